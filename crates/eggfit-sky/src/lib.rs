//! Synthetic sky variants for EGG + SkyMaker.
//!
//! Starting from a SkyMaker catalog produced by `egg-2skymaker` and its
//! configuration file, this crate derives edited pairs (pure bulge, pure
//! disk, halved radii), optionally renders them through external simulator
//! programs, and converts rendered count-rate images to counts.

mod adu;
mod editor;
mod error;
mod simulator;
mod skyconf;

pub use adu::{adu_path, convert_file, to_counts};
pub use editor::{
    apply_variant, build_variant, derived_path, BuildMode, ColumnEdit, SkyVariant, VariantPaths,
};
pub use error::SkyError;
pub use simulator::{SkyMaker, Simulator};
pub use skyconf::{ConfigEntry, SkyConfig};
