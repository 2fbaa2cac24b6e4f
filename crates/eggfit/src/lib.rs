//! Facade crate for the `eggfit-*` workspace.
//!
//! The workflow this supports:
//!
//! 1. derive edited sky catalogs (pure bulge, pure disk, halved radii) from
//!    an `egg-2skymaker` catalog and render them with SkyMaker;
//! 2. convert rendered count-rate images to counts;
//! 3. after Galapagos/Galfit has run on the images, flag every fit as
//!    good, suspicious, bad or unavailable;
//! 4. cross-match the fitted sources back to the simulated truth catalog.
//!
//! ## API map
//! - `eggfit::core`: ASCII catalogs, FITS images, logging.
//! - `eggfit::crossmatch`: candidate/reference matcher and its JSON config.
//! - `eggfit::quality`: fit quality classifier.
//! - `eggfit::sky`: catalog variants, SkyMaker driver, ADU conversion.
//! - `eggfit::workflow`: file-to-file helpers used by the `eggfit` binary.

pub use eggfit_core as core;
pub use eggfit_crossmatch as crossmatch;
pub use eggfit_quality as quality;
pub use eggfit_sky as sky;

pub use eggfit_core::{Catalog, FitsImage};
pub use eggfit_crossmatch::{match_candidates, Candidate, MatchParams, MatchResult};
pub use eggfit_quality::{classify, QualityParams, QualityPartition};
pub use eggfit_sky::{BuildMode, SkyVariant};

pub mod workflow;
