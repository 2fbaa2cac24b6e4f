//! Core I/O types for the eggfit tools.
//!
//! This crate knows how to read and write the two external formats the
//! workflow exchanges: whitespace-separated ASCII catalogs (EGG, SkyMaker,
//! SExtractor/Galapagos outputs) and single-image FITS files (through
//! `fitsio`). It carries no astronomy logic of its own.

mod catalog;
mod fits;
mod logger;

pub use catalog::{Catalog, CatalogError, Column};
pub use fits::{FitsError, FitsHeader, FitsImage, HeaderCard, HeaderValue};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init, init_with_level, LogConfig};
