use eggfit_core::{CatalogError, FitsError};

#[derive(thiserror::Error, Debug)]
pub enum SkyError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Fits(#[from] FitsError),
    #[error("configuration has no `{0}` entry")]
    UnknownKey(String),
    #[error("exposure time must be finite and positive, got {0}")]
    InvalidExposure(f64),
    #[error("`{0}` has no file name to derive from")]
    InvalidPath(String),
    #[error("simulator `{program}` failed: {reason}")]
    Simulator { program: String, reason: String },
}
