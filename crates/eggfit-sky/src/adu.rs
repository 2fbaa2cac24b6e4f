//! Count-rate (ADU/s) to counts (ADU) conversion.

use std::path::{Path, PathBuf};

use eggfit_core::FitsImage;
use log::info;

use crate::SkyError;

/// Multiply every pixel by `exposure` seconds and round half to even.
///
/// `EXPTIME` is set to the exposure and `BUNIT` to `DN` in the returned
/// header; other cards already held there are kept.
pub fn to_counts(image: &FitsImage, exposure: f64) -> Result<FitsImage, SkyError> {
    if !(exposure.is_finite() && exposure > 0.0) {
        return Err(SkyError::InvalidExposure(exposure));
    }
    let mut out = image.clone();
    for v in &mut out.data {
        *v = (*v * exposure).round_ties_even();
    }
    out.header.set("EXPTIME", exposure);
    out.header.set("BUNIT", "DN");
    Ok(out)
}

/// `<stem>_adu.fits` next to `path`.
pub fn adu_path(path: impl AsRef<Path>) -> Result<PathBuf, SkyError> {
    let path = path.as_ref();
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| SkyError::InvalidPath(path.display().to_string()))?;
    Ok(path.with_file_name(format!("{stem}_adu.fits")))
}

/// Convert the image at `path`, writing (and overwriting) its `_adu` sibling.
///
/// The output is a copy of the input file with new pixels, so every input
/// header card survives apart from the updated `EXPTIME` and `BUNIT`.
pub fn convert_file(path: impl AsRef<Path>, exposure: f64) -> Result<PathBuf, SkyError> {
    let path = path.as_ref();
    if !(exposure.is_finite() && exposure > 0.0) {
        return Err(SkyError::InvalidExposure(exposure));
    }
    let image = FitsImage::read(path)?;
    let counts = to_counts(&image, exposure)?;
    let out = adu_path(path)?;
    counts.write_over(path, &out)?;
    info!(
        "{}x{} image converted with EXPTIME={exposure}: {}",
        counts.width,
        counts.height,
        out.display()
    );
    Ok(out)
}
