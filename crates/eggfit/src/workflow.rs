//! File-to-file steps of the workflow.

use std::path::Path;

use eggfit_core::{Catalog, CatalogError};
use eggfit_crossmatch::{CrossmatchConfig, CrossmatchIoError, CrossmatchReport};
use eggfit_quality::{classify, QualityError, QualityParams, QualityReport};
use eggfit_sky::{build_variant, BuildMode, Simulator, SkyError, SkyVariant, VariantPaths};
use log::info;

#[derive(thiserror::Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Crossmatch(#[from] CrossmatchIoError),
    #[error(transparent)]
    Quality(#[from] QualityError),
    #[error(transparent)]
    Sky(#[from] SkyError),
}

/// Build the pure-bulge then the pure-disk variant of `source`.
pub fn bulge_disk(
    source: &VariantPaths,
    mode: BuildMode,
    simulator: &dyn Simulator,
) -> Result<Vec<VariantPaths>, WorkflowError> {
    [SkyVariant::bulge(), SkyVariant::disk()]
        .iter()
        .map(|variant| Ok(build_variant(source, variant, mode, simulator)?))
        .collect()
}

/// Build the halved-radius variant of `source`.
pub fn half_radius(
    source: &VariantPaths,
    mode: BuildMode,
    simulator: &dyn Simulator,
) -> Result<VariantPaths, WorkflowError> {
    Ok(build_variant(
        source,
        &SkyVariant::half_radius(),
        mode,
        simulator,
    )?)
}

/// Classify the fits of the catalog at `path` and write the report to `output`.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "info", skip_all, fields(path = %path.display()))
)]
pub fn flag_catalog(
    path: &Path,
    params: &QualityParams,
    output: &Path,
) -> Result<QualityReport, WorkflowError> {
    let catalog = Catalog::read(path)?;
    let partition = classify(&catalog, params)?;
    let report = QualityReport::new(path.display().to_string(), params.clone(), partition);
    report.write_json(output)?;
    info!("quality report written to {}", output.display());
    Ok(report)
}

/// Run a cross-match and write its report to the configured output path.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "info", skip(config))
)]
pub fn crossmatch(config: &CrossmatchConfig) -> Result<CrossmatchReport, WorkflowError> {
    let report = config.run()?;
    let out = config.output_path();
    report.write_json(&out)?;
    info!("crossmatch report written to {}", out.display());
    Ok(report)
}
