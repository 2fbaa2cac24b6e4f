//! Catalog/configuration variants.
//!
//! A [`SkyVariant`] is a list of column edits plus a tag. Applying it to a
//! catalog and its SkyMaker configuration yields a new pair whose file names
//! and rendered image name carry the tag.

use std::path::{Path, PathBuf};

use eggfit_core::Catalog;
use log::info;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::simulator::Simulator;
use crate::skyconf::SkyConfig;
use crate::SkyError;

/// One operation on a numeric catalog column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ColumnEdit {
    /// Overwrite every row with `value`.
    Set { column: String, value: f64 },
    /// Multiply every row by `factor`.
    Scale { column: String, factor: f64 },
}

impl ColumnEdit {
    fn apply(&self, catalog: &mut Catalog) -> Result<(), SkyError> {
        match self {
            ColumnEdit::Set { column, value } => {
                // The column must exist; only its values change.
                catalog.float_column(column)?;
                catalog.set_float_column(column, vec![*value; catalog.len()])?;
            }
            ColumnEdit::Scale { column, factor } => {
                catalog.map_float_column(column, |v| v * factor)?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkyVariant {
    /// Suffix appended to derived file names.
    pub tag: String,
    pub edits: Vec<ColumnEdit>,
}

impl SkyVariant {
    pub fn new(tag: impl Into<String>, edits: Vec<ColumnEdit>) -> Self {
        Self {
            tag: tag.into(),
            edits,
        }
    }

    /// Every galaxy is a pure bulge.
    pub fn bulge() -> Self {
        Self::new(
            "bulge",
            vec![ColumnEdit::Set {
                column: "bt".to_string(),
                value: 1.0,
            }],
        )
    }

    /// Every galaxy is a pure disk.
    pub fn disk() -> Self {
        Self::new(
            "disk",
            vec![ColumnEdit::Set {
                column: "bt".to_string(),
                value: 0.0,
            }],
        )
    }

    /// Bulge and disk radii halved.
    pub fn half_radius() -> Self {
        Self::new(
            "reL2",
            ["bulge_radius", "disk_radius"]
                .into_iter()
                .map(|column| ColumnEdit::Scale {
                    column: column.to_string(),
                    factor: 0.5,
                })
                .collect(),
        )
    }
}

/// `<stem>_<tag>.fits`, keeping any directory prefix of `image_name`.
fn tagged_image_name(image_name: &str, tag: &str) -> String {
    let stem = image_name.strip_suffix(".fits").unwrap_or(image_name);
    format!("{stem}_{tag}.fits")
}

/// Apply `variant` to a catalog and its configuration without touching disk.
pub fn apply_variant(
    catalog: &Catalog,
    config: &SkyConfig,
    variant: &SkyVariant,
) -> Result<(Catalog, SkyConfig), SkyError> {
    let mut catalog = catalog.clone();
    for edit in &variant.edits {
        edit.apply(&mut catalog)?;
    }

    let mut config = config.clone();
    let image_name = config
        .get(SkyConfig::IMAGE_NAME)
        .ok_or_else(|| SkyError::UnknownKey(SkyConfig::IMAGE_NAME.to_string()))?;
    let renamed = tagged_image_name(image_name, &variant.tag);
    config.set(SkyConfig::IMAGE_NAME, renamed)?;
    Ok((catalog, config))
}

/// `<stem>_<tag>.<ext>` next to `path`.
pub fn derived_path(path: impl AsRef<Path>, tag: &str) -> Result<PathBuf, SkyError> {
    let path = path.as_ref();
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| SkyError::InvalidPath(path.display().to_string()))?;
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_{tag}.{ext}"),
        None => format!("{stem}_{tag}"),
    };
    Ok(path.with_file_name(name))
}

/// A catalog and the SkyMaker configuration that renders it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantPaths {
    pub catalog: PathBuf,
    pub config: PathBuf,
}

impl VariantPaths {
    pub fn new(catalog: impl Into<PathBuf>, config: impl Into<PathBuf>) -> Self {
        Self {
            catalog: catalog.into(),
            config: config.into(),
        }
    }

    pub fn derive(&self, tag: &str) -> Result<Self, SkyError> {
        Ok(Self {
            catalog: derived_path(&self.catalog, tag)?,
            config: derived_path(&self.config, tag)?,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    #[default]
    CatalogOnly,
    CatalogAndImage,
}

/// Write the variant of `source` to derived paths and, when asked, render it.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(source, simulator), fields(tag = %variant.tag))
)]
pub fn build_variant(
    source: &VariantPaths,
    variant: &SkyVariant,
    mode: BuildMode,
    simulator: &dyn Simulator,
) -> Result<VariantPaths, SkyError> {
    let catalog = Catalog::read(&source.catalog)?;
    let config = SkyConfig::read(&source.config)?;
    let (catalog, config) = apply_variant(&catalog, &config, variant)?;

    let out = source.derive(&variant.tag)?;
    catalog.write(&out.catalog)?;
    config.write(&out.config)?;
    info!(
        "{} catalog written to {} ({} sources)",
        variant.tag,
        out.catalog.display(),
        catalog.len()
    );

    if mode == BuildMode::CatalogAndImage {
        simulator.render(&out.catalog, &out.config)?;
        info!("{} sky created", variant.tag);
    }
    Ok(out)
}
