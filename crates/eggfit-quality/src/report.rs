use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classify::{QualityError, QualityParams, QualityPartition};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCounts {
    pub good: usize,
    pub suspicious: usize,
    pub bad: usize,
    pub unavailable: usize,
}

impl From<&QualityPartition> for QualityCounts {
    fn from(p: &QualityPartition) -> Self {
        Self {
            good: p.good.len(),
            suspicious: p.suspicious.len(),
            bad: p.bad.len(),
            unavailable: p.unavailable.len(),
        }
    }
}

/// Serializable outcome of classifying one catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub catalog_path: String,
    pub params: QualityParams,
    pub counts: QualityCounts,
    pub partition: QualityPartition,
}

impl QualityReport {
    pub fn new(
        catalog_path: impl Into<String>,
        params: QualityParams,
        partition: QualityPartition,
    ) -> Self {
        Self {
            catalog_path: catalog_path.into(),
            params,
            counts: QualityCounts::from(&partition),
            partition,
        }
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, QualityError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), QualityError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
