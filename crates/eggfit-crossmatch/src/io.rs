//! JSON configuration and report helpers for cross-matching.

use std::fs;
use std::path::{Path, PathBuf};

use eggfit_core::{Catalog, CatalogError};
use log::info;
use serde::{Deserialize, Serialize};

use crate::match_candidates;
use crate::reference::{
    all_references, candidates_from_catalog, references_from_catalog, select_references,
    CandidateColumns,
};
use crate::types::{Correspondence, MatchParams, MatchResult};

#[derive(thiserror::Error, Debug)]
pub enum CrossmatchIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("a magnitude limit needs `reference_mag` to name the magnitude column")]
    MissingMagnitudeColumn,
}

fn default_reference_x() -> String {
    "x".to_string()
}

fn default_reference_y() -> String {
    "y".to_string()
}

/// Inputs of a cross-matching run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossmatchConfig {
    /// Fitted (Galfit) catalog.
    pub candidates_path: String,
    /// Truth (EGG) catalog with pixel positions.
    pub references_path: String,
    #[serde(default)]
    pub candidate_columns: CandidateColumns,
    #[serde(default = "default_reference_x")]
    pub reference_x: String,
    #[serde(default = "default_reference_y")]
    pub reference_y: String,
    /// Magnitude column used with `mag_limit` to build the eligibility mask.
    #[serde(default)]
    pub reference_mag: Option<String>,
    #[serde(default)]
    pub mag_limit: Option<f64>,
    #[serde(default)]
    pub params: MatchParams,
    #[serde(default)]
    pub output_path: Option<String>,
}

impl CrossmatchConfig {
    pub fn new(candidates_path: impl Into<String>, references_path: impl Into<String>) -> Self {
        Self {
            candidates_path: candidates_path.into(),
            references_path: references_path.into(),
            candidate_columns: CandidateColumns::default(),
            reference_x: default_reference_x(),
            reference_y: default_reference_y(),
            reference_mag: None,
            mag_limit: None,
            params: MatchParams::default(),
            output_path: None,
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CrossmatchIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CrossmatchIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output report path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("crossmatch_report.json"))
    }

    /// Eligible reference indices for `references`.
    pub fn build_mask(&self, references: &Catalog) -> Result<Vec<usize>, CrossmatchIoError> {
        match (self.mag_limit, self.reference_mag.as_deref()) {
            (None, _) => Ok(all_references(references.len())),
            (Some(_), None) => Err(CrossmatchIoError::MissingMagnitudeColumn),
            (Some(limit), Some(column)) => {
                Ok(select_references(references.float_column(column)?, limit))
            }
        }
    }

    /// Load both catalogs and run the matcher.
    pub fn run(&self) -> Result<CrossmatchReport, CrossmatchIoError> {
        let measured = Catalog::read(&self.candidates_path)?;
        let truth = Catalog::read(&self.references_path)?;

        let candidates = candidates_from_catalog(&measured, &self.candidate_columns)?;
        let references = references_from_catalog(&truth, &self.reference_x, &self.reference_y)?;
        let mask = self.build_mask(&truth)?;
        info!(
            "{} candidates, {} of {} references eligible",
            candidates.len(),
            mask.len(),
            references.len()
        );

        let result = match_candidates(&candidates, &references, &mask, &self.params);
        Ok(CrossmatchReport::new(self, references.len(), mask.len(), result))
    }
}

/// Counts of a matching run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub candidates: usize,
    pub references: usize,
    pub eligible_references: usize,
    pub resolved: usize,
    pub conflicts: usize,
    pub unresolved: usize,
    pub error_count: usize,
    pub adaptive_searches: usize,
}

impl MatchSummary {
    pub fn from_result(result: &MatchResult, references: usize, eligible: usize) -> Self {
        Self {
            candidates: result.correspondences.len(),
            references,
            eligible_references: eligible,
            resolved: result.resolved.len(),
            conflicts: result.conflicts(),
            unresolved: result.unresolved(),
            error_count: result.error_count,
            adaptive_searches: result.adaptive_searches,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossmatchReport {
    pub candidates_path: String,
    pub references_path: String,
    pub params: MatchParams,
    pub summary: MatchSummary,
    pub correspondences: Vec<Correspondence>,
    #[serde(default)]
    pub failed: Vec<usize>,
}

impl CrossmatchReport {
    pub fn new(
        cfg: &CrossmatchConfig,
        references: usize,
        eligible: usize,
        result: MatchResult,
    ) -> Self {
        Self {
            candidates_path: cfg.candidates_path.clone(),
            references_path: cfg.references_path.clone(),
            params: cfg.params.clone(),
            summary: MatchSummary::from_result(&result, references, eligible),
            failed: result.failed,
            correspondences: result.correspondences,
        }
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CrossmatchIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CrossmatchIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchStatus;

    fn write(dir: &Path, name: &str, text: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, text).expect("write fixture");
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let cfg: CrossmatchConfig =
            serde_json::from_str(r#"{"candidates_path": "g.cat", "references_path": "e.cat"}"#)
                .expect("json");
        assert_eq!(cfg, CrossmatchConfig::new("g.cat", "e.cat"));
        assert_eq!(cfg.params.search_step, 0.1);
        assert_eq!(cfg.output_path(), PathBuf::from("crossmatch_report.json"));
    }

    #[test]
    fn magnitude_limit_requires_column() {
        let truth = Catalog::parse("x y mag\n0 0 20\n1 1 30\n").expect("parse");
        let mut cfg = CrossmatchConfig::new("a", "b");
        assert_eq!(cfg.build_mask(&truth).expect("all"), vec![0, 1]);

        cfg.mag_limit = Some(25.0);
        assert!(matches!(
            cfg.build_mask(&truth),
            Err(CrossmatchIoError::MissingMagnitudeColumn)
        ));

        cfg.reference_mag = Some("mag".to_string());
        assert_eq!(cfg.build_mask(&truth).expect("bright"), vec![0]);
    }

    #[test]
    fn run_matches_catalogs_and_report_reloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let galfit = write(
            dir.path(),
            "galfit.cat",
            "X_IMAGE Y_IMAGE RE_GALFIT FIT_DONE\n10 10 2 1\n10.5 10 2 1\n80 80 1 0\n",
        );
        let egg = write(
            dir.path(),
            "egg.cat",
            "x y mag\n10 10 22\n50 50 23\n80.2 80.1 29\n",
        );

        let mut cfg = CrossmatchConfig::new(galfit, egg);
        cfg.reference_mag = Some("mag".to_string());
        cfg.mag_limit = Some(25.0);
        let report = cfg.run().expect("run");

        assert_eq!(report.summary.candidates, 3);
        assert_eq!(report.summary.eligible_references, 2);
        assert_eq!(report.summary.resolved, 1);
        assert_eq!(report.summary.conflicts, 1);
        assert_eq!(report.summary.unresolved, 1);
        assert_eq!(report.summary.error_count, 2);
        assert_eq!(report.failed, vec![1, 2]);
        assert_eq!(report.correspondences[0].reference, Some(0));
        assert!(matches!(
            report.correspondences[1].status,
            MatchStatus::Conflict { contested: 0, claimed_by: 0 }
        ));

        let out = dir.path().join("report.json");
        report.write_json(&out).expect("write report");
        assert_eq!(CrossmatchReport::load_json(&out).expect("reload"), report);
    }
}
