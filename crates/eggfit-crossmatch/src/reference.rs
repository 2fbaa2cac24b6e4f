//! Catalog adapters: candidates from a Galfit catalog, references from a
//! truth catalog, and the eligibility mask.

use eggfit_core::{Catalog, CatalogError, Column};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::types::Candidate;

/// Column names used to build candidates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateColumns {
    pub x: String,
    pub y: String,
    pub radius: String,
    pub fit_done: String,
}

impl Default for CandidateColumns {
    fn default() -> Self {
        Self {
            x: "X_IMAGE".to_string(),
            y: "Y_IMAGE".to_string(),
            radius: "RE_GALFIT".to_string(),
            fit_done: "FIT_DONE".to_string(),
        }
    }
}

/// Read candidates from a fitted catalog.
///
/// `fit_done` accepts numeric flags (non-zero is done) or logical text
/// (`T`, `true`, `yes`, `1`, case-insensitive).
pub fn candidates_from_catalog(
    catalog: &Catalog,
    columns: &CandidateColumns,
) -> Result<Vec<Candidate>, CatalogError> {
    let xs = catalog.float_column(&columns.x)?;
    let ys = catalog.float_column(&columns.y)?;
    let radii = catalog.float_column(&columns.radius)?;
    let done: Vec<bool> = match catalog.column(&columns.fit_done) {
        Some(Column::Float(v)) => v.iter().map(|&f| f != 0.0 && !f.is_nan()).collect(),
        Some(Column::Text(v)) => v.iter().map(|s| is_truthy(s)).collect(),
        None => return Err(CatalogError::UnknownColumn(columns.fit_done.clone())),
    };

    Ok(xs
        .iter()
        .zip(ys)
        .zip(radii)
        .zip(done)
        .map(|(((&x, &y), &r), d)| Candidate::new(x, y, r, d))
        .collect())
}

fn is_truthy(s: &str) -> bool {
    ["t", "true", "yes", "y", "1"]
        .iter()
        .any(|t| s.trim().eq_ignore_ascii_case(t))
}

/// Read reference positions (pixels) from a truth catalog.
pub fn references_from_catalog(
    catalog: &Catalog,
    x: &str,
    y: &str,
) -> Result<Vec<Point2<f64>>, CatalogError> {
    let xs = catalog.float_column(x)?;
    let ys = catalog.float_column(y)?;
    Ok(xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| Point2::new(x, y))
        .collect())
}

/// Indices of references brighter than the detection limit.
///
/// Magnitudes that are not finite never pass.
pub fn select_references(magnitudes: &[f64], limit: f64) -> Vec<usize> {
    magnitudes
        .iter()
        .enumerate()
        .filter(|(_, &m)| m.is_finite() && m < limit)
        .map(|(i, _)| i)
        .collect()
}

/// Mask admitting every reference.
pub fn all_references(count: usize) -> Vec<usize> {
    (0..count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_candidates_from_galfit_columns() {
        let cat = Catalog::parse(
            "X_IMAGE Y_IMAGE RE_GALFIT FIT_DONE\n\
             10 20 2.5 1\n\
             11 21 nan 0\n",
        )
        .expect("parse");
        let cands = candidates_from_catalog(&cat, &CandidateColumns::default()).expect("cands");
        assert_eq!(cands.len(), 2);
        assert_eq!(cands[0], Candidate::new(10.0, 20.0, 2.5, true));
        assert!(!cands[1].fit_done);
        assert!(cands[1].radius.is_nan());
    }

    #[test]
    fn logical_fit_done_text_is_understood() {
        let cat = Catalog::parse("X_IMAGE Y_IMAGE RE_GALFIT FIT_DONE\n1 1 1 T\n2 2 1 F\n")
            .expect("parse");
        let cands = candidates_from_catalog(&cat, &CandidateColumns::default()).expect("cands");
        assert!(cands[0].fit_done);
        assert!(!cands[1].fit_done);
    }

    #[test]
    fn missing_columns_are_reported() {
        let cat = Catalog::parse("X_IMAGE Y_IMAGE RE_GALFIT\n1 1 1\n").expect("parse");
        let err = candidates_from_catalog(&cat, &CandidateColumns::default()).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownColumn(name) if name == "FIT_DONE"));
    }

    #[test]
    fn selection_keeps_bright_finite_magnitudes() {
        let mags = [22.0, 25.5, f64::NAN, 24.9, f64::INFINITY];
        assert_eq!(select_references(&mags, 25.0), vec![0, 3]);
        assert_eq!(all_references(3), vec![0, 1, 2]);
    }

    #[test]
    fn reference_positions_follow_catalog_order() {
        let cat = Catalog::parse("x y\n1.5 2.5\n3 4\n").expect("parse");
        let refs = references_from_catalog(&cat, "x", "y").expect("refs");
        assert_eq!(refs, vec![Point2::new(1.5, 2.5), Point2::new(3.0, 4.0)]);
    }
}
