use std::fs;
use std::path::Path;

use eggfit_core::{Catalog, CatalogError, Column};
use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Galfit's lower Sérsic index constraint.
pub const SERSIC_LOWER_BOUND: f64 = 0.2;
/// Galfit's upper Sérsic index constraint.
pub const SERSIC_UPPER_BOUND: f64 = 20.0;
/// Value Galapagos writes to `REERR_GALFIT` when the error is undefined.
pub const RE_ERROR_SENTINEL: f64 = 99999.0;
/// Galfit's effective radius constraint, in pixels.
pub const RE_UPPER_BOUND: f64 = 400.0;
/// `FLAGS_GALFIT` value of a clean fit.
pub const GOOD_FLAG: &str = "GOOD";

#[derive(thiserror::Error, Debug)]
pub enum QualityError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Classifier settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityParams {
    /// The Sérsic index was held fixed: its value and error are not required.
    pub fixed_sersic: bool,
    /// Rows fainter than this magnitude are `bad`.
    pub mag_limit: Option<f64>,
    /// Magnitude column compared against `mag_limit`.
    pub mag_column: String,
}

impl Default for QualityParams {
    fn default() -> Self {
        Self {
            fixed_sersic: false,
            mag_limit: None,
            mag_column: "MAG_BEST".to_string(),
        }
    }
}

impl QualityParams {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, QualityError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), QualityError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Good,
    Suspicious,
    Bad,
    Unavailable,
}

/// The measurements one classification looks at.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FitRow {
    pub sersic: f64,
    pub sersic_err: f64,
    pub ellipticity_err: f64,
    pub ar_err: f64,
    pub re: f64,
    pub re_err: f64,
    pub mag_err: f64,
    pub mag: Option<f64>,
    pub flagged_good: bool,
}

/// Classify a single fit.
pub fn classify_row(row: &FitRow, params: &QualityParams) -> Quality {
    let mut required = vec![row.ellipticity_err, row.ar_err, row.re_err, row.mag_err];
    if !params.fixed_sersic {
        required.extend([row.sersic, row.sersic_err]);
    }
    if required.iter().any(|v| v.is_nan()) {
        return Quality::Unavailable;
    }

    let too_faint = match (params.mag_limit, row.mag) {
        (Some(limit), Some(mag)) => mag > limit,
        _ => false,
    };
    let at_boundary = row.sersic == SERSIC_LOWER_BOUND
        || row.sersic == SERSIC_UPPER_BOUND
        || row.re_err == RE_ERROR_SENTINEL
        || row.re == RE_UPPER_BOUND
        || too_faint;

    if at_boundary {
        Quality::Bad
    } else if row.flagged_good {
        Quality::Good
    } else {
        Quality::Suspicious
    }
}

/// Row indices of each class. The four lists partition `0..len`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityPartition {
    pub good: Vec<usize>,
    pub suspicious: Vec<usize>,
    pub bad: Vec<usize>,
    pub unavailable: Vec<usize>,
}

impl QualityPartition {
    fn push(&mut self, idx: usize, quality: Quality) {
        match quality {
            Quality::Good => self.good.push(idx),
            Quality::Suspicious => self.suspicious.push(idx),
            Quality::Bad => self.bad.push(idx),
            Quality::Unavailable => self.unavailable.push(idx),
        }
    }

    /// Total number of classified rows.
    pub fn len(&self) -> usize {
        self.good.len() + self.suspicious.len() + self.bad.len() + self.unavailable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Class of every row, in row order.
    pub fn labels(&self) -> Vec<Quality> {
        let mut labels = vec![Quality::Unavailable; self.len()];
        for (list, q) in [
            (&self.good, Quality::Good),
            (&self.suspicious, Quality::Suspicious),
            (&self.bad, Quality::Bad),
        ] {
            for &i in list {
                labels[i] = q;
            }
        }
        labels
    }
}

fn good_flags(catalog: &Catalog, name: &str) -> Result<Vec<bool>, CatalogError> {
    match catalog.column(name) {
        Some(Column::Text(v)) => Ok(v.iter().map(|s| s == GOOD_FLAG).collect()),
        Some(Column::Float(v)) => Ok(vec![false; v.len()]),
        None => Err(CatalogError::UnknownColumn(name.to_string())),
    }
}

fn column_or_nan<'a>(
    catalog: &'a Catalog,
    name: &str,
    required: bool,
) -> Result<Option<&'a [f64]>, CatalogError> {
    if required || catalog.has_column(name) {
        catalog.float_column(name).map(Some)
    } else {
        Ok(None)
    }
}

/// Classify every row of a Galapagos/Galfit catalog.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(rows = catalog.len()))
)]
pub fn classify(
    catalog: &Catalog,
    params: &QualityParams,
) -> Result<QualityPartition, QualityError> {
    let sersic = catalog.float_column("SERSIC_GALFIT")?;
    let sersic_err = column_or_nan(catalog, "SERSICERR_GALFIT", !params.fixed_sersic)?;
    let ellipticity_err = catalog.float_column("ELLIPTICITYERR_GALFIT")?;
    let ar_err = catalog.float_column("ARERR_GALFIT")?;
    let re = catalog.float_column("RE_GALFIT")?;
    let re_err = catalog.float_column("REERR_GALFIT")?;
    let mag_err = catalog.float_column("MAGERR_GALFIT")?;
    let mag = match params.mag_limit {
        Some(_) => Some(catalog.float_column(&params.mag_column)?),
        None => None,
    };
    let flags = good_flags(catalog, "FLAGS_GALFIT")?;

    let mut partition = QualityPartition::default();
    for i in 0..catalog.len() {
        let row = FitRow {
            sersic: sersic[i],
            sersic_err: sersic_err.map_or(f64::NAN, |c| c[i]),
            ellipticity_err: ellipticity_err[i],
            ar_err: ar_err[i],
            re: re[i],
            re_err: re_err[i],
            mag_err: mag_err[i],
            mag: mag.map(|c| c[i]),
            flagged_good: flags[i],
        };
        partition.push(i, classify_row(&row, params));
    }

    debug!(
        "quality: good={} suspicious={} bad={} unavailable={}",
        partition.good.len(),
        partition.suspicious.len(),
        partition.bad.len(),
        partition.unavailable.len()
    );
    Ok(partition)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "SERSIC_GALFIT SERSICERR_GALFIT ELLIPTICITYERR_GALFIT ARERR_GALFIT \
                          RE_GALFIT REERR_GALFIT MAGERR_GALFIT MAG_BEST FLAGS_GALFIT FIT_DONE";

    fn catalog(rows: &[&str]) -> Catalog {
        let mut text = format!("{HEADER}\n");
        for r in rows {
            text.push_str(r);
            text.push('\n');
        }
        Catalog::parse(&text).expect("parse")
    }

    fn clean_row() -> FitRow {
        FitRow {
            sersic: 2.5,
            sersic_err: 0.1,
            ellipticity_err: 0.01,
            ar_err: 0.02,
            re: 5.0,
            re_err: 0.3,
            mag_err: 0.05,
            mag: Some(22.0),
            flagged_good: true,
        }
    }

    #[test]
    fn row_classes_follow_predicates() {
        let p = QualityParams::default();
        assert_eq!(classify_row(&clean_row(), &p), Quality::Good);

        let unflagged = FitRow {
            flagged_good: false,
            ..clean_row()
        };
        assert_eq!(classify_row(&unflagged, &p), Quality::Suspicious);

        for bad in [
            FitRow { sersic: 0.2, ..clean_row() },
            FitRow { sersic: 20.0, ..clean_row() },
            FitRow { re: 400.0, ..clean_row() },
            FitRow { re_err: 99999.0, ..clean_row() },
        ] {
            assert_eq!(classify_row(&bad, &p), Quality::Bad);
        }

        let missing = FitRow {
            mag_err: f64::NAN,
            re: 400.0,
            ..clean_row()
        };
        assert_eq!(classify_row(&missing, &p), Quality::Unavailable);
    }

    #[test]
    fn fixed_sersic_ignores_sersic_nans_but_not_boundaries() {
        let p = QualityParams {
            fixed_sersic: true,
            ..QualityParams::default()
        };
        let row = FitRow {
            sersic_err: f64::NAN,
            ..clean_row()
        };
        assert_eq!(classify_row(&row, &p), Quality::Good);
        assert_eq!(
            classify_row(&row, &QualityParams::default()),
            Quality::Unavailable
        );

        let pinned = FitRow {
            sersic: 20.0,
            sersic_err: f64::NAN,
            ..clean_row()
        };
        assert_eq!(classify_row(&pinned, &p), Quality::Bad);
    }

    #[test]
    fn magnitude_limit_marks_faint_rows_bad() {
        let p = QualityParams {
            mag_limit: Some(21.5),
            ..QualityParams::default()
        };
        assert_eq!(classify_row(&clean_row(), &p), Quality::Bad);
        let bright = FitRow {
            mag: Some(21.0),
            ..clean_row()
        };
        assert_eq!(classify_row(&bright, &p), Quality::Good);
        let unknown = FitRow {
            mag: Some(f64::NAN),
            ..clean_row()
        };
        assert_eq!(classify_row(&unknown, &p), Quality::Good);
    }

    #[test]
    fn catalog_rows_partition_into_four_classes() {
        let cat = catalog(&[
            "2.5 0.1 0.01 0.02 5 0.3 0.05 22 GOOD 1",
            "2.5 0.1 0.01 0.02 5 0.3 0.05 22 BAD 1",
            "20 0.1 0.01 0.02 5 0.3 0.05 22 GOOD 1",
            "nan 0.1 0.01 0.02 5 0.3 0.05 22 GOOD 0",
            "1.0 0.1 0.01 0.02 400 99999 0.05 26 GOOD 1",
        ]);
        let part = classify(&cat, &QualityParams::default()).expect("classify");
        assert_eq!(part.good, vec![0]);
        assert_eq!(part.suspicious, vec![1]);
        assert_eq!(part.bad, vec![2, 4]);
        assert_eq!(part.unavailable, vec![3]);
        assert_eq!(part.len(), cat.len());
        assert_eq!(
            part.labels(),
            vec![
                Quality::Good,
                Quality::Suspicious,
                Quality::Bad,
                Quality::Unavailable,
                Quality::Bad
            ]
        );

        let limited = QualityParams {
            mag_limit: Some(23.0),
            ..QualityParams::default()
        };
        let part = classify(&cat, &limited).expect("classify");
        assert_eq!(part.bad, vec![2, 4]);
        assert_eq!(part.good, vec![0]);
    }

    #[test]
    fn params_json_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("params.json");
        fs::write(&path, r#"{"fixed_sersic": true}"#).expect("write");
        let p = QualityParams::load_json(&path).expect("load");
        assert!(p.fixed_sersic);
        assert_eq!(p.mag_limit, None);
        assert_eq!(p.mag_column, "MAG_BEST");
    }

    #[test]
    fn missing_columns_are_errors() {
        let cat = Catalog::parse("SERSIC_GALFIT RE_GALFIT\n1 2\n").expect("parse");
        assert!(matches!(
            classify(&cat, &QualityParams::default()),
            Err(QualityError::Catalog(CatalogError::UnknownColumn(_)))
        ));
    }
}
