//! Quality flags for Galfit fits (van der Wel et al. 2012 criteria).
//!
//! Every row of a fitted catalog lands in exactly one class:
//!
//! - `unavailable`: a required measurement is NaN;
//! - `bad`: the fit sits on a Galfit constraint boundary (Sérsic index 0.2 or
//!   20, effective radius 400, radius error 99999) or, when a limit is set,
//!   is fainter than the magnitude limit;
//! - `good`: neither of the above and Galfit flagged the fit `GOOD`;
//! - `suspicious`: everything else.

mod classify;
mod report;

pub use classify::{
    classify, classify_row, FitRow, Quality, QualityError, QualityParams, QualityPartition,
    GOOD_FLAG, RE_ERROR_SENTINEL, RE_UPPER_BOUND, SERSIC_LOWER_BOUND, SERSIC_UPPER_BOUND,
};
pub use report::{QualityCounts, QualityReport};
