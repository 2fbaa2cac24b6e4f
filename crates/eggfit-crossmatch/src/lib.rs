//! Cross-matching of a synthetic truth catalog against fitted measurements.
//!
//! Each measured source (a *candidate*, typically a Galapagos/Galfit row)
//! is associated with at most one truth source (a *reference*, typically an
//! EGG galaxy projected to pixel coordinates):
//!
//! 1. look for references strictly inside the square footprint of half-width
//!    `RE_GALFIT` around the candidate;
//! 2. if that does not yield exactly one hit, grow a square window from zero
//!    in `search_step` increments until exactly one reference falls inside,
//!    giving up once the window exceeds the candidate radius (or
//!    `unfit_escape_radius` for candidates whose fit never completed);
//! 3. the first candidate to claim a reference keeps it; later claimants are
//!    reported as conflicts.
//!
//! Candidates are processed in input order, which decides claim priority.

mod io;
mod matcher;
mod reference;
mod types;

pub use io::{CrossmatchConfig, CrossmatchIoError, CrossmatchReport, MatchSummary};
pub use matcher::match_candidates;
pub use reference::{
    all_references, candidates_from_catalog, references_from_catalog, select_references,
    CandidateColumns,
};
pub use types::{Candidate, Correspondence, MatchParams, MatchResult, MatchStatus};
