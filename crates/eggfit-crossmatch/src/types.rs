use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// One measured source.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Measured position in pixels (`X_IMAGE`, `Y_IMAGE`).
    pub position: Point2<f64>,
    /// Half-width of the square footprint in pixels (`RE_GALFIT`).
    pub radius: f64,
    /// Whether the profile fit completed (`FIT_DONE`).
    pub fit_done: bool,
}

impl Candidate {
    pub fn new(x: f64, y: f64, radius: f64, fit_done: bool) -> Self {
        Self {
            position: Point2::new(x, y),
            radius,
            fit_done,
        }
    }
}

/// Tunables of the adaptive window search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Window half-width increment per search iteration, in pixels.
    pub search_step: f64,
    /// Half-width past which a candidate without a completed fit and no
    /// reference in its own footprint is abandoned.
    pub unfit_escape_radius: f64,
}

impl MatchParams {
    pub const DEFAULT_SEARCH_STEP: f64 = 0.1;
    pub const DEFAULT_UNFIT_ESCAPE_RADIUS: f64 = 400.0;

    /// Step actually used by the search: non-positive or non-finite steps
    /// would never grow the window.
    pub(crate) fn effective_step(&self) -> f64 {
        if self.search_step.is_finite() && self.search_step > 0.0 {
            self.search_step
        } else {
            Self::DEFAULT_SEARCH_STEP
        }
    }
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            search_step: Self::DEFAULT_SEARCH_STEP,
            unfit_escape_radius: Self::DEFAULT_UNFIT_ESCAPE_RADIUS,
        }
    }
}

/// Outcome for one candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchStatus {
    /// The candidate owns its reference.
    Ok,
    /// The only reference found was already claimed by an earlier candidate.
    Conflict { contested: usize, claimed_by: usize },
    /// No window isolated a single reference before an escape condition hit.
    Unresolved,
}

impl MatchStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, MatchStatus::Ok)
    }
}

/// Output record, one per candidate in input order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correspondence {
    /// Index in the candidate list.
    pub candidate: usize,
    /// Reference index; `Some` only when `status` is `Ok`.
    pub reference: Option<usize>,
    pub status: MatchStatus,
}

/// Result of a full matching pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub correspondences: Vec<Correspondence>,
    /// Candidates with status `Ok`, in input order.
    pub resolved: Vec<usize>,
    /// Candidates with status `Conflict` or `Unresolved`, in input order.
    pub failed: Vec<usize>,
    /// `failed.len()`, reported separately for parity with the summary line.
    pub error_count: usize,
    /// Candidates whose own footprint did not hold exactly one reference.
    pub adaptive_searches: usize,
}

impl MatchResult {
    /// Reference index per candidate, `None` where no valid match exists.
    pub fn reference_indices(&self) -> Vec<Option<usize>> {
        self.correspondences.iter().map(|c| c.reference).collect()
    }

    /// `(candidate, reference)` pairs for valid matches.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.correspondences
            .iter()
            .filter_map(|c| c.reference.map(|r| (c.candidate, r)))
    }

    pub fn conflicts(&self) -> usize {
        self.count(|s| matches!(s, MatchStatus::Conflict { .. }))
    }

    pub fn unresolved(&self) -> usize {
        self.count(|s| matches!(s, MatchStatus::Unresolved))
    }

    fn count(&self, pred: impl Fn(&MatchStatus) -> bool) -> usize {
        self.correspondences
            .iter()
            .filter(|c| pred(&c.status))
            .count()
    }
}
