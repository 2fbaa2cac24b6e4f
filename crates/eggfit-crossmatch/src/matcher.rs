use std::collections::hash_map::Entry;
use std::collections::HashMap;

use kiddo::{KdTree, SquaredEuclidean};
use log::{debug, info, warn};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::types::{Candidate, Correspondence, MatchParams, MatchResult, MatchStatus};

/// Eligible references indexed for square-window queries.
///
/// References sharing exact coordinates are stored once; a slot carries every
/// reference index found at that position.
struct ReferenceWindow {
    tree: KdTree<f64, 2>,
    points: Vec<Point2<f64>>,
    ids: Vec<Vec<usize>>,
    eligible: usize,
}

impl ReferenceWindow {
    fn new(references: &[Point2<f64>], mask: &[usize]) -> Self {
        let mut points = Vec::with_capacity(mask.len());
        let mut ids: Vec<Vec<usize>> = Vec::with_capacity(mask.len());
        // (x, y) bit patterns -> slot; `+ 0.0` folds -0.0 onto 0.0
        let mut slots: HashMap<(u64, u64), usize> = HashMap::new();
        let mut eligible = 0;
        for &idx in mask {
            match references.get(idx) {
                Some(p) if p.x.is_finite() && p.y.is_finite() => {
                    eligible += 1;
                    let key = ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits());
                    match slots.entry(key) {
                        Entry::Occupied(slot) => ids[*slot.get()].push(idx),
                        Entry::Vacant(slot) => {
                            slot.insert(points.len());
                            points.push(*p);
                            ids.push(vec![idx]);
                        }
                    }
                }
                Some(_) => debug!("reference {idx} has a non-finite position, skipped"),
                None => warn!(
                    "mask index {idx} out of range ({} references), skipped",
                    references.len()
                ),
            }
        }
        if points.len() < eligible {
            debug!(
                "{} eligible references share {} distinct positions",
                eligible,
                points.len()
            );
        }

        let coords = points.iter().map(|p| [p.x, p.y]).collect::<Vec<_>>();
        let tree: KdTree<f64, 2> = (&coords).into();
        Self {
            tree,
            points,
            ids,
            eligible,
        }
    }

    fn len(&self) -> usize {
        self.eligible
    }

    /// Collect references strictly inside the square of `half_width` around `center`.
    fn window_hits(&self, center: Point2<f64>, half_width: f64, hits: &mut Vec<usize>) {
        hits.clear();
        if half_width <= 0.0 || self.points.is_empty() {
            return;
        }

        // Circumcircle of the square, with slack so rounding never clips a corner.
        let radius_sq = 2.0 * half_width * half_width * (1.0 + 1e-9);
        let query = [center.x, center.y];
        for nn in self
            .tree
            .within_unsorted::<SquaredEuclidean>(&query, radius_sq)
        {
            let slot = nn.item as usize;
            let p = self.points[slot];
            if center.x - half_width < p.x
                && p.x < center.x + half_width
                && center.y - half_width < p.y
                && p.y < center.y + half_width
            {
                hits.extend_from_slice(&self.ids[slot]);
            }
        }
    }

    /// Grow the window from zero until it isolates exactly one reference.
    ///
    /// The window never grows past `candidate.radius`: a half-width beyond it
    /// returns `None` before any hit is considered. When `zero_hit` is set and
    /// the fit did not complete, the search also stops once the next
    /// half-width exceeds `unfit_escape_radius`.
    fn expand(
        &self,
        candidate: &Candidate,
        zero_hit: bool,
        step: f64,
        params: &MatchParams,
        hits: &mut Vec<usize>,
    ) -> Option<usize> {
        let mut k: u64 = 0;
        loop {
            let half_width = k as f64 * step;
            if half_width > candidate.radius {
                return None;
            }
            self.window_hits(candidate.position, half_width, hits);
            if hits.len() == 1 {
                return Some(hits[0]);
            }
            k += 1;
            if zero_hit && !candidate.fit_done && k as f64 * step > params.unfit_escape_radius {
                return None;
            }
        }
    }
}

/// Match every candidate against the eligible references.
///
/// `mask` lists the reference indices allowed to match (e.g. those brighter
/// than the detection limit). The returned correspondences have the same
/// length and order as `candidates`; no two `Ok` entries share a reference.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(candidates = candidates.len(), eligible = mask.len()))
)]
pub fn match_candidates(
    candidates: &[Candidate],
    references: &[Point2<f64>],
    mask: &[usize],
    params: &MatchParams,
) -> MatchResult {
    let window = ReferenceWindow::new(references, mask);
    let step = params.effective_step();
    if step != params.search_step {
        warn!(
            "search_step {} cannot grow the window, using {}",
            params.search_step, step
        );
    }
    debug!(
        "matching {} candidates against {} eligible references",
        candidates.len(),
        window.len()
    );

    // reference index -> candidate that claimed it
    let mut claimed: HashMap<usize, usize> = HashMap::new();
    let mut hits = Vec::new();
    let mut result = MatchResult {
        correspondences: Vec::with_capacity(candidates.len()),
        ..MatchResult::default()
    };

    for (ci, candidate) in candidates.iter().enumerate() {
        let finite = candidate.position.x.is_finite()
            && candidate.position.y.is_finite()
            && candidate.radius.is_finite();

        let found = if !finite {
            debug!("candidate {ci}: non-finite position or radius");
            None
        } else {
            window.window_hits(candidate.position, candidate.radius, &mut hits);
            if hits.len() == 1 {
                Some(hits[0])
            } else {
                result.adaptive_searches += 1;
                let zero_hit = hits.is_empty();
                window.expand(candidate, zero_hit, step, params, &mut hits)
            }
        };

        let status = match found {
            None => MatchStatus::Unresolved,
            Some(reference) => match claimed.entry(reference) {
                Entry::Vacant(slot) => {
                    slot.insert(ci);
                    MatchStatus::Ok
                }
                Entry::Occupied(owner) => MatchStatus::Conflict {
                    contested: reference,
                    claimed_by: *owner.get(),
                },
            },
        };

        if status.is_ok() {
            result.resolved.push(ci);
        } else {
            debug!("candidate {ci}: {status:?}");
            result.failed.push(ci);
        }
        result.correspondences.push(Correspondence {
            candidate: ci,
            reference: found.filter(|_| status.is_ok()),
            status,
        });
    }

    result.error_count = result.failed.len();
    info!("number of errors: {}", result.error_count);
    result
}
