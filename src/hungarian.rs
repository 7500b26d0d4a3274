//! Minimum-cost assignment of detections to tracks
//!
//! Solves the rectangular track-by-detection assignment problem with the
//! Kuhn-Munkres algorithm, padding to square so either side may be left
//! partially unmatched.

use ndarray::ArrayView2;
use pathfinding::prelude::{kuhn_munkres_min, Matrix};

/// Integer sentinel for pairs that must never be matched
const INVALID_COST: i32 = 1_000_000;
/// Fixed-point scale applied to f32 costs before solving
const COST_SCALE: f32 = 1000.0;

/// Result of the assignment step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentResult {
    /// For each track (cost matrix row), the matched detection index
    pub assignment: Vec<Option<usize>>,
    /// Detections no track was matched to
    pub unassigned_detections: Vec<usize>,
}

/// Rectangular minimum-cost assignment solver
pub struct AssignmentSolver;

impl AssignmentSolver {
    /// Solve the assignment problem for a tracks-by-detections cost matrix.
    ///
    /// Entries of `f32::INFINITY` mark incompatible pairs. Any assignment
    /// whose cost exceeds `max_valid_cost` is discarded as unmatched, so
    /// forced long-distance pairings never survive. The solve is
    /// deterministic: identical matrices yield identical assignments, with
    /// ties resolved by the fixed lowest-row-first scan order.
    pub fn solve(cost: ArrayView2<f32>, max_valid_cost: f32) -> AssignmentResult {
        let num_tracks = cost.nrows();
        let num_detections = cost.ncols();

        if num_tracks == 0 || num_detections == 0 {
            return AssignmentResult {
                assignment: vec![None; num_tracks],
                unassigned_detections: (0..num_detections).collect(),
            };
        }

        // Pad to square with the sentinel so rows and columns beyond the
        // real matrix are throwaway matches
        let size = num_tracks.max(num_detections);
        let mut weights = Matrix::new(size, size, INVALID_COST);
        for t in 0..num_tracks {
            for d in 0..num_detections {
                let c = cost[[t, d]];
                if c.is_finite() && c * COST_SCALE < INVALID_COST as f32 {
                    weights[(t, d)] = (c * COST_SCALE) as i32;
                }
            }
        }

        let (_total, raw) = kuhn_munkres_min(&weights);

        let assignment: Vec<Option<usize>> = (0..num_tracks)
            .map(|t| {
                let d = raw[t];
                if d < num_detections && weights[(t, d)] != INVALID_COST {
                    Some(d)
                } else {
                    None
                }
            })
            .collect();

        Self::finish(cost, max_valid_cost, assignment)
    }

    fn finish(
        cost: ArrayView2<f32>,
        max_valid_cost: f32,
        mut assignment: Vec<Option<usize>>,
    ) -> AssignmentResult {
        // Reject matches the solver was forced into
        for (t, slot) in assignment.iter_mut().enumerate() {
            if let Some(d) = *slot {
                if !(cost[[t, d]] <= max_valid_cost) {
                    *slot = None;
                }
            }
        }

        let unassigned_detections = (0..cost.ncols())
            .filter(|d| !assignment.iter().any(|slot| *slot == Some(*d)))
            .collect();

        AssignmentResult {
            assignment,
            unassigned_detections,
        }
    }
}
