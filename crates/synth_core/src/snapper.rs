//! Network-local coordinates → nearest drivable edge.

use std::cmp::Ordering;

use tracing::debug;

use crate::network::{LaneCandidate, RoadNetwork};

/// Search radii, in network units, tried in order until one finds a lane.
pub const SNAP_RADIUS_LADDER: [f64; 3] = [50.0, 200.0, 500.0];

/// An edge a point was snapped to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEdge {
    pub edge_id: String,
    pub lane_id: String,
    pub distance: f64,
    /// Ladder radius at which the lane was found.
    pub radius: f64,
}

pub(crate) fn radius_for_attempt(ladder: &[f64], attempt: usize) -> Option<f64> {
    ladder.get(attempt).copied().filter(|radius| *radius >= 0.0)
}

/// Snaps `(x, y)` to the closest drivable lane, escalating through `ladder`.
///
/// Returns `None` when no radius finds a lane. Never picks an arbitrary edge.
pub fn snap(network: &dyn RoadNetwork, x: f64, y: f64, ladder: &[f64]) -> Option<ResolvedEdge> {
    let mut attempt = 0;
    while let Some(radius) = radius_for_attempt(ladder, attempt) {
        let candidates = network.neighboring_lanes(x, y, radius);
        if let Some(best) = select_nearest(&candidates) {
            debug!(
                x,
                y,
                radius,
                edge = %best.edge_id,
                distance = best.distance,
                "snapped point to lane {}",
                best.lane_id
            );
            return Some(ResolvedEdge {
                edge_id: best.edge_id.clone(),
                lane_id: best.lane_id.clone(),
                distance: best.distance,
                radius,
            });
        }
        attempt += 1;
    }
    debug!(x, y, "no lane found on the snap ladder");
    None
}

/// Minimum distance; equal distances keep the lane declared first.
pub(crate) fn select_nearest(candidates: &[LaneCandidate]) -> Option<&LaneCandidate> {
    let mut best: Option<&LaneCandidate> = None;

    for candidate in candidates {
        best = Some(match best {
            None => candidate,
            Some(current) => match candidate
                .distance
                .partial_cmp(&current.distance)
                .unwrap_or(Ordering::Equal)
            {
                Ordering::Less => candidate,
                Ordering::Greater => current,
                Ordering::Equal => {
                    if candidate.order < current.order {
                        candidate
                    } else {
                        current
                    }
                }
            },
        });
    }

    best
}
