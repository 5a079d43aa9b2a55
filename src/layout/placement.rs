use log::warn;
use serde::{Deserialize, Serialize};

use crate::graph_utils::geometry::Point;
use crate::graph_utils::graph::Graph;

// Slack for the spacing check: a candidate pushed to exactly `min_spacing` must not be
// reported as a violation again because of float rounding.
const SPACING_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementParams {
    /// Minimum centre distance for a new node, in node radii.
    pub spacing_factor: f32,
    pub max_attempts: usize,
}

impl Default for PlacementParams {
    fn default() -> Self {
        Self { spacing_factor: 3.0, max_attempts: 50 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Point,
    pub attempts: usize,
    /// False when attempts ran out and the last candidate was accepted as is.
    pub resolved: bool,
}

/// Find a spawn position near `hint` at least `spacing_factor * radius` from every node.
///
/// Each round scans nodes in insertion order and moves the candidate out of the first
/// offender it finds, to exactly the minimum spacing along the line joining them. This is
/// a bounded heuristic, not a global search.
pub fn place(graph: &Graph, hint: Point, params: &PlacementParams) -> Placement {
    let min_spacing = params.spacing_factor * graph.node_radius;
    let mut candidate = hint;

    for attempt in 0..params.max_attempts {
        let offender = graph
            .nodes()
            .find(|n| n.position.distance(candidate) < min_spacing - SPACING_TOLERANCE);
        match offender {
            None => return Placement { position: candidate, attempts: attempt, resolved: true },
            Some(node) => {
                // atan2(0, 0) is 0, so a candidate dead on a node is pushed along +x
                let angle = (candidate - node.position).angle();
                candidate = node.position + Point::from_angle(angle, min_spacing);
            }
        }
    }

    let clear = graph
        .nodes()
        .all(|n| n.position.distance(candidate) >= min_spacing - SPACING_TOLERANCE);
    if !clear {
        warn!(
            "placement near ({:.1}, {:.1}) gave up after {} attempts; accepting overlap",
            hint.x, hint.y, params.max_attempts
        );
    }
    Placement { position: candidate, attempts: params.max_attempts, resolved: clear }
}
