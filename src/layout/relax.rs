use log::debug;
use serde::{Deserialize, Serialize};

use crate::graph_utils::geometry::Point;
use crate::graph_utils::graph::{Graph, NodeId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    pub iterations: usize,
    /// Minimum centre distance between any two nodes, in node radii.
    pub repulsion_factor: f32,
    pub ideal_edge_length: f32,
    /// Fraction of the spring error corrected per iteration.
    pub damping: f32,
    pub convergence_epsilon: f32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            iterations: 200,
            repulsion_factor: 4.0,
            ideal_edge_length: 800.0,
            damping: 0.05,
            convergence_epsilon: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaxReport {
    pub iterations: usize,
    /// Largest single-node displacement during the final iteration.
    pub last_max_delta: f32,
    pub converged: bool,
}

/// Batch force-directed relaxation: `params.iterations` rounds of pairwise repulsion followed
/// by edge springs. Positions are updated in place, pair by pair.
///
/// Coincident nodes (distance exactly zero) get no repulsion because there is no direction
/// to push them in; callers that care separate them beforehand
/// (see [`Graph::separate_coincident`]).
pub fn relax(graph: &mut Graph, params: &LayoutParams) -> RelaxReport {
    let ids: Vec<NodeId> = graph.nodes.keys().copied().collect();
    let mut positions: Vec<Point> = graph.nodes.values().map(|n| n.position).collect();
    let pinned: Vec<bool> = graph.nodes.values().map(|n| n.pinned).collect();
    // Edges resolved to indices once; the id lookup stays out of the hot loop.
    let springs: Vec<(usize, usize)> = graph
        .edges
        .iter()
        .filter_map(|e| Some((graph.nodes.get_index_of(&e.source)?, graph.nodes.get_index_of(&e.target)?)))
        .collect();

    let min_distance = params.repulsion_factor * graph.node_radius;
    let mut last_max_delta = 0.0_f32;
    let mut before = positions.clone();

    for _ in 0..params.iterations {
        before.copy_from_slice(&positions);
        repulsion_pass(&mut positions, &pinned, min_distance);
        attraction_pass(&mut positions, &pinned, &springs, params);
        last_max_delta = positions
            .iter()
            .zip(&before)
            .map(|(now, was)| now.distance(*was))
            .fold(0.0, f32::max);
    }

    for (id, pos) in ids.iter().zip(positions) {
        if let Some(node) = graph.nodes.get_mut(id) {
            node.position = pos;
        }
    }

    let report = RelaxReport {
        iterations: params.iterations,
        last_max_delta,
        converged: last_max_delta < params.convergence_epsilon,
    };
    debug!(
        "relaxed {} nodes / {} edges in {} iterations (last delta {:.4}, converged: {})",
        ids.len(),
        springs.len(),
        report.iterations,
        report.last_max_delta,
        report.converged
    );
    report
}

pub(crate) fn repulsion_pass(positions: &mut [Point], pinned: &[bool], min_distance: f32) {
    let n = positions.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let delta = positions[j] - positions[i];
            let d = delta.length();
            if d <= 0.0 || d >= min_distance {
                continue;
            }
            let unit = delta / d;
            let overlap = min_distance - d;
            // split push; a pinned partner hands its share to the other node
            match (pinned[i], pinned[j]) {
                (false, false) => {
                    positions[i] -= unit * (overlap * 0.5);
                    positions[j] += unit * (overlap * 0.5);
                }
                (true, false) => positions[j] += unit * overlap,
                (false, true) => positions[i] -= unit * overlap,
                (true, true) => {}
            }
        }
    }
}

pub(crate) fn attraction_pass(
    positions: &mut [Point],
    pinned: &[bool],
    springs: &[(usize, usize)],
    params: &LayoutParams,
) {
    for &(s, t) in springs {
        let delta = positions[t] - positions[s];
        let d = delta.length();
        if d <= 0.0 {
            continue;
        }
        let diff = (d - params.ideal_edge_length) / d;
        let step = delta * (diff * params.damping);
        if !pinned[s] {
            positions[s] += step;
        }
        if !pinned[t] {
            positions[t] -= step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::geometry::point;

    fn line_graph(xs: &[f32]) -> Graph {
        let mut g = Graph::new(120.0);
        for (i, x) in xs.iter().enumerate() {
            g.insert_node(i as NodeId + 1, format!("n{}", i + 1), "", point(*x, 0.0));
        }
        g
    }

    fn pos(g: &Graph, id: NodeId) -> Point { g.node(id).unwrap().position }

    #[test]
    fn single_repulsion_pass_restores_min_distance() {
        let mut positions = vec![point(0.0, 0.0), point(30.0, 40.0)];
        repulsion_pass(&mut positions, &[false, false], 480.0);
        assert!(positions[0].distance(positions[1]) >= 480.0 - 1e-3);
        // symmetric split around the old midpoint
        let mid = (positions[0] + positions[1]) * 0.5;
        assert!(mid.distance(point(15.0, 20.0)) < 1e-3);
    }

    #[test]
    fn coincident_nodes_stay_coincident() {
        let mut positions = vec![point(10.0, 10.0), point(10.0, 10.0)];
        repulsion_pass(&mut positions, &[false, false], 480.0);
        assert_eq!(positions[0], positions[1]);

        let mut g = line_graph(&[10.0, 10.0]);
        relax(&mut g, &LayoutParams::default());
        assert_eq!(pos(&g, 1), pos(&g, 2));
    }

    #[test]
    fn pinned_node_is_left_alone_and_partner_takes_full_push() {
        let mut positions = vec![point(0.0, 0.0), point(100.0, 0.0)];
        repulsion_pass(&mut positions, &[true, false], 480.0);
        assert_eq!(positions[0], point(0.0, 0.0));
        assert!((positions[1].x - 480.0).abs() < 1e-3);
    }

    #[test]
    fn spring_pulls_long_edge_toward_ideal_length() {
        let mut g = line_graph(&[0.0, 3000.0]);
        g.add_edge(1, 2, "rel");
        let report = relax(&mut g, &LayoutParams::default());
        let d = pos(&g, 1).distance(pos(&g, 2));
        assert!((d - 800.0).abs() < 0.5, "distance was {d}");
        assert!(report.converged);
    }

    #[test]
    fn edges_are_symmetric_for_layout() {
        let mut forward = line_graph(&[0.0, 2000.0]);
        forward.add_edge(1, 2, "");
        let mut backward = line_graph(&[0.0, 2000.0]);
        backward.add_edge(2, 1, "");
        relax(&mut forward, &LayoutParams::default());
        relax(&mut backward, &LayoutParams::default());
        assert!(pos(&forward, 1).distance(pos(&backward, 1)) < 1e-2);
        assert!(pos(&forward, 2).distance(pos(&backward, 2)) < 1e-2);
    }
}
