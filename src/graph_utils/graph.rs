use indexmap::IndexMap;
use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::geometry::{Bounds, Point};
use crate::layout::placement::{self, PlacementParams};

// Basic type aliases for clarity
pub type NodeId = u64;

pub const DEFAULT_NODE_RADIUS: f32 = 120.0;

fn default_node_radius() -> f32 { DEFAULT_NODE_RADIUS }

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Point,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Set while the interaction controller owns the node (drag in progress).
    /// Relaxation never moves a pinned node.
    #[serde(skip)]
    pub pinned: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub label: String,
}

impl Edge {
    pub fn touches(&self, id: NodeId) -> bool { self.source == id || self.target == id }

    /// True when the edge joins `a` and `b`, in either orientation.
    pub fn joins(&self, a: NodeId, b: NodeId) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default = "default_node_radius")]
    pub node_radius: f32,
    pub nodes: IndexMap<NodeId, Node>,
    pub edges: Vec<Edge>,
}

impl Default for Graph {
    fn default() -> Self { Self::new(DEFAULT_NODE_RADIUS) }
}

impl Graph {
    // Instantiate a new, empty graph whose nodes all share `node_radius`
    pub fn new(node_radius: f32) -> Self {
        Graph {
            node_radius,
            nodes: IndexMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn next_id(&self) -> NodeId {
        self.nodes.keys().max().map_or(1, |max| max + 1)
    }

    /// Create a node at a collision-free spot near `spawn_hint`, optionally linked to an
    /// existing node by an edge from the new node. Returns the new id.
    pub fn add_node(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        spawn_hint: Point,
        connect_to: Option<(NodeId, String)>,
        params: &PlacementParams,
    ) -> NodeId {
        let id = self.next_id();
        let placed = placement::place(self, spawn_hint, params);
        self.nodes.insert(id, Node {
            id,
            position: placed.position,
            title: title.into(),
            description: description.into(),
            pinned: false,
        });
        if let Some((other, label)) = connect_to {
            // A missing target leaves the node unconnected.
            self.add_edge(id, other, label);
        }
        id
    }

    /// Insert a node with a known id and position (seeding from the data source).
    /// Rejects duplicate ids.
    pub fn insert_node(
        &mut self,
        id: NodeId,
        title: impl Into<String>,
        description: impl Into<String>,
        position: Point,
    ) -> bool {
        if self.nodes.contains_key(&id) {
            return false;
        }
        self.nodes.insert(id, Node {
            id,
            position,
            title: title.into(),
            description: description.into(),
            pinned: false,
        });
        true
    }

    // Add an edge if both ends exist; otherwise nothing changes
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, label: impl Into<String>) -> bool {
        if self.nodes.contains_key(&source) && self.nodes.contains_key(&target) {
            self.edges.push(Edge { source, target, label: label.into() });
            true
        } else {
            false
        }
    }

    /// Remove every edge joining the two nodes, whatever its direction or label.
    pub fn remove_edge(&mut self, source: NodeId, target: NodeId) -> usize {
        let before = self.edges.len();
        self.edges.retain(|e| !e.joins(source, target));
        before - self.edges.len()
    }

    pub fn remove_node(&mut self, id: NodeId) -> bool {
        // shift_remove keeps the remaining insertion order intact
        if self.nodes.shift_remove(&id).is_some() {
            // Cascade delete edges involving this node
            self.edges.retain(|e| !e.touches(id));
            true
        } else {
            false
        }
    }

    pub fn update_node_text(&mut self, id: NodeId, title: String, description: String) -> bool {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.title = title;
            node.description = description;
            true
        } else {
            false
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> { self.nodes.get(&id) }
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> { self.nodes.get_mut(&id) }
    pub fn nodes(&self) -> impl Iterator<Item = &Node> { self.nodes.values() }
    pub fn edges(&self) -> &[Edge] { &self.edges }
    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.edges.len() }
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn edges_of(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.touches(id))
    }

    pub fn degree(&self, id: NodeId) -> usize { self.edges_of(id).count() }

    /// Bounding box of all node discs, `None` for an empty graph.
    pub fn bounds(&self) -> Option<Bounds> {
        self.nodes
            .values()
            .map(|n| Bounds::around(n.position, self.node_radius))
            .reduce(Bounds::union)
    }

    /// Bring a graph that came from outside (data source, session file) back in line with
    /// the model: every node is keyed by its own id, first occurrence wins, and every edge
    /// joins two existing nodes. Returns how many nodes and edges were dropped or re-keyed.
    pub fn sanitize(&mut self) -> usize {
        let mut fixed = 0;
        if self.nodes.iter().any(|(key, n)| *key != n.id) {
            let nodes = std::mem::take(&mut self.nodes);
            for (key, node) in nodes {
                if key != node.id {
                    warn!("node stored under {} carries id {}; re-keyed", key, node.id);
                    fixed += 1;
                }
                if self.nodes.contains_key(&node.id) {
                    warn!("dropping duplicate node {} ({:?})", node.id, node.title);
                    fixed += 1;
                    continue;
                }
                self.nodes.insert(node.id, node);
            }
        }

        let nodes = &self.nodes;
        let before = self.edges.len();
        self.edges.retain(|e| {
            let keep = nodes.contains_key(&e.source) && nodes.contains_key(&e.target);
            if !keep {
                warn!("dropping dangling edge {} -> {} ({:?})", e.source, e.target, e.label);
            }
            keep
        });
        fixed + before - self.edges.len()
    }

    /// Nudge every node that sits exactly on an earlier node by a random offset of
    /// `magnitude` world units. Returns how many nodes moved.
    pub fn separate_coincident<R: Rng>(&mut self, rng: &mut R, magnitude: f32) -> usize {
        let mut moved = 0;
        for i in 1..self.nodes.len() {
            let pos = self.nodes[i].position;
            let clash = self.nodes.values().take(i).any(|n| n.position == pos);
            if clash {
                let angle = rng.gen_range(0.0..std::f32::consts::TAU);
                self.nodes[i].position = pos + Point::from_angle(angle, magnitude);
                moved += 1;
            }
        }
        moved
    }
}
