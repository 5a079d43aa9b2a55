use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::persist::{SessionFile, atomic_write, load_from_path, to_pretty_ron};
use crate::graph_utils::geometry::Point;
use crate::graph_utils::graph::{Graph, NodeId};

/// A structural change made by the engine, reported to the graph data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    NodeAdded { id: NodeId, title: String, description: String, position: Point },
    NodeRemoved { id: NodeId },
    NodeUpdated { id: NodeId, title: String, description: String },
    /// A drag finished; the node rests at `position`.
    NodeMoved { id: NodeId, position: Point },
    EdgeAdded { source: NodeId, target: NodeId, label: String },
    EdgeRemoved { source: NodeId, target: NodeId },
}

/// Replay a mutation onto a graph. Returns false when it did not apply (unknown ids).
pub fn apply_mutation(graph: &mut Graph, mutation: &Mutation) -> bool {
    match mutation {
        Mutation::NodeAdded { id, title, description, position } => {
            graph.insert_node(*id, title.clone(), description.clone(), *position)
        }
        Mutation::NodeRemoved { id } => graph.remove_node(*id),
        Mutation::NodeUpdated { id, title, description } => {
            graph.update_node_text(*id, title.clone(), description.clone())
        }
        Mutation::NodeMoved { id, position } => match graph.node_mut(*id) {
            Some(n) => {
                n.position = *position;
                true
            }
            None => false,
        },
        Mutation::EdgeAdded { source, target, label } => graph.add_edge(*source, *target, label.clone()),
        Mutation::EdgeRemoved { source, target } => graph.remove_edge(*source, *target) > 0,
    }
}

/// The load/save boundary to wherever graphs actually live. The engine never depends on
/// the transport behind it.
pub trait GraphStore {
    fn load(&mut self) -> anyhow::Result<Graph>;
    fn apply(&mut self, mutation: &Mutation) -> anyhow::Result<()>;
}

/// In-process store, handy for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub graph: Graph,
    pub log: Vec<Mutation>,
}

impl MemoryStore {
    pub fn new(graph: Graph) -> Self {
        Self { graph, log: Vec::new() }
    }
}

impl GraphStore for MemoryStore {
    fn load(&mut self) -> anyhow::Result<Graph> {
        Ok(self.graph.clone())
    }

    fn apply(&mut self, mutation: &Mutation) -> anyhow::Result<()> {
        if !apply_mutation(&mut self.graph, mutation) {
            log::warn!("memory store ignored {:?}", mutation);
        }
        self.log.push(mutation.clone());
        Ok(())
    }
}

/// Keeps a session file in sync: every applied mutation rewrites it atomically.
#[derive(Debug)]
pub struct SessionFileStore {
    path: PathBuf,
    session: SessionFile,
}

impl SessionFileStore {
    /// Open `path`, or start an empty session there if it does not exist yet.
    pub fn open(path: &Path, node_radius: f32) -> anyhow::Result<Self> {
        let session = if path.exists() {
            load_from_path(path)?
        } else {
            SessionFile { graph: Graph::new(node_radius), offset: (0.0, 0.0), scale: 1.0 }
        };
        Ok(Self { path: path.to_path_buf(), session })
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn session(&self) -> &SessionFile { &self.session }

    /// Replace the stored graph wholesale (after a full relayout or a fresh seed).
    pub fn reset(&mut self, graph: Graph) -> anyhow::Result<()> {
        self.session.graph = graph;
        self.flush()
    }

    /// Record the current pan/zoom so the next open restores it.
    pub fn set_view(&mut self, offset: Point, scale: f32) -> anyhow::Result<()> {
        self.session.offset = (offset.x, offset.y);
        self.session.scale = scale;
        self.flush()
    }

    fn flush(&self) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
        }
        let s = to_pretty_ron(&self.session)?;
        atomic_write(&self.path, s.as_bytes()).with_context(|| format!("cannot write {}", self.path.display()))?;
        Ok(())
    }
}

impl GraphStore for SessionFileStore {
    fn load(&mut self) -> anyhow::Result<Graph> {
        Ok(self.session.graph.clone())
    }

    fn apply(&mut self, mutation: &Mutation) -> anyhow::Result<()> {
        if !apply_mutation(&mut self.session.graph, mutation) {
            anyhow::bail!("mutation does not apply to {}: {:?}", self.path.display(), mutation);
        }
        self.flush()
    }
}
