//! Interactive node-link graph canvas engine.
//!
//! The engine owns a graph of equally sized nodes and labelled edges, lays it out with a
//! batch force-directed relaxation, places new nodes without overlap, keeps a pan/zoom
//! viewport, turns pointer and pinch gestures into drags, pans, zooms and tap selections,
//! and projects everything into a screen-space [`view::Frame`] for a renderer to paint.
//!
//! Everything is synchronous and single-threaded; see [`bridge`] for handing mutations
//! over from other threads.

pub mod bridge;
pub mod engine;
pub mod graph_utils;
pub mod layout;
pub mod persistence;
pub mod view;

#[cfg(feature = "gui")]
pub mod gui;

pub use engine::{Engine, EngineEvent};
pub use graph_utils::geometry::{Point, point};
pub use graph_utils::graph::{Edge, Graph, Node, NodeId};
