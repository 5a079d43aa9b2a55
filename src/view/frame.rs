use serde::{Deserialize, Serialize};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::viewport::Viewport;
use crate::graph_utils::geometry::Point;
use crate::graph_utils::graph::{Graph, NodeId};

const ELLIPSIS: char = '…';

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameStyle {
    /// Display columns per title line inside a node.
    pub wrap_columns: usize,
    pub max_lines: usize,
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self { wrap_columns: 14, max_lines: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeShape {
    pub id: NodeId,
    pub center: Point,
    pub radius: f32,
    pub lines: Vec<String>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeShape {
    pub source: NodeId,
    pub target: NodeId,
    pub from: Point,
    pub to: Point,
    pub label_position: Point,
    pub label: String,
}

/// Screen-space draw list. Edges come first so renderers can paint in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frame {
    pub scale: f32,
    pub edges: Vec<EdgeShape>,
    pub nodes: Vec<NodeShape>,
}

pub fn build_frame(graph: &Graph, viewport: &Viewport, style: &FrameStyle, selected: Option<NodeId>) -> Frame {
    let radius = viewport.screen_radius(graph.node_radius);
    let edges = graph
        .edges()
        .iter()
        .filter_map(|e| {
            let from = viewport.world_to_screen(graph.node(e.source)?.position);
            let to = viewport.world_to_screen(graph.node(e.target)?.position);
            Some(EdgeShape {
                source: e.source,
                target: e.target,
                from,
                to,
                label_position: (from + to) * 0.5,
                label: e.label.clone(),
            })
        })
        .collect();
    let nodes = graph
        .nodes()
        .map(|n| NodeShape {
            id: n.id,
            center: viewport.world_to_screen(n.position),
            radius,
            lines: wrap_title(&n.title, style.wrap_columns, style.max_lines),
            selected: selected == Some(n.id),
        })
        .collect();
    Frame { scale: viewport.scale(), edges, nodes }
}

/// Greedy word wrap by display width. Words wider than a line are split; text beyond
/// `max_lines` is cut and the last line ends with an ellipsis.
pub fn wrap_title(title: &str, columns: usize, max_lines: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in title.split_whitespace() {
        let needed = if current.is_empty() { word.width() } else { current.width() + 1 + word.width() };
        if needed <= columns {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if word.width() <= columns {
            current.push_str(word);
            continue;
        }
        // hard split an overlong word
        for ch in word.chars() {
            let w = ch.width().unwrap_or(0);
            if current.width() + w > columns && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current.push(ch);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if max_lines > 0 && lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            while !last.is_empty() && last.width() + 1 > columns {
                last.pop();
            }
            last.push(ELLIPSIS);
        }
    }
    lines
}
