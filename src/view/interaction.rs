use log::debug;
use serde::{Deserialize, Serialize};

use super::viewport::Viewport;
use crate::graph_utils::geometry::Point;
use crate::graph_utils::graph::{Graph, NodeId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionParams {
    /// Screen distance a press may travel and still count as a tap.
    pub tap_slop: f32,
    /// Relative zoom per wheel notch.
    pub wheel_zoom_step: f32,
}

impl Default for InteractionParams {
    fn default() -> Self {
        Self { tap_slop: 0.0, wheel_zoom_step: 0.1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,
    ArmedOnNode { node: NodeId, down: Point },
    DraggingNode { node: NodeId },
    ArmedOnCanvas { down: Point, last: Point },
    PanningCanvas { last: Point },
    PinchZooming,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeSelected {
    pub id: NodeId,
    pub title: String,
    pub description: String,
}

/// What a pointer event did, so the host knows whether to redraw.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEffect {
    None,
    Armed,
    NodeMoved(NodeId),
    Panned,
    Zoomed,
    Released,
    Selected(NodeSelected),
}

impl GestureEffect {
    pub fn needs_redraw(&self) -> bool {
        matches!(self, GestureEffect::NodeMoved(_) | GestureEffect::Panned | GestureEffect::Zoomed | GestureEffect::Selected(_))
    }
}

/// First node (insertion order) whose disc contains the world point.
pub fn hit_test(graph: &Graph, world: Point) -> Option<NodeId> {
    graph
        .nodes()
        .find(|n| n.position.distance(world) <= graph.node_radius)
        .map(|n| n.id)
}

/// Turns raw pointer and pinch events into drags, pans, zooms and tap selections.
///
/// While a node is armed or dragged it is `pinned`: the controller is its only writer
/// until release, cancel, or a pinch takes over.
#[derive(Debug, Clone)]
pub struct InteractionController {
    state: GestureState,
    params: InteractionParams,
}

impl InteractionController {
    pub fn new(params: InteractionParams) -> Self {
        Self { state: GestureState::Idle, params }
    }

    pub fn state(&self) -> GestureState { self.state }

    /// The node currently held by the pointer, if any.
    pub fn held_node(&self) -> Option<NodeId> {
        match self.state {
            GestureState::ArmedOnNode { node, .. } | GestureState::DraggingNode { node } => Some(node),
            _ => None,
        }
    }

    pub fn pointer_down(&mut self, graph: &mut Graph, viewport: &Viewport, screen: Point) -> GestureEffect {
        // a stray down without an up: drop whatever was held
        self.release_held(graph);
        let world = viewport.screen_to_world(screen);
        self.state = match hit_test(graph, world) {
            Some(node) => {
                if let Some(n) = graph.node_mut(node) {
                    n.pinned = true;
                }
                GestureState::ArmedOnNode { node, down: screen }
            }
            None => GestureState::ArmedOnCanvas { down: screen, last: screen },
        };
        GestureEffect::Armed
    }

    pub fn pointer_move(&mut self, graph: &mut Graph, viewport: &mut Viewport, screen: Point) -> GestureEffect {
        match self.state {
            GestureState::ArmedOnNode { down, .. } | GestureState::ArmedOnCanvas { down, .. }
                if screen.distance(down) <= self.params.tap_slop =>
            {
                GestureEffect::None
            }
            GestureState::ArmedOnNode { node, .. } | GestureState::DraggingNode { node } => {
                let world = viewport.screen_to_world(screen);
                match graph.node_mut(node) {
                    Some(n) => {
                        n.position = world;
                        n.pinned = true;
                        self.state = GestureState::DraggingNode { node };
                        GestureEffect::NodeMoved(node)
                    }
                    None => {
                        // node removed underneath the pointer
                        self.state = GestureState::Idle;
                        GestureEffect::Released
                    }
                }
            }
            GestureState::ArmedOnCanvas { last, .. } | GestureState::PanningCanvas { last } => {
                viewport.pan(screen - last);
                self.state = GestureState::PanningCanvas { last: screen };
                GestureEffect::Panned
            }
            GestureState::Idle | GestureState::PinchZooming => GestureEffect::None,
        }
    }

    pub fn pointer_up(&mut self, graph: &mut Graph, screen: Point) -> GestureEffect {
        let state = std::mem::replace(&mut self.state, GestureState::Idle);
        if let GestureState::ArmedOnNode { node, down } = state {
            unpin(graph, node);
            if screen.distance(down) <= self.params.tap_slop
                && let Some(n) = graph.node(node)
            {
                return GestureEffect::Selected(NodeSelected {
                    id: n.id,
                    title: n.title.clone(),
                    description: n.description.clone(),
                });
            }
            return GestureEffect::Released;
        }
        if let GestureState::DraggingNode { node } = state {
            unpin(graph, node);
        }
        GestureEffect::Released
    }

    /// Multi-touch zoom. The pinch wins over any single-pointer gesture in progress: a held
    /// node is released where it is and no selection will follow.
    pub fn pinch(&mut self, graph: &mut Graph, viewport: &mut Viewport, factor: f32, focal: Point) -> GestureEffect {
        if let Some(node) = self.held_node() {
            debug!("pinch cancelled gesture on node {}", node);
        }
        self.release_held(graph);
        self.state = GestureState::PinchZooming;
        viewport.zoom_at(factor, focal);
        GestureEffect::Zoomed
    }

    pub fn pinch_end(&mut self) -> GestureEffect {
        if self.state == GestureState::PinchZooming {
            self.state = GestureState::Idle;
        }
        GestureEffect::Released
    }

    /// Mouse wheel: `steps` notches (positive zooms in) anchored at `focal`.
    pub fn scroll_zoom(&mut self, viewport: &mut Viewport, steps: f32, focal: Point) -> GestureEffect {
        if steps == 0.0 {
            return GestureEffect::None;
        }
        viewport.zoom_at((1.0 + self.params.wheel_zoom_step).powf(steps), focal);
        GestureEffect::Zoomed
    }

    /// Pointer left the surface or the host aborted the gesture.
    pub fn cancel(&mut self, graph: &mut Graph) -> GestureEffect {
        self.release_held(graph);
        self.state = GestureState::Idle;
        GestureEffect::Released
    }

    fn release_held(&mut self, graph: &mut Graph) {
        if let Some(node) = self.held_node() {
            unpin(graph, node);
        }
    }
}

fn unpin(graph: &mut Graph, node: NodeId) {
    if let Some(n) = graph.node_mut(node) {
        n.pinned = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::geometry::point;
    use crate::view::viewport::ViewportParams;

    fn setup() -> (Graph, Viewport, InteractionController) {
        let mut g = Graph::new(120.0);
        g.insert_node(1, "A", "first", point(0.0, 0.0));
        g.insert_node(2, "B", "second", point(100.0, 0.0));
        g.insert_node(3, "C", "third", point(1000.0, 1000.0));
        let mut v = Viewport::new(&ViewportParams::default());
        v.resize(800.0, 600.0);
        (g, v, InteractionController::new(InteractionParams::default()))
    }

    #[test]
    fn overlapping_hit_resolves_to_first_inserted() {
        let (g, _, _) = setup();
        // (50, 0) is inside both A and B
        for _ in 0..10 {
            assert_eq!(hit_test(&g, point(50.0, 0.0)), Some(1));
        }
        assert_eq!(hit_test(&g, point(220.0, 0.0)), Some(2));
        assert_eq!(hit_test(&g, point(500.0, 500.0)), None);
    }

    #[test]
    fn tap_on_node_selects_it() {
        let (mut g, v, mut c) = setup();
        assert_eq!(c.pointer_down(&mut g, &v, point(1000.0, 1000.0)), GestureEffect::Armed);
        assert!(g.node(3).unwrap().pinned);
        let effect = c.pointer_up(&mut g, point(1000.0, 1000.0));
        assert_eq!(
            effect,
            GestureEffect::Selected(NodeSelected { id: 3, title: "C".into(), description: "third".into() })
        );
        assert_eq!(c.state(), GestureState::Idle);
        assert!(!g.node(3).unwrap().pinned);
    }

    #[test]
    fn drag_moves_node_to_pointer_and_suppresses_selection() {
        let (mut g, mut v, mut c) = setup();
        v.pan(point(10.0, 20.0));
        c.pointer_down(&mut g, &v, point(1010.0, 1020.0));
        assert_eq!(c.pointer_move(&mut g, &mut v, point(1500.0, 1600.0)), GestureEffect::NodeMoved(3));
        assert_eq!(c.state(), GestureState::DraggingNode { node: 3 });
        assert_eq!(g.node(3).unwrap().position, point(1490.0, 1580.0));
        assert!(g.node(3).unwrap().pinned);
        // back to the press point: still a drag, not a tap
        c.pointer_move(&mut g, &mut v, point(1010.0, 1020.0));
        assert_eq!(c.pointer_up(&mut g, point(1010.0, 1020.0)), GestureEffect::Released);
        assert!(!g.node(3).unwrap().pinned);
    }

    #[test]
    fn canvas_drag_pans_by_screen_delta() {
        let (mut g, mut v, mut c) = setup();
        c.pointer_down(&mut g, &v, point(500.0, 500.0));
        assert!(matches!(c.state(), GestureState::ArmedOnCanvas { .. }));
        c.pointer_move(&mut g, &mut v, point(510.0, 490.0));
        c.pointer_move(&mut g, &mut v, point(530.0, 495.0));
        assert_eq!(v.offset(), point(30.0, -5.0));
        assert_eq!(c.state(), GestureState::PanningCanvas { last: point(530.0, 495.0) });
        assert_eq!(c.pointer_up(&mut g, point(530.0, 495.0)), GestureEffect::Released);
        assert_eq!(c.state(), GestureState::Idle);
    }

    #[test]
    fn pinch_cancels_drag() {
        let (mut g, mut v, mut c) = setup();
        c.pointer_down(&mut g, &v, point(1000.0, 1000.0));
        c.pointer_move(&mut g, &mut v, point(1100.0, 1000.0));
        assert_eq!(c.pinch(&mut g, &mut v, 1.5, point(400.0, 300.0)), GestureEffect::Zoomed);
        assert_eq!(c.state(), GestureState::PinchZooming);
        assert!(!g.node(3).unwrap().pinned);
        assert!((v.scale() - 1.5).abs() < 1e-6);
        // further single-pointer moves are ignored until the gesture ends
        let before = g.node(3).unwrap().position;
        assert_eq!(c.pointer_move(&mut g, &mut v, point(0.0, 0.0)), GestureEffect::None);
        assert_eq!(g.node(3).unwrap().position, before);
        assert_eq!(c.pointer_up(&mut g, point(0.0, 0.0)), GestureEffect::Released);
        assert_eq!(c.state(), GestureState::Idle);
    }

    #[test]
    fn tap_slop_tolerates_jitter() {
        let (mut g, mut v, _) = setup();
        let mut c = InteractionController::new(InteractionParams { tap_slop: 8.0, ..Default::default() });
        c.pointer_down(&mut g, &v, point(1000.0, 1000.0));
        assert_eq!(c.pointer_move(&mut g, &mut v, point(1003.0, 1004.0)), GestureEffect::None);
        assert_eq!(g.node(3).unwrap().position, point(1000.0, 1000.0));
        assert!(matches!(c.pointer_up(&mut g, point(1003.0, 1004.0)), GestureEffect::Selected(_)));
    }

    #[test]
    fn canvas_jitter_within_slop_does_not_pan() {
        let (mut g, mut v, _) = setup();
        let mut c = InteractionController::new(InteractionParams { tap_slop: 8.0, ..Default::default() });
        c.pointer_down(&mut g, &v, point(500.0, 500.0));
        assert_eq!(c.pointer_move(&mut g, &mut v, point(503.0, 504.0)), GestureEffect::None);
        assert_eq!(v.offset(), point(0.0, 0.0));
        assert!(matches!(c.state(), GestureState::ArmedOnCanvas { .. }));
        // past the slop the pan covers the whole distance from the press
        assert_eq!(c.pointer_move(&mut g, &mut v, point(520.0, 500.0)), GestureEffect::Panned);
        assert_eq!(v.offset(), point(20.0, 0.0));
    }

    #[test]
    fn wheel_zoom_uses_step_per_notch() {
        let (_, mut v, mut c) = setup();
        c.scroll_zoom(&mut v, 2.0, point(0.0, 0.0));
        assert!((v.scale() - 1.21).abs() < 1e-5);
        assert_eq!(c.scroll_zoom(&mut v, 0.0, point(0.0, 0.0)), GestureEffect::None);
    }
}
