use std::collections::VecDeque;

use log::{debug, info};

use crate::bridge::{CommandReceiver, EngineCommand};
use crate::graph_utils::geometry::Point;
use crate::graph_utils::graph::{Graph, NodeId};
use crate::layout::{RelaxReport, relax};
use crate::persistence::persist::SessionFile;
use crate::persistence::settings::EngineSettings;
use crate::persistence::store::{GraphStore, Mutation};
use crate::view::{Frame, GestureEffect, GestureState, InteractionController, NodeSelected, Viewport, build_frame};

/// Events for the surrounding UI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    NodeSelected(NodeSelected),
    SelectionCleared,
}

/// Owns the graph, the viewport and the gesture controller, and is the single writer of
/// all three. Everything runs synchronously on the caller's thread.
pub struct Engine {
    graph: Graph,
    viewport: Viewport,
    controller: InteractionController,
    settings: EngineSettings,
    selected: Option<NodeId>,
    // saved (scale, offset) waiting for the first fit
    pending_view: Option<(f32, Point)>,
    frame: Option<Frame>,
    redraw: bool,
    events: VecDeque<EngineEvent>,
    outbox: Vec<Mutation>,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            graph: Graph::new(settings.node_radius),
            viewport: Viewport::new(&settings.viewport),
            controller: InteractionController::new(settings.interaction.clone()),
            settings,
            selected: None,
            pending_view: None,
            frame: None,
            redraw: true,
            events: VecDeque::new(),
            outbox: Vec::new(),
        }
    }

    pub fn graph(&self) -> &Graph { &self.graph }
    pub fn viewport(&self) -> &Viewport { &self.viewport }
    pub fn settings(&self) -> &EngineSettings { &self.settings }
    pub fn selected(&self) -> Option<NodeId> { self.selected }
    pub fn gesture(&self) -> GestureState { self.controller.state() }

    /// Replace the graph with a freshly loaded one: separate coincident nodes, run the
    /// full relaxation, and fit the view if its size is known.
    pub fn seed(&mut self, mut graph: Graph) -> RelaxReport {
        graph.sanitize();
        if self.settings.coincident_jitter > 0.0 {
            let moved = graph.separate_coincident(&mut rand::thread_rng(), self.settings.coincident_jitter);
            if moved > 0 {
                debug!("nudged {} coincident nodes before relaxation", moved);
            }
        }
        let report = relax(&mut graph, &self.settings.layout);
        info!("seeded graph with {} nodes and {} edges", graph.node_count(), graph.edge_count());
        self.graph = graph;
        self.controller.cancel(&mut self.graph);
        self.selected = None;
        self.refit();
        self.invalidate();
        report
    }

    pub fn seed_from(&mut self, store: &mut dyn GraphStore) -> anyhow::Result<RelaxReport> {
        let graph = store.load()?;
        Ok(self.seed(graph))
    }

    /// Reopen a saved session as is: no relaxation. The saved transform is applied once
    /// the view has been fitted, so the minimum zoom still comes from the graph bounds.
    pub fn restore(&mut self, session: SessionFile) {
        let (mut graph, offset, scale) = session.to_runtime();
        graph.sanitize();
        // an empty graph is never fitted, so its saved transform is dropped
        self.pending_view = (!graph.is_empty()).then_some((scale, offset));
        self.graph = graph;
        self.controller.cancel(&mut self.graph);
        self.selected = None;
        self.refit();
        self.invalidate();
    }

    pub fn session(&self) -> SessionFile {
        SessionFile::from_runtime(&self.graph, &self.viewport)
    }

    /// Run the full relaxation again on the current graph (explicit user request).
    pub fn relayout(&mut self) -> RelaxReport {
        let report = relax(&mut self.graph, &self.settings.layout);
        self.invalidate();
        report
    }

    /// Fit the whole graph into the view; this also resets the minimum zoom.
    pub fn refit(&mut self) -> bool {
        let fitted = match self.graph.bounds() {
            Some(bounds) => self.viewport.fit_to_bounds(bounds),
            None => false,
        };
        if fitted {
            if let Some((scale, offset)) = self.pending_view.take() {
                self.viewport.restore(scale, offset);
            }
            self.invalidate();
        }
        fitted
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        let size = self.viewport.view_size();
        if size.x == width && size.y == height {
            return;
        }
        self.viewport.resize(width, height);
        if !self.viewport.is_fitted() {
            self.refit();
        } else if let Some(bounds) = self.graph.bounds() {
            self.viewport.refresh_min_scale(bounds);
        }
        self.invalidate();
    }

    // Structural mutations

    /// Add a node near `spawn_hint` (world units; `None` means the centre of the view).
    pub fn add_node(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        spawn_hint: Option<Point>,
        connect_to: Option<(NodeId, String)>,
    ) -> NodeId {
        let hint = spawn_hint.unwrap_or_else(|| self.view_centre());
        let id = self.graph.add_node(title, description, hint, connect_to, &self.settings.placement);
        if let Some(n) = self.graph.node(id) {
            self.outbox.push(Mutation::NodeAdded {
                id,
                title: n.title.clone(),
                description: n.description.clone(),
                position: n.position,
            });
        }
        // add_node only ever creates the edge from the new node
        for e in self.graph.edges_of(id) {
            self.outbox.push(Mutation::EdgeAdded { source: e.source, target: e.target, label: e.label.clone() });
        }
        // first node on an empty canvas
        if !self.viewport.is_fitted() {
            self.refit();
        }
        self.invalidate();
        id
    }

    pub fn add_edge(&mut self, source: NodeId, target: NodeId, label: impl Into<String>) -> bool {
        let label = label.into();
        if !self.graph.add_edge(source, target, label.clone()) {
            debug!("edge {} -> {} ignored: missing endpoint", source, target);
            return false;
        }
        self.outbox.push(Mutation::EdgeAdded { source, target, label });
        self.invalidate();
        true
    }

    pub fn remove_edge(&mut self, source: NodeId, target: NodeId) -> usize {
        let removed = self.graph.remove_edge(source, target);
        if removed > 0 {
            self.outbox.push(Mutation::EdgeRemoved { source, target });
            self.invalidate();
        }
        removed
    }

    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if self.controller.held_node() == Some(id) {
            self.controller.cancel(&mut self.graph);
        }
        if !self.graph.remove_node(id) {
            return false;
        }
        if self.selected == Some(id) {
            self.clear_selection();
        }
        self.outbox.push(Mutation::NodeRemoved { id });
        self.invalidate();
        true
    }

    pub fn update_node_text(&mut self, id: NodeId, title: impl Into<String>, description: impl Into<String>) -> bool {
        let (title, description) = (title.into(), description.into());
        if !self.graph.update_node_text(id, title.clone(), description.clone()) {
            return false;
        }
        self.outbox.push(Mutation::NodeUpdated { id, title, description });
        self.invalidate();
        true
    }

    /// Drain commands marshalled from other threads and apply them in arrival order.
    pub fn apply_commands(&mut self, rx: &CommandReceiver) -> usize {
        let mut applied = 0;
        for cmd in rx.try_iter() {
            self.apply_command(cmd);
            applied += 1;
        }
        applied
    }

    pub fn apply_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::AddNode { title, description, spawn_hint, connect_to } => {
                self.add_node(title, description, spawn_hint, connect_to);
            }
            EngineCommand::AddEdge { source, target, label } => {
                self.add_edge(source, target, label);
            }
            EngineCommand::RemoveEdge { source, target } => {
                self.remove_edge(source, target);
            }
            EngineCommand::RemoveNode { id } => {
                self.remove_node(id);
            }
            EngineCommand::UpdateNode { id, title, description } => {
                self.update_node_text(id, title, description);
            }
            EngineCommand::Relayout => {
                self.relayout();
            }
        }
    }

    // Pointer and gesture input, all in screen coordinates

    pub fn pointer_down(&mut self, screen: Point) {
        // a down without an up ends the previous drag
        self.settle_drag();
        let effect = self.controller.pointer_down(&mut self.graph, &self.viewport, screen);
        self.absorb(effect);
    }

    pub fn pointer_move(&mut self, screen: Point) {
        let effect = self.controller.pointer_move(&mut self.graph, &mut self.viewport, screen);
        self.absorb(effect);
    }

    pub fn pointer_up(&mut self, screen: Point) {
        let before = self.controller.state();
        self.settle_drag();
        let effect = self.controller.pointer_up(&mut self.graph, screen);
        // a tap on empty canvas drops the selection
        if let GestureState::ArmedOnCanvas { down, .. } = before
            && screen.distance(down) <= self.settings.interaction.tap_slop
            && self.selected.is_some()
        {
            self.clear_selection();
        }
        self.absorb(effect);
    }

    pub fn pinch(&mut self, factor: f32, focal: Point) {
        self.settle_drag();
        let effect = self.controller.pinch(&mut self.graph, &mut self.viewport, factor, focal);
        self.absorb(effect);
    }

    pub fn pinch_end(&mut self) {
        let effect = self.controller.pinch_end();
        self.absorb(effect);
    }

    pub fn scroll_zoom(&mut self, steps: f32, focal: Point) {
        let effect = self.controller.scroll_zoom(&mut self.viewport, steps, focal);
        self.absorb(effect);
    }

    pub fn cancel_gesture(&mut self) {
        self.settle_drag();
        let effect = self.controller.cancel(&mut self.graph);
        self.absorb(effect);
    }

    // Output side

    /// Current draw list, rebuilt only after something changed.
    pub fn frame(&mut self) -> &Frame {
        if self.frame.is_none() {
            debug!("rebuilding frame");
        }
        self.frame
            .get_or_insert_with(|| build_frame(&self.graph, &self.viewport, &self.settings.frame, self.selected))
    }

    /// True once after every change that needs a repaint.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.events.drain(..).collect()
    }

    pub fn drain_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.outbox)
    }

    /// Push pending mutations to the data source in order. On failure the failed
    /// mutation and everything after it stay queued.
    pub fn flush_to(&mut self, store: &mut dyn GraphStore) -> anyhow::Result<usize> {
        let pending = std::mem::take(&mut self.outbox);
        for (i, m) in pending.iter().enumerate() {
            if let Err(e) = store.apply(m) {
                self.outbox = pending[i..].to_vec();
                return Err(e);
            }
        }
        Ok(pending.len())
    }

    /// Report where a dragged node was dropped, whatever ends the drag.
    fn settle_drag(&mut self) {
        if let GestureState::DraggingNode { node } = self.controller.state()
            && let Some(n) = self.graph.node(node)
        {
            self.outbox.push(Mutation::NodeMoved { id: node, position: n.position });
        }
    }

    fn absorb(&mut self, effect: GestureEffect) {
        if effect.needs_redraw() {
            self.invalidate();
        }
        if let GestureEffect::Selected(sel) = effect {
            self.selected = Some(sel.id);
            self.events.push_back(EngineEvent::NodeSelected(sel));
        }
    }

    fn clear_selection(&mut self) {
        self.selected = None;
        self.events.push_back(EngineEvent::SelectionCleared);
        self.invalidate();
    }

    fn view_centre(&self) -> Point {
        self.viewport.screen_to_world(self.viewport.view_size() * 0.5)
    }

    fn invalidate(&mut self) {
        self.frame = None;
        self.redraw = true;
    }
}
