use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Vec2};

use crate::bridge::CommandReceiver;
use crate::engine::{Engine, EngineEvent};
use crate::graph_utils::geometry::{Point, point};
use crate::graph_utils::graph::NodeId;
use crate::persistence::persist;
use crate::persistence::store::SessionFileStore;
use crate::view::{Frame, GestureState, NodeSelected};

// Scroll delta (points) that counts as one wheel notch
const SCROLL_PER_NOTCH: f32 = 50.0;

fn color_for_node(id: NodeId) -> Color32 {
    const PALETTE: [Color32; 8] = [
        Color32::from_rgb(0x7b, 0xa3, 0xff), // blue
        Color32::from_rgb(0xff, 0xa3, 0x7b), // orange
        Color32::from_rgb(0x7b, 0xff, 0xa3), // green
        Color32::from_rgb(0xff, 0x7b, 0xa3), // pink
        Color32::from_rgb(0xa3, 0x7b, 0xff), // violet
        Color32::from_rgb(0xff, 0xe0, 0x7b), // yellow
        Color32::from_rgb(0x7b, 0xff, 0xe0), // teal
        Color32::from_rgb(0x7b, 0xe0, 0xff), // cyan
    ];
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    id.hash(&mut hasher);
    let h = hasher.finish() as usize;
    PALETTE[h % PALETTE.len()]
}

pub struct CanvasApp {
    engine: Engine,
    store: SessionFileStore,
    commands: CommandReceiver,
    detail: Option<NodeSelected>,
    pinching: bool,
    new_title: String,
    new_edge_label: String,
    status: Option<String>,
}

impl CanvasApp {
    pub fn new(engine: Engine, store: SessionFileStore, commands: CommandReceiver) -> Self {
        Self {
            engine,
            store,
            commands,
            detail: None,
            pinching: false,
            new_title: String::new(),
            new_edge_label: "related to".to_string(),
            status: None,
        }
    }

    fn save_version(&mut self) {
        let view = self.engine.viewport();
        let (offset, scale) = (view.offset(), view.scale());
        let result = self.store.set_view(offset, scale).and_then(|_| {
            let dir = self.store.path().parent().map(|p| p.to_path_buf()).unwrap_or_else(persist::autosave_dir);
            persist::save_versioned(&dir, &self.engine.session())
        });
        self.status = Some(match result {
            Ok(path) => format!("Saved {}", path.display()),
            Err(e) => format!("Save failed: {:#}", e),
        });
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Title");
            ui.text_edit_singleline(&mut self.new_title);
            let link = self.engine.selected();
            if link.is_some() {
                ui.label("Link label");
                ui.text_edit_singleline(&mut self.new_edge_label);
            }
            if ui.button("Add node").clicked() && !self.new_title.trim().is_empty() {
                // spawn next to the selected node, linked to it
                let hint = link.and_then(|id| self.engine.graph().node(id)).map(|n| n.position);
                let connect = link.map(|id| (id, self.new_edge_label.clone()));
                let title = std::mem::take(&mut self.new_title);
                self.engine.add_node(title.trim(), "", hint, connect);
            }
            if ui.button("Fit").clicked() {
                self.engine.refit();
            }
            if ui.button("Relayout").clicked() {
                self.engine.relayout();
                // positions moved wholesale; mutations do not cover that
                if let Err(e) = self.store.reset(self.engine.graph().clone()) {
                    self.status = Some(format!("Autosave failed: {:#}", e));
                }
            }
            if ui.button("Save version").clicked() {
                self.save_version();
            }
            ui.label(format!("{:.2}x", self.engine.viewport().scale()));
            if let Some(s) = &self.status {
                ui.small(s.as_str());
            }
        });
    }

    fn handle_input(&mut self, ui: &egui::Ui, rect: Rect, response: &egui::Response) {
        let local = |p: Pos2| point(p.x - rect.min.x, p.y - rect.min.y);
        let (pressed, released, down, moving, pos, touch, scroll) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.primary_down(),
                i.pointer.is_moving(),
                i.pointer.interact_pos(),
                i.multi_touch(),
                i.raw_scroll_delta.y,
            )
        });

        // Pinch first: it takes over any drag in progress
        match touch {
            Some(t) => {
                self.engine.pinch(t.zoom_delta, local(t.center_pos));
                self.pinching = true;
            }
            None if self.pinching => {
                self.engine.pinch_end();
                self.pinching = false;
            }
            None => {}
        }

        if let Some(p) = pos {
            if pressed && response.hovered() {
                self.engine.pointer_down(local(p));
            } else if down && moving {
                self.engine.pointer_move(local(p));
            }
            if released {
                self.engine.pointer_up(local(p));
            }
        }

        if response.hovered() && scroll != 0.0 {
            let focal = ui.ctx().pointer_hover_pos().map(local).unwrap_or_else(|| local(rect.center()));
            self.engine.scroll_zoom(scroll / SCROLL_PER_NOTCH, focal);
        }
        // release never arrived (focus lost mid-gesture)
        if !down && !released && !self.pinching && self.engine.gesture() != GestureState::Idle {
            self.engine.cancel_gesture();
        }
    }

    fn detail_window(&mut self, ctx: &egui::Context) {
        let Some(sel) = self.detail.clone() else { return };
        let mut open = true;
        let mut delete = false;
        egui::Window::new(sel.title.clone())
            .id(egui::Id::new(("node_detail", sel.id)))
            .open(&mut open)
            .resizable(true)
            .show(ctx, |ui| {
                ui.monospace(format!("id: {}", sel.id));
                ui.small(format!("degree: {}", self.engine.graph().degree(sel.id)));
                ui.separator();
                if sel.description.is_empty() {
                    ui.weak("No description");
                } else {
                    ui.label(sel.description.as_str());
                }
                ui.separator();
                if ui.button("Delete node").clicked() {
                    delete = true;
                }
            });
        if delete {
            self.engine.remove_node(sel.id);
            open = false;
        }
        if !open {
            self.detail = None;
        }
    }
}

fn paint_frame(painter: &egui::Painter, origin: Pos2, frame: &Frame) {
    let to_screen = |p: Point| Pos2::new(p.x + origin.x, p.y + origin.y);
    let edge_stroke = Stroke { width: 1.5, color: Color32::from_rgba_premultiplied(200, 200, 200, 200) };
    let label_font = FontId::proportional((12.0 * frame.scale.sqrt()).clamp(8.0, 16.0));
    for e in &frame.edges {
        painter.line_segment([to_screen(e.from), to_screen(e.to)], edge_stroke);
        if !e.label.is_empty() {
            let galley = painter.layout_no_wrap(e.label.clone(), label_font.clone(), Color32::from_rgb(20, 20, 20));
            let pad = Vec2::new(6.0, 3.0);
            let center = to_screen(e.label_position);
            let pill = Rect::from_center_size(center, galley.size() + pad * 2.0);
            painter.rect_filled(pill, 6.0, Color32::from_rgba_premultiplied(245, 245, 245, 220));
            painter.galley(center - galley.size() * 0.5, galley, Color32::from_rgb(20, 20, 20));
        }
    }

    let line_height = (14.0 * frame.scale.sqrt()).clamp(9.0, 22.0);
    let font = FontId::proportional(line_height);
    for n in &frame.nodes {
        let c = to_screen(n.center);
        let fill = color_for_node(n.id);
        let stroke = if n.selected { Stroke::new(3.0, Color32::WHITE) } else { Stroke::new(1.5, Color32::DARK_GRAY) };
        painter.circle_filled(c, n.radius, fill);
        painter.circle_stroke(c, n.radius, stroke);
        let top = c.y - (n.lines.len() as f32 - 1.0) * line_height * 0.5;
        for (i, line) in n.lines.iter().enumerate() {
            painter.text(
                Pos2::new(c.x, top + i as f32 * line_height),
                Align2::CENTER_CENTER,
                line,
                font.clone(),
                Color32::BLACK,
            );
        }
    }
}

impl eframe::App for CanvasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.engine.apply_commands(&self.commands) > 0 {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| self.toolbar(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_rect_before_wrap();
            let response = ui.allocate_rect(available, Sense::click_and_drag());
            self.engine.resize(available.width(), available.height());
            self.handle_input(ui, available, &response);

            let painter = ui.painter_at(available);
            painter.rect_filled(available, 0.0, Color32::from_rgb(0x1a, 0x1a, 0x2e));
            paint_frame(&painter, available.min, self.engine.frame());
        });

        for event in self.engine.drain_events() {
            match event {
                EngineEvent::NodeSelected(sel) => self.detail = Some(sel),
                EngineEvent::SelectionCleared => self.detail = None,
            }
        }
        self.detail_window(ctx);

        if let Err(e) = self.engine.flush_to(&mut self.store) {
            log::error!("persisting graph changes failed: {:#}", e);
            self.status = Some(format!("Autosave failed: {:#}", e));
        }
        if self.engine.take_redraw() {
            ctx.request_repaint();
        }
    }
}
