use log::debug;
use serde::{Deserialize, Serialize};

use crate::graph_utils::geometry::{Bounds, Point, point};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportParams {
    pub max_scale: f32,
    /// Lowest scale ever allowed, also the lower clamp before the first fit.
    pub min_scale_floor: f32,
}

impl Default for ViewportParams {
    fn default() -> Self {
        Self { max_scale: 3.0, min_scale_floor: 0.01 }
    }
}

// Smallest scale any configuration may produce; keeps screen_to_world finite
const SMALLEST_SCALE: f32 = 1e-4;

/// Pan/zoom transform: `screen = world * scale + offset`.
#[derive(Debug, Clone)]
pub struct Viewport {
    scale: f32,
    offset: Point,
    min_scale: f32,
    max_scale: f32,
    floor: f32,
    view_size: Point,
    fitted: bool,
}

impl Viewport {
    pub fn new(params: &ViewportParams) -> Self {
        let max_scale = params.max_scale.max(SMALLEST_SCALE);
        let floor = params.min_scale_floor.max(SMALLEST_SCALE).min(max_scale);
        Self {
            scale: 1.0_f32.clamp(floor, max_scale),
            offset: Point::ZERO,
            min_scale: floor,
            max_scale,
            floor,
            view_size: Point::ZERO,
            fitted: false,
        }
    }

    pub fn scale(&self) -> f32 { self.scale }
    pub fn offset(&self) -> Point { self.offset }
    pub fn min_scale(&self) -> f32 { self.min_scale }
    pub fn max_scale(&self) -> f32 { self.max_scale }
    pub fn view_size(&self) -> Point { self.view_size }
    pub fn is_fitted(&self) -> bool { self.fitted }

    pub fn world_to_screen(&self, world: Point) -> Point { world * self.scale + self.offset }

    pub fn screen_to_world(&self, screen: Point) -> Point { (screen - self.offset) / self.scale }

    pub fn screen_radius(&self, world_radius: f32) -> f32 { world_radius * self.scale }

    /// Restore a saved transform (session files). The scale is clamped to the current range.
    pub fn restore(&mut self, scale: f32, offset: Point) {
        if scale.is_finite() && scale > 0.0 && offset.is_finite() {
            self.scale = scale.clamp(self.min_scale, self.max_scale);
            self.offset = offset;
        }
    }

    /// Scale the world box to fit the view and center it. The fitted scale becomes the
    /// minimum zoom. Returns false when there is no view area or the box is degenerate.
    pub fn fit_to_bounds(&mut self, bounds: Bounds) -> bool {
        let Some(fit) = self.fit_scale(bounds) else { return false };
        let (ww, wh) = (bounds.width(), bounds.height());
        self.min_scale = fit.clamp(self.floor, self.max_scale);
        self.scale = fit.clamp(self.min_scale, self.max_scale);
        self.offset = self.view_size * 0.5 - bounds.center() * self.scale;
        self.fitted = true;
        debug!(
            "viewport fit {:.0}x{:.0} world into {:.0}x{:.0} view at scale {:.4}",
            ww, wh, self.view_size.x, self.view_size.y, self.scale
        );
        true
    }

    /// Recompute the minimum zoom so that `bounds` still fits at the current view size.
    /// Pan and zoom are left alone unless the scale is now below the minimum, in which
    /// case it is raised around the view centre.
    pub fn refresh_min_scale(&mut self, bounds: Bounds) {
        let Some(fit) = self.fit_scale(bounds) else { return };
        self.min_scale = fit.clamp(self.floor, self.max_scale);
        if self.scale < self.min_scale {
            self.zoom_at(1.0, self.view_size * 0.5);
        }
    }

    fn fit_scale(&self, bounds: Bounds) -> Option<f32> {
        let (ww, wh) = (bounds.width(), bounds.height());
        if self.view_size.x <= 0.0 || self.view_size.y <= 0.0 || ww <= 0.0 || wh <= 0.0 {
            return None;
        }
        Some((self.view_size.x / ww).min(self.view_size.y / wh))
    }

    /// Update the view size, keeping the world point under the view centre in place.
    pub fn resize(&mut self, width: f32, height: f32) {
        let new_size = point(width.max(0.0), height.max(0.0));
        if self.fitted {
            self.offset += (new_size - self.view_size) * 0.5;
        }
        self.view_size = new_size;
    }

    pub fn pan(&mut self, delta: Point) { self.offset += delta; }

    /// Multiply the scale by `factor` (clamped) keeping the world point under `focal`
    /// stationary on screen.
    pub fn zoom_at(&mut self, factor: f32, focal: Point) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let old = self.scale;
        self.scale = (self.scale * factor).clamp(self.min_scale, self.max_scale);
        self.offset += (self.offset - focal) * (self.scale / old - 1.0);
    }
}
