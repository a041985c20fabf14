//! Zoom/pan state and pointer-anchored zoom math.
//!
//! One [`ViewportTransform`] per canvas session. Screen coordinates are
//! device pixels relative to the canvas element; canvas-local coordinates
//! are the space obstacles live in. The mapping is
//! `screen = canvas * zoom + pan`.

use crate::model::Point;
use serde::{Deserialize, Serialize};

/// Direction for the discrete zoom buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    zoom: f32,
    pan_x: f32,
    pan_y: f32,
    min_zoom: f32,
    max_zoom: f32,
}

impl ViewportTransform {
    /// Identity transform with the given clamp bounds.
    pub fn new(min_zoom: f32, max_zoom: f32) -> Self {
        debug_assert!(min_zoom > 0.0 && min_zoom <= max_zoom);
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            min_zoom,
            max_zoom,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan_offset(&self) -> (f32, f32) {
        (self.pan_x, self.pan_y)
    }

    /// Multiply zoom by `factor`, clamp, then recompute pan so that `pivot`
    /// (a screen point) maps to the same canvas-local point before and
    /// after. This is the wheel-zoom anchor behavior.
    pub fn zoom_at_point(&mut self, factor: f32, pivot: Point) {
        let anchored = self.to_canvas(pivot);
        self.zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        self.pan_x = pivot.x - anchored.x * self.zoom;
        self.pan_y = pivot.y - anchored.y * self.zoom;
    }

    /// Discrete zoom step (the +/- buttons). No pivot: the pan offset is
    /// left in place, so the view scales about the canvas origin.
    pub fn zoom_step(&mut self, direction: ZoomDirection, step: f32) {
        let factor = match direction {
            ZoomDirection::In => step,
            ZoomDirection::Out => 1.0 / step,
        };
        self.zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
    }

    /// Continuous wheel zoom: `base ^ delta_y`, pointer-anchored. A positive
    /// delta (wheel down) zooms out for any base < 1.
    pub fn wheel_zoom(&mut self, delta_y: f32, pivot: Point, base: f32) {
        self.zoom_at_point(base.powf(delta_y), pivot);
    }

    /// Add a fixed offset to pan. Intentionally unclamped.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Back to zoom 1, pan (0, 0).
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }

    /// Screen point to canvas-local point (the `getPointer` contract).
    pub fn to_canvas(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan_x) / self.zoom,
            (screen.y - self.pan_y) / self.zoom,
        )
    }

    /// Canvas-local point to screen point.
    pub fn to_screen(&self, canvas: Point) -> Point {
        Point::new(
            canvas.x * self.zoom + self.pan_x,
            canvas.y * self.zoom + self.pan_y,
        )
    }
}

/// Identity transform with the reference clamp bounds.
impl Default for ViewportTransform {
    fn default() -> Self {
        Self::new(1.0, 20.0)
    }
}
