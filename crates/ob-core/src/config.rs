//! Engine configuration.
//!
//! Every behavioral constant (obstacle count, zoom bounds, pan offset,
//! coalescing window, drag threshold, colors, size ranges) is a config
//! field rather than a hard-coded value, so hosts can tune a session
//! without forking the engine. `Default` carries the reference values.

use crate::model::Color;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Canvas size in pixels.
    pub canvas_width: u32,
    pub canvas_height: u32,

    /// How many obstacles `start()` generates after the background loads.
    pub obstacle_count: usize,

    /// Zoom clamp, inclusive on both ends.
    pub min_zoom: f32,
    pub max_zoom: f32,

    /// Multiplicative factor for the discrete zoom buttons.
    pub zoom_step: f32,

    /// Base of the continuous wheel-zoom factor (`wheel_base ^ delta_y`).
    pub wheel_base: f32,

    /// Pixels per directional pan move.
    pub pan_step: f32,

    /// Minimum pointer travel before a draft rectangle materializes.
    /// Below this, pointer-down/up is a click, not a draw.
    pub drag_threshold: f32,

    /// Snapshot coalescing window for reconciliation, in milliseconds.
    pub coalesce_window_ms: u64,

    /// Fill color for newly drawn rectangles.
    pub draw_color: Color,

    /// When set, newly drawn rectangles take a random color instead of
    /// `draw_color`.
    pub randomize_draw_color: bool,

    /// Size range for generated obstacles, inclusive.
    pub min_obstacle_size: f32,
    pub max_obstacle_size: f32,

    /// Gap between a selected shape's corner and the delete icon.
    pub overlay_offset: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            canvas_width: 800,
            canvas_height: 800,
            obstacle_count: 100,
            min_zoom: 1.0,
            max_zoom: 20.0,
            zoom_step: 1.1,
            wheel_base: 0.999,
            pan_step: 10.0,
            drag_threshold: 5.0,
            coalesce_window_ms: 100,
            draw_color: Color::rgb(0, 255, 255),
            randomize_draw_color: false,
            min_obstacle_size: 20.0,
            max_obstacle_size: 120.0,
            overlay_offset: 10.0,
        }
    }
}

impl EngineConfig {
    pub fn coalesce_window(&self) -> Duration {
        Duration::from_millis(self.coalesce_window_ms)
    }
}
