//! Delete-icon overlay placement.
//!
//! Pure math: given a shape's viewport-adjusted bounding box and the canvas
//! container's page-space rectangle, compute the absolute `{top, left}` for
//! an icon anchored at the shape's top-right corner. The host places a DOM
//! element (or equivalent) at the result; nothing here holds state.

use ob_core::model::Bounds;
use serde::{Deserialize, Serialize};

/// The canvas container's bounding rectangle in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageRect {
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
}

impl PageRect {
    pub const fn new(top: f32, left: f32, width: f32, height: f32) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }
}

/// Absolute CSS-style position for the overlay icon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayPlacement {
    pub top: f32,
    pub left: f32,
}

/// Anchor the icon just outside the shape's top-right corner: raised
/// `offset` above the top edge, pushed `offset` past the right edge.
pub fn delete_icon_placement(
    shape_box: Bounds,
    container: &PageRect,
    offset: f32,
) -> OverlayPlacement {
    OverlayPlacement {
        top: container.top + shape_box.y - offset,
        left: container.left + shape_box.x + shape_box.width + offset,
    }
}
