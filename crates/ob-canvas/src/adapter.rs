//! Backend-agnostic canvas adapter boundary.
//!
//! Two structurally different backends sit behind [`CanvasAdapter`]: an
//! immediate-redraw bitmap canvas ([`BitmapCanvas`](crate::BitmapCanvas))
//! and a retained scene graph ([`SceneCanvas`](crate::SceneCanvas)). The
//! editor engine addresses shapes only through opaque [`ShapeHandle`]s and
//! consumes the normalized [`CanvasEvent`] stream; it must never depend on
//! which backend is active.
//!
//! Raw input arrives in screen pixels. `dispatch` converts positions to
//! canvas-local coordinates through the current viewport (the `get_pointer`
//! contract) and synthesizes selection and native-drag events with
//! identical semantics on both backends.

use crate::background::BackgroundSource;
use ob_core::model::{Bounds, Obstacle, ObstaclePatch, Point};
use ob_core::{EngineError, ViewportTransform};
use smallvec::SmallVec;

/// Opaque, adapter-scoped key for one backend shape.
///
/// The backends own the actual shape records; everything else refers to
/// them only through this handle, which is what lets two incompatible
/// backend shape types sit behind one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeHandle(pub(crate) u32);

impl ShapeHandle {
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Raw pointer input in screen pixels, relative to the canvas element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
    DoubleClick { x: f32, y: f32 },
    Wheel { x: f32, y: f32, delta_y: f32 },
}

/// Normalized canvas event, produced by [`CanvasAdapter::dispatch`].
///
/// Pointer positions are canvas-local (zoom/pan adjusted). The wheel pivot
/// stays in screen space because pointer-anchored zoom needs the screen
/// point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasEvent {
    PointerDown {
        pos: Point,
        target: Option<ShapeHandle>,
    },
    PointerMove {
        pos: Point,
    },
    PointerUp {
        pos: Point,
    },
    DoubleClick {
        pos: Point,
        target: Option<ShapeHandle>,
    },
    Wheel {
        pivot: Point,
        delta_y: f32,
    },
    /// A shape became the active selection (emitted before the
    /// corresponding `PointerDown`).
    SelectionCreated {
        handle: ShapeHandle,
    },
    /// The active selection was dismissed by a click on empty canvas.
    SelectionCleared,
    /// A draggable shape is being moved natively; `pos` is its new
    /// top-left in canvas-local coordinates.
    ObjectMoving {
        handle: ShapeHandle,
        pos: Point,
    },
    /// A native move/resize gesture finished.
    ObjectModified {
        handle: ShapeHandle,
    },
}

/// Event batch from one raw input. Almost always short.
pub type Events = SmallVec<[CanvasEvent; 4]>;

/// In-progress native drag of a backend shape.
///
/// Both backends track the grab offset so the shape does not jump to the
/// pointer on the first move.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DragSession {
    pub handle: ShapeHandle,
    pub grab: Point,
    pub moved: bool,
}

impl DragSession {
    pub fn start(handle: ShapeHandle, pointer: Point, frame: Bounds) -> Self {
        Self {
            handle,
            grab: Point::new(pointer.x - frame.x, pointer.y - frame.y),
            moved: false,
        }
    }

    /// New top-left for the dragged shape given the current pointer.
    pub fn origin_for(&self, pointer: Point) -> Point {
        Point::new(pointer.x - self.grab.x, pointer.y - self.grab.y)
    }
}

/// The backend contract. Object-safe: the engine holds `Box<dyn
/// CanvasAdapter>`, selected at construction time.
pub trait CanvasAdapter {
    /// Allocate the drawing surface. Calling twice or with a zero
    /// dimension is a caller-sequencing bug and fails fast.
    fn init(&mut self, width: u32, height: u32) -> Result<(), EngineError>;

    /// Decode and install the background image. On failure the canvas
    /// stays usable with no background.
    fn load_background(&mut self, source: &BackgroundSource) -> Result<(), EngineError>;

    fn create_shape(&mut self, obstacle: &Obstacle) -> Result<ShapeHandle, EngineError>;

    /// Apply the present fields of `patch`. Unknown handles warn and no-op.
    fn update_shape(&mut self, handle: ShapeHandle, patch: &ObstaclePatch)
    -> Result<(), EngineError>;

    fn destroy_shape(&mut self, handle: ShapeHandle) -> Result<(), EngineError>;

    fn set_visible(&mut self, handles: &[ShapeHandle], visible: bool) -> Result<(), EngineError>;

    /// Shapes are created draggable; drafts under construction turn this
    /// off until finalization.
    fn set_draggable(&mut self, handle: ShapeHandle, draggable: bool) -> Result<(), EngineError>;

    /// Topmost visible shape at a canvas-local point.
    fn hit_test(&self, pos: Point) -> Option<ShapeHandle>;

    /// Canvas-local frame of a shape (position and size as stored).
    fn shape_frame(&self, handle: ShapeHandle) -> Option<Bounds>;

    /// Viewport-adjusted bounding box (screen space), for overlay
    /// placement.
    fn bounding_box(&self, handle: ShapeHandle) -> Option<Bounds>;

    /// Screen point to canvas-local point under the current viewport.
    fn get_pointer(&self, screen: Point) -> Point;

    /// Normalize one raw input into canvas events.
    fn dispatch(&mut self, input: &PointerInput) -> Events;

    fn selection(&self) -> Option<ShapeHandle>;

    /// Programmatic selection change. Emits the same selection events a
    /// pointer interaction would.
    fn set_selection(&mut self, handle: Option<ShapeHandle>) -> Events;

    /// While disabled, pointer-downs never target shapes (drawing mode).
    fn set_selection_enabled(&mut self, enabled: bool);

    fn set_viewport(&mut self, viewport: &ViewportTransform);

    fn set_grid_visible(&mut self, visible: bool);

    /// Coalesced repaint. Cheap when nothing changed.
    fn flush(&mut self);

    /// Drop interactive state (selection, in-flight drags, draggable
    /// flags). First step of teardown, before shapes are destroyed.
    fn release_subscriptions(&mut self);

    /// Final teardown. Idempotent; the adapter rejects further use.
    fn dispose(&mut self);
}
