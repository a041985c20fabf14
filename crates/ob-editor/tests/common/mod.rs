//! Shared test support: an adapter that delegates to a real backend while
//! recording every mutating call, so tests can assert on exact call counts
//! (reconciliation minimality) and call ordering (teardown).

#![allow(dead_code)]

use ob_canvas::BitmapCanvas;
use ob_canvas::adapter::{CanvasAdapter, Events, PointerInput, ShapeHandle};
use ob_canvas::background::BackgroundSource;
use ob_core::model::{Bounds, Obstacle, ObstaclePatch, Point};
use ob_core::{EngineError, ViewportTransform};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub created: usize,
    pub updated: usize,
    pub destroyed: usize,
    pub flushes: usize,
}

impl CallCounts {
    pub fn mutations(&self) -> usize {
        self.created + self.updated + self.destroyed
    }
}

#[derive(Debug, Default)]
pub struct CallLog {
    pub counts: CallCounts,
    /// Call names in order, for teardown-order assertions.
    pub order: Vec<&'static str>,
}

pub struct RecordingAdapter {
    inner: BitmapCanvas,
    log: Rc<RefCell<CallLog>>,
}

impl RecordingAdapter {
    pub fn new() -> (Self, Rc<RefCell<CallLog>>) {
        let log = Rc::new(RefCell::new(CallLog::default()));
        (
            Self {
                inner: BitmapCanvas::new(),
                log: log.clone(),
            },
            log,
        )
    }
}

impl CanvasAdapter for RecordingAdapter {
    fn init(&mut self, width: u32, height: u32) -> Result<(), EngineError> {
        self.inner.init(width, height)
    }

    fn load_background(&mut self, source: &BackgroundSource) -> Result<(), EngineError> {
        self.inner.load_background(source)
    }

    fn create_shape(&mut self, obstacle: &Obstacle) -> Result<ShapeHandle, EngineError> {
        let mut log = self.log.borrow_mut();
        log.counts.created += 1;
        log.order.push("create");
        drop(log);
        self.inner.create_shape(obstacle)
    }

    fn update_shape(
        &mut self,
        handle: ShapeHandle,
        patch: &ObstaclePatch,
    ) -> Result<(), EngineError> {
        let mut log = self.log.borrow_mut();
        log.counts.updated += 1;
        log.order.push("update");
        drop(log);
        self.inner.update_shape(handle, patch)
    }

    fn destroy_shape(&mut self, handle: ShapeHandle) -> Result<(), EngineError> {
        let mut log = self.log.borrow_mut();
        log.counts.destroyed += 1;
        log.order.push("destroy");
        drop(log);
        self.inner.destroy_shape(handle)
    }

    fn set_visible(&mut self, handles: &[ShapeHandle], visible: bool) -> Result<(), EngineError> {
        self.inner.set_visible(handles, visible)
    }

    fn set_draggable(&mut self, handle: ShapeHandle, draggable: bool) -> Result<(), EngineError> {
        self.inner.set_draggable(handle, draggable)
    }

    fn hit_test(&self, pos: Point) -> Option<ShapeHandle> {
        self.inner.hit_test(pos)
    }

    fn shape_frame(&self, handle: ShapeHandle) -> Option<Bounds> {
        self.inner.shape_frame(handle)
    }

    fn bounding_box(&self, handle: ShapeHandle) -> Option<Bounds> {
        self.inner.bounding_box(handle)
    }

    fn get_pointer(&self, screen: Point) -> Point {
        self.inner.get_pointer(screen)
    }

    fn dispatch(&mut self, input: &PointerInput) -> Events {
        self.inner.dispatch(input)
    }

    fn selection(&self) -> Option<ShapeHandle> {
        self.inner.selection()
    }

    fn set_selection(&mut self, handle: Option<ShapeHandle>) -> Events {
        self.inner.set_selection(handle)
    }

    fn set_selection_enabled(&mut self, enabled: bool) {
        self.inner.set_selection_enabled(enabled);
    }

    fn set_viewport(&mut self, viewport: &ViewportTransform) {
        self.inner.set_viewport(viewport);
    }

    fn set_grid_visible(&mut self, visible: bool) {
        self.inner.set_grid_visible(visible);
    }

    fn flush(&mut self) {
        let mut log = self.log.borrow_mut();
        log.counts.flushes += 1;
        log.order.push("flush");
        drop(log);
        self.inner.flush();
    }

    fn release_subscriptions(&mut self) {
        self.log.borrow_mut().order.push("release");
        self.inner.release_subscriptions();
    }

    fn dispose(&mut self) {
        self.log.borrow_mut().order.push("dispose");
        self.inner.dispose();
    }
}
