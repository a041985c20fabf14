//! Immediate-redraw bitmap backend.
//!
//! Shapes live in a slot table and nothing is drawn until `flush`, which
//! software-rasterizes background, grid, and shapes into a packed 0RGB
//! framebuffer. Every mutation only raises a dirty flag, so a burst of
//! updates from one logical operation costs a single repaint.

use crate::adapter::{CanvasAdapter, CanvasEvent, DragSession, Events, PointerInput, ShapeHandle};
use crate::background::{BackgroundImage, BackgroundSource};
use ob_core::model::{Bounds, Color, Obstacle, ObstaclePatch, Point};
use ob_core::{EngineError, ViewportTransform};

const CLEAR_COLOR: u32 = 0x00FF_FFFF;
const GRID_COLOR: u32 = 0x00E0_E0E0;
/// Grid spacing in canvas-local pixels.
const GRID_STEP: f32 = 50.0;

#[derive(Debug, Clone)]
struct RectShape {
    frame: Bounds,
    color: Color,
    visible: bool,
    draggable: bool,
}

pub struct BitmapCanvas {
    width: u32,
    height: u32,
    frame: Vec<u32>,
    background: Option<BackgroundImage>,
    /// Slot per handle; destroyed shapes leave a `None` so handles stay
    /// unambiguous for the lifetime of the canvas.
    shapes: Vec<Option<RectShape>>,
    /// Paint order, back to front.
    z_order: Vec<ShapeHandle>,
    viewport: ViewportTransform,
    selection: Option<ShapeHandle>,
    selection_enabled: bool,
    drag: Option<DragSession>,
    grid: bool,
    dirty: bool,
    initialized: bool,
    disposed: bool,
}

impl BitmapCanvas {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            frame: Vec::new(),
            background: None,
            shapes: Vec::new(),
            z_order: Vec::new(),
            viewport: ViewportTransform::default(),
            selection: None,
            selection_enabled: true,
            drag: None,
            grid: false,
            dirty: false,
            initialized: false,
            disposed: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The rasterized frame as of the last `flush`.
    pub fn frame_buffer(&self) -> &[u32] {
        &self.frame
    }

    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        self.frame[(y * self.width + x) as usize]
    }

    fn ready(&self) -> Result<(), EngineError> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }
        if !self.initialized {
            return Err(EngineError::Uninitialized);
        }
        Ok(())
    }

    fn shape(&self, handle: ShapeHandle) -> Option<&RectShape> {
        self.shapes.get(handle.0 as usize)?.as_ref()
    }

    fn shape_mut(&mut self, handle: ShapeHandle) -> Option<&mut RectShape> {
        self.shapes.get_mut(handle.0 as usize)?.as_mut()
    }

    // ─── Rasterization ───────────────────────────────────────────────────

    fn put_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        self.frame[(y as u32 * self.width + x as u32) as usize] = color;
    }

    /// Fill the screen-space rectangle, clipped to the framebuffer.
    fn fill_rect(&mut self, rect: kurbo::Rect, color: u32) {
        let clip = kurbo::Rect::new(0.0, 0.0, self.width as f64, self.height as f64);
        let r = rect.intersect(clip);
        if r.is_zero_area() {
            return;
        }
        let (x0, x1) = (r.x0.floor() as i32, r.x1.ceil() as i32);
        let (y0, y1) = (r.y0.floor() as i32, r.y1.ceil() as i32);
        for y in y0..y1 {
            for x in x0..x1 {
                self.put_pixel(x, y, color);
            }
        }
    }

    fn screen_rect(&self, frame: Bounds) -> kurbo::Rect {
        let zoom = self.viewport.zoom() as f64;
        let origin = self.viewport.to_screen(frame.origin());
        kurbo::Rect::new(
            origin.x as f64,
            origin.y as f64,
            origin.x as f64 + frame.width as f64 * zoom,
            origin.y as f64 + frame.height as f64 * zoom,
        )
    }

    fn rasterize(&mut self) {
        self.frame.fill(CLEAR_COLOR);

        if self.background.is_some() {
            // Inverse-map every screen pixel through the viewport so zoom
            // and pan apply to the background as well.
            for sy in 0..self.height {
                for sx in 0..self.width {
                    let c = self
                        .viewport
                        .to_canvas(Point::new(sx as f32 + 0.5, sy as f32 + 0.5));
                    let sample = self
                        .background
                        .as_ref()
                        .and_then(|bg| bg.sample(c.x.floor() as i32, c.y.floor() as i32));
                    if let Some(px) = sample {
                        self.frame[(sy * self.width + sx) as usize] = px;
                    }
                }
            }
        }

        if self.grid {
            self.rasterize_grid();
        }

        for handle in self.z_order.clone() {
            let Some((frame, color)) = self
                .shape(handle)
                .filter(|s| s.visible)
                .map(|s| (s.frame, s.color.to_rgb24()))
            else {
                continue;
            };
            let rect = self.screen_rect(frame);
            self.fill_rect(rect, color);
        }
    }

    fn rasterize_grid(&mut self) {
        // Grid lines sit at canvas-local multiples of GRID_STEP; walk the
        // visible canvas range and map each line back to screen space.
        let min = self.viewport.to_canvas(Point::new(0.0, 0.0));
        let max = self
            .viewport
            .to_canvas(Point::new(self.width as f32, self.height as f32));

        let mut cx = (min.x / GRID_STEP).floor() * GRID_STEP;
        while cx <= max.x {
            let sx = self.viewport.to_screen(Point::new(cx, 0.0)).x.round() as i32;
            for sy in 0..self.height as i32 {
                self.put_pixel(sx, sy, GRID_COLOR);
            }
            cx += GRID_STEP;
        }

        let mut cy = (min.y / GRID_STEP).floor() * GRID_STEP;
        while cy <= max.y {
            let sy = self.viewport.to_screen(Point::new(0.0, cy)).y.round() as i32;
            for sx in 0..self.width as i32 {
                self.put_pixel(sx, sy, GRID_COLOR);
            }
            cy += GRID_STEP;
        }
    }
}

impl Default for BitmapCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasAdapter for BitmapCanvas {
    fn init(&mut self, width: u32, height: u32) -> Result<(), EngineError> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }
        if self.initialized {
            return Err(EngineError::AlreadyInitialized);
        }
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidDimensions { width, height });
        }
        self.width = width;
        self.height = height;
        self.frame = vec![CLEAR_COLOR; (width * height) as usize];
        self.initialized = true;
        self.dirty = true;
        Ok(())
    }

    fn load_background(&mut self, source: &BackgroundSource) -> Result<(), EngineError> {
        self.ready()?;
        self.background = Some(BackgroundImage::load(source, self.width, self.height)?);
        self.dirty = true;
        Ok(())
    }

    fn create_shape(&mut self, obstacle: &Obstacle) -> Result<ShapeHandle, EngineError> {
        self.ready()?;
        let handle = ShapeHandle(self.shapes.len() as u32);
        self.shapes.push(Some(RectShape {
            frame: obstacle.bounds(),
            color: obstacle.color,
            visible: true,
            draggable: true,
        }));
        self.z_order.push(handle);
        self.dirty = true;
        Ok(handle)
    }

    fn update_shape(
        &mut self,
        handle: ShapeHandle,
        patch: &ObstaclePatch,
    ) -> Result<(), EngineError> {
        self.ready()?;
        let Some(shape) = self.shape_mut(handle) else {
            log::warn!("update for unknown shape {handle:?}");
            return Ok(());
        };
        if let Some(x) = patch.x {
            shape.frame.x = x;
        }
        if let Some(y) = patch.y {
            shape.frame.y = y;
        }
        if let Some(w) = patch.width {
            shape.frame.width = w;
        }
        if let Some(h) = patch.height {
            shape.frame.height = h;
        }
        if let Some(c) = patch.color {
            shape.color = c;
        }
        self.dirty = true;
        Ok(())
    }

    fn destroy_shape(&mut self, handle: ShapeHandle) -> Result<(), EngineError> {
        self.ready()?;
        match self.shapes.get_mut(handle.0 as usize) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                self.z_order.retain(|h| *h != handle);
                if self.selection == Some(handle) {
                    self.selection = None;
                }
                if self.drag.map(|d| d.handle) == Some(handle) {
                    self.drag = None;
                }
                self.dirty = true;
            }
            _ => log::warn!("destroy for unknown shape {handle:?}"),
        }
        Ok(())
    }

    fn set_visible(&mut self, handles: &[ShapeHandle], visible: bool) -> Result<(), EngineError> {
        self.ready()?;
        for &handle in handles {
            match self.shape_mut(handle) {
                Some(shape) => shape.visible = visible,
                None => log::warn!("set_visible for unknown shape {handle:?}"),
            }
        }
        self.dirty = true;
        Ok(())
    }

    fn set_draggable(&mut self, handle: ShapeHandle, draggable: bool) -> Result<(), EngineError> {
        self.ready()?;
        match self.shape_mut(handle) {
            Some(shape) => shape.draggable = draggable,
            None => log::warn!("set_draggable for unknown shape {handle:?}"),
        }
        Ok(())
    }

    fn hit_test(&self, pos: Point) -> Option<ShapeHandle> {
        // Front to back: last painted wins.
        self.z_order.iter().rev().copied().find(|&h| {
            self.shape(h)
                .is_some_and(|s| s.visible && s.frame.contains(pos.x, pos.y))
        })
    }

    fn shape_frame(&self, handle: ShapeHandle) -> Option<Bounds> {
        self.shape(handle).map(|s| s.frame)
    }

    fn bounding_box(&self, handle: ShapeHandle) -> Option<Bounds> {
        let frame = self.shape_frame(handle)?;
        let zoom = self.viewport.zoom();
        let origin = self.viewport.to_screen(frame.origin());
        Some(Bounds::new(
            origin.x,
            origin.y,
            frame.width * zoom,
            frame.height * zoom,
        ))
    }

    fn get_pointer(&self, screen: Point) -> Point {
        self.viewport.to_canvas(screen)
    }

    fn dispatch(&mut self, input: &PointerInput) -> Events {
        let mut events = Events::new();
        if self.ready().is_err() {
            log::warn!("input dispatched to an unusable canvas");
            return events;
        }

        match *input {
            PointerInput::Down { x, y } => {
                let pos = self.get_pointer(Point::new(x, y));
                let target = if self.selection_enabled {
                    self.hit_test(pos)
                } else {
                    None
                };
                match target {
                    Some(handle) => {
                        if self.selection != Some(handle) {
                            self.selection = Some(handle);
                            events.push(CanvasEvent::SelectionCreated { handle });
                        }
                        if let Some(shape) = self.shape(handle)
                            && shape.draggable
                        {
                            self.drag = Some(DragSession::start(handle, pos, shape.frame));
                        }
                    }
                    None => {
                        if self.selection.take().is_some() {
                            events.push(CanvasEvent::SelectionCleared);
                        }
                    }
                }
                events.push(CanvasEvent::PointerDown { pos, target });
            }
            PointerInput::Move { x, y } => {
                let pos = self.get_pointer(Point::new(x, y));
                if let Some(drag) = &mut self.drag {
                    let origin = drag.origin_for(pos);
                    drag.moved = true;
                    let handle = drag.handle;
                    if let Some(shape) = self.shape_mut(handle) {
                        shape.frame.x = origin.x;
                        shape.frame.y = origin.y;
                    }
                    self.dirty = true;
                    events.push(CanvasEvent::ObjectMoving {
                        handle,
                        pos: origin,
                    });
                }
                events.push(CanvasEvent::PointerMove { pos });
            }
            PointerInput::Up { x, y } => {
                let pos = self.get_pointer(Point::new(x, y));
                if let Some(drag) = self.drag.take()
                    && drag.moved
                {
                    events.push(CanvasEvent::ObjectModified {
                        handle: drag.handle,
                    });
                }
                events.push(CanvasEvent::PointerUp { pos });
            }
            PointerInput::DoubleClick { x, y } => {
                let pos = self.get_pointer(Point::new(x, y));
                let target = self.hit_test(pos);
                events.push(CanvasEvent::DoubleClick { pos, target });
            }
            PointerInput::Wheel { x, y, delta_y } => {
                events.push(CanvasEvent::Wheel {
                    pivot: Point::new(x, y),
                    delta_y,
                });
            }
        }
        events
    }

    fn selection(&self) -> Option<ShapeHandle> {
        self.selection
    }

    fn set_selection(&mut self, handle: Option<ShapeHandle>) -> Events {
        let mut events = Events::new();
        match handle {
            Some(h) if self.shape(h).is_some() => {
                if self.selection != Some(h) {
                    self.selection = Some(h);
                    events.push(CanvasEvent::SelectionCreated { handle: h });
                }
            }
            Some(h) => log::warn!("select for unknown shape {h:?}"),
            None => {
                if self.selection.take().is_some() {
                    events.push(CanvasEvent::SelectionCleared);
                }
            }
        }
        events
    }

    fn set_selection_enabled(&mut self, enabled: bool) {
        self.selection_enabled = enabled;
    }

    fn set_viewport(&mut self, viewport: &ViewportTransform) {
        self.viewport = *viewport;
        self.dirty = true;
    }

    fn set_grid_visible(&mut self, visible: bool) {
        if self.grid != visible {
            self.grid = visible;
            self.dirty = true;
        }
    }

    fn flush(&mut self) {
        if !self.initialized || self.disposed || !self.dirty {
            return;
        }
        self.rasterize();
        self.dirty = false;
        log::trace!("bitmap canvas repainted ({} shapes)", self.z_order.len());
    }

    fn release_subscriptions(&mut self) {
        self.selection = None;
        self.drag = None;
        for shape in self.shapes.iter_mut().flatten() {
            shape.draggable = false;
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.shapes.clear();
        self.z_order.clear();
        self.frame.clear();
        self.background = None;
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn obstacle(id: u64, x: f32, y: f32, w: f32, h: f32) -> Obstacle {
        Obstacle::new(
            ob_core::ObstacleId::from_raw(id),
            x,
            y,
            w,
            h,
            Color::rgb(255, 0, 0),
        )
    }

    #[test]
    fn mutations_are_visible_only_after_flush() {
        let mut canvas = BitmapCanvas::new();
        canvas.init(100, 100).unwrap();
        canvas.flush();
        assert_eq!(canvas.pixel(15, 15), CLEAR_COLOR);

        canvas.create_shape(&obstacle(1, 10.0, 10.0, 20.0, 20.0)).unwrap();
        // Not committed yet: immediate backends paint at flush
        assert_eq!(canvas.pixel(15, 15), CLEAR_COLOR);

        canvas.flush();
        assert_eq!(canvas.pixel(15, 15), 0x00FF_0000);
    }

    #[test]
    fn init_preconditions_fail_fast() {
        let mut canvas = BitmapCanvas::new();
        assert_eq!(
            canvas.create_shape(&obstacle(1, 0.0, 0.0, 5.0, 5.0)),
            Err(EngineError::Uninitialized)
        );
        assert_eq!(
            canvas.init(0, 64),
            Err(EngineError::InvalidDimensions {
                width: 0,
                height: 64
            })
        );
        canvas.init(64, 64).unwrap();
        assert_eq!(canvas.init(64, 64), Err(EngineError::AlreadyInitialized));

        canvas.dispose();
        assert_eq!(
            canvas.create_shape(&obstacle(1, 0.0, 0.0, 5.0, 5.0)),
            Err(EngineError::Disposed)
        );
    }

    #[test]
    fn hit_test_prefers_topmost_shape() {
        let mut canvas = BitmapCanvas::new();
        canvas.init(200, 200).unwrap();
        let below = canvas.create_shape(&obstacle(1, 10.0, 10.0, 50.0, 50.0)).unwrap();
        let above = canvas.create_shape(&obstacle(2, 30.0, 30.0, 50.0, 50.0)).unwrap();

        assert_eq!(canvas.hit_test(Point::new(40.0, 40.0)), Some(above));
        assert_eq!(canvas.hit_test(Point::new(15.0, 15.0)), Some(below));
        assert_eq!(canvas.hit_test(Point::new(150.0, 150.0)), None);

        canvas.set_visible(&[above], false).unwrap();
        assert_eq!(canvas.hit_test(Point::new(40.0, 40.0)), Some(below));
    }

    #[test]
    fn bounding_box_tracks_viewport() {
        let mut canvas = BitmapCanvas::new();
        canvas.init(200, 200).unwrap();
        let h = canvas.create_shape(&obstacle(1, 10.0, 20.0, 30.0, 40.0)).unwrap();

        let mut vp = ViewportTransform::new(0.2, 20.0);
        vp.zoom_at_point(2.0, Point::new(0.0, 0.0));
        vp.pan(5.0, 7.0);
        canvas.set_viewport(&vp);

        let bbox = canvas.bounding_box(h).unwrap();
        assert_eq!(bbox, Bounds::new(25.0, 47.0, 60.0, 80.0));

        // The canvas-local frame is unaffected by the viewport
        assert_eq!(canvas.shape_frame(h), Some(Bounds::new(10.0, 20.0, 30.0, 40.0)));
    }
}
