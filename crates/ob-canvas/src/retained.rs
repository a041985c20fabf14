//! Retained scene-graph backend.
//!
//! Shapes are nodes in a `petgraph` stable graph under a root; paint order
//! is child order. The scene auto-tracks damage: mutations invalidate a
//! cached paint list that is rebuilt lazily on the next query, so `flush`
//! is a hint rather than a requirement.

use crate::adapter::{CanvasAdapter, CanvasEvent, DragSession, Events, PointerInput, ShapeHandle};
use crate::background::{BackgroundImage, BackgroundSource};
use ob_core::model::{Bounds, Color, Obstacle, ObstaclePatch, Point};
use ob_core::{EngineError, ViewportTransform};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct SceneShape {
    handle: ShapeHandle,
    frame: Bounds,
    color: Color,
    visible: bool,
    draggable: bool,
}

#[derive(Debug, Clone)]
enum SceneNode {
    Root,
    Shape(SceneShape),
}

/// One entry of the derived paint list: screen-space rectangle plus fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintOp {
    pub handle: ShapeHandle,
    pub rect: Bounds,
    pub color: Color,
}

pub struct SceneCanvas {
    graph: StableDiGraph<SceneNode, ()>,
    root: NodeIndex,
    handle_index: HashMap<ShapeHandle, NodeIndex>,
    next_handle: u32,
    width: u32,
    height: u32,
    background: Option<BackgroundImage>,
    viewport: ViewportTransform,
    selection: Option<ShapeHandle>,
    selection_enabled: bool,
    drag: Option<DragSession>,
    grid: bool,
    /// Set by any mutation; cleared when the paint list is rebuilt.
    damaged: bool,
    paint_list: Vec<PaintOp>,
    initialized: bool,
    disposed: bool,
}

impl SceneCanvas {
    pub fn new() -> Self {
        let mut graph = StableDiGraph::new();
        let root = graph.add_node(SceneNode::Root);
        Self {
            graph,
            root,
            handle_index: HashMap::new(),
            next_handle: 0,
            width: 0,
            height: 0,
            background: None,
            viewport: ViewportTransform::default(),
            selection: None,
            selection_enabled: true,
            drag: None,
            grid: false,
            damaged: false,
            paint_list: Vec::new(),
            initialized: false,
            disposed: false,
        }
    }

    pub fn grid_visible(&self) -> bool {
        self.grid
    }

    pub fn background_loaded(&self) -> bool {
        self.background.is_some()
    }

    /// The current paint list, rebuilding it first if the scene is
    /// damaged. This is the retained-mode analog of a repaint: callers may
    /// query at any time without an explicit `flush`.
    pub fn paint_ops(&mut self) -> &[PaintOp] {
        if self.damaged {
            self.rebuild_paint_list();
            self.damaged = false;
        }
        &self.paint_list
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

    /// Children of the root in insertion order. Sorting by `NodeIndex`
    /// keeps paint order deterministic regardless of adjacency iteration
    /// order.
    fn children(&self) -> Vec<NodeIndex> {
        let mut children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(self.root, petgraph::Direction::Outgoing)
            .collect();
        children.sort();
        children
    }

    fn shape(&self, handle: ShapeHandle) -> Option<&SceneShape> {
        let idx = *self.handle_index.get(&handle)?;
        match &self.graph[idx] {
            SceneNode::Shape(s) => Some(s),
            SceneNode::Root => None,
        }
    }

    fn shape_mut(&mut self, handle: ShapeHandle) -> Option<&mut SceneShape> {
        let idx = *self.handle_index.get(&handle)?;
        match &mut self.graph[idx] {
            SceneNode::Shape(s) => Some(s),
            SceneNode::Root => None,
        }
    }

    fn to_screen_bounds(&self, frame: Bounds) -> Bounds {
        let zoom = self.viewport.zoom();
        let origin = self.viewport.to_screen(frame.origin());
        Bounds::new(origin.x, origin.y, frame.width * zoom, frame.height * zoom)
    }

    fn rebuild_paint_list(&mut self) {
        let mut ops = Vec::new();
        for idx in self.children() {
            if let SceneNode::Shape(s) = &self.graph[idx]
                && s.visible
            {
                ops.push(PaintOp {
                    handle: s.handle,
                    rect: self.to_screen_bounds(s.frame),
                    color: s.color,
                });
            }
        }
        self.paint_list = ops;
        log::trace!("scene paint list rebuilt ({} ops)", self.paint_list.len());
    }
}

impl Default for SceneCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasAdapter for SceneCanvas {
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
        self.initialized = true;
        self.damaged = true;
        Ok(())
    }

    fn load_background(&mut self, source: &BackgroundSource) -> Result<(), EngineError> {
        self.ready()?;
        self.background = Some(BackgroundImage::load(source, self.width, self.height)?);
        self.damaged = true;
        Ok(())
    }

    fn create_shape(&mut self, obstacle: &Obstacle) -> Result<ShapeHandle, EngineError> {
        self.ready()?;
        let handle = ShapeHandle(self.next_handle);
        self.next_handle += 1;

        let idx = self.graph.add_node(SceneNode::Shape(SceneShape {
            handle,
            frame: obstacle.bounds(),
            color: obstacle.color,
            visible: true,
            draggable: true,
        }));
        self.graph.add_edge(self.root, idx, ());
        self.handle_index.insert(handle, idx);
        self.damaged = true;
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
        self.damaged = true;
        Ok(())
    }

    fn destroy_shape(&mut self, handle: ShapeHandle) -> Result<(), EngineError> {
        self.ready()?;
        match self.handle_index.remove(&handle) {
            Some(idx) => {
                self.graph.remove_node(idx);
                if self.selection == Some(handle) {
                    self.selection = None;
                }
                if self.drag.map(|d| d.handle) == Some(handle) {
                    self.drag = None;
                }
                self.damaged = true;
            }
            None => log::warn!("destroy for unknown shape {handle:?}"),
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
        self.damaged = true;
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
        // Reverse child order: last painted is topmost.
        for idx in self.children().into_iter().rev() {
            if let SceneNode::Shape(s) = &self.graph[idx]
                && s.visible
                && s.frame.contains(pos.x, pos.y)
            {
                return Some(s.handle);
            }
        }
        None
    }

    fn shape_frame(&self, handle: ShapeHandle) -> Option<Bounds> {
        self.shape(handle).map(|s| s.frame)
    }

    fn bounding_box(&self, handle: ShapeHandle) -> Option<Bounds> {
        self.shape(handle).map(|s| self.to_screen_bounds(s.frame))
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
                    self.damaged = true;
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
        self.damaged = true;
    }

    fn set_grid_visible(&mut self, visible: bool) {
        if self.grid != visible {
            self.grid = visible;
            self.damaged = true;
        }
    }

    fn flush(&mut self) {
        // A hint only: the scene rebuilds its paint list lazily, but doing
        // it now keeps the repaint off the next query path.
        if self.initialized && !self.disposed && self.damaged {
            self.rebuild_paint_list();
            self.damaged = false;
        }
    }

    fn release_subscriptions(&mut self) {
        self.selection = None;
        self.drag = None;
        let handles: Vec<ShapeHandle> = self.handle_index.keys().copied().collect();
        for handle in handles {
            if let Some(shape) = self.shape_mut(handle) {
                shape.draggable = false;
            }
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.graph.clear();
        self.root = self.graph.add_node(SceneNode::Root);
        self.handle_index.clear();
        self.paint_list.clear();
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
            Color::rgb(0, 0, 255),
        )
    }

    #[test]
    fn paint_list_tracks_mutations_without_flush() {
        let mut canvas = SceneCanvas::new();
        canvas.init(200, 200).unwrap();
        let h = canvas.create_shape(&obstacle(1, 10.0, 10.0, 40.0, 30.0)).unwrap();

        // No flush: the retained scene self-heals on query
        let ops = canvas.paint_ops().to_vec();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].rect, Bounds::new(10.0, 10.0, 40.0, 30.0));

        canvas
            .update_shape(h, &ObstaclePatch::position(50.0, 60.0))
            .unwrap();
        let ops = canvas.paint_ops().to_vec();
        assert_eq!(ops[0].rect, Bounds::new(50.0, 60.0, 40.0, 30.0));
    }

    #[test]
    fn destroy_removes_node_and_clears_selection() {
        let mut canvas = SceneCanvas::new();
        canvas.init(100, 100).unwrap();
        let h = canvas.create_shape(&obstacle(1, 0.0, 0.0, 20.0, 20.0)).unwrap();
        canvas.set_selection(Some(h));
        assert_eq!(canvas.selection(), Some(h));

        canvas.destroy_shape(h).unwrap();
        assert_eq!(canvas.selection(), None);
        assert_eq!(canvas.shape_frame(h), None);
        assert!(canvas.paint_ops().is_empty());
    }

    #[test]
    fn hit_test_walks_children_in_reverse() {
        let mut canvas = SceneCanvas::new();
        canvas.init(100, 100).unwrap();
        let below = canvas.create_shape(&obstacle(1, 0.0, 0.0, 50.0, 50.0)).unwrap();
        let above = canvas.create_shape(&obstacle(2, 25.0, 25.0, 50.0, 50.0)).unwrap();

        assert_eq!(canvas.hit_test(Point::new(30.0, 30.0)), Some(above));
        assert_eq!(canvas.hit_test(Point::new(10.0, 10.0)), Some(below));
    }

    #[test]
    fn native_drag_emits_moving_then_modified() {
        let mut canvas = SceneCanvas::new();
        canvas.init(200, 200).unwrap();
        let h = canvas.create_shape(&obstacle(1, 10.0, 10.0, 20.0, 20.0)).unwrap();

        let down = canvas.dispatch(&PointerInput::Down { x: 15.0, y: 15.0 });
        assert!(matches!(down[0], CanvasEvent::SelectionCreated { handle } if handle == h));

        let moved = canvas.dispatch(&PointerInput::Move { x: 35.0, y: 45.0 });
        assert!(
            matches!(moved[0], CanvasEvent::ObjectMoving { handle, pos }
                if handle == h && pos == Point::new(30.0, 40.0)),
            "grab offset must be preserved, got {moved:?}"
        );

        let up = canvas.dispatch(&PointerInput::Up { x: 35.0, y: 45.0 });
        assert!(matches!(up[0], CanvasEvent::ObjectModified { handle } if handle == h));
        assert_eq!(canvas.shape_frame(h), Some(Bounds::new(30.0, 40.0, 20.0, 20.0)));
    }
}
