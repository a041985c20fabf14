//! The editor engine: pointer-driven interaction state machine.
//!
//! The engine is the only component that mutates the store in response to
//! raw input, and the reconciler it owns is the only component that
//! mutates the canvas handle map in response to store changes. Input flows
//! `PointerInput → adapter (normalize) → CanvasEvent → state machine →
//! store → coalescer → reconciler → adapter`, one way, which is what keeps
//! "user moved a shape" and "store update redraws the shape" from feeding
//! back into each other.
//!
//! Everything the engine depends on is passed into [`EditorEngine::new`]:
//! the store, a boxed adapter (either backend), the config, the canvas
//! container's page rectangle, and the delete-confirmation capability.

use crate::coalesce::SnapshotCoalescer;
use crate::reconcile::Reconciler;
use crate::session::{ConfirmDelete, EditFormSession, InteractionState, Session};
use ob_canvas::adapter::{CanvasAdapter, CanvasEvent, PointerInput, ShapeHandle};
use ob_canvas::background::BackgroundSource;
use ob_canvas::overlay::{OverlayPlacement, PageRect, delete_icon_placement};
use ob_core::model::{Obstacle, ObstaclePatch};
use ob_core::store::Subscription;
use ob_core::{EngineConfig, EngineError, ObstacleId, ObstacleStore, ViewportTransform, ZoomDirection};
use std::time::Instant;

pub struct EditorEngine {
    store: ObstacleStore,
    adapter: Box<dyn CanvasAdapter>,
    config: EngineConfig,
    viewport: ViewportTransform,
    reconciler: Reconciler,
    coalescer: SnapshotCoalescer,
    subscription: Subscription,
    session: Session,
    container: PageRect,
    confirm: Box<dyn ConfirmDelete>,
    grid: bool,
    disposed: bool,
}

impl EditorEngine {
    pub fn new(
        mut store: ObstacleStore,
        mut adapter: Box<dyn CanvasAdapter>,
        config: EngineConfig,
        container: PageRect,
        confirm: Box<dyn ConfirmDelete>,
    ) -> Result<Self, EngineError> {
        adapter.init(config.canvas_width, config.canvas_height)?;

        let viewport = ViewportTransform::new(config.min_zoom, config.max_zoom);
        adapter.set_viewport(&viewport);
        store.set_size_range(config.min_obstacle_size, config.max_obstacle_size);

        let subscription = store.subscribe();
        let coalescer = SnapshotCoalescer::new(config.coalesce_window());

        Ok(Self {
            store,
            adapter,
            config,
            viewport,
            reconciler: Reconciler::new(),
            coalescer,
            subscription,
            session: Session::new(),
            container,
            confirm,
            grid: false,
            disposed: false,
        })
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn state(&self) -> InteractionState {
        self.session.state
    }

    pub fn overlay(&self) -> Option<OverlayPlacement> {
        self.session.overlay
    }

    pub fn edit_form(&self) -> Option<&EditFormSession> {
        self.session.edit_form.as_ref()
    }

    pub fn store(&self) -> &ObstacleStore {
        &self.store
    }

    pub fn viewport(&self) -> &ViewportTransform {
        &self.viewport
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn adapter(&self) -> &dyn CanvasAdapter {
        self.adapter.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn grid_visible(&self) -> bool {
        self.grid
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Load the background (if any) and populate the canvas.
    ///
    /// Generation is sequenced after the background load settles. A failed
    /// load is logged and the session continues with no background.
    pub fn start(
        &mut self,
        background: Option<&BackgroundSource>,
        now: Instant,
    ) -> Result<(), EngineError> {
        self.ensure_live()?;
        if let Some(source) = background {
            match self.adapter.load_background(source) {
                Ok(()) => log::debug!("background image ready"),
                Err(e) => log::error!("background image failed to load: {e}"),
            }
        }
        self.store.generate_random(
            self.config.obstacle_count,
            self.config.canvas_width as f32,
            self.config.canvas_height as f32,
        );
        self.pump_now(now)
    }

    /// Tear down in dependency order: adapter subscriptions first, then
    /// every tracked shape, then the adapter itself. Idempotent.
    pub fn dispose(&mut self) -> Result<(), EngineError> {
        if self.disposed {
            return Ok(());
        }
        self.adapter.release_subscriptions();
        self.reconciler.clear(self.adapter.as_mut())?;
        self.adapter.dispose();
        self.store.unsubscribe(self.subscription);
        self.session.reset();
        self.disposed = true;
        Ok(())
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Feed one raw pointer input through the adapter and the state
    /// machine, then service the reconciliation pipeline.
    pub fn handle_input(&mut self, input: &PointerInput, now: Instant) -> Result<(), EngineError> {
        self.ensure_live()?;
        let events = self.adapter.dispatch(input);
        for event in events {
            self.on_event(event, now)?;
        }
        self.pump(now)
    }

    /// Idle-time service: delivers coalesced snapshots whose window has
    /// closed. The host loop calls this between input events.
    pub fn tick(&mut self, now: Instant) -> Result<(), EngineError> {
        self.ensure_live()?;
        self.pump(now)
    }

    /// Run the pipeline immediately, ignoring the coalescing window. For
    /// hosts that need the canvas current right now (initial paint,
    /// export).
    pub fn sync_now(&mut self, now: Instant) -> Result<(), EngineError> {
        self.ensure_live()?;
        self.pump_now(now)
    }

    fn on_event(&mut self, event: CanvasEvent, now: Instant) -> Result<(), EngineError> {
        match event {
            CanvasEvent::SelectionCreated { handle } => match self.reconciler.id_of(handle) {
                Some(id) => {
                    self.session.state = InteractionState::Selected { id };
                    self.update_overlay(handle);
                }
                None => log::warn!("selection for untracked shape {handle:?}"),
            },

            CanvasEvent::SelectionCleared => {
                self.session.state = InteractionState::Idle;
                self.session.overlay = None;
            }

            CanvasEvent::PointerDown { pos, target } => {
                if target.is_none()
                    && !matches!(self.session.state, InteractionState::Drawing { .. })
                {
                    // Empty canvas: begin a draw gesture. Selection mode is
                    // suspended so moves cannot re-target existing shapes.
                    let color = if self.config.randomize_draw_color {
                        self.store.random_color()
                    } else {
                        self.config.draw_color
                    };
                    self.session.state = InteractionState::Drawing {
                        anchor: pos,
                        draft: None,
                        color,
                    };
                    self.adapter.set_selection_enabled(false);
                }
                // Down on a shape: selection was already raised; the drag,
                // if the shape is draggable, announces itself via
                // ObjectMoving.
            }

            CanvasEvent::PointerMove { pos } => {
                if let InteractionState::Drawing {
                    anchor,
                    draft,
                    color,
                } = self.session.state
                {
                    if draft.is_none() && pos.distance(anchor) > self.config.drag_threshold {
                        // Past the click threshold: materialize the draft.
                        // It stays out of the store until finalization.
                        let proto = Obstacle::new(
                            ObstacleId::from_raw(0),
                            anchor.x,
                            anchor.y,
                            0.0,
                            0.0,
                            color,
                        );
                        let handle = self.adapter.create_shape(&proto)?;
                        self.adapter.set_draggable(handle, false)?;
                        self.session.state = InteractionState::Drawing {
                            anchor,
                            draft: Some(handle),
                            color,
                        };
                    }
                    if let InteractionState::Drawing {
                        draft: Some(handle),
                        ..
                    } = self.session.state
                    {
                        let patch = ObstaclePatch {
                            width: Some((pos.x - anchor.x).abs()),
                            height: Some((pos.y - anchor.y).abs()),
                            ..Default::default()
                        };
                        self.adapter.update_shape(handle, &patch)?;
                        self.adapter.flush();
                    }
                }
            }

            CanvasEvent::PointerUp { pos } => match self.session.state {
                InteractionState::Drawing {
                    anchor,
                    draft,
                    color,
                } => {
                    self.adapter.set_selection_enabled(true);
                    match draft {
                        Some(handle) => {
                            let width = (pos.x - anchor.x).abs();
                            let height = (pos.y - anchor.y).abs();
                            if width > 0.0 && height > 0.0 {
                                let id = self.store.alloc_id();
                                let obstacle =
                                    Obstacle::new(id, anchor.x, anchor.y, width, height, color);
                                self.finalize_draft(handle, obstacle, now)?;
                            } else {
                                // Degenerate draft: discard, no store entry
                                self.adapter.destroy_shape(handle)?;
                                self.adapter.flush();
                                self.session.state = InteractionState::Idle;
                            }
                        }
                        // Sub-threshold movement is a click, not a draw
                        None => self.session.state = InteractionState::Idle,
                    }
                }
                InteractionState::Dragging { id, handle } => {
                    // Backends emit ObjectModified before the pointer-up,
                    // but a drag can also end without one (no net motion).
                    self.finalize_drag(id, handle, now)?;
                }
                _ => {}
            },

            CanvasEvent::ObjectMoving { handle, pos } => {
                if !matches!(
                    self.session.state,
                    InteractionState::Dragging { handle: h, .. } if h == handle
                ) {
                    let Some(id) = self.reconciler.id_of(handle) else {
                        log::warn!("move event for untracked shape {handle:?}");
                        return Ok(());
                    };
                    self.session.state = InteractionState::Dragging { id, handle };
                    self.session.overlay = None;
                }
                if let InteractionState::Dragging { id, .. } = self.session.state {
                    // Position only; size is untouched while dragging
                    self.store.update(id, &ObstaclePatch::position(pos.x, pos.y));
                }
            }

            CanvasEvent::ObjectModified { handle } => {
                if let Some(id) = self.reconciler.id_of(handle) {
                    self.finalize_drag(id, handle, now)?;
                }
            }

            CanvasEvent::DoubleClick { target, .. } => {
                if let Some(handle) = target
                    && let Some(id) = self.reconciler.id_of(handle)
                {
                    self.session.state = InteractionState::Selected { id };
                    self.open_edit_form(id);
                }
            }

            CanvasEvent::Wheel { pivot, delta_y } => {
                // The overlay's screen position depends on the transform
                self.session.overlay = None;
                self.viewport
                    .wheel_zoom(delta_y, pivot, self.config.wheel_base);
                self.adapter.set_viewport(&self.viewport);
                self.adapter.flush();
            }
        }
        Ok(())
    }

    fn finalize_draft(
        &mut self,
        handle: ShapeHandle,
        obstacle: Obstacle,
        now: Instant,
    ) -> Result<(), EngineError> {
        let id = obstacle.id;
        self.adapter
            .update_shape(handle, &ObstaclePatch::all_of(&obstacle))?;
        self.adapter.set_draggable(handle, true)?;
        // Adopt before the store add so the next reconcile pass treats the
        // draft as the new obstacle's shape instead of creating a twin.
        self.reconciler.adopt(id, handle, &obstacle);
        self.store.add(obstacle);

        let events = self.adapter.set_selection(Some(handle));
        for event in events {
            self.on_event(event, now)?;
        }
        log::debug!("draw finalized as {id}");
        self.pump_now(now)
    }

    fn finalize_drag(
        &mut self,
        id: ObstacleId,
        handle: ShapeHandle,
        now: Instant,
    ) -> Result<(), EngineError> {
        // Re-query the backend's settled frame and write the whole of it,
        // the setCoords-equivalent snap.
        if let Some(frame) = self.adapter.shape_frame(handle) {
            self.store.update(id, &ObstaclePatch::frame(frame));
        }
        self.session.state = InteractionState::Selected { id };
        self.update_overlay(handle);
        self.pump_now(now)
    }

    fn update_overlay(&mut self, handle: ShapeHandle) {
        self.session.overlay = self.adapter.bounding_box(handle).map(|bbox| {
            delete_icon_placement(bbox, &self.container, self.config.overlay_offset)
        });
    }

    // ─── Reconciliation pipeline ─────────────────────────────────────────

    fn pump(&mut self, now: Instant) -> Result<(), EngineError> {
        if let Some(snapshot) = self.store.take(self.subscription) {
            self.coalescer.offer(snapshot, now);
        }
        if let Some(snapshot) = self.coalescer.poll(now) {
            self.reconciler.reconcile(&snapshot, self.adapter.as_mut())?;
        }
        Ok(())
    }

    /// End-of-gesture variant: closes the coalescing window immediately.
    fn pump_now(&mut self, now: Instant) -> Result<(), EngineError> {
        if let Some(snapshot) = self.store.take(self.subscription) {
            self.coalescer.offer(snapshot, now);
        }
        if let Some(snapshot) = self.coalescer.flush() {
            self.reconciler.reconcile(&snapshot, self.adapter.as_mut())?;
        }
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), EngineError> {
        if self.disposed {
            Err(EngineError::Disposed)
        } else {
            Ok(())
        }
    }

    // ─── Viewport controls ───────────────────────────────────────────────
    // Orthogonal to the interaction state machine: permitted from any
    // state, and the overlay is dismissed first since its screen position
    // depends on the transform.

    pub fn zoom_in(&mut self) {
        self.session.overlay = None;
        self.viewport.zoom_step(ZoomDirection::In, self.config.zoom_step);
        self.adapter.set_viewport(&self.viewport);
        self.adapter.flush();
    }

    pub fn zoom_out(&mut self) {
        self.session.overlay = None;
        self.viewport.zoom_step(ZoomDirection::Out, self.config.zoom_step);
        self.adapter.set_viewport(&self.viewport);
        self.adapter.flush();
    }

    pub fn reset_zoom(&mut self) {
        self.session.overlay = None;
        self.viewport.reset();
        self.adapter.set_viewport(&self.viewport);
        self.adapter.flush();
    }

    pub fn pan_view(&mut self, dx: f32, dy: f32) {
        self.session.overlay = None;
        self.viewport.pan(dx, dy);
        self.adapter.set_viewport(&self.viewport);
        self.adapter.flush();
    }

    pub fn move_up(&mut self) {
        self.pan_view(0.0, -self.config.pan_step);
    }

    pub fn move_down(&mut self) {
        self.pan_view(0.0, self.config.pan_step);
    }

    pub fn move_left(&mut self) {
        self.pan_view(-self.config.pan_step, 0.0);
    }

    pub fn move_right(&mut self) {
        self.pan_view(self.config.pan_step, 0.0);
    }

    pub fn toggle_grid(&mut self) {
        self.session.overlay = None;
        self.grid = !self.grid;
        self.adapter.set_grid_visible(self.grid);
        self.adapter.flush();
    }

    // ─── Programmatic selection and deletion ─────────────────────────────

    /// Select by id (the sidebar-click path). Unknown ids warn and no-op.
    pub fn select_obstacle(&mut self, id: ObstacleId, now: Instant) -> Result<(), EngineError> {
        self.ensure_live()?;
        match self.reconciler.handle_of(id) {
            Some(handle) => {
                let events = self.adapter.set_selection(Some(handle));
                for event in events {
                    self.on_event(event, now)?;
                }
                // Re-selecting the already-active shape still refreshes
                // the overlay.
                if self.session.state == (InteractionState::Selected { id }) {
                    self.update_overlay(handle);
                }
                Ok(())
            }
            None => {
                log::warn!("no obstacle found for {id}");
                Ok(())
            }
        }
    }

    /// Delete by explicit id, or the current selection when `id` is
    /// `None`. The injected confirmation capability is consulted first;
    /// a declined confirmation leaves everything untouched.
    pub fn delete_obstacle(
        &mut self,
        id: Option<ObstacleId>,
        now: Instant,
    ) -> Result<bool, EngineError> {
        self.ensure_live()?;
        let target = id.or_else(|| self.session.state.active_id());
        let Some(target) = target else {
            log::warn!("delete requested with no target obstacle");
            return Ok(false);
        };
        if self.store.get(target).is_none() {
            log::warn!("delete for unknown obstacle {target}");
            return Ok(false);
        }
        if !self.confirm.confirm(target) {
            log::debug!("delete of {target} declined");
            return Ok(false);
        }

        self.store.remove(target);
        if self
            .session
            .edit_form
            .as_ref()
            .is_some_and(|f| f.obstacle_id == target)
        {
            self.session.edit_form = None;
        }
        let events = self.adapter.set_selection(None);
        for event in events {
            self.on_event(event, now)?;
        }
        self.session.state = InteractionState::Idle;
        self.session.overlay = None;
        // The reconciler destroys the shape on this forced pass
        self.pump_now(now)?;
        Ok(true)
    }

    // ─── Edit-form boundary ──────────────────────────────────────────────

    /// Open the form for `id`, snapshotting current values for cancel.
    pub fn open_edit_form(&mut self, id: ObstacleId) {
        match self.store.get(id) {
            Some(ob) => {
                self.session.edit_form = Some(EditFormSession {
                    obstacle_id: id,
                    original_values: ob.clone(),
                });
            }
            None => log::warn!("edit form for unknown obstacle {id}"),
        }
    }

    /// Apply one field-level change from the form. The form validates;
    /// the engine only applies.
    pub fn apply_form_change(
        &mut self,
        patch: &ObstaclePatch,
        now: Instant,
    ) -> Result<(), EngineError> {
        self.ensure_live()?;
        let Some(form) = &self.session.edit_form else {
            log::warn!("form change with no open edit form");
            return Ok(());
        };
        self.store.update(form.obstacle_id, patch);
        self.pump_now(now)
    }

    /// Compensating write: restore the snapshot taken at open. The form
    /// stays open with its fields reset.
    pub fn cancel_edit_form(&mut self, now: Instant) -> Result<(), EngineError> {
        self.ensure_live()?;
        if let Some(form) = &self.session.edit_form {
            let revert = ObstaclePatch::all_of(&form.original_values);
            let id = form.obstacle_id;
            self.store.update(id, &revert);
            self.pump_now(now)?;
        }
        Ok(())
    }

    /// Accept the edits: clear the session without reverting.
    pub fn submit_edit_form(&mut self, now: Instant) -> Result<(), EngineError> {
        self.close_edit_form(now)
    }

    /// Close acts as a deselect: the active id is cleared and the overlay
    /// hidden, with no revert.
    pub fn close_edit_form(&mut self, now: Instant) -> Result<(), EngineError> {
        self.ensure_live()?;
        self.session.edit_form = None;
        let events = self.adapter.set_selection(None);
        for event in events {
            self.on_event(event, now)?;
        }
        self.session.state = InteractionState::Idle;
        self.session.overlay = None;
        Ok(())
    }
}
