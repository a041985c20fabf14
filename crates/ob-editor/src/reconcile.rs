//! Store-to-canvas reconciliation.
//!
//! The reconciler is the only component that mutates the id → handle map.
//! Each pass diffs a store snapshot against the shapes it already tracks
//! and applies the minimal create/update/destroy set to the adapter, so a
//! snapshot equal to the previous one results in zero adapter mutations.

use ob_canvas::adapter::{CanvasAdapter, ShapeHandle};
use ob_core::model::{Obstacle, ObstaclePatch};
use ob_core::{EngineError, ObstacleId};
use std::collections::{HashMap, HashSet};

pub struct Reconciler {
    handles: HashMap<ObstacleId, ShapeHandle>,
    /// Last reconciled record per id, for field-level change detection.
    cache: HashMap<ObstacleId, Obstacle>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
            cache: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn contains(&self, id: ObstacleId) -> bool {
        self.handles.contains_key(&id)
    }

    pub fn handle_of(&self, id: ObstacleId) -> Option<ShapeHandle> {
        self.handles.get(&id).copied()
    }

    pub fn id_of(&self, handle: ShapeHandle) -> Option<ObstacleId> {
        self.handles
            .iter()
            .find(|&(_, &h)| h == handle)
            .map(|(&id, _)| id)
    }

    /// Apply one snapshot to the adapter.
    pub fn reconcile(
        &mut self,
        snapshot: &[Obstacle],
        adapter: &mut dyn CanvasAdapter,
    ) -> Result<(), EngineError> {
        let mut stale: HashSet<ObstacleId> = self.handles.keys().copied().collect();

        for ob in snapshot {
            match self.handles.get(&ob.id) {
                Some(&handle) => {
                    stale.remove(&ob.id);
                    let patch = match self.cache.get(&ob.id) {
                        Some(prev) => ObstaclePatch::diff(prev, ob),
                        None => ObstaclePatch::all_of(ob),
                    };
                    if !patch.is_empty() {
                        adapter.update_shape(handle, &patch)?;
                        self.cache.insert(ob.id, ob.clone());
                    }
                }
                None => {
                    let handle = adapter.create_shape(ob)?;
                    self.handles.insert(ob.id, handle);
                    self.cache.insert(ob.id, ob.clone());
                }
            }
        }

        // Whatever is left was removed from the store.
        for id in stale {
            if let Some(handle) = self.handles.remove(&id) {
                adapter.destroy_shape(handle)?;
            }
            self.cache.remove(&id);
            log::trace!("reconcile destroyed shape for {id}");
        }

        adapter.flush();
        Ok(())
    }

    /// Take ownership of a finalized draft's handle so the next pass sees
    /// the new obstacle as already known instead of creating a duplicate
    /// shape for it.
    pub fn adopt(&mut self, id: ObstacleId, handle: ShapeHandle, obstacle: &Obstacle) {
        debug_assert!(!self.handles.contains_key(&id), "adopting a known id");
        self.handles.insert(id, handle);
        self.cache.insert(id, obstacle.clone());
    }

    /// Destroy every tracked shape. Teardown step between releasing the
    /// adapter's subscriptions and disposing the adapter itself.
    pub fn clear(&mut self, adapter: &mut dyn CanvasAdapter) -> Result<(), EngineError> {
        for (_, handle) in self.handles.drain() {
            adapter.destroy_shape(handle)?;
        }
        self.cache.clear();
        Ok(())
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ob_canvas::BitmapCanvas;
    use ob_core::model::{Color, Point};
    use pretty_assertions::assert_eq;

    fn obstacle(id: u64, x: f32) -> Obstacle {
        Obstacle::new(
            ObstacleId::from_raw(id),
            x,
            10.0,
            30.0,
            30.0,
            Color::rgb(10, 20, 30),
        )
    }

    #[test]
    fn handle_map_matches_snapshot_after_pass() {
        let mut adapter = BitmapCanvas::new();
        adapter.init(640, 640).unwrap();
        let mut rec = Reconciler::new();

        rec.reconcile(&[obstacle(1, 10.0), obstacle(2, 100.0)], &mut adapter)
            .unwrap();
        assert_eq!(rec.len(), 2);
        assert!(rec.contains(ObstacleId::from_raw(1)));

        let h1 = rec.handle_of(ObstacleId::from_raw(1)).unwrap();
        assert_eq!(rec.id_of(h1), Some(ObstacleId::from_raw(1)));
        assert_eq!(adapter.hit_test(Point::new(15.0, 15.0)), Some(h1));

        // Drop 2, keep 1
        rec.reconcile(&[obstacle(1, 10.0)], &mut adapter).unwrap();
        assert_eq!(rec.len(), 1);
        assert!(!rec.contains(ObstacleId::from_raw(2)));
        assert_eq!(adapter.hit_test(Point::new(105.0, 15.0)), None);
    }

    #[test]
    fn clear_destroys_everything() {
        let mut adapter = BitmapCanvas::new();
        adapter.init(640, 640).unwrap();
        let mut rec = Reconciler::new();
        rec.reconcile(&[obstacle(1, 10.0), obstacle(2, 100.0)], &mut adapter)
            .unwrap();

        rec.clear(&mut adapter).unwrap();
        assert!(rec.is_empty());
        assert_eq!(adapter.hit_test(Point::new(15.0, 15.0)), None);
    }
}
