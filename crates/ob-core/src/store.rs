//! Canonical obstacle store.
//!
//! Single source of truth for obstacle records. Every mutation pushes a
//! fresh full-list snapshot into each subscriber's mailbox; a mailbox holds
//! at most one unread snapshot (the latest), so a subscriber that drains
//! slower than the store mutates never observes a stale list. Delivery is
//! synchronous with the mutating call; time-based coalescing is a
//! subscriber-side policy layered on top.

use crate::id::{IdAllocator, ObstacleId};
use crate::model::{Color, Obstacle, ObstaclePatch};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Handle to one subscription. Obtained from [`ObstacleStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(usize);

#[derive(Debug)]
struct Mailbox {
    /// Latest unread snapshot, overwritten on every mutation.
    pending: Option<Vec<Obstacle>>,
}

pub struct ObstacleStore {
    items: Vec<Obstacle>,
    ids: IdAllocator,
    rng: Pcg32,
    /// `None` slots are unsubscribed; indices stay stable.
    mailboxes: Vec<Option<Mailbox>>,
    /// Generated obstacle size range, inclusive.
    size_range: (f32, f32),
}

impl ObstacleStore {
    pub fn new() -> Self {
        Self::seeded(rand::rng().random())
    }

    /// Deterministic store for tests and reproducible sessions.
    pub fn seeded(seed: u64) -> Self {
        Self {
            items: Vec::new(),
            ids: IdAllocator::new(),
            rng: Pcg32::seed_from_u64(seed),
            mailboxes: Vec::new(),
            size_range: (20.0, 120.0),
        }
    }

    pub fn set_size_range(&mut self, min: f32, max: f32) {
        debug_assert!(min > 0.0 && min <= max);
        self.size_range = (min, max);
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn current(&self) -> &[Obstacle] {
        &self.items
    }

    pub fn get(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.items.iter().find(|o| o.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Fresh unique id for an obstacle about to be finalized.
    pub fn alloc_id(&mut self) -> ObstacleId {
        self.ids.next_id()
    }

    /// Uniformly sampled 24-bit color.
    pub fn random_color(&mut self) -> Color {
        Color::from_rgb24(self.rng.random_range(0..0x0100_0000))
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Admit a finalized obstacle. Zero- or negative-area records are the
    /// discarded-draft case and are dropped without error.
    pub fn add(&mut self, obstacle: Obstacle) {
        if obstacle.width <= 0.0 || obstacle.height <= 0.0 {
            log::debug!(
                "discarding zero-area obstacle {} ({}x{})",
                obstacle.id,
                obstacle.width,
                obstacle.height
            );
            return;
        }
        self.items.push(obstacle);
        self.notify();
    }

    /// Merge the present fields of `patch` into the obstacle with `id`.
    /// Unknown ids are a no-op, not an error.
    pub fn update(&mut self, id: ObstacleId, patch: &ObstaclePatch) {
        match self.items.iter_mut().find(|o| o.id == id) {
            Some(ob) => {
                patch.apply_to(ob);
                self.notify();
            }
            None => log::warn!("update for unknown obstacle {id}"),
        }
    }

    /// Remove the obstacle with `id`. Unknown ids are a no-op.
    pub fn remove(&mut self, id: ObstacleId) {
        let before = self.items.len();
        self.items.retain(|o| o.id != id);
        if self.items.len() == before {
            log::warn!("remove for unknown obstacle {id}");
            return;
        }
        self.notify();
    }

    /// Replace the list with `count` randomly generated obstacles.
    ///
    /// Width and height are uniform in the configured size range; positions
    /// are sampled so each rectangle lies fully inside
    /// `[0, bounds_w) x [0, bounds_h)`.
    pub fn generate_random(&mut self, count: usize, bounds_w: f32, bounds_h: f32) {
        let (min_size, max_size) = self.size_range;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let width = self.rng.random_range(min_size..=max_size).min(bounds_w);
            let height = self.rng.random_range(min_size..=max_size).min(bounds_h);
            let x = self.rng.random_range(0.0..=(bounds_w - width).max(0.0));
            let y = self.rng.random_range(0.0..=(bounds_h - height).max(0.0));
            let color = self.random_color();
            items.push(Obstacle::new(self.ids.next_id(), x, y, width, height, color));
        }
        log::debug!("generated {count} obstacles in {bounds_w}x{bounds_h}");
        self.items = items;
        self.notify();
    }

    // ─── Subscriptions ───────────────────────────────────────────────────

    /// Register a subscriber. The mailbox is primed with the current
    /// snapshot so a late subscriber starts from live state.
    pub fn subscribe(&mut self) -> Subscription {
        let mailbox = Mailbox {
            pending: Some(self.items.clone()),
        };
        // Reuse a free slot if one exists.
        if let Some(idx) = self.mailboxes.iter().position(Option::is_none) {
            self.mailboxes[idx] = Some(mailbox);
            Subscription(idx)
        } else {
            self.mailboxes.push(Some(mailbox));
            Subscription(self.mailboxes.len() - 1)
        }
    }

    pub fn unsubscribe(&mut self, sub: Subscription) {
        if let Some(slot) = self.mailboxes.get_mut(sub.0) {
            *slot = None;
        }
    }

    /// Drain the latest unread snapshot, if any.
    pub fn take(&mut self, sub: Subscription) -> Option<Vec<Obstacle>> {
        self.mailboxes
            .get_mut(sub.0)
            .and_then(Option::as_mut)
            .and_then(|m| m.pending.take())
    }

    fn notify(&mut self) {
        for mailbox in self.mailboxes.iter_mut().flatten() {
            mailbox.pending = Some(self.items.clone());
        }
    }
}

impl Default for ObstacleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Color;
    use pretty_assertions::assert_eq;

    fn obstacle(store: &mut ObstacleStore, x: f32, y: f32, w: f32, h: f32) -> Obstacle {
        let id = store.alloc_id();
        Obstacle::new(id, x, y, w, h, Color::rgb(0, 255, 255))
    }

    #[test]
    fn add_then_remove_restores_prior_list() {
        let mut store = ObstacleStore::seeded(1);
        store.generate_random(5, 640.0, 640.0);
        let before: Vec<_> = store.current().to_vec();

        let ob = obstacle(&mut store, 10.0, 10.0, 30.0, 30.0);
        let id = ob.id;
        store.add(ob);
        assert_eq!(store.len(), 6);

        store.remove(id);
        let mut after: Vec<_> = store.current().to_vec();
        let mut expected = before;
        after.sort_by_key(|o| o.id);
        expected.sort_by_key(|o| o.id);
        assert_eq!(after, expected);
    }

    #[test]
    fn zero_area_obstacles_are_discarded() {
        let mut store = ObstacleStore::seeded(2);
        let flat = obstacle(&mut store, 5.0, 5.0, 0.0, 40.0);
        store.add(flat);
        assert!(store.is_empty());
    }

    #[test]
    fn update_merges_partial_fields_and_ignores_unknown_ids() {
        let mut store = ObstacleStore::seeded(3);
        let ob = obstacle(&mut store, 10.0, 10.0, 50.0, 50.0);
        let id = ob.id;
        store.add(ob);

        store.update(id, &ObstaclePatch::position(30.0, 40.0));
        let updated = store.get(id).unwrap();
        assert_eq!(updated.x, 30.0);
        assert_eq!(updated.y, 40.0);
        assert_eq!(updated.width, 50.0);

        // Unknown id: no-op, store untouched
        let snapshot: Vec<_> = store.current().to_vec();
        store.update(ObstacleId::from_raw(9999), &ObstaclePatch::position(0.0, 0.0));
        assert_eq!(store.current(), &snapshot[..]);
    }

    #[test]
    fn generation_respects_bounds_and_id_uniqueness() {
        let mut store = ObstacleStore::seeded(4);
        store.generate_random(100, 800.0, 600.0);
        assert_eq!(store.len(), 100);

        let mut seen = std::collections::HashSet::new();
        for ob in store.current() {
            assert!(seen.insert(ob.id), "duplicate id {}", ob.id);
            assert!(ob.x >= 0.0 && ob.x + ob.width <= 800.0, "{ob:?} escapes x");
            assert!(ob.y >= 0.0 && ob.y + ob.height <= 600.0, "{ob:?} escapes y");
            assert!(ob.width >= 20.0 && ob.width <= 120.0);
            assert!(ob.height >= 20.0 && ob.height <= 120.0);
        }
    }

    #[test]
    fn generation_replaces_previous_list() {
        let mut store = ObstacleStore::seeded(5);
        store.generate_random(10, 640.0, 640.0);
        let first_ids: Vec<_> = store.current().iter().map(|o| o.id).collect();

        store.generate_random(10, 640.0, 640.0);
        assert_eq!(store.len(), 10);
        for ob in store.current() {
            assert!(!first_ids.contains(&ob.id), "ids must not be reused");
        }
    }

    #[test]
    fn subscriber_sees_only_latest_snapshot() {
        let mut store = ObstacleStore::seeded(6);
        let sub = store.subscribe();

        // Primed with the (empty) current state
        assert_eq!(store.take(sub), Some(vec![]));
        assert_eq!(store.take(sub), None, "mailbox drained");

        let a = obstacle(&mut store, 1.0, 1.0, 10.0, 10.0);
        let b = obstacle(&mut store, 2.0, 2.0, 10.0, 10.0);
        store.add(a);
        store.add(b.clone());

        // Two mutations, one unread snapshot: the latest
        let snapshot = store.take(sub).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1], b);
        assert_eq!(store.take(sub), None);
    }

    #[test]
    fn unsubscribe_stops_delivery_and_frees_the_slot() {
        let mut store = ObstacleStore::seeded(7);
        let sub = store.subscribe();
        store.unsubscribe(sub);

        let ob = obstacle(&mut store, 1.0, 1.0, 10.0, 10.0);
        store.add(ob);
        assert_eq!(store.take(sub), None);

        // Slot reuse keeps indices dense
        let again = store.subscribe();
        assert_eq!(again, sub);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let mut a = ObstacleStore::seeded(42);
        let mut b = ObstacleStore::seeded(42);
        a.generate_random(20, 500.0, 500.0);
        b.generate_random(20, 500.0, 500.0);
        assert_eq!(a.current(), b.current());
    }
}
