//! Time-window snapshot coalescing.
//!
//! During a rapid burst of store mutations (a drag pushes one update per
//! pointer move) reconciliation is intentionally delayed: the first
//! snapshot of a burst opens a window, later snapshots replace the held
//! one, and only the most recent is delivered when the window closes. A
//! snapshot equal to the last delivered one is dropped entirely. This
//! bounds repaint frequency while never delivering stale data.
//!
//! Time is injected: callers pass `Instant`s, so tests run on virtual
//! time.

use ob_core::model::Obstacle;
use std::time::{Duration, Instant};

pub struct SnapshotCoalescer {
    window: Duration,
    pending: Option<Vec<Obstacle>>,
    /// Opens when the first snapshot of a burst arrives. Deliberately not
    /// extended by later snapshots, so a long drag still repaints every
    /// window instead of starving.
    deadline: Option<Instant>,
    last_delivered: Option<Vec<Obstacle>>,
}

impl SnapshotCoalescer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            deadline: None,
            last_delivered: None,
        }
    }

    /// Hand a fresh snapshot to the coalescer.
    pub fn offer(&mut self, snapshot: Vec<Obstacle>, now: Instant) {
        if self.pending.is_none() && self.last_delivered.as_deref() == Some(&snapshot[..]) {
            log::trace!("dropping unchanged snapshot");
            return;
        }
        if self.pending.is_none() {
            self.deadline = Some(now + self.window);
        }
        self.pending = Some(snapshot);
    }

    /// The held snapshot, once its window has closed.
    pub fn poll(&mut self, now: Instant) -> Option<Vec<Obstacle>> {
        if self.deadline.is_some_and(|d| d <= now) {
            self.deliver()
        } else {
            None
        }
    }

    /// Close the window immediately (end of a gesture).
    pub fn flush(&mut self) -> Option<Vec<Obstacle>> {
        self.deliver()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    fn deliver(&mut self) -> Option<Vec<Obstacle>> {
        self.deadline = None;
        let snapshot = self.pending.take()?;
        self.last_delivered = Some(snapshot.clone());
        Some(snapshot)
    }
}
