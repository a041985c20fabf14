pub mod coalesce;
pub mod engine;
pub mod reconcile;
pub mod session;

pub use coalesce::SnapshotCoalescer;
pub use engine::EditorEngine;
pub use reconcile::Reconciler;
pub use session::{ConfirmDelete, EditFormSession, InteractionState, Session};
