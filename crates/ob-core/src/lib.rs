pub mod config;
pub mod error;
pub mod id;
pub mod model;
pub mod store;
pub mod viewport;

pub use config::EngineConfig;
pub use error::EngineError;
pub use id::ObstacleId;
pub use model::*;
pub use store::{ObstacleStore, Subscription};
pub use viewport::{ViewportTransform, ZoomDirection};
