//! Error taxonomy.
//!
//! Only caller-sequencing bugs surface as hard errors: operating on an
//! adapter that was never initialized, initializing twice, or using a
//! disposed session. Lookup misses (unknown ids or handles) are warn-level
//! no-ops at the call site, and a failed background load leaves the engine
//! usable without a background.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("canvas adapter is not initialized")]
    Uninitialized,

    #[error("canvas adapter is already initialized")]
    AlreadyInitialized,

    #[error("canvas session has been disposed")]
    Disposed,

    #[error("invalid canvas dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("background image failed to load: {0}")]
    BackgroundLoad(String),
}
