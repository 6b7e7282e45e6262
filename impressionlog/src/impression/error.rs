//! Engine error types.

use thiserror::Error;

/// Errors from the engine's control surface.
///
/// Geometry evaluation, disposal and cache clearing never fail; only
/// starting the background poll loop can.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `start()` was called outside a Tokio runtime.
    #[error("No Tokio runtime available for the poll loop: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
