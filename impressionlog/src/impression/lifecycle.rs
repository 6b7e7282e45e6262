//! Binding the poll loop to an external start/stop signal.
//!
//! The embedding scope (a screen, an app in the foreground) owns a
//! `watch::Sender<Lifecycle>`; the engine follows it, polling only while the
//! scope is started. Stopping keeps all state, so resuming never implies a
//! reset.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::engine::ImpressionEngine;
use super::error::EngineError;
use super::item::ImpressionKey;

/// Activation state of the scope that owns an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// Scope is active; the poll loop should run.
    Started,
    /// Scope is inactive; the poll loop should be stopped.
    #[default]
    Stopped,
}

impl<K: ImpressionKey> ImpressionEngine<K> {
    /// Follow `lifecycle` until its sender is dropped.
    ///
    /// Starts the poll loop on [`Lifecycle::Started`], stops it (waiting for
    /// it to exit) on [`Lifecycle::Stopped`], and stops it once more when the
    /// channel closes. Intended to be spawned as its own task.
    pub async fn bind_lifecycle(
        self: Arc<Self>,
        mut lifecycle: watch::Receiver<Lifecycle>,
    ) -> Result<(), EngineError> {
        loop {
            let state = *lifecycle.borrow_and_update();
            debug!(state = ?state, "Lifecycle changed");
            match state {
                Lifecycle::Started => {
                    self.start()?;
                }
                Lifecycle::Stopped => {
                    self.stop().await;
                }
            }

            if lifecycle.changed().await.is_err() {
                break;
            }
        }

        debug!("Lifecycle channel closed");
        self.stop().await;
        Ok(())
    }
}
