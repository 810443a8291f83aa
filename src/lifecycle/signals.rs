//! OS signal handling.
//!
//! # Responsibilities
//! - Translate Ctrl+C (SIGINT) into a shutdown trigger
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Failing to install the handler is logged, not fatal: the server can
//!   still be stopped through its handle

use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

/// Trigger `shutdown` when the process receives Ctrl+C.
pub fn trigger_on_ctrl_c(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                shutdown.trigger();
            }
            Err(e) => tracing::warn!(error = %e, "Failed to install Ctrl+C handler"),
        }
    })
}
