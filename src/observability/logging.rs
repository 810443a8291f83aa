//! Structured diagnostics for the hosting process.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber
//!
//! # Design Decisions
//! - `RUST_LOG` wins; the configured level is the fallback
//! - Library code only emits events; installing a subscriber is left to
//!   binaries

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a fmt subscriber filtered by `RUST_LOG`, or by `default_level`.
///
/// Returns an error if a global subscriber is already set.
pub fn init_tracing(default_level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
