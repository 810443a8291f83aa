//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (listener, connections, sink failures)
//!     → metrics.rs (request counters, latency histogram)
//!
//! Consumers:
//!     → logging.rs installs the fmt subscriber in binaries
//!     → Metrics recorder chosen by the host (none by default)
//! ```
//!
//! # Design Decisions
//! - The request log seen by operators lives in `crate::logging`; this
//!   module covers diagnostics of the engine itself
//! - Metrics are cheap when no recorder is installed

pub mod logging;
pub mod metrics;

pub use self::logging::init_tracing;
