//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! State (state.rs):
//!     Created → Starting (bind) → Listening → Stopping → Stopped
//!
//! Shutdown (shutdown.rs):
//!     stop() or signal → flag set → loop observes it → listener closed
//!
//! Signals (signals.rs):
//!     SIGINT → Trigger cooperative shutdown
//! ```
//!
//! # Design Decisions
//! - Cancellation is cooperative: the loop checks the flag once per
//!   iteration and races it against the pending accept
//! - In-flight requests are never aborted

pub mod shutdown;
pub mod signals;
pub mod state;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::trigger_on_ctrl_c;
pub use state::{ServerState, StateCell};
