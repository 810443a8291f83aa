//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits, hyper HTTP/1.1)
//!     → connection.rs (lifecycle tracking)
//!     → RequestContext queued for the dispatch loop
//! ```
//!
//! # Design Decisions
//! - Bounded accept and request queues prevent resource exhaustion
//! - The dispatch loop only sees `ContextSource`, so it can be driven
//!   in-process without sockets

pub mod connection;
pub mod listener;

pub use listener::{ContextSource, HttpListener, ListenerError, ListenerLimits};
