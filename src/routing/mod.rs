//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (builder, startup):
//!     (path, method, handler)
//!     → matcher.rs (normalize to RouteKey)
//!     → router.rs (insert, reject duplicates)
//!     → Freeze as Arc<RouteTable>
//!
//! Incoming request (dispatch loop):
//!     (path, method)
//!     → matcher.rs (same normalization)
//!     → router.rs (lookup)
//!     → Return: Route or NotFound
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - Exact matching only, case-insensitive on path and method
//! - Explicit NotFound rather than a silent default

pub mod matcher;
pub mod router;

pub use matcher::RouteKey;
pub use router::{Route, RouteTable};
