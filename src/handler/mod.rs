//! Request handlers.
//!
//! # Data Flow
//! ```text
//! user closure / controller method
//!     → HandlerShape (action | func | task | async_func)
//!     → adapt() → Handler (uniform async invocation)
//!     → Reply (Empty | Text | Opaque) written by the dispatch loop
//! ```

pub mod adapter;
pub mod controller;
pub mod reply;

pub use adapter::{adapt, BoxFuture, Handler, HandlerShape, ShapeKind};
pub use controller::{Controller, ControllerMethod, ControllerRoutes};
pub use reply::{Completion, HandlerResult, IntoReply, OpaqueValue, Reply};
