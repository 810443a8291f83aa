//! Pecan: a minimal embeddable HTTP routing and dispatch engine.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ net::HttpListener ──▶ RequestContext queue
//!                                                │
//!                                                ▼
//!                                     http::WebServer dispatch loop
//!                                     ├─ routing::RouteTable lookup
//!                                     ├─ handler::Handler invoke
//!                                     └─ http::ResponseWriter (pooled buffers)
//!                                                │
//!     Client Response ◀──────────────────────────┘
//!
//!     Cross-cutting: config, logging (request log sinks),
//!                    observability (tracing, metrics), lifecycle
//! ```
//!
//! ```no_run
//! use pecan::{RequestContext, WebServerBuilder};
//!
//! # async fn demo() -> Result<(), pecan::ConfigurationError> {
//! WebServerBuilder::new()
//!     .listen("127.0.0.1:8080", 80)
//!     .with_console_logger()
//!     .map_get_func("/hi", |_ctx: &mut RequestContext| "Hello, Pecan!")
//!     .run()
//!     .await
//! # }
//! ```

// Core subsystems
pub mod error;
pub mod handler;
pub mod http;
pub mod routing;

// Hosting
pub mod config;
pub mod lifecycle;
pub mod net;
pub mod static_files;

// Cross-cutting concerns
pub mod logging;
pub mod observability;

pub use self::config::{load_config, DispatchMode, ServerConfig};
pub use self::error::{BoxError, ConfigurationError, RequestError};
pub use self::handler::{BoxFuture, Controller, ControllerRoutes, HandlerShape, IntoReply, Reply};
pub use self::http::{RequestContext, ResponseWriter, ServerHandle, WebServer, WebServerBuilder};
pub use self::lifecycle::{ServerState, Shutdown};
pub use self::logging::{LogSink, Logger};
