//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! WebServerBuilder (builder.rs)
//!     → build() → WebServer (server.rs, frozen route table)
//!     → ContextSource yields RequestContext (context.rs)
//!     → RequestId assigned (request.rs)
//!     → route lookup → handler → ResponseWriter (response.rs)
//!         → pooled buffers (buffer_pool.rs)
//!     → context closed, response completes
//! ```

pub mod buffer_pool;
pub mod builder;
pub mod context;
pub mod request;
pub mod response;
pub mod server;

pub use buffer_pool::{BufferPool, PooledBuffer};
pub use builder::{WebServerBuilder, DEFAULT_PORT};
pub use context::{PendingResponse, RequestContext, ResponseBody};
pub use request::{RequestId, RequestIdSequence};
pub use response::{ResponseWriter, DEFAULT_CHUNK_SIZE};
pub use server::{ServerHandle, WebServer};
