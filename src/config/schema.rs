//! Configuration schema definitions.
//!
//! Every field has a default so a minimal (or empty) TOML file is valid.

use serde::{Deserialize, Serialize};

/// Root configuration for a Pecan server.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bound addresses and connection limits.
    pub listener: ListenerConfig,

    /// Request log sinks.
    pub logging: LoggingConfig,

    /// Response writer and buffer pool.
    pub response: ResponseConfig,

    /// Diagnostics for the hosting process.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Addresses to bind, as `ip` or `ip:port`.
    pub bind_addresses: Vec<String>,

    /// Port used when an address does not name one.
    pub default_port: u16,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Parsed requests waiting for the dispatch loop.
    pub request_queue_depth: usize,

    /// How the dispatch loop runs handlers.
    pub dispatch: DispatchMode,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addresses: Vec::new(),
            default_port: 80,
            max_connections: 1024,
            request_queue_depth: 64,
            dispatch: DispatchMode::Serial,
        }
    }
}

/// Dispatch strategy.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// One request at a time; the loop awaits each handler.
    #[default]
    Serial,
    /// Each request runs on its own task.
    Concurrent,
}

/// Request log configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write request log lines to stdout.
    pub console: bool,

    /// Forward request log lines to `tracing`.
    pub tracing: bool,

    /// Keep recent lines in memory and serve them on a route.
    pub in_memory: Option<InMemoryLogConfig>,
}

/// In-memory request log.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct InMemoryLogConfig {
    /// Lines retained.
    pub capacity: usize,

    /// Route serving the log page.
    pub route: String,
}

impl Default for InMemoryLogConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            route: "/log".to_string(),
        }
    }
}

/// Response writer configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ResponseConfig {
    /// Bytes per body write.
    pub chunk_size: usize,

    /// Buffers retained by the pool.
    pub max_pooled_buffers: usize,

    /// Largest buffer capacity the pool keeps.
    pub max_retained_capacity: usize,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            max_pooled_buffers: 16,
            max_retained_capacity: 64 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
