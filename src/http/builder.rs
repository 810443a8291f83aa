//! Fluent server configuration.
//!
//! # Responsibilities
//! - Accumulate routes, log sinks and listener settings
//! - Produce an immutable [`WebServer`]
//!
//! # Design Decisions
//! - Registration methods never panic; the first configuration error is
//!   kept and returned by [`WebServerBuilder::build`], later errors are
//!   traced
//! - Response settings are fixed when the builder is created, because
//!   built-in handlers (log page, static content) capture the response
//!   writer when they are mapped

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use http::Method;

use crate::config::{parse_bind_address, DispatchMode, ResponseConfig, ServerConfig};
use crate::error::ConfigurationError;
use crate::handler::adapter::BoxFuture;
use crate::handler::{Completion, Handler, HandlerShape, IntoReply};
use crate::http::buffer_pool::BufferPool;
use crate::http::response::ResponseWriter;
use crate::http::server::{ServerHandle, ServerParts, WebServer};
use crate::http::RequestContext;
use crate::logging::{ConsoleSink, LogSink, Logger, TracingSink};
use crate::net::ListenerLimits;
use crate::routing::RouteTable;

/// Port used when an address is given without one.
pub const DEFAULT_PORT: u16 = 80;

/// Builder for [`WebServer`].
pub struct WebServerBuilder {
    routes: RouteTable,
    sinks: Vec<Arc<dyn LogSink>>,
    bind_addresses: Vec<SocketAddr>,
    limits: ListenerLimits,
    dispatch: DispatchMode,
    writer: ResponseWriter,
    error: Option<ConfigurationError>,
}

impl WebServerBuilder {
    pub fn new() -> Self {
        Self::with_response_settings(&ResponseConfig::default())
    }

    /// Builder whose response writer uses the given chunk size and pool
    /// bounds.
    pub fn with_response_settings(response: &ResponseConfig) -> Self {
        let pool = BufferPool::new(response.max_pooled_buffers, response.max_retained_capacity);
        Self {
            routes: RouteTable::new(),
            sinks: Vec::new(),
            bind_addresses: Vec::new(),
            limits: ListenerLimits::default(),
            dispatch: DispatchMode::default(),
            writer: ResponseWriter::new(pool, response.chunk_size),
            error: None,
        }
    }

    /// Builder preconfigured from a loaded configuration: bind addresses,
    /// listener limits, dispatch mode, response settings and log sinks.
    pub fn from_config(config: &ServerConfig) -> Self {
        let listener = &config.listener;
        let mut builder = Self::with_response_settings(&config.response)
            .max_connections(listener.max_connections)
            .request_queue_depth(listener.request_queue_depth)
            .dispatch_mode(listener.dispatch);

        for address in &listener.bind_addresses {
            builder = builder.listen(address, listener.default_port);
        }

        let logging = &config.logging;
        if logging.console {
            builder = builder.with_console_logger();
        }
        if logging.tracing {
            builder = builder.with_tracing_logger();
        }
        if let Some(in_memory) = &logging.in_memory {
            builder = builder.with_in_memory_logger(in_memory.capacity, &in_memory.route);
        }
        builder
    }

    /// Map a handler for an arbitrary method.
    pub fn map(mut self, path: &str, method: Method, handler: HandlerShape) -> Self {
        self.register(path, &method, handler.into());
        self
    }

    /// Map a GET handler.
    pub fn map_get(self, path: &str, handler: HandlerShape) -> Self {
        self.map(path, Method::GET, handler)
    }

    /// GET handler, synchronous, no result.
    pub fn map_get_action<F, C>(self, path: &str, f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> C + Send + Sync + 'static,
        C: Completion,
    {
        self.map_get(path, HandlerShape::action(f))
    }

    /// GET handler, synchronous, producing a value.
    pub fn map_get_func<F, R>(self, path: &str, f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        self.map_get(path, HandlerShape::func(f))
    }

    /// GET handler, asynchronous, no result.
    pub fn map_get_task<F, C>(self, path: &str, f: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, C> + Send + Sync + 'static,
        C: Completion + 'static,
    {
        self.map_get(path, HandlerShape::task(f))
    }

    /// GET handler, asynchronous, producing a value.
    pub fn map_get_async_func<F, R>(self, path: &str, f: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, R> + Send + Sync + 'static,
        R: IntoReply + 'static,
    {
        self.map_get(path, HandlerShape::async_func(f))
    }

    /// Listen on `ip`, on `port` or the default port 80.
    pub fn listen_on(self, ip: IpAddr, port: Option<u16>) -> Self {
        self.listen_addr(SocketAddr::new(ip, port.unwrap_or(DEFAULT_PORT)))
    }

    pub fn listen_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addresses.push(addr);
        self
    }

    /// Listen on an address given as `ip` or `ip:port`.
    pub fn listen(mut self, address: &str, default_port: u16) -> Self {
        match parse_bind_address(address, default_port) {
            Ok(addr) => self.bind_addresses.push(addr),
            Err(reason) => self.record_error(ConfigurationError::InvalidBindAddress {
                address: address.to_owned(),
                reason,
            }),
        }
        self
    }

    pub fn max_connections(mut self, max: usize) -> Self {
        if max == 0 {
            self.record_error(ConfigurationError::InvalidSetting {
                setting: "listener.max_connections",
                reason: "must be greater than 0".into(),
            });
        } else {
            self.limits.max_connections = max;
        }
        self
    }

    pub fn request_queue_depth(mut self, depth: usize) -> Self {
        if depth == 0 {
            self.record_error(ConfigurationError::InvalidSetting {
                setting: "listener.request_queue_depth",
                reason: "must be greater than 0".into(),
            });
        } else {
            self.limits.queue_depth = depth;
        }
        self
    }

    pub fn dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch = mode;
        self
    }

    /// Attach a log sink. Sinks receive lines in attachment order.
    pub fn with_logger(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Log request lines to stdout.
    pub fn with_console_logger(self) -> Self {
        self.with_logger(Arc::new(ConsoleSink::stdout()))
    }

    /// Forward request lines to `tracing`.
    pub fn with_tracing_logger(self) -> Self {
        self.with_logger(Arc::new(TracingSink))
    }

    /// Writer shared by the handlers this builder maps.
    pub fn response_writer(&self) -> &ResponseWriter {
        &self.writer
    }

    /// Freeze the configuration.
    ///
    /// Logs `Mapped METHOD path` for every route through the composed logger.
    pub fn build(self) -> Result<WebServer, ConfigurationError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let logger = Logger::compose(self.sinks);
        for route in self.routes.routes() {
            let key = route.key();
            logger.log(format_args!("Mapped {} {}", key.method(), key.path()));
        }

        Ok(WebServer::from_parts(ServerParts {
            routes: self.routes,
            logger,
            writer: self.writer,
            bind_addresses: self.bind_addresses,
            limits: self.limits,
            dispatch: self.dispatch,
        }))
    }

    /// Build and serve until stopped.
    pub async fn run(self) -> Result<(), ConfigurationError> {
        self.build()?.run().await
    }

    /// Build, bind, and serve in the background.
    pub async fn start(self) -> Result<ServerHandle, ConfigurationError> {
        self.build()?.start().await
    }

    pub(crate) fn register(&mut self, path: &str, method: &Method, handler: Handler) {
        if let Err(err) = self.routes.register(path, method, handler) {
            self.record_error(err);
        }
    }

    pub(crate) fn record_error(&mut self, err: ConfigurationError) {
        tracing::error!(error = %err, "Invalid server configuration");
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

impl Default for WebServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WebServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebServerBuilder")
            .field("routes", &self.routes.len())
            .field("sinks", &self.sinks.len())
            .field("bind_addresses", &self.bind_addresses)
            .field("dispatch", &self.dispatch)
            .field("error", &self.error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InMemoryLogConfig, ServerConfig};
    use crate::logging::RingBufferSink;
    use std::num::NonZeroUsize;

    #[test]
    fn duplicate_route_is_reported_and_first_kept() {
        let err = WebServerBuilder::new()
            .map_get_func("/hi", |_ctx: &mut RequestContext| "first")
            .map_get_func("/HI", |_ctx: &mut RequestContext| "second")
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "route GET /HI is already registered");
    }

    #[test]
    fn first_error_wins() {
        let err = WebServerBuilder::new()
            .listen("not an address", 80)
            .max_connections(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidBindAddress { .. }));
    }

    #[test]
    fn listen_on_defaults_to_port_80() {
        let builder = WebServerBuilder::new()
            .listen_on(IpAddr::from([127, 0, 0, 1]), None)
            .listen_on(IpAddr::from([127, 0, 0, 1]), Some(8080))
            .listen("10.0.0.1", DEFAULT_PORT);
        let ports: Vec<u16> = builder.bind_addresses.iter().map(|a| a.port()).collect();
        assert_eq!(ports, [80, 8080, 80]);
    }

    #[test]
    fn build_logs_mapped_routes() {
        let ring = Arc::new(RingBufferSink::new(NonZeroUsize::new(8).unwrap()));
        let server = WebServerBuilder::new()
            .with_logger(ring.clone())
            .map_get_func("/hi", |_ctx: &mut RequestContext| "hi")
            .map(
                "/items",
                Method::POST,
                HandlerShape::action(|_ctx: &mut RequestContext| ()),
            )
            .build()
            .unwrap();

        assert_eq!(server.routes().len(), 2);
        assert_eq!(ring.snapshot(), ["Mapped GET /HI", "Mapped POST /ITEMS"]);
    }

    #[test]
    fn from_config_applies_settings() {
        let mut config = ServerConfig::default();
        config.listener.bind_addresses = vec!["127.0.0.1".into(), "127.0.0.1:9000".into()];
        config.listener.default_port = 8000;
        config.listener.dispatch = DispatchMode::Concurrent;
        config.logging.in_memory = Some(InMemoryLogConfig {
            capacity: 10,
            route: "/recent".into(),
        });
        config.response.chunk_size = 256;

        let builder = WebServerBuilder::from_config(&config);
        let ports: Vec<u16> = builder.bind_addresses.iter().map(|a| a.port()).collect();
        assert_eq!(ports, [8000, 9000]);
        assert_eq!(builder.dispatch, DispatchMode::Concurrent);
        assert_eq!(builder.response_writer().chunk_size(), 256);

        let server = builder.build().unwrap();
        assert!(server.routes().contains("/recent", "GET"));
    }

    #[test]
    fn from_config_attaches_console_only_when_enabled() {
        let mut config = ServerConfig::default();
        config.logging.tracing = false;
        config.logging.in_memory = None;

        config.logging.console = false;
        assert!(WebServerBuilder::from_config(&config).sinks.is_empty());

        config.logging.console = true;
        assert_eq!(WebServerBuilder::from_config(&config).sinks.len(), 1);
    }

    #[test]
    fn from_config_reports_bad_addresses() {
        let mut config = ServerConfig::default();
        config.listener.bind_addresses = vec!["example.org".into()];
        let err = WebServerBuilder::from_config(&config).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidBindAddress { ref address, .. } if address == "example.org"
        ));
    }
}
