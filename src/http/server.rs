//! The dispatch loop.
//!
//! # Responsibilities
//! - Pull request contexts from a [`ContextSource`]
//! - Resolve the route, invoke the handler, write the reply
//! - Contain every per-request failure (404 / 500) and keep serving
//! - Close every context exactly once, on every path
//! - Log start, resolution, outcome and elapsed time per request
//! - Observe stop requests between iterations and while waiting
//!
//! # Design Decisions
//! - `Serial` dispatch awaits each request before accepting the next;
//!   `Concurrent` runs each request on its own task and waits for them on stop
//! - Handler panics are caught and treated like returned errors
//! - Error detail goes to the log sink, never to the response body

use std::any::Any;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::StatusCode;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

use crate::config::DispatchMode;
use crate::error::{error_chain, ConfigurationError, RequestError};
use crate::http::request::{RequestId, RequestIdSequence};
use crate::http::response::ResponseWriter;
use crate::http::RequestContext;
use crate::lifecycle::{ServerState, Shutdown, StateCell};
use crate::logging::Logger;
use crate::net::{ContextSource, HttpListener, ListenerLimits};
use crate::observability::metrics;
use crate::routing::RouteTable;

/// Everything a built server owns.
pub(crate) struct ServerParts {
    pub routes: RouteTable,
    pub logger: Logger,
    pub writer: ResponseWriter,
    pub bind_addresses: Vec<SocketAddr>,
    pub limits: ListenerLimits,
    pub dispatch: DispatchMode,
}

/// A built server. Cloning is cheap and shares the same instance.
#[derive(Clone)]
pub struct WebServer {
    inner: Arc<ServerInner>,
}

struct ServerInner {
    routes: RouteTable,
    logger: Logger,
    writer: ResponseWriter,
    bind_addresses: Vec<SocketAddr>,
    limits: ListenerLimits,
    dispatch: DispatchMode,
    request_ids: RequestIdSequence,
    shutdown: Shutdown,
    state: StateCell,
}

impl WebServer {
    pub(crate) fn from_parts(parts: ServerParts) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                routes: parts.routes,
                logger: parts.logger,
                writer: parts.writer,
                bind_addresses: parts.bind_addresses,
                limits: parts.limits,
                dispatch: parts.dispatch,
                request_ids: RequestIdSequence::new(),
                shutdown: Shutdown::new(),
                state: StateCell::new(),
            }),
        }
    }

    /// The frozen route table.
    pub fn routes(&self) -> &RouteTable {
        &self.inner.routes
    }

    pub fn logger(&self) -> &Logger {
        &self.inner.logger
    }

    pub fn response_writer(&self) -> &ResponseWriter {
        &self.inner.writer
    }

    /// Configured bind addresses (as given, before binding).
    pub fn bind_addresses(&self) -> &[SocketAddr] {
        &self.inner.bind_addresses
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        self.inner.dispatch
    }

    pub fn state(&self) -> ServerState {
        self.inner.state.get()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ServerState> {
        self.inner.state.subscribe()
    }

    /// Ask the loop to stop. In-flight requests complete.
    pub fn stop(&self) {
        self.inner.shutdown.trigger();
    }

    /// The server's shutdown coordinator, e.g. for signal handlers.
    pub fn shutdown(&self) -> &Shutdown {
        &self.inner.shutdown
    }

    /// Bind the configured addresses and serve until stopped.
    pub async fn run(&self) -> Result<(), ConfigurationError> {
        let listener = self.bind().await?;
        self.serve_loop(listener).await;
        Ok(())
    }

    /// Bind the configured addresses and serve on a background task.
    pub async fn start(&self) -> Result<ServerHandle, ConfigurationError> {
        let listener = self.bind().await?;
        let local_addrs = listener.local_addrs().to_vec();

        let server = self.clone();
        let task = tokio::spawn(async move { server.serve_loop(listener).await });
        Ok(ServerHandle {
            server: self.clone(),
            local_addrs,
            task,
        })
    }

    /// Serve requests from any source until it is exhausted or the server
    /// is stopped.
    pub async fn serve<S: ContextSource>(&self, source: S) -> Result<(), ConfigurationError> {
        self.inner.state.begin()?;
        self.serve_loop(source).await;
        Ok(())
    }

    async fn bind(&self) -> Result<HttpListener, ConfigurationError> {
        self.inner.state.begin()?;
        match HttpListener::bind(&self.inner.bind_addresses, self.inner.limits).await {
            Ok(listener) => {
                self.inner.state.set(ServerState::Listening);
                Ok(listener)
            }
            Err(err) => {
                tracing::error!(error = %error_chain(&err), "Failed to start listener");
                self.inner.state.set(ServerState::Stopped);
                Err(err.into())
            }
        }
    }

    async fn serve_loop<S: ContextSource>(&self, mut source: S) {
        let inner = &self.inner;
        let mut shutdown = inner.shutdown.subscribe();
        let mut in_flight = JoinSet::new();

        inner.state.set(ServerState::Listening);
        inner.logger.log(format_args!("Pecan web server started"));

        loop {
            if shutdown.is_triggered() {
                break;
            }
            while in_flight.try_join_next().is_some() {}

            inner.logger.log(format_args!("Waiting for request"));
            let ctx = tokio::select! {
                biased;
                _ = shutdown.triggered() => break,
                ctx = source.accept() => match ctx {
                    Some(ctx) => ctx,
                    None => break,
                },
            };

            let id = inner.request_ids.next_id();
            match inner.dispatch {
                DispatchMode::Serial => {
                    self.dispatch(id, ctx).await;
                }
                DispatchMode::Concurrent => {
                    let server = self.clone();
                    in_flight.spawn(async move {
                        server.dispatch(id, ctx).await;
                    });
                }
            }
        }

        inner.state.set(ServerState::Stopping);
        source.close();
        while in_flight.join_next().await.is_some() {}

        inner.logger.log(format_args!("Stopped"));
        inner.state.set(ServerState::Stopped);
    }

    /// Process one request end to end and close its context.
    ///
    /// Returns the status sent to the client.
    pub async fn dispatch(&self, id: RequestId, mut ctx: RequestContext) -> StatusCode {
        let started = Instant::now();
        let logger = &self.inner.logger;
        logger.log(format_args!("[{id}] {} {}", ctx.method(), ctx.raw_url()));

        match self.process(id, &mut ctx).await {
            Ok(()) => {}
            Err(err @ RequestError::NotFound { .. }) => {
                logger.log(format_args!("[{id}] {err}"));
                ctx.set_status(err.status());
            }
            Err(err) => {
                let detail = error_chain(&err);
                logger.log(format_args!("[{id}] Error processing request: {detail}"));
                tracing::warn!(request_id = %id, error = %detail, "Request failed");
                if !ctx.is_committed() {
                    let headers = ctx.response_headers_mut();
                    headers.remove(CONTENT_LENGTH);
                    headers.remove(CONTENT_TYPE);
                }
                ctx.set_status(err.status());
            }
        }

        let status = ctx.status();
        let method = ctx.method().clone();
        ctx.close();

        let elapsed = started.elapsed();
        logger.log(format_args!(
            "[{id}] {} ({} ms)",
            status.as_u16(),
            elapsed.as_millis()
        ));
        metrics::record_request(method.as_str(), status.as_u16(), elapsed);
        status
    }

    async fn process(&self, id: RequestId, ctx: &mut RequestContext) -> Result<(), RequestError> {
        let route = self.inner.routes.lookup(ctx.path(), ctx.method().as_str())?;
        self.inner.logger.log(format_args!("[{id}] -> {}", route.key()));

        // Sync shapes run the user closure inside `invoke`, so the call
        // itself must be inside the guarded future.
        let reply = AssertUnwindSafe(async { route.handler().invoke(ctx).await })
            .catch_unwind()
            .await
            .map_err(|panic| RequestError::HandlerPanicked(panic_message(panic.as_ref())))?
            .map_err(RequestError::HandlerExecution)?;

        self.inner.writer.write_reply(ctx, reply).await
    }
}

impl std::fmt::Debug for WebServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebServer")
            .field("routes", &self.inner.routes.len())
            .field("bind_addresses", &self.inner.bind_addresses)
            .field("dispatch", &self.inner.dispatch)
            .field("state", &self.state())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Handle to a server running on a background task.
#[derive(Debug)]
pub struct ServerHandle {
    server: WebServer,
    local_addrs: Vec<SocketAddr>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Addresses actually bound.
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.local_addrs
    }

    /// First bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addrs[0]
    }

    pub fn server(&self) -> &WebServer {
        &self.server
    }

    pub fn state(&self) -> ServerState {
        self.server.state()
    }

    pub fn stop(&self) {
        self.server.stop();
    }

    /// Wait for the loop to finish.
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Dispatch loop task failed");
        }
    }

    /// Stop and wait.
    pub async fn shutdown(self) {
        self.stop();
        self.wait().await;
    }
}
