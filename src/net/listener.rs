//! HTTP/1.1 listener feeding the dispatch loop.
//!
//! # Responsibilities
//! - Bind to the configured address(es)
//! - Accept TCP connections, bounded by `max_connections`
//! - Parse requests with hyper and queue one [`RequestContext`] per request
//! - Hand the committed response back to the connection
//!
//! # Design Decisions
//! - One accept task per bound address; every connection runs on its own task
//! - The request queue is bounded, so a busy dispatch loop pushes back on
//!   connections instead of buffering without limit
//! - Once the listener is closed, queued and new requests get 503
//! - A context dropped without a response yields 500

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use http::{Response, StatusCode};
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::http::context::ResponseBody;
use crate::http::RequestContext;
use crate::net::connection::{ConnectionGuard, ConnectionTracker};

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    /// Nothing to bind.
    NoAddresses,
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind { addr, .. } => write!(f, "Failed to bind {}", addr),
            ListenerError::NoAddresses => write!(f, "No bind address configured"),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind { source, .. } => Some(source),
            ListenerError::NoAddresses => None,
        }
    }
}

/// Where the dispatch loop gets its requests from.
pub trait ContextSource: Send {
    /// Next request, or `None` once the source is exhausted.
    ///
    /// Must be cancel-safe: the loop races it against shutdown.
    fn accept(&mut self) -> impl Future<Output = Option<RequestContext>> + Send;

    /// Stop producing requests.
    fn close(&mut self);
}

impl ContextSource for mpsc::Receiver<RequestContext> {
    async fn accept(&mut self) -> Option<RequestContext> {
        self.recv().await
    }

    fn close(&mut self) {
        mpsc::Receiver::close(self);
    }
}

/// Limits applied by an [`HttpListener`].
#[derive(Debug, Clone, Copy)]
pub struct ListenerLimits {
    /// Concurrent connections across all bound addresses.
    pub max_connections: usize,
    /// Parsed requests waiting for the dispatch loop.
    pub queue_depth: usize,
}

impl Default for ListenerLimits {
    fn default() -> Self {
        Self {
            max_connections: 1024,
            queue_depth: 64,
        }
    }
}

/// TCP listener speaking HTTP/1.1 on one or more addresses.
pub struct HttpListener {
    requests: mpsc::Receiver<RequestContext>,
    local_addrs: Vec<SocketAddr>,
    accept_tasks: Vec<JoinHandle<()>>,
    closed: watch::Sender<bool>,
    tracker: ConnectionTracker,
}

impl HttpListener {
    /// Bind every address, then start accepting.
    ///
    /// Nothing is accepted unless all addresses bind.
    pub async fn bind(addrs: &[SocketAddr], limits: ListenerLimits) -> Result<Self, ListenerError> {
        if addrs.is_empty() {
            return Err(ListenerError::NoAddresses);
        }

        let mut listeners = Vec::with_capacity(addrs.len());
        for &addr in addrs {
            let bind_error = |source| ListenerError::Bind { addr, source };
            let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
            let local_addr = listener.local_addr().map_err(bind_error)?;
            listeners.push((listener, local_addr));
        }

        let (queue, requests) = mpsc::channel(limits.queue_depth.max(1));
        let (closed, _) = watch::channel(false);
        let connection_limit = Arc::new(Semaphore::new(limits.max_connections.max(1)));
        let tracker = ConnectionTracker::new();

        let mut local_addrs = Vec::with_capacity(listeners.len());
        let mut accept_tasks = Vec::with_capacity(listeners.len());
        for (listener, local_addr) in listeners {
            tracing::info!(
                address = %local_addr,
                max_connections = limits.max_connections,
                "Listener bound"
            );
            local_addrs.push(local_addr);

            let acceptor = Acceptor {
                listener,
                queue: queue.clone(),
                connection_limit: Arc::clone(&connection_limit),
                tracker: tracker.clone(),
                closed: closed.subscribe(),
            };
            accept_tasks.push(tokio::spawn(acceptor.run()));
        }

        Ok(Self {
            requests,
            local_addrs,
            accept_tasks,
            closed,
            tracker,
        })
    }

    /// Addresses actually bound (useful with port 0).
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.local_addrs
    }

    /// Connections currently open.
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }
}

impl ContextSource for HttpListener {
    async fn accept(&mut self) -> Option<RequestContext> {
        self.requests.recv().await
    }

    fn close(&mut self) {
        let _ = self.closed.send(true);
        self.requests.close();
        while let Ok(mut ctx) = self.requests.try_recv() {
            ctx.set_status(StatusCode::SERVICE_UNAVAILABLE);
            ctx.close();
        }
        tracing::info!(addresses = ?self.local_addrs, "Listener closed");
    }
}

impl Drop for HttpListener {
    fn drop(&mut self) {
        let _ = self.closed.send(true);
        for task in &self.accept_tasks {
            task.abort();
        }
    }
}

/// Accept loop for one bound address.
struct Acceptor {
    listener: TcpListener,
    queue: mpsc::Sender<RequestContext>,
    connection_limit: Arc<Semaphore>,
    tracker: ConnectionTracker,
    closed: watch::Receiver<bool>,
}

impl Acceptor {
    async fn run(mut self) {
        loop {
            // Acquire permit first (backpressure)
            let permit = tokio::select! {
                biased;
                _ = self.closed.changed() => break,
                permit = Arc::clone(&self.connection_limit).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, peer) = tokio::select! {
                biased;
                _ = self.closed.changed() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        continue;
                    }
                },
            };

            let guard = self.tracker.track();
            tracing::debug!(
                connection_id = %guard.id(),
                peer_addr = %peer,
                available_permits = self.connection_limit.available_permits(),
                "Connection accepted"
            );
            tokio::spawn(serve_connection(
                stream,
                peer,
                self.queue.clone(),
                ConnectionPermit { _permit: permit },
                guard,
            ));
        }
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the connection slot is released back to the pool.
/// This ensures backpressure is maintained even if the connection task panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    queue: mpsc::Sender<RequestContext>,
    _permit: ConnectionPermit,
    guard: ConnectionGuard,
) {
    let service = service_fn(move |request: http::Request<Incoming>| {
        let queue = queue.clone();
        async move { Ok::<_, Infallible>(enqueue(request, peer, &queue).await) }
    });

    if let Err(e) = http1::Builder::new()
        .serve_connection(TokioIo::new(stream), service)
        .await
    {
        tracing::debug!(connection_id = %guard.id(), error = %e, "Connection error");
    }
}

/// Queue a request for the dispatch loop and wait for its response head.
async fn enqueue(
    request: http::Request<Incoming>,
    peer: SocketAddr,
    queue: &mpsc::Sender<RequestContext>,
) -> Response<ResponseBody> {
    // Request bodies are not consumed.
    let (head, _body) = request.into_parts();
    let (ctx, pending) = RequestContext::new(head, Some(peer));

    if queue.send(ctx).await.is_err() {
        return status_only(StatusCode::SERVICE_UNAVAILABLE);
    }
    match pending.recv().await {
        Some(response) => response,
        None => status_only(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

fn status_only(status: StatusCode) -> Response<ResponseBody> {
    let mut response = Response::new(Empty::new().boxed_unsync());
    *response.status_mut() = status;
    response
}
