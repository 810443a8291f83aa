//! Per-request context handed to handlers.
//!
//! # Responsibilities
//! - Expose the inbound request (method, path, query, headers)
//! - Collect the response head (status, headers) until it is committed
//! - Stream body bytes back to the connection through a bounded channel
//! - Complete the exchange on `close()`
//!
//! # Design Decisions
//! - The head is committed lazily: on the first body write or on close
//! - Body writes await channel capacity, so a slow client slows the writer
//! - Dropping a context without closing it leaves the connection side to
//!   answer 500

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;

use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderValue, InvalidHeaderValue};
use http::request::Parts;
use http::{Method, Response, StatusCode, Version};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, StreamBody};
use hyper::body::Frame;
use tokio::sync::{mpsc, oneshot};

/// Response body type handed to the connection.
pub type ResponseBody = UnsyncBoxBody<Bytes, Infallible>;

/// Number of body chunks buffered between a writer and the connection.
const BODY_CHANNEL_DEPTH: usize = 16;

/// Request/response exchange for a single dispatch.
pub struct RequestContext {
    head: Parts,
    remote_addr: Option<SocketAddr>,
    status: StatusCode,
    headers: HeaderMap,
    responder: Option<oneshot::Sender<Response<ResponseBody>>>,
    body_tx: Option<mpsc::Sender<Bytes>>,
    bytes_written: u64,
}

impl RequestContext {
    /// Create a context for a parsed request head.
    ///
    /// The returned [`PendingResponse`] resolves once the response head is
    /// committed.
    pub fn new(head: Parts, remote_addr: Option<SocketAddr>) -> (Self, PendingResponse) {
        let (tx, rx) = oneshot::channel();
        let ctx = Self {
            head,
            remote_addr,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            responder: Some(tx),
            body_tx: None,
            bytes_written: 0,
        };
        (ctx, PendingResponse { rx })
    }

    /// Create a context from a request without any connection behind it.
    ///
    /// The request body is discarded.
    pub fn detached<B>(request: http::Request<B>) -> (Self, PendingResponse) {
        let (head, _body) = request.into_parts();
        Self::new(head, None)
    }

    pub fn method(&self) -> &Method {
        &self.head.method
    }

    /// Request path, without the query string.
    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    /// Path and query as received.
    pub fn raw_url(&self) -> &str {
        self.head
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }

    pub fn query(&self) -> Option<&str> {
        self.head.uri.query()
    }

    /// First value of a query parameter, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn version(&self) -> Version {
        self.head.version
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// A request header as text, if present and valid ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Response status (200 unless changed).
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Set the response status. Ignored once the head is committed.
    pub fn set_status(&mut self, status: StatusCode) {
        if self.is_committed() {
            tracing::debug!(%status, "status change after commit ignored");
            return;
        }
        self.status = status;
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Response headers. Changes after commit have no effect.
    pub fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn set_content_type(&mut self, content_type: &str) -> Result<(), InvalidHeaderValue> {
        let value = HeaderValue::from_str(content_type)?;
        self.headers.insert(header::CONTENT_TYPE, value);
        Ok(())
    }

    pub fn set_content_length(&mut self, length: u64) {
        self.headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }

    /// Whether the response head has been sent.
    pub fn is_committed(&self) -> bool {
        self.responder.is_none()
    }

    /// Body bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Write body bytes, committing the head first if needed.
    pub async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        if self.body_tx.is_none() {
            let (tx, rx) = mpsc::channel(BODY_CHANNEL_DEPTH);
            self.commit(channel_body(rx))?;
            self.body_tx = Some(tx);
        }

        let tx = self
            .body_tx
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "response already closed"))?;
        tx.send(Bytes::copy_from_slice(data))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client went away"))?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    /// Complete the response. Sends an empty body if nothing was written.
    pub fn close(mut self) {
        if !self.is_committed() {
            // A closed client is not an error at this point.
            let _ = self.commit(Empty::new().boxed_unsync());
        }
        self.body_tx = None;
    }

    fn commit(&mut self, body: ResponseBody) -> io::Result<()> {
        let responder = self
            .responder
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "response already committed"))?;

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();

        responder
            .send(response)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client went away"))
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.head.method)
            .field("uri", &self.head.uri)
            .field("status", &self.status)
            .field("committed", &self.is_committed())
            .finish()
    }
}

fn channel_body(mut rx: mpsc::Receiver<Bytes>) -> ResponseBody {
    let frames = futures_util::stream::poll_fn(move |cx| {
        rx.poll_recv(cx)
            .map(|chunk| chunk.map(|bytes| Ok::<_, Infallible>(Frame::data(bytes))))
    });
    StreamBody::new(frames).boxed_unsync()
}

/// Receiving half of a context's response.
#[derive(Debug)]
pub struct PendingResponse {
    rx: oneshot::Receiver<Response<ResponseBody>>,
}

impl PendingResponse {
    /// Wait for the response head.
    ///
    /// Returns `None` if the context was dropped without being closed.
    pub async fn recv(self) -> Option<Response<ResponseBody>> {
        self.rx.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(uri: &str) -> (RequestContext, PendingResponse) {
        RequestContext::detached(http::Request::builder().uri(uri).body(()).unwrap())
    }

    async fn body_text(response: Response<ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn exposes_request_view() {
        let (ctx, _pending) = RequestContext::detached(
            http::Request::builder()
                .method(Method::POST)
                .uri("/Decrement?quantity=3&name=a%20b")
                .header("x-test", "yes")
                .body(())
                .unwrap(),
        );

        assert_eq!(ctx.method(), Method::POST);
        assert_eq!(ctx.path(), "/Decrement");
        assert_eq!(ctx.raw_url(), "/Decrement?quantity=3&name=a%20b");
        assert_eq!(ctx.query_param("quantity").as_deref(), Some("3"));
        assert_eq!(ctx.query_param("name").as_deref(), Some("a b"));
        assert_eq!(ctx.query_param("missing"), None);
        assert_eq!(ctx.header("x-test"), Some("yes"));
        assert_eq!(ctx.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn close_without_writes_sends_empty_body() {
        let (mut ctx, pending) = get("/nothing");
        ctx.set_status(StatusCode::NOT_FOUND);
        ctx.close();

        let response = pending.recv().await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn first_write_commits_head() {
        let (mut ctx, pending) = get("/stream");
        ctx.set_content_type("text/plain").unwrap();
        ctx.write(b"hello ").await.unwrap();
        assert!(ctx.is_committed());

        ctx.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ctx.status(), StatusCode::OK);

        ctx.write(b"world").await.unwrap();
        assert_eq!(ctx.bytes_written(), 11);
        ctx.close();

        let response = pending.recv().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(body_text(response).await, "hello world");
    }

    #[tokio::test]
    async fn dropped_context_abandons_response() {
        let (ctx, pending) = get("/dropped");
        drop(ctx);
        assert!(pending.recv().await.is_none());
    }

    #[tokio::test]
    async fn write_to_departed_client_fails() {
        let (mut ctx, pending) = get("/gone");
        drop(pending);
        let err = ctx.write(b"data").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
