//! The in-memory log page.
//!
//! Attaches a [`RingBufferSink`] and serves its contents as a small HTML
//! document on a GET route.

use std::io;
use std::num::NonZeroUsize;
use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use http::Method;

use crate::error::ConfigurationError;
use crate::handler::{Handler, HandlerShape};
use crate::http::response::ResponseWriter;
use crate::http::{RequestContext, WebServerBuilder};
use crate::logging::RingBufferSink;

/// Route used by the demo host and configuration when none is given.
pub const DEFAULT_LOG_ROUTE: &str = "/log";

const PAGE_HEAD: &str = "<html><body><pre>";
const PAGE_TAIL: &str = "</pre></body></html>";
const PAGE_CONTENT_TYPE: &str = "text/html; charset=utf-8";

impl WebServerBuilder {
    /// Keep the last `capacity` log lines in memory and serve them at
    /// `route`.
    pub fn with_in_memory_logger(mut self, capacity: usize, route: &str) -> Self {
        let Some(capacity) = NonZeroUsize::new(capacity) else {
            self.record_error(ConfigurationError::InvalidSetting {
                setting: "logging.in_memory.capacity",
                reason: "must be greater than 0".into(),
            });
            return self;
        };

        let sink = Arc::new(RingBufferSink::new(capacity));
        let writer = self.response_writer().clone();
        let page_sink = Arc::clone(&sink);
        let handler: Handler = HandlerShape::task(move |ctx: &mut RequestContext| {
            let sink = Arc::clone(&page_sink);
            let writer = writer.clone();
            Box::pin(async move { render_log_page(&sink, &writer, ctx).await })
        })
        .into();

        self.register(route, &Method::GET, handler);
        self.with_logger(sink)
    }
}

/// Write the sink's entries, oldest first, as an HTML page.
pub async fn render_log_page(
    sink: &RingBufferSink,
    writer: &ResponseWriter,
    ctx: &mut RequestContext,
) -> io::Result<()> {
    let mut entries = Vec::new();
    sink.read_into(&mut entries, sink.capacity().get());

    let body_len: usize = entries.iter().map(|e| e.len() + 1).sum();
    let mut page = writer
        .pool()
        .acquire(PAGE_HEAD.len() + body_len + PAGE_TAIL.len());
    page.put_slice(PAGE_HEAD.as_bytes());
    for entry in &entries {
        escape_into(&mut page, entry);
        page.put_u8(b'\n');
    }
    page.put_slice(PAGE_TAIL.as_bytes());

    ctx.set_content_type(PAGE_CONTENT_TYPE)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    writer.write_bytes(ctx, &page).await
}

fn escape_into(out: &mut BytesMut, text: &str) {
    for byte in text.bytes() {
        match byte {
            b'&' => out.put_slice(b"&amp;"),
            b'<' => out.put_slice(b"&lt;"),
            b'>' => out.put_slice(b"&gt;"),
            other => out.put_u8(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::context::ResponseBody;
    use crate::logging::LogSink;
    use http::header::CONTENT_TYPE;
    use http_body_util::BodyExt;

    async fn render(sink: &RingBufferSink) -> (http::Response<()>, String) {
        let (mut ctx, pending) =
            RequestContext::detached(http::Request::get("/log").body(()).unwrap());
        render_log_page(sink, &ResponseWriter::default(), &mut ctx)
            .await
            .unwrap();
        ctx.close();

        let response: http::Response<ResponseBody> = pending.recv().await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = body.collect().await.unwrap().to_bytes();
        (
            http::Response::from_parts(parts, ()),
            String::from_utf8(bytes.to_vec()).unwrap(),
        )
    }

    #[tokio::test]
    async fn renders_most_recent_entries() {
        let sink = RingBufferSink::new(NonZeroUsize::new(5).unwrap());
        for i in 1..=7 {
            sink.log(&format!("line {i}")).unwrap();
        }

        let (head, body) = render(&sink).await;
        assert_eq!(head.headers()[CONTENT_TYPE], PAGE_CONTENT_TYPE);
        assert_eq!(
            body,
            "<html><body><pre>line 3\nline 4\nline 5\nline 6\nline 7\n</pre></body></html>"
        );
    }

    #[tokio::test]
    async fn escapes_markup() {
        let sink = RingBufferSink::new(NonZeroUsize::new(2).unwrap());
        sink.log("<script>a & b</script>").unwrap();
        sink.log("plain").unwrap();

        let (_, body) = render(&sink).await;
        assert_eq!(
            body,
            "<html><body><pre>&lt;script&gt;a &amp; b&lt;/script&gt;\nplain\n</pre></body></html>"
        );
    }

    #[tokio::test]
    async fn empty_sink_renders_scaffold() {
        let sink = RingBufferSink::new(NonZeroUsize::new(3).unwrap());
        let (_, body) = render(&sink).await;
        assert_eq!(body, "<html><body><pre></pre></body></html>");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = WebServerBuilder::new()
            .with_in_memory_logger(0, DEFAULT_LOG_ROUTE)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidSetting { setting: "logging.in_memory.capacity", .. }
        ));
    }

    #[test]
    fn registers_get_route() {
        let server = WebServerBuilder::new()
            .with_in_memory_logger(4, "/recent")
            .build()
            .unwrap();
        assert!(server.routes().contains("/recent", "GET"));
    }
}
