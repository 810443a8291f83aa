//! Static and embedded content.
//!
//! # Data Flow
//! ```text
//! map_static_file / map_static_files / map_index_file
//!     → GET route per file (path resolved now, opened per request)
//!     → tokio::fs::File → ResponseWriter::copy_from (pooled chunks)
//!
//! map_embedded_resource / map_embedded_resources / map_index_resource
//!     → GET route per resource → ResponseWriter::write_bytes
//! ```
//!
//! # Design Decisions
//! - A file that disappears after registration fails the request (500);
//!   problems walking a directory fail the build
//! - Content type is inferred only for `.html`; anything else is left
//!   unset unless given

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use http::Method;

use crate::error::ConfigurationError;
use crate::handler::{Handler, HandlerShape};
use crate::http::response::ResponseWriter;
use crate::http::{RequestContext, WebServerBuilder};

const HTML_CONTENT_TYPE: &str = "text/html";

impl WebServerBuilder {
    /// Serve one file at `virtual_path`.
    pub fn map_static_file(
        mut self,
        physical: impl AsRef<Path>,
        virtual_path: &str,
        content_type: Option<&str>,
    ) -> Self {
        let physical = physical.as_ref().to_path_buf();
        let content_type = content_type
            .map(str::to_owned)
            .or_else(|| infer_content_type(&physical).map(str::to_owned));
        let handler = file_handler(self.response_writer().clone(), physical, content_type);
        self.register(virtual_path, &Method::GET, handler);
        self
    }

    /// Serve every file under `dir` (recursively) whose name matches
    /// `pattern`, at `virtual_root` + its path relative to `dir`.
    ///
    /// `pattern` is `*`, `*.ext`, or an exact file name.
    pub fn map_static_files(
        mut self,
        dir: impl AsRef<Path>,
        pattern: &str,
        virtual_root: &str,
        content_type: Option<&str>,
    ) -> Self {
        let dir = dir.as_ref();
        let files = match collect_files(dir, pattern) {
            Ok(files) => files,
            Err(source) => {
                self.record_error(ConfigurationError::StaticFiles {
                    path: dir.to_path_buf(),
                    source,
                });
                return self;
            }
        };

        for file in files {
            let Ok(relative) = file.strip_prefix(dir) else {
                continue;
            };
            let virtual_path = join_virtual(virtual_root, relative);
            self = self.map_static_file(&file, &virtual_path, content_type);
        }
        self
    }

    /// Serve a file at `/`.
    pub fn map_index_file(self, physical: impl AsRef<Path>, content_type: Option<&str>) -> Self {
        self.map_static_file(physical, "/", content_type)
    }

    /// Serve bytes bundled into the binary at `virtual_path`. `key` is the
    /// resource name and drives content type inference.
    pub fn map_embedded_resource(
        mut self,
        key: &str,
        bytes: &'static [u8],
        virtual_path: &str,
        content_type: Option<&str>,
    ) -> Self {
        let content_type = content_type
            .map(str::to_owned)
            .or_else(|| infer_content_type(Path::new(key)).map(str::to_owned));
        let handler = bytes_handler(self.response_writer().clone(), bytes, content_type);
        self.register(virtual_path, &Method::GET, handler);
        self
    }

    /// Serve several bundled resources under `virtual_root`, each at
    /// `virtual_root/key`.
    pub fn map_embedded_resources(
        mut self,
        resources: &[(&str, &'static [u8])],
        virtual_root: &str,
        content_type: Option<&str>,
    ) -> Self {
        for &(key, bytes) in resources {
            let virtual_path = join_virtual(virtual_root, Path::new(key));
            self = self.map_embedded_resource(key, bytes, &virtual_path, content_type);
        }
        self
    }

    /// Serve a bundled resource at `/`.
    pub fn map_index_resource(
        self,
        key: &str,
        bytes: &'static [u8],
        content_type: Option<&str>,
    ) -> Self {
        self.map_embedded_resource(key, bytes, "/", content_type)
    }
}

fn file_handler(writer: ResponseWriter, path: PathBuf, content_type: Option<String>) -> Handler {
    let path = Arc::new(path);
    HandlerShape::task(move |ctx: &mut RequestContext| {
        let writer = writer.clone();
        let path = Arc::clone(&path);
        let content_type = content_type.clone();
        Box::pin(async move { serve_file(&writer, &path, content_type.as_deref(), ctx).await })
    })
    .into()
}

fn bytes_handler(
    writer: ResponseWriter,
    bytes: &'static [u8],
    content_type: Option<String>,
) -> Handler {
    HandlerShape::task(move |ctx: &mut RequestContext| {
        let writer = writer.clone();
        let content_type = content_type.clone();
        Box::pin(async move {
            apply_content_type(ctx, content_type.as_deref())?;
            writer.write_bytes(ctx, bytes).await
        })
    })
    .into()
}

async fn serve_file(
    writer: &ResponseWriter,
    path: &Path,
    content_type: Option<&str>,
    ctx: &mut RequestContext,
) -> io::Result<()> {
    let file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();

    apply_content_type(ctx, content_type)?;
    ctx.set_content_length(len);
    writer.copy_from(ctx, file).await?;
    Ok(())
}

fn apply_content_type(ctx: &mut RequestContext, content_type: Option<&str>) -> io::Result<()> {
    if let Some(content_type) = content_type {
        ctx.set_content_type(content_type)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    }
    Ok(())
}

/// `text/html` for `.html` names, nothing otherwise.
pub fn infer_content_type(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.eq_ignore_ascii_case("html"))
        .map(|_| HTML_CONTENT_TYPE)
}

fn matches_pattern(name: &str, pattern: &str) -> bool {
    match pattern {
        "*" | "*.*" => true,
        _ => match pattern.strip_prefix("*.") {
            Some(ext) => Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext)),
            None => name == pattern,
        },
    }
}

fn collect_files(dir: &Path, pattern: &str) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else if entry.file_name().to_str().is_some_and(|n| matches_pattern(n, pattern)) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn join_virtual(root: &str, relative: &Path) -> String {
    let mut joined = root.trim_end_matches('/').to_owned();
    for component in relative.components() {
        joined.push('/');
        joined.push_str(&component.as_os_str().to_string_lossy());
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::context::ResponseBody;
    use crate::http::{RequestId, WebServer};
    use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
    use http::StatusCode;
    use http_body_util::BodyExt;

    async fn get(server: &WebServer, uri: &str) -> (http::Response<()>, Vec<u8>) {
        let (ctx, pending) = RequestContext::detached(http::Request::get(uri).body(()).unwrap());
        server.dispatch(RequestId::from(1), ctx).await;
        let response: http::Response<ResponseBody> = pending.recv().await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = body.collect().await.unwrap().to_bytes();
        (http::Response::from_parts(parts, ()), bytes.to_vec())
    }

    #[test]
    fn content_type_inference() {
        assert_eq!(infer_content_type(Path::new("index.html")), Some("text/html"));
        assert_eq!(infer_content_type(Path::new("INDEX.HTML")), Some("text/html"));
        assert_eq!(infer_content_type(Path::new("app.js")), None);
        assert_eq!(infer_content_type(Path::new("README")), None);
    }

    #[test]
    fn pattern_matching() {
        assert!(matches_pattern("a.css", "*"));
        assert!(matches_pattern("a.CSS", "*.css"));
        assert!(!matches_pattern("a.js", "*.css"));
        assert!(matches_pattern("favicon.ico", "favicon.ico"));
        assert!(!matches_pattern("other.ico", "favicon.ico"));
    }

    #[tokio::test]
    async fn serves_file_with_length_and_type() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("index.html");
        std::fs::write(&page, "<h1>pecan</h1>").unwrap();

        let server = WebServerBuilder::new()
            .map_index_file(&page, None)
            .build()
            .unwrap();
        let (head, body) = get(&server, "/").await;

        assert_eq!(head.status(), StatusCode::OK);
        assert_eq!(head.headers()[CONTENT_TYPE], "text/html");
        assert_eq!(head.headers()[CONTENT_LENGTH], "14");
        assert_eq!(body, b"<h1>pecan</h1>");
    }

    #[tokio::test]
    async fn streams_files_larger_than_a_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let blob = dir.path().join("blob.bin");
        let content: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&blob, &content).unwrap();

        let server = WebServerBuilder::new()
            .map_static_file(&blob, "/blob", Some("application/octet-stream"))
            .build()
            .unwrap();
        let (head, body) = get(&server, "/blob").await;

        assert_eq!(head.headers()[CONTENT_TYPE], "application/octet-stream");
        assert_eq!(body, content);
    }

    #[tokio::test]
    async fn missing_file_at_request_time_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone.txt");
        std::fs::write(&gone, "soon gone").unwrap();

        let server = WebServerBuilder::new()
            .map_static_file(&gone, "/gone", None)
            .build()
            .unwrap();
        std::fs::remove_file(&gone).unwrap();

        let (head, body) = get(&server, "/gone").await;
        assert_eq!(head.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.is_empty());
    }

    #[test]
    fn maps_directory_recursively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("index.html"), "").unwrap();
        std::fs::write(dir.path().join("css").join("site.css"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let all = WebServerBuilder::new()
            .map_static_files(dir.path(), "*", "/static/", None)
            .build()
            .unwrap();
        assert_eq!(all.routes().len(), 3);
        assert!(all.routes().contains("/static/css/site.css", "GET"));
        assert!(all.routes().contains("/static/index.html", "GET"));

        let css_only = WebServerBuilder::new()
            .map_static_files(dir.path(), "*.css", "/", None)
            .build()
            .unwrap();
        assert_eq!(css_only.routes().len(), 1);
        assert!(css_only.routes().contains("/css/site.css", "GET"));
    }

    #[test]
    fn missing_directory_fails_build() {
        let dir = tempfile::tempdir().unwrap();
        let err = WebServerBuilder::new()
            .map_static_files(dir.path().join("nope"), "*", "/", None)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::StaticFiles { .. }));
    }

    #[tokio::test]
    async fn serves_embedded_resources() {
        static INDEX: &[u8] = b"<p>home</p>";
        static SCRIPT: &[u8] = b"console.log(1)";

        let server = WebServerBuilder::new()
            .map_index_resource("index.html", INDEX, None)
            .map_embedded_resources(&[("app.js", SCRIPT)], "/assets", None)
            .build()
            .unwrap();

        let (head, body) = get(&server, "/").await;
        assert_eq!(head.headers()[CONTENT_TYPE], "text/html");
        assert_eq!(body, INDEX);

        let (head, body) = get(&server, "/assets/app.js").await;
        assert!(head.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(head.headers()[CONTENT_LENGTH], "14");
        assert_eq!(body, SCRIPT);
    }
}
