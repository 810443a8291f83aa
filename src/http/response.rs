//! Response encoding.
//!
//! # Responsibilities
//! - Encode a handler [`Reply`] onto the request context's body stream
//! - Stage bytes in pooled buffers and write them in bounded chunks
//! - Stream arbitrary readers (static content) with the same discipline
//!
//! # Design Decisions
//! - `Reply::NoBody` writes nothing; `Reply::Text("")` writes an empty,
//!   length-framed body
//! - `Reply::Opaque` is refused with `RequestError::ResultEncoding` instead
//!   of guessing an encoding
//! - Content-Length is set from the UTF-8 byte length whenever the head is
//!   still uncommitted
//! - Pooled buffers are RAII guards, so they go back to the pool on every
//!   exit path, including failed writes

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::RequestError;
use crate::handler::Reply;
use crate::http::buffer_pool::BufferPool;
use crate::http::RequestContext;

/// Default size of a single body write.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Writes handler results to the client.
#[derive(Debug, Clone)]
pub struct ResponseWriter {
    pool: BufferPool,
    chunk_size: usize,
}

impl ResponseWriter {
    pub fn new(pool: BufferPool, chunk_size: usize) -> Self {
        Self {
            pool,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Encode a handler result.
    pub async fn write_reply(
        &self,
        ctx: &mut RequestContext,
        reply: Reply,
    ) -> Result<(), RequestError> {
        match reply {
            Reply::NoBody => Ok(()),
            Reply::Text(text) => Ok(self.write_str(ctx, &text).await?),
            Reply::Opaque(value) => Err(RequestError::ResultEncoding {
                type_name: value.type_name(),
            }),
        }
    }

    /// Write a string body through a pooled buffer.
    pub async fn write_str(&self, ctx: &mut RequestContext, text: &str) -> io::Result<()> {
        let mut buf = self.pool.acquire(text.len());
        buf.extend_from_slice(text.as_bytes());
        self.write_bytes(ctx, &buf).await
    }

    /// Write a complete body in `chunk_size` pieces.
    pub async fn write_bytes(&self, ctx: &mut RequestContext, bytes: &[u8]) -> io::Result<()> {
        if !ctx.is_committed() {
            ctx.set_content_length(bytes.len() as u64);
        }
        for chunk in bytes.chunks(self.chunk_size) {
            ctx.write(chunk).await?;
        }
        Ok(())
    }

    /// Copy a reader to the body until it reports end of stream.
    ///
    /// Returns the number of bytes copied.
    pub async fn copy_from<R>(&self, ctx: &mut RequestContext, mut reader: R) -> io::Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = self.pool.acquire(self.chunk_size);
        let mut copied = 0u64;
        loop {
            buf.clear();
            let n = reader.read_buf(&mut *buf).await?;
            if n == 0 {
                return Ok(copied);
            }
            ctx.write(&buf[..n]).await?;
            copied += n as u64;
        }
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new(BufferPool::default(), DEFAULT_CHUNK_SIZE)
    }
}
