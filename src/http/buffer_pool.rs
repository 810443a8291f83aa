//! Reusable byte buffers for the response path.
//!
//! # Responsibilities
//! - Hand out exclusive scratch buffers of at least a requested capacity
//! - Take them back when the guard drops, on success and failure alike
//!
//! # Design Decisions
//! - Scoped to a server instance and passed explicitly, never global
//! - Bounded: at most `max_pooled` buffers are retained, and oversized
//!   buffers are released to the allocator instead of being kept

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::BytesMut;

/// Pool of reusable byte buffers.
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    free: Mutex<Vec<BytesMut>>,
    max_pooled: usize,
    max_retained_capacity: usize,
}

impl BufferPool {
    /// Create a pool retaining at most `max_pooled` buffers of at most
    /// `max_retained_capacity` bytes each.
    pub fn new(max_pooled: usize, max_retained_capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new(Vec::with_capacity(max_pooled)),
                max_pooled,
                max_retained_capacity,
            }),
        }
    }

    /// Take an empty buffer with capacity of at least `min_capacity`.
    pub fn acquire(&self, min_capacity: usize) -> PooledBuffer {
        let reused = {
            let mut free = self.inner.free.lock().unwrap_or_else(PoisonError::into_inner);
            free.iter()
                .position(|buf| buf.capacity() >= min_capacity)
                .map(|idx| free.swap_remove(idx))
        };

        let buf = reused.unwrap_or_else(|| BytesMut::with_capacity(min_capacity));
        PooledBuffer {
            buf: Some(buf),
            pool: Arc::clone(&self.inner),
        }
    }

    /// Buffers currently waiting in the pool.
    pub fn available(&self) -> usize {
        self.inner
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(16, 64 * 1024)
    }
}

/// Exclusive handle to a pooled buffer. Returned to the pool on drop.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Option<BytesMut>,
    pool: Arc<PoolInner>,
}

impl Deref for PooledBuffer {
    type Target = BytesMut;

    fn deref(&self) -> &BytesMut {
        self.buf.as_ref().expect("buffer present until drop")
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut BytesMut {
        self.buf.as_mut().expect("buffer present until drop")
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let Some(mut buf) = self.buf.take() else {
            return;
        };
        if buf.capacity() > self.pool.max_retained_capacity {
            return;
        }
        buf.clear();

        let mut free = self.pool.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.pool.max_pooled {
            free.push(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_honours_minimum_capacity() {
        let pool = BufferPool::new(4, 1024);
        let buf = pool.acquire(100);
        assert!(buf.capacity() >= 100);
        assert!(buf.is_empty());
    }

    #[test]
    fn dropped_buffers_are_reused_cleared() {
        let pool = BufferPool::new(4, 1024);
        {
            let mut buf = pool.acquire(64);
            buf.extend_from_slice(b"stale");
        }
        assert_eq!(pool.available(), 1);

        let buf = pool.acquire(32);
        assert!(buf.is_empty());
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn concurrent_holders_get_distinct_buffers() {
        let pool = BufferPool::new(4, 1024);
        let mut a = pool.acquire(16);
        let mut b = pool.acquire(16);
        a.extend_from_slice(b"a");
        b.extend_from_slice(b"b");
        assert_eq!(&a[..], b"a");
        assert_eq!(&b[..], b"b");
        drop(a);
        drop(b);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn pool_is_bounded() {
        let pool = BufferPool::new(1, 1024);
        let a = pool.acquire(8);
        let b = pool.acquire(8);
        drop(a);
        drop(b);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn oversized_buffers_are_not_retained() {
        let pool = BufferPool::new(4, 128);
        drop(pool.acquire(4096));
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn buffer_returns_after_panic() {
        let pool = BufferPool::new(4, 1024);
        let cloned = pool.clone();
        let result = std::panic::catch_unwind(move || {
            let _buf = cloned.acquire(16);
            panic!("write failed");
        });
        assert!(result.is_err());
        assert_eq!(pool.available(), 1);
    }
}
