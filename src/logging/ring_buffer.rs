//! Bounded in-memory log.
//!
//! # Responsibilities
//! - Keep the last `capacity` entries, evicting the oldest first
//! - Serve readers while writers keep logging
//!
//! # Design Decisions
//! - One mutex guards the slots and both cursors; `log` and `read` are
//!   mutually exclusive
//! - Before the buffer first fills, [`RingBufferSink::read`] reports one
//!   entry fewer than were logged (`write - 1`). Readers that need every
//!   entry use [`RingBufferSink::snapshot`]

use std::io;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use super::LogSink;

/// Fixed-capacity ring of log entries.
#[derive(Debug)]
pub struct RingBufferSink {
    capacity: NonZeroUsize,
    ring: Mutex<Ring>,
}

#[derive(Debug)]
struct Ring {
    slots: Vec<String>,
    write: usize,
    read: usize,
    full: bool,
}

impl RingBufferSink {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            ring: Mutex::new(Ring {
                slots: vec![String::new(); capacity.get()],
                write: 0,
                read: 0,
                full: false,
            }),
        }
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    /// Entries currently stored.
    pub fn len(&self) -> usize {
        let ring = self.lock();
        if ring.full {
            self.capacity.get()
        } else {
            ring.write
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.lock().full
    }

    /// Up to `count` entries from the read cursor, oldest first.
    pub fn read(&self, count: usize) -> Vec<String> {
        let mut out = Vec::new();
        self.read_into(&mut out, count);
        out
    }

    /// Append up to `count` entries to `out`; returns how many were appended.
    pub fn read_into(&self, out: &mut Vec<String>, count: usize) -> usize {
        let ring = self.lock();
        let cap = self.capacity.get();
        let readable = if ring.full {
            cap
        } else {
            ring.write.saturating_sub(1)
        };
        let n = count.min(readable);

        out.reserve(n);
        out.extend((0..n).map(|i| ring.slots[(ring.read + i) % cap].clone()));
        n
    }

    /// Every stored entry, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        let ring = self.lock();
        if ring.full {
            let (newer, older) = ring.slots.split_at(ring.write);
            older.iter().chain(newer).cloned().collect()
        } else {
            ring.slots[..ring.write].to_vec()
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogSink for RingBufferSink {
    fn log(&self, text: &str) -> io::Result<()> {
        let cap = self.capacity.get();
        let mut ring = self.lock();

        let slot = ring.write;
        ring.slots[slot].clear();
        ring.slots[slot].push_str(text);

        ring.write += 1;
        if ring.write >= cap {
            ring.full = true;
            ring.write = 0;
        }
        if ring.full {
            ring.read = ring.write;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn ring(capacity: usize) -> RingBufferSink {
        RingBufferSink::new(NonZeroUsize::new(capacity).unwrap())
    }

    fn log_lines(sink: &RingBufferSink, lines: std::ops::Range<usize>) {
        for i in lines {
            sink.log(&format!("line {i}")).unwrap();
        }
    }

    #[test]
    fn read_before_full_lags_by_one() {
        let sink = ring(5);
        sink.log("first").unwrap();
        assert!(sink.read(5).is_empty());

        sink.log("second").unwrap();
        sink.log("third").unwrap();
        assert_eq!(sink.read(5), ["first", "second"]);
        assert_eq!(sink.read(1), ["first"]);
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn snapshot_has_every_entry() {
        let sink = ring(5);
        sink.log("first").unwrap();
        assert_eq!(sink.snapshot(), ["first"]);
    }

    #[test]
    fn full_buffer_returns_last_n_oldest_first() {
        let sink = ring(5);
        log_lines(&sink, 0..7);
        assert!(sink.is_full());

        let expected = ["line 2", "line 3", "line 4", "line 5", "line 6"];
        assert_eq!(sink.read(5), expected);
        assert_eq!(sink.snapshot(), expected);
        assert_eq!(sink.read(2), ["line 2", "line 3"]);
    }

    #[test]
    fn exactly_full_buffer() {
        let sink = ring(3);
        log_lines(&sink, 0..3);
        assert_eq!(sink.read(3), ["line 0", "line 1", "line 2"]);
        assert_eq!(sink.read(10).len(), 3);
    }

    #[test]
    fn read_into_appends() {
        let sink = ring(2);
        log_lines(&sink, 0..4);
        let mut out = vec!["kept".to_string()];
        assert_eq!(sink.read_into(&mut out, 2), 2);
        assert_eq!(out, ["kept", "line 2", "line 3"]);
    }

    #[test]
    fn capacity_one() {
        let sink = ring(1);
        sink.log("a").unwrap();
        sink.log("b").unwrap();
        assert_eq!(sink.read(1), ["b"]);
    }

    #[test]
    fn concurrent_logging_loses_nothing() {
        let sink = Arc::new(ring(64));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for i in 0..8 {
                        sink.log(&format!("{t}-{i}")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries = sink.read(64);
        assert_eq!(entries.len(), 64);
        let distinct: HashSet<_> = entries.iter().collect();
        assert_eq!(distinct.len(), 64);
    }

    #[test]
    fn readers_run_alongside_writers() {
        let sink = Arc::new(ring(16));
        let writer = {
            let sink = Arc::clone(&sink);
            std::thread::spawn(move || log_lines(&sink, 0..1000))
        };
        for _ in 0..100 {
            let entries = sink.read(16);
            assert!(entries.len() <= 16);
            assert!(entries.iter().all(|e| e.starts_with("line ")));
        }
        writer.join().unwrap();
        assert_eq!(sink.read(16).last().map(String::as_str), Some("line 999"));
    }
}
