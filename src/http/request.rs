//! Request correlation.
//!
//! # Responsibilities
//! - Number every dispatched request so its log lines can be grouped
//!
//! # Design Decisions
//! - Identifiers wrap around on overflow; they group log lines and carry no
//!   uniqueness guarantee
//! - The counter belongs to one server instance

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Correlation identifier of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out request identifiers, starting at 1.
#[derive(Debug)]
pub struct RequestIdSequence {
    last: AtomicU64,
}

impl RequestIdSequence {
    pub fn new() -> Self {
        Self::starting_after(0)
    }

    /// A sequence whose first identifier follows `last`.
    pub fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    pub fn next_id(&self) -> RequestId {
        // fetch_add wraps on overflow.
        RequestId(self.last.fetch_add(1, Ordering::Relaxed).wrapping_add(1))
    }
}

impl Default for RequestIdSequence {
    fn default() -> Self {
        Self::new()
    }
}
