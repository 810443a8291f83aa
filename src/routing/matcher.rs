//! Route key normalization.
//!
//! # Responsibilities
//! - Normalize (path, method) pairs into a lookup key
//! - Keep insertion and lookup on the same normalization
//!
//! # Design Decisions
//! - Path and method are both upper-cased, so matching is case-insensitive
//! - No wildcards, no parameter segments: keys compare byte-for-byte
//! - Query strings never take part in matching

use std::fmt;

/// Normalized (path, method) route key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    path: String,
    method: String,
}

impl RouteKey {
    /// Create a key, upper-casing both parts.
    pub fn new(path: &str, method: &str) -> Self {
        Self {
            path: path.to_uppercase(),
            method: method.to_uppercase(),
        }
    }

    /// Normalized path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Normalized method.
    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}
