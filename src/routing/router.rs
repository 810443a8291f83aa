//! Route table.
//!
//! # Responsibilities
//! - Store registered routes keyed by normalized (path, method)
//! - Reject duplicate registrations without touching the existing entry
//! - Look up the route for a request or report an explicit not-found
//!
//! # Design Decisions
//! - Mutable only while the builder owns it; the server holds it behind an
//!   `Arc` with no mutating API, so serve-time lookups need no locking
//! - O(1) lookup via HashMap

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use http::Method;

use crate::error::{ConfigurationError, RequestError};
use crate::handler::Handler;
use crate::routing::matcher::RouteKey;

/// A registered route: normalized key plus its handler.
#[derive(Clone)]
pub struct Route {
    key: RouteKey,
    handler: Handler,
}

impl Route {
    /// Normalized key of this route.
    pub fn key(&self) -> &RouteKey {
        &self.key
    }

    /// Handler bound to this route.
    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("key", &self.key)
            .field("shape", &self.handler.shape())
            .finish()
    }
}

/// Mapping from (path, method) to handler.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    routes: HashMap<RouteKey, Route>,
}

impl RouteTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler.
    ///
    /// Fails with [`ConfigurationError::DuplicateRoute`] if the normalized key
    /// is taken; the existing route is kept.
    pub fn register(
        &mut self,
        path: &str,
        method: &Method,
        handler: Handler,
    ) -> Result<&Route, ConfigurationError> {
        let key = RouteKey::new(path, method.as_str());
        match self.routes.entry(key) {
            Entry::Occupied(entry) => Err(ConfigurationError::DuplicateRoute {
                key: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                let key = entry.key().clone();
                Ok(entry.insert(Route { key, handler }))
            }
        }
    }

    /// Find the route for a request path and method, in any letter case.
    pub fn lookup(&self, path: &str, method: &str) -> Result<&Route, RequestError> {
        let key = RouteKey::new(path, method);
        match self.routes.get(&key) {
            Some(route) => Ok(route),
            None => Err(RequestError::NotFound { key }),
        }
    }

    /// Whether a route exists for the key.
    pub fn contains(&self, path: &str, method: &str) -> bool {
        self.routes.contains_key(&RouteKey::new(path, method))
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes ordered by key, for deterministic listings.
    pub fn routes(&self) -> Vec<&Route> {
        let mut routes: Vec<&Route> = self.routes.values().collect();
        routes.sort_by(|a, b| a.key.cmp(&b.key));
        routes
    }
}
