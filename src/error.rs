//! Error taxonomy.
//!
//! Two families:
//! - [`ConfigurationError`]: raised while building a server. Fatal to startup,
//!   the server never reaches the listening state.
//! - [`RequestError`]: raised while processing a single request. Always
//!   contained by the dispatch loop and mapped to a status code; the detail
//!   goes to the logging sink, never to the response body.

use std::fmt::Write as _;
use std::io;
use std::path::PathBuf;

use http::StatusCode;
use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::net::listener::ListenerError;
use crate::routing::matcher::RouteKey;

/// Failure type handlers report with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Startup-time errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Two registrations share the same normalized (path, method) key.
    #[error("route {key} is already registered")]
    DuplicateRoute { key: RouteKey },

    /// A controller entry cannot be turned into a route.
    #[error("controller method `{method}` cannot be mapped: {reason}")]
    InvalidControllerMethod { method: String, reason: &'static str },

    /// A bind address could not be parsed.
    #[error("invalid bind address `{address}`: {reason}")]
    InvalidBindAddress { address: String, reason: String },

    /// A setting is out of its valid range.
    #[error("invalid setting `{setting}`: {reason}")]
    InvalidSetting { setting: &'static str, reason: String },

    /// Static content could not be enumerated.
    #[error("cannot map static content at {}", path.display())]
    StaticFiles {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The listener could not be started.
    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// The configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The server has already been run once.
    #[error("server has already been started")]
    AlreadyStarted,
}

/// Per-request errors. Never escape the dispatch loop.
#[derive(Debug, Error)]
pub enum RequestError {
    /// No route is registered for the request key.
    #[error("no route for {key}")]
    NotFound { key: RouteKey },

    /// The handler returned a failure.
    #[error("handler failed")]
    HandlerExecution(#[source] BoxError),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    HandlerPanicked(String),

    /// The handler produced a result the response writer cannot encode.
    #[error("cannot encode handler result of type `{type_name}`")]
    ResultEncoding { type_name: &'static str },

    /// Writing the response failed.
    #[error("failed to write response")]
    Io(#[from] io::Error),
}

impl RequestError {
    /// Status code reported to the client for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Render an error with its whole source chain, `outer: inner: root`.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(out, ": {cause}");
        source = cause.source();
    }
    out
}
