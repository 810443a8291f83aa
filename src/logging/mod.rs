//! Pluggable text logging for the dispatch loop.
//!
//! # Data Flow
//! ```text
//! WebServerBuilder::with_*_logger
//!     → sinks collected in registration order
//!     → Logger::compose (none / single / AggregateSink)
//!     → dispatch loop calls Logger::log(format_args!(..))
//!     → ConsoleSink | TracingSink | RingBufferSink (→ log page)
//! ```
//!
//! # Design Decisions
//! - A logger with no sink skips formatting entirely
//! - Sink failures never reach the request being served
//! - This is the request log shown to operators; diagnostics about the
//!   server itself go through `tracing`

pub mod aggregate;
pub mod console;
pub mod page;
pub mod ring_buffer;
pub mod tracing_sink;

use std::borrow::Cow;
use std::fmt;
use std::io;
use std::sync::Arc;

pub use aggregate::AggregateSink;
pub use console::ConsoleSink;
pub use ring_buffer::RingBufferSink;
pub use tracing_sink::TracingSink;

/// Destination for log lines.
pub trait LogSink: Send + Sync {
    /// Record one line of text.
    fn log(&self, text: &str) -> io::Result<()>;
}

/// The composed logging handle held by a server.
#[derive(Clone, Default)]
pub struct Logger {
    sink: Option<Arc<dyn LogSink>>,
}

impl Logger {
    /// A logger that drops everything.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Compose the given sinks: none, the single sink itself, or a fan-out.
    pub fn compose(mut sinks: Vec<Arc<dyn LogSink>>) -> Self {
        let sink = match sinks.len() {
            0 => None,
            1 => sinks.pop(),
            _ => Some(Arc::new(AggregateSink::new(sinks)) as Arc<dyn LogSink>),
        };
        Self { sink }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Log a formatted line. Nothing is formatted when no sink is attached.
    pub fn log(&self, args: fmt::Arguments<'_>) {
        let Some(sink) = &self.sink else {
            return;
        };

        let text = match args.as_str() {
            Some(text) => Cow::Borrowed(text),
            None => Cow::Owned(args.to_string()),
        };
        if let Err(e) = sink.log(&text) {
            tracing::warn!(error = %e, "log sink failed");
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
