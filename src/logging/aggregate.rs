//! Fan-out sink.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::LogSink;

/// Delivers every entry to each sink in registration order.
///
/// A sink that fails or panics is reported and skipped; the remaining sinks
/// still receive the entry.
pub struct AggregateSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl AggregateSink {
    pub fn new(sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl LogSink for AggregateSink {
    fn log(&self, text: &str) -> io::Result<()> {
        for (index, sink) in self.sinks.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| sink.log(text))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(sink = index, error = %e, "log sink failed"),
                Err(_) => tracing::warn!(sink = index, "log sink panicked"),
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for AggregateSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
