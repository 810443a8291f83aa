//! Sink forwarding entries to `tracing`.

use std::io;

use super::LogSink;

/// Emits each entry as an INFO event under the `pecan::log` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, text: &str) -> io::Result<()> {
        tracing::info!(target: "pecan::log", "{text}");
        Ok(())
    }
}
