//! Server lifecycle state.

use std::fmt;

use tokio::sync::watch;

use crate::error::ConfigurationError;

/// Where a server is in its lifecycle.
///
/// `Created → Starting → Listening → Stopping → Stopped`. A server runs at
/// most once; `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Built, not yet run.
    Created,
    /// Binding the listener.
    Starting,
    /// Accepting requests.
    Listening,
    /// Loop has observed a stop; closing the listener.
    Stopping,
    Stopped,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Created => "created",
            ServerState::Starting => "starting",
            ServerState::Listening => "listening",
            ServerState::Stopping => "stopping",
            ServerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Published lifecycle state.
#[derive(Debug)]
pub struct StateCell {
    tx: watch::Sender<ServerState>,
}

impl StateCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ServerState::Created);
        Self { tx }
    }

    pub fn get(&self) -> ServerState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.tx.subscribe()
    }

    /// Move from `Created` to `Starting`; any other state means the server
    /// has already been run.
    pub fn begin(&self) -> Result<(), ConfigurationError> {
        let began = self.tx.send_if_modified(|state| {
            if *state == ServerState::Created {
                *state = ServerState::Starting;
                true
            } else {
                false
            }
        });
        if began {
            Ok(())
        } else {
            Err(ConfigurationError::AlreadyStarted)
        }
    }

    pub fn set(&self, next: ServerState) {
        let previous = self.tx.send_replace(next);
        tracing::debug!(from = %previous, to = %next, "Server state changed");
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
