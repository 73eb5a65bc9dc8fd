//! Coordinated shutdown: tri-state run flag plus a cancellation tree.
//!
//! The root token is the global interrupt fan-out. Every entity's stop
//! token is a child of the root, so cancelling the root reaches every
//! watcher at once, while cancelling one child stops only that entity.
//! The flag itself is written once per transition and read cooperatively
//! by the countdown and monitor loops.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::error::WatchError;

/// Process-wide run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Stopping,
    Stopped,
}

const RUNNING: u8 = 0;
const STOPPING: u8 = 1;
const STOPPED: u8 = 2;

/// Shared shutdown context.
#[derive(Debug)]
pub struct Shutdown {
    token: CancellationToken,
    state: AtomicU8,
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            state: AtomicU8::new(RUNNING),
        }
    }

    pub fn state(&self) -> RunState {
        match self.state.load(Ordering::SeqCst) {
            RUNNING => RunState::Running,
            STOPPING => RunState::Stopping,
            _ => RunState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) == RUNNING
    }

    /// Transition running -> stopping.
    ///
    /// Returns true only for the call that made the transition, so
    /// competing initiators (timer expiry, interrupt, empty registry)
    /// agree on who announced it.
    pub fn begin(&self) -> bool {
        self.state
            .compare_exchange(RUNNING, STOPPING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Transition stopping -> stopped, after all watchers are joined.
    pub fn complete(&self) -> bool {
        self.state
            .compare_exchange(STOPPING, STOPPED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Cancel the root token, stopping every watcher.
    pub fn cancel_all(&self) {
        self.token.cancel();
    }

    /// Resolves when the root token is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Derive a stop token for one entity.
    pub fn entity_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the process-wide interrupt route.
///
/// A `Ctrl-C` to the controller sets the flag to stopping and cancels
/// the root token; the cancellation cascade is the broadcast that
/// reaches every watcher's process group. Installation failure is a
/// fatal setup error.
pub fn route_interrupt(
    shutdown: Arc<Shutdown>,
) -> Result<tokio::task::JoinHandle<()>, WatchError> {
    let mut interrupt =
        signal(SignalKind::interrupt()).map_err(|source| WatchError::Interrupt { source })?;

    Ok(tokio::spawn(async move {
        if interrupt.recv().await.is_some() {
            if shutdown.begin() {
                crate::log_event!("signal", "interrupt received, stopping all watchers");
            }
            shutdown.cancel_all();
        }
    }))
}
