//! User-driven pause/resume gate.

use std::sync::Arc;

use tokio::sync::watch;

/// Two-state gate consulted by the body loops before each chunk.
///
/// Clones share the same state: the UI holds one clone and toggles it, the
/// transfer loop holds another and waits on it. The gate can be paused and
/// resumed any number of times.
#[derive(Debug, Clone)]
pub struct PauseGate {
    tx: Arc<watch::Sender<bool>>,
}

impl PauseGate {
    /// Creates a gate in the running state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Pauses the gate. Returns `false` if it was already paused.
    pub fn pause(&self) -> bool {
        !self.tx.send_replace(true)
    }

    /// Releases the gate. Returns `false` if it was already running.
    pub fn resume(&self) -> bool {
        self.tx.send_replace(false)
    }

    /// Flips the gate and returns the new paused state.
    pub fn toggle(&self) -> bool {
        let mut paused = false;
        self.tx.send_modify(|state| {
            *state = !*state;
            paused = *state;
        });
        paused
    }

    pub fn is_paused(&self) -> bool {
        *self.tx.borrow()
    }

    /// Suspends while the gate is paused.
    pub async fn wait_released(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|paused| !*paused).await;
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}
