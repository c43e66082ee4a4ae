//! Typed events consumed by the UI collaborator.

use quicdrop_protocol::TransferHeader;
use tokio::sync::mpsc;
use tracing::trace;

use crate::progress::TransferProgress;

/// Lifecycle of a transfer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    /// Created, `run` not called yet.
    Pending,
    /// Header exchange or body streaming in progress.
    Running,
    /// Every body byte was sent or received.
    Completed,
    /// Aborted with the given error message.
    Failed(String),
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Failed(_))
    }
}

/// Event emitted by a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    /// Header written (sender) or read (receiver).
    Header { filename: String, file_size: u32 },
    /// A body chunk was written or drained.
    Progress(TransferProgress),
    /// Estimator tick, in bits per second.
    Rate { bits_per_second: f64 },
    StatusChanged(TransferStatus),
}

/// Receives session notifications. All methods default to no-ops.
pub trait TransferObserver: Send + Sync {
    fn on_header(&self, _header: &TransferHeader) {}

    fn on_progress(&self, _progress: TransferProgress) {}

    fn on_rate(&self, _bits_per_second: f64) {}

    fn on_status(&self, _status: &TransferStatus) {}
}

/// Observer that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl TransferObserver for NullObserver {}

/// Forwards events to a channel without blocking the transfer loop.
///
/// Events are dropped when the channel is full or closed.
impl TransferObserver for mpsc::Sender<TransferEvent> {
    fn on_header(&self, header: &TransferHeader) {
        forward(
            self,
            TransferEvent::Header {
                filename: header.filename.clone(),
                file_size: header.file_size,
            },
        );
    }

    fn on_progress(&self, progress: TransferProgress) {
        forward(self, TransferEvent::Progress(progress));
    }

    fn on_rate(&self, bits_per_second: f64) {
        forward(self, TransferEvent::Rate { bits_per_second });
    }

    fn on_status(&self, status: &TransferStatus) {
        forward(self, TransferEvent::StatusChanged(status.clone()));
    }
}

fn forward(tx: &mpsc::Sender<TransferEvent>, event: TransferEvent) {
    if let Err(e) = tx.try_send(event) {
        trace!("dropping transfer event: {e}");
    }
}
