//! Flow-controlled single-file transfer over a [`TransferStream`].
//!
//! A [`Sender`] streams a [`ByteSource`] in bounded chunks, waiting for room
//! in the stream's send buffer before each write. A [`Receiver`] drains the
//! body into memory as data arrives. Both can be paused, report progress
//! and estimate bandwidth over a sliding window of samples.
//!
//! [`TransferStream`]: quicdrop_protocol::TransferStream

mod config;
mod estimator;
mod events;
pub mod format;
mod gate;
mod progress;
mod reader;
mod session;
mod source;
mod validation;
mod writer;

use std::time::Duration;

use quicdrop_protocol::{ProtocolError, StreamError};

pub use config::TransferConfig;
pub use estimator::{BandwidthEstimator, EstimatorState, WINDOW_SIZE};
pub use events::{NullObserver, TransferEvent, TransferObserver, TransferStatus};
pub use gate::PauseGate;
pub use progress::{ProgressHandle, TransferProgress};
pub use reader::FlowControlledReader;
pub use session::{ReceivedFile, Receiver, Sender, TransferSession};
pub use source::{ByteSource, FileSource, MemorySource, checksum_bytes};
pub use validation::validate_received_filename;
pub use writer::FlowControlledWriter;

/// Default body chunk size: 16 KiB.
///
/// Also the receiver's readiness threshold, so small enough to stay well
/// under typical stream send buffers.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Default bandwidth sampling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("stream finished after {received} of {expected} bytes")]
    Incomplete { received: u32, expected: u32 },

    #[error("source unavailable: {0}")]
    SourceUnavailable(#[source] std::io::Error),

    #[error("sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("file too large: {0} bytes does not fit the 32-bit size field")]
    FileTooLarge(u64),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("transfer already ran")]
    AlreadyFinished,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
