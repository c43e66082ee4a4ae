//! Error types for the stream abstraction and wire framing.

/// Errors reported by a [`TransferStream`](crate::TransferStream) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("write of {len} bytes exceeds send buffer ({buffered} of {capacity} bytes queued)")]
    BufferFull {
        len: usize,
        buffered: usize,
        capacity: usize,
    },

    #[error("stream already finished")]
    Finished,

    #[error("stream reset by peer")]
    Reset,
}

/// Errors produced while encoding or decoding protocol frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("stream ended after {received} of {expected} frame bytes")]
    Truncated { expected: usize, received: usize },

    #[error("invalid UTF-8 in string frame: {0}")]
    InvalidEncoding(#[from] std::string::FromUtf8Error),

    #[error("frame too large: {len} bytes (max {max})")]
    FrameTooLarge { len: usize, max: usize },

    #[error("stream error: {0}")]
    Stream(#[from] StreamError),
}
