//! Transport-agnostic view of one reliable, ordered, flow-controlled stream.
//!
//! Any transport that exposes a bounded send buffer, a readable-amount
//! threshold and an explicit finish signal (a QUIC stream, for instance)
//! can carry a transfer by implementing [`TransferStream`].

use async_trait::async_trait;

use crate::error::StreamError;

/// Outcome of draining bytes with [`TransferStream::read_into`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadResult {
    /// Number of bytes copied into the caller's buffer.
    pub amount: usize,
    /// `true` once the remote finished and every byte has been drained.
    pub finished: bool,
}

/// A bidirectional byte stream with explicit backpressure.
///
/// Writes are non-blocking enqueues that fail when they would overflow the
/// send buffer; callers suspend on
/// [`wait_for_write_buffered_amount_below`](Self::wait_for_write_buffered_amount_below)
/// first. Reads drain whatever is buffered; callers suspend on
/// [`wait_for_readable`](Self::wait_for_readable) first.
#[async_trait]
pub trait TransferStream: Send {
    /// Capacity of the send buffer (queued but not yet consumed bytes).
    fn max_write_buffered_amount(&self) -> usize;

    /// Most bytes the receive side can hold before the peer must wait.
    ///
    /// Readers never wait for more than this many bytes at once.
    fn max_read_buffered_amount(&self) -> usize;

    /// Bytes currently queued for sending.
    fn write_buffered_amount(&self) -> usize;

    /// Bytes received and not yet drained.
    fn read_buffered_amount(&self) -> usize;

    /// Enqueues `data` for sending.
    fn write(&mut self, data: &[u8]) -> Result<(), StreamError>;

    /// Enqueues the end-of-stream marker. Further writes fail.
    fn finish(&mut self) -> Result<(), StreamError>;

    /// Drains up to `buf.len()` buffered bytes into `buf`.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<ReadResult, StreamError>;

    /// Suspends until the queued amount is at or below `threshold`.
    async fn wait_for_write_buffered_amount_below(
        &mut self,
        threshold: usize,
    ) -> Result<(), StreamError>;

    /// Suspends until at least `amount` bytes are readable or the remote
    /// side has finished. Also resolves early when the remote writer is
    /// stalled on a full send buffer and some bytes are pending, so callers
    /// must drain what is buffered rather than assume `amount` arrived.
    async fn wait_for_readable(&mut self, amount: usize) -> Result<(), StreamError>;
}
