use quicdrop_protocol::TransferStream;
use tracing::{debug, trace, warn};

use crate::TransferError;
use crate::events::TransferObserver;
use crate::gate::PauseGate;
use crate::progress::ProgressHandle;

/// Drains exactly `total` body bytes from a stream into memory, honouring
/// the pause gate between readiness and draining.
pub struct FlowControlledReader<'a, S: ?Sized> {
    stream: &'a mut S,
    total: u32,
    chunk_size: usize,
    gate: &'a PauseGate,
    progress: &'a ProgressHandle,
    observer: &'a dyn TransferObserver,
}

impl<'a, S> FlowControlledReader<'a, S>
where
    S: TransferStream + ?Sized,
{
    pub fn new(
        stream: &'a mut S,
        total: u32,
        chunk_size: usize,
        gate: &'a PauseGate,
        progress: &'a ProgressHandle,
        observer: &'a dyn TransferObserver,
    ) -> Self {
        Self {
            stream,
            total,
            chunk_size,
            gate,
            progress,
            observer,
        }
    }

    /// Appends the body to `sink`.
    ///
    /// Fails with [`TransferError::Incomplete`] if the peer finishes early;
    /// whatever arrived before that stays in `sink`.
    pub async fn run(mut self, sink: &mut Vec<u8>) -> Result<u32, TransferError> {
        // A threshold above the peer's buffer could never be reached.
        let max_readable = self.stream.max_read_buffered_amount().max(1);
        let mut offset: u32 = 0;

        while offset < self.total {
            let remaining = (self.total - offset) as usize;
            self.stream
                .wait_for_readable(self.chunk_size.min(remaining).min(max_readable))
                .await?;
            self.gate.wait_released().await;

            // Drain everything buffered, but never past the declared size.
            let available = self.stream.read_buffered_amount().min(remaining);
            let start = sink.len();
            sink.try_reserve(available)
                .map_err(|e| TransferError::SinkUnavailable(e.to_string()))?;
            sink.resize(start + available, 0);
            let result = match self.stream.read_into(&mut sink[start..]) {
                Ok(result) => result,
                Err(e) => {
                    sink.truncate(start);
                    return Err(e.into());
                }
            };
            sink.truncate(start + result.amount);

            offset += result.amount as u32;
            if result.amount > 0 {
                self.progress.advance_to(offset);
                self.observer.on_progress(self.progress.snapshot());
                trace!(offset, total = self.total, "chunk drained");
            }

            if result.finished && offset < self.total {
                warn!(
                    received = offset,
                    expected = self.total,
                    "stream finished before the declared size"
                );
                return Err(TransferError::Incomplete {
                    received: offset,
                    expected: self.total,
                });
            }
        }

        if self.stream.read_buffered_amount() > 0 {
            warn!(
                trailing = self.stream.read_buffered_amount(),
                "ignoring bytes past the declared size"
            );
        }
        debug!(total = self.total, "body received");
        Ok(offset)
    }
}
