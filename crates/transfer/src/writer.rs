use std::io;

use quicdrop_protocol::TransferStream;
use tracing::{debug, trace};

use crate::TransferError;
use crate::events::TransferObserver;
use crate::gate::PauseGate;
use crate::progress::ProgressHandle;
use crate::source::ByteSource;

/// Streams a byte source in bounded chunks against the stream's send
/// buffer, honouring the pause gate before every chunk.
pub struct FlowControlledWriter<'a, S: ?Sized, B: ?Sized> {
    stream: &'a mut S,
    source: &'a B,
    total: u32,
    chunk_size: usize,
    gate: &'a PauseGate,
    progress: &'a ProgressHandle,
    observer: &'a dyn TransferObserver,
}

impl<'a, S, B> FlowControlledWriter<'a, S, B>
where
    S: TransferStream + ?Sized,
    B: ByteSource + ?Sized,
{
    pub fn new(
        stream: &'a mut S,
        source: &'a B,
        total: u32,
        chunk_size: usize,
        gate: &'a PauseGate,
        progress: &'a ProgressHandle,
        observer: &'a dyn TransferObserver,
    ) -> Self {
        Self {
            stream,
            source,
            total,
            chunk_size,
            gate,
            progress,
            observer,
        }
    }

    /// Writes every body byte, then the finish marker.
    ///
    /// Returns the number of bytes written. On failure the finish marker is
    /// not sent and the progress handle keeps the last written offset.
    pub async fn run(mut self) -> Result<u32, TransferError> {
        let capacity = self.stream.max_write_buffered_amount();
        let mut offset: u32 = 0;

        while offset < self.total {
            self.gate.wait_released().await;

            let want = self.chunk_size.min((self.total - offset) as usize);
            let mut chunk = self
                .source
                .read_chunk(offset as u64, want)
                .await
                .map_err(TransferError::SourceUnavailable)?;
            if chunk.is_empty() {
                return Err(TransferError::SourceUnavailable(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("source ended at {offset} of {} bytes", self.total),
                )));
            }
            chunk.truncate(want);

            self.stream
                .wait_for_write_buffered_amount_below(capacity.saturating_sub(chunk.len()))
                .await?;
            self.stream.write(&chunk)?;

            offset += chunk.len() as u32;
            self.progress.advance_to(offset);
            self.observer.on_progress(self.progress.snapshot());
            trace!(offset, total = self.total, "chunk written");
        }

        self.stream.finish()?;
        debug!(total = self.total, "body written, stream finished");
        Ok(offset)
    }
}
