//! In-process loopback transport.
//!
//! [`MemoryStream::pair`] returns two connected ends. Each direction is a
//! bounded pipe whose capacity is the writer's send buffer, so backpressure
//! behaves like a real flow-controlled stream whose peer drains slowly.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::trace;

use crate::error::StreamError;
use crate::stream::{ReadResult, TransferStream};

struct Pipe {
    state: Mutex<PipeState>,
    notify: Notify,
}

struct PipeState {
    buf: VecDeque<u8>,
    capacity: usize,
    finished: bool,
    writer_gone: bool,
    reader_gone: bool,
    /// The writer is suspended waiting for room.
    writer_stalled: bool,
}

impl Pipe {
    fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PipeState {
                buf: VecDeque::with_capacity(capacity),
                capacity,
                finished: false,
                writer_gone: false,
                reader_gone: false,
                writer_stalled: false,
            }),
            notify: Notify::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, PipeState> {
        // Pipe state stays consistent even if a holder panicked.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One end of an in-memory bidirectional stream.
pub struct MemoryStream {
    outgoing: Arc<Pipe>,
    incoming: Arc<Pipe>,
}

impl MemoryStream {
    /// Creates two connected streams whose send buffers hold `capacity` bytes.
    pub fn pair(capacity: usize) -> (MemoryStream, MemoryStream) {
        let a_to_b = Pipe::new(capacity);
        let b_to_a = Pipe::new(capacity);
        (
            MemoryStream {
                outgoing: Arc::clone(&a_to_b),
                incoming: Arc::clone(&b_to_a),
            },
            MemoryStream {
                outgoing: b_to_a,
                incoming: a_to_b,
            },
        )
    }
}

#[async_trait]
impl TransferStream for MemoryStream {
    fn max_write_buffered_amount(&self) -> usize {
        self.outgoing.lock().capacity
    }

    fn max_read_buffered_amount(&self) -> usize {
        self.incoming.lock().capacity
    }

    fn write_buffered_amount(&self) -> usize {
        self.outgoing.lock().buf.len()
    }

    fn read_buffered_amount(&self) -> usize {
        self.incoming.lock().buf.len()
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StreamError> {
        let mut state = self.outgoing.lock();
        if state.finished {
            return Err(StreamError::Finished);
        }
        if state.reader_gone {
            return Err(StreamError::Reset);
        }
        if state.buf.len() + data.len() > state.capacity {
            return Err(StreamError::BufferFull {
                len: data.len(),
                buffered: state.buf.len(),
                capacity: state.capacity,
            });
        }
        state.buf.extend(data);
        drop(state);
        self.outgoing.notify.notify_waiters();
        Ok(())
    }

    fn finish(&mut self) -> Result<(), StreamError> {
        let mut state = self.outgoing.lock();
        if state.finished {
            return Err(StreamError::Finished);
        }
        state.finished = true;
        drop(state);
        trace!("loopback stream finished");
        self.outgoing.notify.notify_waiters();
        Ok(())
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<ReadResult, StreamError> {
        let mut state = self.incoming.lock();
        let amount = buf.len().min(state.buf.len());
        for (dst, src) in buf.iter_mut().zip(state.buf.drain(..amount)) {
            *dst = src;
        }
        let finished = state.finished && state.buf.is_empty();
        if amount == 0 && !finished && state.writer_gone {
            return Err(StreamError::Reset);
        }
        drop(state);
        if amount > 0 {
            self.incoming.notify.notify_waiters();
        }
        Ok(ReadResult { amount, finished })
    }

    async fn wait_for_write_buffered_amount_below(
        &mut self,
        threshold: usize,
    ) -> Result<(), StreamError> {
        loop {
            let notified = self.outgoing.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            let newly_stalled = {
                let mut state = self.outgoing.lock();
                if state.reader_gone {
                    return Err(StreamError::Reset);
                }
                if state.buf.len() <= threshold {
                    state.writer_stalled = false;
                    return Ok(());
                }
                !std::mem::replace(&mut state.writer_stalled, true)
            };
            if newly_stalled {
                // Readers waiting for more than fits may take what is queued.
                self.outgoing.notify.notify_waiters();
            }
            notified.await;
        }
    }

    async fn wait_for_readable(&mut self, amount: usize) -> Result<(), StreamError> {
        loop {
            let notified = self.incoming.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let state = self.incoming.lock();
                if state.buf.len() >= amount || state.finished {
                    return Ok(());
                }
                if state.writer_stalled && !state.buf.is_empty() {
                    return Ok(());
                }
                if state.writer_gone {
                    return Err(StreamError::Reset);
                }
            }
            notified.await;
        }
    }
}

impl Drop for MemoryStream {
    fn drop(&mut self) {
        {
            let mut out = self.outgoing.lock();
            if !out.finished {
                out.writer_gone = true;
            }
        }
        self.outgoing.notify.notify_waiters();

        self.incoming.lock().reader_gone = true;
        self.incoming.notify.notify_waiters();
    }
}
