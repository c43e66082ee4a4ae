//! One direction of a single file transfer.
//!
//! A [`Sender`] writes the header and streams a [`ByteSource`]; a
//! [`Receiver`] reads the header and accumulates the body. Both sample
//! their progress into a [`BandwidthEstimator`] on every poll tick while
//! the transfer runs, in the same task as the transfer itself.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use quicdrop_protocol::{TransferHeader, TransferStream, wire};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::TransferConfig;
use crate::estimator::BandwidthEstimator;
use crate::events::{NullObserver, TransferObserver, TransferStatus};
use crate::gate::PauseGate;
use crate::progress::{ProgressHandle, TransferProgress};
use crate::reader::FlowControlledReader;
use crate::source::ByteSource;
use crate::validation::validate_received_filename;
use crate::writer::FlowControlledWriter;
use crate::TransferError;

/// Shared surface of [`Sender`] and [`Receiver`].
#[async_trait]
pub trait TransferSession: Send {
    type Output: Send;

    /// Runs the transfer to completion. May only be called once; later
    /// calls fail with [`TransferError::AlreadyFinished`].
    async fn run(&mut self) -> Result<Self::Output, TransferError>;

    /// Gate toggled by pause/resume. Clone it to control the transfer from
    /// another task while `run` is in progress.
    fn pause_gate(&self) -> &PauseGate;

    /// Progress readable from other tasks.
    fn progress_handle(&self) -> &ProgressHandle;

    fn status(&self) -> TransferStatus;

    /// Current estimate in bits per second.
    fn average_rate(&self) -> f64;

    fn pause(&self) -> bool {
        self.pause_gate().pause()
    }

    fn resume(&self) -> bool {
        self.pause_gate().resume()
    }

    /// Flips the pause state and returns `true` if now paused.
    fn toggle_pause(&self) -> bool {
        self.pause_gate().toggle()
    }

    fn is_paused(&self) -> bool {
        self.pause_gate().is_paused()
    }

    fn progress(&self) -> TransferProgress {
        self.progress_handle().snapshot()
    }
}

// ---------------------------------------------------------------------------
// SessionCore
// ---------------------------------------------------------------------------

struct SessionCore {
    config: TransferConfig,
    gate: PauseGate,
    progress: ProgressHandle,
    estimator: BandwidthEstimator,
    status: TransferStatus,
    observer: Arc<dyn TransferObserver>,
}

impl SessionCore {
    fn new(config: TransferConfig) -> Self {
        Self {
            estimator: BandwidthEstimator::new(config.poll_interval),
            config,
            gate: PauseGate::new(),
            progress: ProgressHandle::new(),
            status: TransferStatus::Pending,
            observer: Arc::new(NullObserver),
        }
    }

    fn set_status(&mut self, status: TransferStatus) {
        self.observer.on_status(&status);
        self.status = status;
    }

    /// Runs `work` while ticking the estimator, then records the outcome.
    async fn drive<T, F>(&mut self, work: F) -> Result<T, TransferError>
    where
        F: Future<Output = Result<T, TransferError>> + Send,
        T: Send,
    {
        if self.status != TransferStatus::Pending {
            return Err(TransferError::AlreadyFinished);
        }
        self.set_status(TransferStatus::Running);
        if let Err(e) = self.config.validate() {
            self.set_status(TransferStatus::Failed(e.to_string()));
            return Err(e);
        }
        self.estimator.start();

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        tokio::pin!(work);
        let result = loop {
            tokio::select! {
                result = &mut work => break result,
                _ = ticker.tick() => {
                    self.estimator.push_sample(self.progress.offset() as u64);
                    self.observer.on_rate(self.estimator.average_rate());
                }
            }
        };

        let progress = self.progress.snapshot();
        self.estimator.finish(progress.offset as u64);
        let rate = self.estimator.average_rate();
        self.observer.on_rate(rate);

        match &result {
            Ok(_) => {
                info!(bytes = progress.offset, bits_per_second = rate, "transfer completed");
                self.set_status(TransferStatus::Completed);
            }
            Err(e) => {
                warn!(
                    offset = progress.offset,
                    total = progress.total,
                    "transfer failed: {e}"
                );
                self.set_status(TransferStatus::Failed(e.to_string()));
            }
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Sender
// ---------------------------------------------------------------------------

/// Sends one [`ByteSource`] over a stream.
pub struct Sender<S, B> {
    stream: S,
    source: B,
    core: SessionCore,
}

impl<S, B> Sender<S, B>
where
    S: TransferStream,
    B: ByteSource,
{
    pub fn new(stream: S, source: B, config: TransferConfig) -> Self {
        Self {
            stream,
            source,
            core: SessionCore::new(config),
        }
    }

    /// Replaces the default no-op observer.
    pub fn with_observer(mut self, observer: Arc<dyn TransferObserver>) -> Self {
        self.core.observer = observer;
        self
    }

    /// Releases the stream, e.g. to keep it alive until the peer drained it.
    pub fn into_stream(self) -> S {
        self.stream
    }
}

async fn send_file<S, B>(
    stream: &mut S,
    source: &B,
    config: TransferConfig,
    gate: PauseGate,
    progress: ProgressHandle,
    observer: Arc<dyn TransferObserver>,
) -> Result<u32, TransferError>
where
    S: TransferStream + ?Sized,
    B: ByteSource + ?Sized,
{
    let capacity = stream.max_write_buffered_amount();
    if config.chunk_size > capacity {
        return Err(TransferError::InvalidConfig(format!(
            "chunkSize {} exceeds stream capacity {capacity}",
            config.chunk_size
        )));
    }

    let len = source.len();
    let file_size = u32::try_from(len).map_err(|_| TransferError::FileTooLarge(len))?;
    let header = TransferHeader {
        filename: source.name().to_string(),
        file_size,
    };
    progress.set_total(file_size);

    wire::write_header(stream, &header).await?;
    observer.on_header(&header);

    FlowControlledWriter::new(
        stream,
        source,
        file_size,
        config.chunk_size,
        &gate,
        &progress,
        observer.as_ref(),
    )
    .run()
    .await
}

#[async_trait]
impl<S, B> TransferSession for Sender<S, B>
where
    S: TransferStream,
    B: ByteSource,
{
    /// Number of body bytes sent.
    type Output = u32;

    async fn run(&mut self) -> Result<u32, TransferError> {
        let Self {
            stream,
            source,
            core,
        } = self;
        debug!(filename = source.name(), size = source.len(), "starting send");
        let work = send_file(
            stream,
            &*source,
            core.config.clone(),
            core.gate.clone(),
            core.progress.clone(),
            Arc::clone(&core.observer),
        );
        core.drive(work).await
    }

    fn pause_gate(&self) -> &PauseGate {
        &self.core.gate
    }

    fn progress_handle(&self) -> &ProgressHandle {
        &self.core.progress
    }

    fn status(&self) -> TransferStatus {
        self.core.status.clone()
    }

    fn average_rate(&self) -> f64 {
        self.core.estimator.average_rate()
    }
}

// ---------------------------------------------------------------------------
// Receiver
// ---------------------------------------------------------------------------

/// A completely received file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFile {
    /// Name announced by the sender (not yet validated).
    pub filename: String,
    pub data: Vec<u8>,
}

impl ReceivedFile {
    /// Writes the file under `dir` and returns its path.
    ///
    /// The peer-supplied name must stay inside `dir`.
    pub async fn save_to(&self, dir: &Path) -> Result<PathBuf, TransferError> {
        validate_received_filename(&self.filename)?;
        let path = dir.join(&self.filename);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &self.data).await?;
        debug!(path = %path.display(), size = self.data.len(), "received file saved");
        Ok(path)
    }
}

/// Receives one file from a stream into memory.
pub struct Receiver<S> {
    stream: S,
    data: Vec<u8>,
    filename: Option<String>,
    core: SessionCore,
}

impl<S> Receiver<S>
where
    S: TransferStream,
{
    pub fn new(stream: S, config: TransferConfig) -> Self {
        Self {
            stream,
            data: Vec::new(),
            filename: None,
            core: SessionCore::new(config),
        }
    }

    /// Replaces the default no-op observer.
    pub fn with_observer(mut self, observer: Arc<dyn TransferObserver>) -> Self {
        self.core.observer = observer;
        self
    }

    /// Filename from the header, once it has been read.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Body bytes accumulated so far. After a failed run this holds
    /// everything that arrived before the failure.
    pub fn partial_data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_stream(self) -> S {
        self.stream
    }
}

async fn receive_file<S>(
    stream: &mut S,
    sink: &mut Vec<u8>,
    filename: &mut Option<String>,
    config: TransferConfig,
    gate: PauseGate,
    progress: ProgressHandle,
    observer: Arc<dyn TransferObserver>,
) -> Result<(), TransferError>
where
    S: TransferStream + ?Sized,
{
    let header = wire::read_header(stream).await?;
    progress.set_total(header.file_size);
    *filename = Some(header.filename.clone());
    observer.on_header(&header);

    FlowControlledReader::new(
        stream,
        header.file_size,
        config.chunk_size,
        &gate,
        &progress,
        observer.as_ref(),
    )
    .run(sink)
    .await?;
    Ok(())
}

#[async_trait]
impl<S> TransferSession for Receiver<S>
where
    S: TransferStream,
{
    type Output = ReceivedFile;

    async fn run(&mut self) -> Result<ReceivedFile, TransferError> {
        let Self {
            stream,
            data,
            filename,
            core,
        } = self;
        let work = receive_file(
            stream,
            &mut *data,
            &mut *filename,
            core.config.clone(),
            core.gate.clone(),
            core.progress.clone(),
            Arc::clone(&core.observer),
        );
        core.drive(work).await?;

        Ok(ReceivedFile {
            filename: filename.clone().unwrap_or_default(),
            data: std::mem::take(data),
        })
    }

    fn pause_gate(&self) -> &PauseGate {
        &self.core.gate
    }

    fn progress_handle(&self) -> &ProgressHandle {
        &self.core.progress
    }

    fn status(&self) -> TransferStatus {
        self.core.status.clone()
    }

    fn average_rate(&self) -> f64 {
        self.core.estimator.average_rate()
    }
}
