use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Body-phase progress of one transfer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferProgress {
    /// Bytes sent or received so far.
    pub offset: u32,
    /// Declared file size.
    pub total: u32,
}

impl TransferProgress {
    /// Completion as a fraction 0.0 - 1.0. An empty file counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.offset as f64 / self.total as f64).min(1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.offset >= self.total
    }
}

/// Lock-free progress shared between the transfer loop and observers.
///
/// Only the body loop advances the offset; clones may read it at any time.
#[derive(Debug, Clone, Default)]
pub struct ProgressHandle {
    inner: Arc<ProgressInner>,
}

#[derive(Debug, Default)]
struct ProgressInner {
    offset: AtomicU32,
    total: AtomicU32,
}

impl ProgressHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> TransferProgress {
        TransferProgress {
            offset: self.offset(),
            total: self.total(),
        }
    }

    pub fn offset(&self) -> u32 {
        self.inner.offset.load(Ordering::Acquire)
    }

    pub fn total(&self) -> u32 {
        self.inner.total.load(Ordering::Acquire)
    }

    pub(crate) fn set_total(&self, total: u32) {
        self.inner.total.store(total, Ordering::Release);
    }

    /// Moves the offset forward; never backwards and never past the total.
    pub(crate) fn advance_to(&self, offset: u32) {
        let capped = offset.min(self.total());
        self.inner.offset.fetch_max(capped, Ordering::AcqRel);
    }
}
