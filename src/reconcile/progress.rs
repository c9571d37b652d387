//! Best-effort progress reporting for long scans.
//!
//! A sink that fails (for example a channel whose receiver is gone) never
//! aborts the scan; the failure is logged once and the scan continues.

use tokio::sync::mpsc::UnboundedSender;

/// `processed` of `total` items handled so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    /// Fraction complete (0.0 - 1.0).
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f32 / self.total as f32
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("progress sink closed")]
pub struct SinkClosed;

/// Receives progress updates.
pub trait ProgressSink: Send + Sync {
    fn update(&self, progress: Progress) -> Result<(), SinkClosed>;
}

/// Discards every update.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _progress: Progress) -> Result<(), SinkClosed> {
        Ok(())
    }
}

impl ProgressSink for UnboundedSender<Progress> {
    fn update(&self, progress: Progress) -> Result<(), SinkClosed> {
        self.send(progress).map_err(|_| SinkClosed)
    }
}

/// Wraps a sink so that only the first failure is logged.
pub(crate) struct Reporter<'a> {
    sink: &'a dyn ProgressSink,
    total: usize,
    failed: bool,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink, total: usize) -> Self {
        Self {
            sink,
            total,
            failed: false,
        }
    }

    pub(crate) fn report(&mut self, processed: usize) {
        if self.failed {
            return;
        }
        let progress = Progress {
            processed,
            total: self.total,
        };
        if let Err(e) = self.sink.update(progress) {
            tracing::debug!("Progress updates stopped at {}/{}: {}", processed, self.total, e);
            self.failed = true;
        }
    }
}
