//! Saving the live playback queue as a playlist.

use super::{PlaylistManager, WriteOptions};
use crate::capture::{CaptureOutcome, QueueCaptureSession};
use crate::error::Result;
use crate::materialize::MaterializeReport;
use crate::service::MusicService;

#[derive(Debug, Clone)]
pub struct QueueReport {
    pub outcome: CaptureOutcome,
    /// `None` when the queue was empty
    pub playlist: Option<MaterializeReport>,
}

impl<S: MusicService + ?Sized> PlaylistManager<'_, S> {
    /// Capture the queue and write it to a playlist.
    ///
    /// Only one capture per user runs at a time through this manager's
    /// guard. An empty queue writes nothing.
    pub async fn save_queue(&self, options: &WriteOptions) -> Result<QueueReport> {
        let me = self.me().await?;
        let _permit = self.guard.acquire(&me.id)?;

        let mut session = QueueCaptureSession::new(self.service, self.capture.clone());
        let outcome = session.run().await?;

        if let CaptureOutcome::LimitReached(ids) = &outcome {
            tracing::warn!("Queue limit reached, saving the first {} tracks", ids.len());
        }

        let playlist = match &outcome {
            CaptureOutcome::Empty => {
                tracing::info!("Queue is empty, nothing to save");
                None
            }
            CaptureOutcome::Captured(ids) | CaptureOutcome::LimitReached(ids) => {
                let mode = options.mode(|| self.settings.queue_name.clone());
                Some(self.write(ids, &mode).await?)
            }
        };

        Ok(QueueReport { outcome, playlist })
    }
}
