//! Queue capture.
//!
//! The service does not expose the play queue, so it is read by walking it:
//! mute, append a sentinel track (and the current track) to the queue, skip
//! through playback recording each track until the sentinel comes up, then
//! skip past it and put position and volume back.
//!
//! # Architecture
//!
//! - [`session`] - the [`QueueCaptureSession`] state machine
//! - [`scheduler`] - injectable time source for every delay
//! - [`guard`] - single-flight guard so two sessions never share a device

pub mod guard;
pub mod scheduler;
pub mod session;

use std::time::Duration;

use crate::service::ServiceError;

pub use guard::{CaptureGuard, CapturePermit};
pub use scheduler::{Scheduler, TokioScheduler};
pub use session::QueueCaptureSession;

/// "bittersweet" by $up1, assumed never to be in anyone's queue.
pub const DEFAULT_SENTINEL_ID: &str = "6sVK7RXMHRGxAefiqEGEbP";

/// Largest queue the service lets a user build.
pub const DEFAULT_QUEUE_LIMIT: usize = 100;

/// Session phases. `Error` can follow any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Initializing,
    Muting,
    Seeding,
    Capturing,
    Draining,
    Restoring,
    Done,
    Error,
}

/// Timings and limits for a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub sentinel_id: String,
    /// Stop recording after this many tracks
    pub queue_limit: usize,
    /// Cooldown starts this many tracks before the limit
    pub cooldown_margin: usize,
    pub cooldown: Duration,
    /// Wait after every skip before reading the current track
    pub settle_delay: Duration,
    pub poll_interval: Duration,
    /// How long a skip may take to show up before it is retried
    pub step_deadline: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sentinel_id: DEFAULT_SENTINEL_ID.to_string(),
            queue_limit: DEFAULT_QUEUE_LIMIT,
            cooldown_margin: 7,
            cooldown: Duration::from_secs(10),
            settle_delay: Duration::from_millis(250),
            poll_interval: Duration::from_millis(100),
            step_deadline: Duration::from_millis(1250),
        }
    }
}

/// Successful end of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Queued track ids, in play order
    Captured(Vec<String>),
    /// Nothing was queued
    Empty,
    /// Recording stopped at the queue limit; holds what was read
    LimitReached(Vec<String>),
}

impl CaptureOutcome {
    pub fn track_ids(&self) -> &[String] {
        match self {
            CaptureOutcome::Captured(ids) | CaptureOutcome::LimitReached(ids) => ids,
            CaptureOutcome::Empty => &[],
        }
    }

    pub fn into_track_ids(self) -> Vec<String> {
        match self {
            CaptureOutcome::Captured(ids) | CaptureOutcome::LimitReached(ids) => ids,
            CaptureOutcome::Empty => Vec::new(),
        }
    }
}

/// Errors from queue capture.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CaptureError {
    #[error("No active playback. Start playing something and retry")]
    NoActivePlayback,

    #[error("The device reports no current track")]
    NoCurrentTrack,

    #[error("Could not read playback state: {0}")]
    Service(ServiceError),

    #[error("Queue capture failed after {} tracks: {source}", captured.len())]
    CaptureFailed {
        captured: Vec<String>,
        #[source]
        source: ServiceError,
    },

    #[error("Playback did not advance after a retried skip ({} tracks read)", captured.len())]
    Stalled { captured: Vec<String> },

    #[error("A queue capture is already running for {0}")]
    InProgress(String),
}

impl CaptureError {
    /// Stable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            CaptureError::NoActivePlayback => "no_active_playback",
            CaptureError::NoCurrentTrack => "no_current_track",
            CaptureError::Service(e) => e.reason(),
            CaptureError::CaptureFailed {
                source: ServiceError::DeviceControlDenied(_),
                ..
            } => "device_control_denied",
            CaptureError::CaptureFailed { .. } => "capture_failed",
            CaptureError::Stalled { .. } => "capture_stalled",
            CaptureError::InProgress(_) => "capture_in_progress",
        }
    }

    /// Tracks read before the failure.
    pub fn captured(&self) -> &[String] {
        match self {
            CaptureError::CaptureFailed { captured, .. } | CaptureError::Stalled { captured } => {
                captured
            }
            _ => &[],
        }
    }
}
