//! The queue capture state machine.
//!
//! ```text
//! Idle -> Initializing -> Muting -> Seeding -> Capturing -> Draining -> Restoring -> Done
//!              |                       |            |
//!              v                       +------------+--> [Draining ->] Restoring -> Error
//!            Error
//! ```
//!
//! Once playback has been read, every exit path goes through `Restoring`
//! exactly once: position (if the queue was touched), volume (if one was
//! read) and pause state (if the session had to resume playback). A failure
//! after the sentinel was queued still drains past it first.

use std::sync::Arc;

use super::{CaptureConfig, CaptureError, CaptureOutcome, CaptureState, Scheduler, TokioScheduler};
use crate::model::PlaybackSnapshot;
use crate::service::{MusicService, ServiceError};

/// One walk of the device queue.
pub struct QueueCaptureSession<'a, S: MusicService + ?Sized> {
    service: &'a S,
    scheduler: Arc<dyn Scheduler>,
    config: CaptureConfig,
    state: CaptureState,
    history: Vec<CaptureState>,
    captured: Vec<String>,
    muted: bool,
    resumed: bool,
    seeded: bool,
    /// Sentinel is in the device queue
    queued: bool,
    /// Last track seen playing after seeding
    last_seen: Option<String>,
    restored: bool,
    reskips: usize,
}

impl<'a, S: MusicService + ?Sized> QueueCaptureSession<'a, S> {
    pub fn new(service: &'a S, config: CaptureConfig) -> Self {
        Self {
            service,
            scheduler: Arc::new(TokioScheduler),
            config,
            state: CaptureState::Idle,
            history: Vec::new(),
            captured: Vec::new(),
            muted: false,
            resumed: false,
            seeded: false,
            queued: false,
            last_seen: None,
            restored: false,
            reskips: 0,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Every state entered during the last run, in order.
    pub fn history(&self) -> &[CaptureState] {
        &self.history
    }

    /// Whether muting succeeded in the last run.
    pub fn was_muted(&self) -> bool {
        self.muted
    }

    /// Skips that had to be repeated because playback did not move.
    pub fn reskips(&self) -> usize {
        self.reskips
    }

    /// Walk the queue and return what was in it.
    pub async fn run(&mut self) -> Result<CaptureOutcome, CaptureError> {
        self.reset();

        self.enter(CaptureState::Initializing);
        let snapshot = match self.service.playback().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) | Err(ServiceError::NoActiveDevice) => {
                return Err(self.fail(CaptureError::NoActivePlayback));
            }
            Err(e) => return Err(self.fail(CaptureError::Service(e))),
        };
        tracing::debug!(
            "Playback at {} ms, playing: {}, volume: {:?}",
            snapshot.position_ms,
            snapshot.is_playing,
            snapshot.volume_percent
        );

        self.mute(&snapshot).await;
        let walked = match self.walk(&snapshot).await {
            Err(e) => {
                self.recover().await;
                Err(e)
            }
            ok => ok,
        };
        self.restore(&snapshot).await;

        match walked {
            Ok(outcome) => {
                self.enter(CaptureState::Done);
                tracing::info!("Captured {} queued tracks", outcome.track_ids().len());
                Ok(outcome)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn reset(&mut self) {
        self.state = CaptureState::Idle;
        self.history.clear();
        self.captured.clear();
        self.muted = false;
        self.resumed = false;
        self.seeded = false;
        self.queued = false;
        self.last_seen = None;
        self.restored = false;
        self.reskips = 0;
    }

    fn enter(&mut self, next: CaptureState) {
        tracing::debug!("Capture {:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    fn fail(&mut self, error: CaptureError) -> CaptureError {
        tracing::warn!("Queue capture failed: {}", error);
        self.enter(CaptureState::Error);
        error
    }

    fn failed(&self, source: ServiceError) -> CaptureError {
        CaptureError::CaptureFailed {
            captured: self.captured.clone(),
            source,
        }
    }

    async fn mute(&mut self, snapshot: &PlaybackSnapshot) {
        self.enter(CaptureState::Muting);
        if snapshot.volume_percent.is_none() {
            tracing::debug!("Device reports no volume, not muting");
            return;
        }
        match self.service.set_volume(0).await {
            Ok(()) => self.muted = true,
            Err(e) => tracing::warn!("Could not mute device, capturing audibly: {}", e),
        }
    }

    async fn walk(&mut self, snapshot: &PlaybackSnapshot) -> Result<CaptureOutcome, CaptureError> {
        let mut current = self.seed(snapshot).await?;

        self.enter(CaptureState::Capturing);
        let limit = self.config.queue_limit;
        let cooldown_at = limit.saturating_sub(self.config.cooldown_margin);
        let mut limit_reached = false;

        while current != self.config.sentinel_id {
            if self.captured.len() >= limit {
                tracing::warn!("Queue limit of {} reached, stopping", limit);
                limit_reached = true;
                break;
            }
            if self.captured.len() == cooldown_at {
                tracing::info!(
                    "Pausing {:?} near the queue limit so the service can catch up",
                    self.config.cooldown
                );
                self.scheduler.sleep(self.config.cooldown).await;
            }
            tracing::debug!("Queue[{}] = {}", self.captured.len(), current);
            self.captured.push(current.clone());
            current = self.advance(&current).await?;
        }

        self.drain(current).await;

        let captured = self.captured.clone();
        Ok(if limit_reached {
            CaptureOutcome::LimitReached(captured)
        } else if captured.is_empty() {
            CaptureOutcome::Empty
        } else {
            CaptureOutcome::Captured(captured)
        })
    }

    /// Put the sentinel (then the current track) at the end of the queue and
    /// skip to the first queued track.
    async fn seed(&mut self, snapshot: &PlaybackSnapshot) -> Result<String, CaptureError> {
        self.enter(CaptureState::Seeding);

        if !snapshot.is_playing {
            self.service.resume().await.map_err(|e| self.failed(e))?;
            self.resumed = true;
        }

        let original = match self.service.currently_playing().await {
            Ok(Some(id)) => id,
            Ok(None) => return Err(CaptureError::NoCurrentTrack),
            Err(e) => return Err(self.failed(e)),
        };

        self.seeded = true;
        self.last_seen = Some(original.clone());
        let sentinel = self.config.sentinel_id.clone();
        self.service
            .add_to_queue(&sentinel)
            .await
            .map_err(|e| self.failed(e))?;
        self.queued = true;
        self.service
            .add_to_queue(&original)
            .await
            .map_err(|e| self.failed(e))?;

        self.advance(&original).await
    }

    /// Skip and wait for the current track to change from `previous`.
    ///
    /// A skip that has not shown up by the step deadline is repeated once;
    /// a second miss is a stall.
    async fn advance(&mut self, previous: &str) -> Result<String, CaptureError> {
        self.skip().await?;
        let mut retried = false;
        let mut deadline = self.scheduler.now() + self.config.step_deadline;

        loop {
            let observed = self
                .service
                .currently_playing()
                .await
                .map_err(|e| self.failed(e))?;
            if let Some(id) = observed
                && id != previous
            {
                self.last_seen = Some(id.clone());
                return Ok(id);
            }

            if self.scheduler.now() >= deadline {
                if retried {
                    return Err(CaptureError::Stalled {
                        captured: self.captured.clone(),
                    });
                }
                tracing::debug!(
                    "Still on {} after {:?}, skipping again",
                    previous,
                    self.config.step_deadline
                );
                self.reskips += 1;
                retried = true;
                self.skip().await?;
                deadline = self.scheduler.now() + self.config.step_deadline;
                continue;
            }

            self.scheduler.sleep(self.config.poll_interval).await;
        }
    }

    async fn skip(&mut self) -> Result<(), CaptureError> {
        self.service.skip_next().await.map_err(|e| self.failed(e))?;
        self.scheduler.sleep(self.config.settle_delay).await;
        Ok(())
    }

    /// Move past the sentinel. Failures here do not undo a capture.
    async fn drain(&mut self, mut current: String) {
        self.enter(CaptureState::Draining);

        let mut steps = 0;
        while current != self.config.sentinel_id {
            if steps >= self.config.queue_limit {
                tracing::warn!("Sentinel never came up, leaving the queue as it is");
                return;
            }
            match self.advance(&current).await {
                Ok(next) => current = next,
                Err(e) => {
                    tracing::warn!("Could not reach the sentinel: {}", e);
                    return;
                }
            }
            steps += 1;
        }

        if let Err(e) = self.skip().await {
            tracing::warn!("Could not skip past the sentinel: {}", e);
        }
    }

    /// Drain after a failed walk so the sentinel does not stay queued.
    async fn recover(&mut self) {
        if !self.queued {
            return;
        }
        match self.last_seen.clone() {
            Some(current) => self.drain(current).await,
            None => tracing::warn!("Playback position unknown, sentinel left in the queue"),
        }
    }

    async fn restore(&mut self, snapshot: &PlaybackSnapshot) {
        if self.restored {
            return;
        }
        self.restored = true;
        self.enter(CaptureState::Restoring);

        if self.seeded
            && let Err(e) = self.service.seek(snapshot.position_ms).await
        {
            tracing::warn!("Could not restore playback position: {}", e);
        }

        if let Some(volume) = snapshot.volume_percent {
            match self.service.set_volume(volume).await {
                Ok(()) => tracing::debug!("Volume restored to {}", volume),
                Err(e) => tracing::warn!("Could not restore volume to {}: {}", volume, e),
            }
        }

        if self.resumed
            && let Err(e) = self.service.pause().await
        {
            tracing::warn!("Could not pause playback again: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::capture::DEFAULT_SENTINEL_ID;
    use crate::capture::scheduler::testing::RecordingScheduler;
    use crate::service::mocks::{Call, FakeDevice, FakeService};

    const QUEUE: [&str; 5] = ["q1", "q2", "q3", "q4", "q5"];

    fn service(device: FakeDevice) -> FakeService {
        FakeService::new("me").with_device(device)
    }

    fn strings(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn last_calls(service: &FakeService, n: usize) -> Vec<Call> {
        let calls = service.calls();
        calls[calls.len().saturating_sub(n)..].to_vec()
    }

    #[tokio::test(start_paused = true)]
    async fn test_captures_whole_queue_and_restores() {
        let service = service(FakeDevice::playing("now", &QUEUE));
        let mut session = QueueCaptureSession::new(&service, CaptureConfig::default());

        let outcome = session.run().await.unwrap();

        assert_eq!(outcome, CaptureOutcome::Captured(strings(&QUEUE)));
        assert!(!outcome.track_ids().contains(&DEFAULT_SENTINEL_ID.to_string()));
        assert!(session.was_muted());
        assert_eq!(
            session.history(),
            &[
                CaptureState::Initializing,
                CaptureState::Muting,
                CaptureState::Seeding,
                CaptureState::Capturing,
                CaptureState::Draining,
                CaptureState::Restoring,
                CaptureState::Done,
            ]
        );

        let calls = service.calls();
        assert_eq!(calls[0], Call::SetVolume(0));
        assert_eq!(calls[1], Call::Queue(DEFAULT_SENTINEL_ID.to_string()));
        assert_eq!(calls[2], Call::Queue("now".to_string()));
        // seed + one per queued track + drain
        assert_eq!(calls.iter().filter(|c| **c == Call::Skip).count(), 7);
        assert_eq!(last_calls(&service, 2), vec![Call::Seek(42_000), Call::SetVolume(65)]);

        let state = service.state();
        assert_eq!(state.device.current.as_deref(), Some("now"));
        assert!(state.device.queue.is_empty());
        assert_eq!(state.device.volume, Some(65));
        assert_eq!(state.device.position_ms, 42_000);
        assert!(state.device.is_playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_failure_mid_capture_still_restores() {
        let mut device = FakeDevice::playing("now", &QUEUE);
        // seed skip is #1, so #4 is the skip after the third track
        device.failing_skips.insert(4);
        let service = service(device);
        let mut session = QueueCaptureSession::new(&service, CaptureConfig::default());

        let err = session.run().await.unwrap_err();

        assert!(matches!(err, CaptureError::CaptureFailed { .. }));
        assert_eq!(err.reason(), "device_control_denied");
        assert_eq!(err.captured(), strings(&["q1", "q2", "q3"]).as_slice());
        assert_eq!(session.state(), CaptureState::Error);
        assert!(session.history().contains(&CaptureState::Restoring));
        assert_eq!(last_calls(&service, 2), vec![Call::Seek(42_000), Call::SetVolume(65)]);
        assert_eq!(service.state().device.volume, Some(65));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_queue_still_restores() {
        let service = service(FakeDevice::playing("now", &[]));
        let mut session = QueueCaptureSession::new(&service, CaptureConfig::default());

        let outcome = session.run().await.unwrap();

        assert_eq!(outcome, CaptureOutcome::Empty);
        assert_eq!(last_calls(&service, 2), vec![Call::Seek(42_000), Call::SetVolume(65)]);
        let state = service.state();
        assert_eq!(state.device.current.as_deref(), Some("now"));
        assert_eq!(state.device.volume, Some(65));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_active_playback_touches_nothing() {
        let service = service(FakeDevice::default());
        let mut session = QueueCaptureSession::new(&service, CaptureConfig::default());

        let err = session.run().await.unwrap_err();

        assert!(matches!(err, CaptureError::NoActivePlayback));
        assert!(service.calls().is_empty());
        assert!(!session.history().contains(&CaptureState::Restoring));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_current_track_restores_volume_only() {
        let mut device = FakeDevice::playing("now", &QUEUE);
        device.hide_current = true;
        let service = service(device);
        let mut session = QueueCaptureSession::new(&service, CaptureConfig::default());

        let err = session.run().await.unwrap_err();

        assert_eq!(err.reason(), "no_current_track");
        assert_eq!(service.calls(), vec![Call::SetVolume(0), Call::SetVolume(65)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mute_denied_is_not_fatal() {
        let mut device = FakeDevice::playing("now", &["q1", "q2"]);
        device.deny_volume = true;
        let service = service(device);
        let mut session = QueueCaptureSession::new(&service, CaptureConfig::default());

        let outcome = session.run().await.unwrap();

        assert_eq!(outcome.track_ids(), strings(&["q1", "q2"]).as_slice());
        assert!(!session.was_muted());
        // restore is still attempted with the volume read at the start
        assert_eq!(service.calls().last(), Some(&Call::SetVolume(65)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_volume_skips_mute_and_restore() {
        let mut device = FakeDevice::playing("now", &["q1"]);
        device.volume = None;
        let service = service(device);
        let mut session = QueueCaptureSession::new(&service, CaptureConfig::default());

        session.run().await.unwrap();

        assert!(
            !service
                .calls()
                .iter()
                .any(|c| matches!(c, Call::SetVolume(_)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignored_skip_is_retried_once() {
        let mut device = FakeDevice::playing("now", &QUEUE);
        device.ignored_skips.insert(2);
        let service = service(device);
        let mut session = QueueCaptureSession::new(&service, CaptureConfig::default());

        let start = tokio::time::Instant::now();
        let outcome = session.run().await.unwrap();

        assert_eq!(outcome, CaptureOutcome::Captured(strings(&QUEUE)));
        assert_eq!(session.reskips(), 1);
        assert!(start.elapsed() >= Duration::from_millis(1250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_missed_skip_is_a_stall() {
        let mut device = FakeDevice::playing("now", &QUEUE);
        device.ignored_skips.extend([2, 3]);
        let service = service(device);
        let mut session = QueueCaptureSession::new(&service, CaptureConfig::default());

        let err = session.run().await.unwrap_err();

        assert!(matches!(err, CaptureError::Stalled { .. }));
        assert_eq!(err.captured(), strings(&["q1"]).as_slice());
        assert_eq!(service.calls().last(), Some(&Call::SetVolume(65)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_drains_past_sentinel() {
        let mut device = FakeDevice::playing("now", &QUEUE);
        device.ignored_skips.extend([2, 3]);
        let service = service(device);
        let mut session = QueueCaptureSession::new(&service, CaptureConfig::default());

        let err = session.run().await.unwrap_err();

        assert_eq!(err.reason(), "capture_stalled");
        assert_eq!(
            session.history(),
            &[
                CaptureState::Initializing,
                CaptureState::Muting,
                CaptureState::Seeding,
                CaptureState::Capturing,
                CaptureState::Draining,
                CaptureState::Restoring,
                CaptureState::Error,
            ]
        );
        let state = service.state();
        assert_eq!(state.device.current.as_deref(), Some("now"));
        assert!(state.device.queue.is_empty());
        assert_eq!(state.device.position_ms, 42_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_seed_skip_still_drains() {
        let mut device = FakeDevice::playing("now", &QUEUE);
        device.failing_skips.insert(1);
        let service = service(device);
        let mut session = QueueCaptureSession::new(&service, CaptureConfig::default());

        let err = session.run().await.unwrap_err();

        assert_eq!(err.reason(), "device_control_denied");
        assert!(err.captured().is_empty());
        assert!(session.history().contains(&CaptureState::Draining));
        let state = service.state();
        assert_eq!(state.device.current.as_deref(), Some("now"));
        assert!(state.device.queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_queue_is_not_drained() {
        let mut device = FakeDevice::playing("now", &QUEUE);
        device.deny_queue = true;
        let service = service(device);
        let mut session = QueueCaptureSession::new(&service, CaptureConfig::default());

        let err = session.run().await.unwrap_err();

        assert_eq!(err.reason(), "device_control_denied");
        assert!(!session.history().contains(&CaptureState::Draining));
        assert!(!service.calls().contains(&Call::Skip));
        assert_eq!(service.state().device.queue.len(), QUEUE.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_paused_device_is_paused_again() {
        let mut device = FakeDevice::playing("now", &["q1"]);
        device.is_playing = false;
        let service = service(device);
        let mut session = QueueCaptureSession::new(&service, CaptureConfig::default());

        session.run().await.unwrap();

        let calls = service.calls();
        assert!(calls.contains(&Call::Resume));
        assert_eq!(calls.last(), Some(&Call::Pause));
        assert!(!service.state().device.is_playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_returns_partial_queue_after_cooldown() {
        let queue = ["q1", "q2", "q3", "q4", "q5", "q6"];
        let service = service(FakeDevice::playing("now", &queue));
        let config = CaptureConfig {
            queue_limit: 4,
            cooldown_margin: 2,
            ..CaptureConfig::default()
        };
        let scheduler = Arc::new(RecordingScheduler::default());
        let mut session =
            QueueCaptureSession::new(&service, config).with_scheduler(scheduler.clone());

        let outcome = session.run().await.unwrap();

        assert_eq!(
            outcome,
            CaptureOutcome::LimitReached(strings(&["q1", "q2", "q3", "q4"]))
        );
        assert_eq!(scheduler.count(Duration::from_secs(10)), 1);
        // drained past the rest of the queue and the sentinel
        assert_eq!(service.state().device.current.as_deref(), Some("now"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_can_run_again() {
        let service = service(FakeDevice::playing("now", &["q1"]));
        let mut session = QueueCaptureSession::new(&service, CaptureConfig::default());

        assert_eq!(session.run().await.unwrap().track_ids().len(), 1);
        assert_eq!(session.run().await.unwrap(), CaptureOutcome::Empty);
    }
}
