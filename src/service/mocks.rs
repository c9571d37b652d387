//! In-memory music service for tests.
//!
//! [`FakeService`] keeps playlists, liked tracks, listening history and a
//! simulated playback device behind a mutex. Faults can be injected per
//! playlist (unreadable sources), per skip call (errors or skips that
//! silently do nothing) and for queue additions. Every device/write call is
//! recorded in [`Call`] order.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};

use super::domain::{Page, ServiceError};
use super::traits::{MAX_IDS_PER_SAVED_CHECK, MAX_ITEMS_PER_WRITE, MusicService};
use crate::model::{PlaybackSnapshot, PlayedTrack, PlaylistSummary, Track, User};

/// Source key used to make the liked-tracks listing fail.
pub const LIKED_SOURCE: &str = "liked";

/// A recorded device or write call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetVolume(u8),
    Resume,
    Pause,
    Skip,
    Seek(u64),
    Queue(String),
    Create(String),
    Replace { playlist_id: String, items: usize },
    Add { playlist_id: String, items: usize },
}

/// Simulated playback device.
#[derive(Debug, Clone, Default)]
pub struct FakeDevice {
    /// `false` means nothing is playing anywhere
    pub active: bool,
    pub current: Option<String>,
    pub queue: VecDeque<String>,
    pub position_ms: u64,
    pub is_playing: bool,
    pub volume: Option<u8>,
    /// Volume commands answer 403
    pub deny_volume: bool,
    /// 1-based skip calls that fail with `DeviceControlDenied`
    pub failing_skips: HashSet<usize>,
    /// 1-based skip calls that succeed but do not advance
    pub ignored_skips: HashSet<usize>,
    /// `currently_playing` reports nothing
    pub hide_current: bool,
    /// Queue additions answer 403
    pub deny_queue: bool,
    pub skips: usize,
}

impl FakeDevice {
    /// An active device playing `current` with `queue` lined up after it.
    pub fn playing(current: &str, queue: &[&str]) -> Self {
        Self {
            active: true,
            current: Some(current.to_string()),
            queue: queue.iter().map(|id| id.to_string()).collect(),
            position_ms: 42_000,
            is_playing: true,
            volume: Some(65),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakePlaylist {
    pub summary: PlaylistSummary,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub user_id: String,
    pub playlists: Vec<FakePlaylist>,
    pub liked: Vec<Track>,
    /// Listening history, most recent first
    pub history: Vec<PlayedTrack>,
    pub history_pages: usize,
    pub page_size: usize,
    pub unreadable: HashSet<String>,
    pub device: FakeDevice,
    pub calls: Vec<Call>,
    pub created: usize,
    pub catalog: HashMap<String, Track>,
}

impl FakeState {
    fn playlist_mut(&mut self, playlist_id: &str) -> Result<&mut FakePlaylist, ServiceError> {
        self.playlists
            .iter_mut()
            .find(|p| p.summary.id == playlist_id)
            .ok_or_else(|| ServiceError::NotFound(playlist_id.to_string()))
    }

    fn resolve(&self, track_id: &str) -> Track {
        self.catalog
            .get(track_id)
            .cloned()
            .unwrap_or_else(|| Track::new(track_id, "Unknown", track_id))
    }

    fn page<T: Clone>(&self, items: &[T], cursor: Option<String>) -> Result<Page<T>, ServiceError> {
        let offset: usize = match cursor {
            Some(c) => c
                .parse()
                .map_err(|_| ServiceError::Parse(format!("bad cursor {c}")))?,
            None => 0,
        };
        let size = self.page_size.max(1);
        let end = (offset + size).min(items.len());
        let slice = items.get(offset..end).unwrap_or_default().to_vec();
        let next = (end < items.len()).then(|| end.to_string());
        Ok(Page { items: slice, next })
    }
}

/// In-memory [`MusicService`].
pub struct FakeService {
    state: Mutex<FakeState>,
}

impl FakeService {
    pub fn new(user_id: &str) -> Self {
        Self {
            state: Mutex::new(FakeState {
                user_id: user_id.to_string(),
                page_size: 2,
                ..Default::default()
            }),
        }
    }

    pub fn with_playlist(self, id: &str, name: &str, owner: &str, tracks: Vec<Track>) -> Self {
        {
            let mut state = self.state.lock();
            for track in &tracks {
                state.catalog.insert(track.id.clone(), track.clone());
            }
            state.playlists.push(FakePlaylist {
                summary: PlaylistSummary {
                    id: id.to_string(),
                    name: name.to_string(),
                    owner_id: owner.to_string(),
                    total_tracks: tracks.len() as u32,
                },
                tracks,
            });
        }
        self
    }

    pub fn with_liked(self, tracks: Vec<Track>) -> Self {
        {
            let mut state = self.state.lock();
            for track in &tracks {
                state.catalog.insert(track.id.clone(), track.clone());
            }
            state.liked = tracks;
        }
        self
    }

    pub fn with_history(self, history: Vec<PlayedTrack>) -> Self {
        self.state.lock().history = history;
        self
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state.lock().page_size = page_size;
        self
    }

    /// Make reads of a playlist (or [`LIKED_SOURCE`]) fail.
    pub fn with_unreadable(self, source: &str) -> Self {
        self.state.lock().unreadable.insert(source.to_string());
        self
    }

    pub fn with_device(self, device: FakeDevice) -> Self {
        self.state.lock().device = device;
        self
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn track_ids(&self, playlist_id: &str) -> Vec<String> {
        let state = self.state.lock();
        state
            .playlists
            .iter()
            .find(|p| p.summary.id == playlist_id)
            .map(|p| p.tracks.iter().map(|t| t.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn playlists_named(&self, name: &str) -> Vec<String> {
        let state = self.state.lock();
        state
            .playlists
            .iter()
            .filter(|p| p.summary.name == name)
            .map(|p| p.summary.id.clone())
            .collect()
    }
}

fn check_batch(len: usize, limit: usize) -> Result<(), ServiceError> {
    if len > limit {
        return Err(ServiceError::ApiError {
            status: 400,
            message: format!("too many items: {len} > {limit}"),
        });
    }
    Ok(())
}

#[async_trait]
impl MusicService for FakeService {
    async fn current_user(&self) -> Result<User, ServiceError> {
        let state = self.state.lock();
        Ok(User {
            id: state.user_id.clone(),
            display_name: None,
        })
    }

    async fn user_playlists(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<PlaylistSummary>, ServiceError> {
        let state = self.state.lock();
        let summaries: Vec<_> = state
            .playlists
            .iter()
            .map(|p| PlaylistSummary {
                total_tracks: p.tracks.len() as u32,
                ..p.summary.clone()
            })
            .collect();
        state.page(&summaries, cursor)
    }

    async fn playlist(&self, playlist_id: &str) -> Result<PlaylistSummary, ServiceError> {
        let mut state = self.state.lock();
        let playlist = state.playlist_mut(playlist_id)?;
        Ok(PlaylistSummary {
            total_tracks: playlist.tracks.len() as u32,
            ..playlist.summary.clone()
        })
    }

    async fn playlist_tracks(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<Track>, ServiceError> {
        let mut state = self.state.lock();
        if state.unreadable.contains(playlist_id) {
            return Err(ServiceError::Network(format!("{playlist_id} unreachable")));
        }
        let tracks = state.playlist_mut(playlist_id)?.tracks.clone();
        state.page(&tracks, cursor)
    }

    async fn liked_tracks(&self, cursor: Option<String>) -> Result<Page<Track>, ServiceError> {
        let state = self.state.lock();
        if state.unreadable.contains(LIKED_SOURCE) {
            return Err(ServiceError::Network("liked tracks unreachable".to_string()));
        }
        state.page(&state.liked, cursor)
    }

    async fn saved_contains(&self, track_ids: &[String]) -> Result<Vec<bool>, ServiceError> {
        check_batch(track_ids.len(), MAX_IDS_PER_SAVED_CHECK)?;
        let state = self.state.lock();
        Ok(track_ids
            .iter()
            .map(|id| state.liked.iter().any(|t| &t.id == id))
            .collect())
    }

    async fn recently_played(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<PlayedTrack>, ServiceError> {
        let mut state = self.state.lock();
        state.history_pages += 1;
        state.page(&state.history, cursor)
    }

    async fn playback(&self) -> Result<Option<PlaybackSnapshot>, ServiceError> {
        let state = self.state.lock();
        let device = &state.device;
        if !device.active {
            return Ok(None);
        }
        Ok(Some(PlaybackSnapshot {
            current_track_id: device.current.clone(),
            position_ms: device.position_ms,
            is_playing: device.is_playing,
            volume_percent: device.volume,
            device_id: Some("fake-device".to_string()),
        }))
    }

    async fn currently_playing(&self) -> Result<Option<String>, ServiceError> {
        let state = self.state.lock();
        let device = &state.device;
        if !device.active || device.hide_current {
            return Ok(None);
        }
        Ok(device.current.clone())
    }

    async fn set_volume(&self, percent: u8) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        state.calls.push(Call::SetVolume(percent));
        if state.device.deny_volume {
            return Err(ServiceError::DeviceControlDenied(
                "Cannot control device volume".to_string(),
            ));
        }
        state.device.volume = Some(percent);
        Ok(())
    }

    async fn resume(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Resume);
        state.device.is_playing = true;
        Ok(())
    }

    async fn pause(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Pause);
        state.device.is_playing = false;
        Ok(())
    }

    async fn skip_next(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Skip);
        let device = &mut state.device;
        device.skips += 1;
        if device.failing_skips.contains(&device.skips) {
            return Err(ServiceError::DeviceControlDenied("skip refused".to_string()));
        }
        if device.ignored_skips.contains(&device.skips) {
            return Ok(());
        }
        device.current = device.queue.pop_front();
        device.position_ms = 0;
        device.is_playing = device.current.is_some();
        Ok(())
    }

    async fn seek(&self, position_ms: u64) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Seek(position_ms));
        state.device.position_ms = position_ms;
        Ok(())
    }

    async fn add_to_queue(&self, track_id: &str) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Queue(track_id.to_string()));
        if state.device.deny_queue {
            return Err(ServiceError::DeviceControlDenied("queue refused".to_string()));
        }
        state.device.queue.push_back(track_id.to_string());
        Ok(())
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        _public: bool,
    ) -> Result<PlaylistSummary, ServiceError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Create(name.to_string()));
        state.created += 1;
        let summary = PlaylistSummary {
            id: format!("created-{}", state.created),
            name: name.to_string(),
            owner_id: user_id.to_string(),
            total_tracks: 0,
        };
        state.playlists.push(FakePlaylist {
            summary: summary.clone(),
            tracks: Vec::new(),
        });
        Ok(summary)
    }

    async fn replace_playlist_items(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), ServiceError> {
        check_batch(track_ids.len(), MAX_ITEMS_PER_WRITE)?;
        let mut state = self.state.lock();
        state.calls.push(Call::Replace {
            playlist_id: playlist_id.to_string(),
            items: track_ids.len(),
        });
        let tracks: Vec<Track> = track_ids.iter().map(|id| state.resolve(id)).collect();
        state.playlist_mut(playlist_id)?.tracks = tracks;
        Ok(())
    }

    async fn add_playlist_items(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), ServiceError> {
        check_batch(track_ids.len(), MAX_ITEMS_PER_WRITE)?;
        let mut state = self.state.lock();
        state.calls.push(Call::Add {
            playlist_id: playlist_id.to_string(),
            items: track_ids.len(),
        });
        let tracks: Vec<Track> = track_ids.iter().map(|id| state.resolve(id)).collect();
        state.playlist_mut(playlist_id)?.tracks.extend(tracks);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::domain::collect_pages;
    use crate::test_utils::track;

    #[tokio::test]
    async fn test_fake_paginates() {
        let service = FakeService::new("me")
            .with_page_size(2)
            .with_liked(vec![
                track("a", "A", "1"),
                track("b", "B", "2"),
                track("c", "C", "3"),
            ]);
        let first = service.liked_tracks(None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next.as_deref(), Some("2"));

        let all = collect_pages(|c| service.liked_tracks(c)).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_fake_device_skips_through_queue() {
        let service = FakeService::new("me").with_device(FakeDevice::playing("now", &["q1"]));
        service.skip_next().await.unwrap();
        assert_eq!(service.currently_playing().await.unwrap().as_deref(), Some("q1"));
        service.skip_next().await.unwrap();
        assert_eq!(service.currently_playing().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fake_rejects_oversized_batches() {
        let service = FakeService::new("me").with_playlist("p", "P", "me", vec![]);
        let ids: Vec<String> = (0..101).map(|i| i.to_string()).collect();
        let result = service.add_playlist_items("p", &ids).await;
        assert!(matches!(result, Err(ServiceError::ApiError { status: 400, .. })));
    }
}
