//! Trait definition for the remote music service.
//!
//! Every component talks to the service through [`MusicService`], so tests
//! can substitute the in-memory fake from [`super::mocks`] while production
//! code uses [`super::spotify::SpotifyClient`].
//!
//! # Example
//!
//! ```ignore
//! use playlist_minder::service::MusicService;
//!
//! async fn owned<S: MusicService>(service: &S) -> Result<usize, ServiceError> {
//!     let me = service.current_user().await?;
//!     let lists = collect_pages(|c| service.user_playlists(c)).await?;
//!     Ok(lists.iter().filter(|p| p.is_owned_by(&me.id)).count())
//! }
//! ```

use async_trait::async_trait;

use super::domain::{Page, ServiceError};
use crate::model::{PlaybackSnapshot, PlayedTrack, PlaylistSummary, Track, User};

/// Largest number of items a single playlist write may carry.
pub const MAX_ITEMS_PER_WRITE: usize = 100;

/// Largest number of ids a single saved-status check may carry.
pub const MAX_IDS_PER_SAVED_CHECK: usize = 50;

/// Operations consumed from the remote music service.
///
/// Listing methods take an opaque continuation cursor (`None` for the first
/// page). Track listings are already filtered: episodes, local files and
/// items without an id or artist never appear.
#[async_trait]
pub trait MusicService: Send + Sync {
    /// The user the credentials belong to.
    async fn current_user(&self) -> Result<User, ServiceError>;

    /// Playlists the user follows or owns.
    async fn user_playlists(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<PlaylistSummary>, ServiceError>;

    /// Metadata for a single playlist.
    async fn playlist(&self, playlist_id: &str) -> Result<PlaylistSummary, ServiceError>;

    /// Tracks of a playlist, in playlist order.
    async fn playlist_tracks(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<Track>, ServiceError>;

    /// The user's liked tracks, most recently saved first.
    async fn liked_tracks(&self, cursor: Option<String>) -> Result<Page<Track>, ServiceError>;

    /// Whether each id is in the user's library. At most
    /// [`MAX_IDS_PER_SAVED_CHECK`] ids per call.
    async fn saved_contains(&self, track_ids: &[String]) -> Result<Vec<bool>, ServiceError>;

    /// Listening history, most recent play first.
    async fn recently_played(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<PlayedTrack>, ServiceError>;

    /// Current device playback, or `None` when nothing is playing anywhere.
    async fn playback(&self) -> Result<Option<PlaybackSnapshot>, ServiceError>;

    /// Id of the track currently loaded on the active device.
    async fn currently_playing(&self) -> Result<Option<String>, ServiceError>;

    async fn set_volume(&self, percent: u8) -> Result<(), ServiceError>;

    async fn resume(&self) -> Result<(), ServiceError>;

    async fn pause(&self) -> Result<(), ServiceError>;

    async fn skip_next(&self) -> Result<(), ServiceError>;

    async fn seek(&self, position_ms: u64) -> Result<(), ServiceError>;

    async fn add_to_queue(&self, track_id: &str) -> Result<(), ServiceError>;

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        public: bool,
    ) -> Result<PlaylistSummary, ServiceError>;

    /// Replace all items of a playlist. At most [`MAX_ITEMS_PER_WRITE`] ids.
    async fn replace_playlist_items(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), ServiceError>;

    /// Append items to a playlist. At most [`MAX_ITEMS_PER_WRITE`] ids.
    async fn add_playlist_items(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), ServiceError>;
}

#[async_trait]
impl MusicService for super::spotify::SpotifyClient {
    async fn current_user(&self) -> Result<User, ServiceError> {
        self.current_user().await
    }

    async fn user_playlists(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<PlaylistSummary>, ServiceError> {
        self.user_playlists(cursor).await
    }

    async fn playlist(&self, playlist_id: &str) -> Result<PlaylistSummary, ServiceError> {
        self.playlist(playlist_id).await
    }

    async fn playlist_tracks(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<Track>, ServiceError> {
        self.playlist_tracks(playlist_id, cursor).await
    }

    async fn liked_tracks(&self, cursor: Option<String>) -> Result<Page<Track>, ServiceError> {
        self.liked_tracks(cursor).await
    }

    async fn saved_contains(&self, track_ids: &[String]) -> Result<Vec<bool>, ServiceError> {
        self.saved_contains(track_ids).await
    }

    async fn recently_played(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<PlayedTrack>, ServiceError> {
        self.recently_played(cursor).await
    }

    async fn playback(&self) -> Result<Option<PlaybackSnapshot>, ServiceError> {
        self.playback().await
    }

    async fn currently_playing(&self) -> Result<Option<String>, ServiceError> {
        self.currently_playing().await
    }

    async fn set_volume(&self, percent: u8) -> Result<(), ServiceError> {
        self.set_volume(percent).await
    }

    async fn resume(&self) -> Result<(), ServiceError> {
        self.resume().await
    }

    async fn pause(&self) -> Result<(), ServiceError> {
        self.pause().await
    }

    async fn skip_next(&self) -> Result<(), ServiceError> {
        self.skip_next().await
    }

    async fn seek(&self, position_ms: u64) -> Result<(), ServiceError> {
        self.seek(position_ms).await
    }

    async fn add_to_queue(&self, track_id: &str) -> Result<(), ServiceError> {
        self.add_to_queue(track_id).await
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        public: bool,
    ) -> Result<PlaylistSummary, ServiceError> {
        self.create_playlist(user_id, name, public).await
    }

    async fn replace_playlist_items(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), ServiceError> {
        self.replace_playlist_items(playlist_id, track_ids).await
    }

    async fn add_playlist_items(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), ServiceError> {
        self.add_playlist_items(playlist_id, track_ids).await
    }
}
