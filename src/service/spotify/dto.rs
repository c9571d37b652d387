//! Spotify Web API Data Transfer Objects
//!
//! These types match what the Spotify Web API returns for the endpoints we
//! call. DO NOT use these types outside the spotify module - convert to
//! domain types in the adapter.
//!
//! API Reference: https://developer.spotify.com/documentation/web-api

use serde::{Deserialize, Serialize};

/// Generic paging object (`items` + `next` URL)
#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    /// Full URL of the next page, null on the last page
    pub next: Option<String>,
    pub total: Option<u32>,
}

/// GET /me
#[derive(Debug, Clone, Deserialize)]
pub struct PrivateUser {
    pub id: String,
    pub display_name: Option<String>,
}

/// Simplified playlist object from listings and GET /playlists/{id}
#[derive(Debug, Clone, Deserialize)]
pub struct SimplifiedPlaylist {
    pub id: String,
    pub name: Option<String>,
    pub owner: PlaylistOwner,
    /// Listings return `tracks`; newer responses may use `items`
    #[serde(alias = "items")]
    pub tracks: Option<TracksRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistOwner {
    pub id: String,
}

/// Reference to a playlist's track collection (count only)
#[derive(Debug, Clone, Deserialize)]
pub struct TracksRef {
    #[serde(default)]
    pub total: u32,
}

/// Playlist item or saved-track entry wrapping a track.
///
/// `track` is null for removed/unavailable items.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemWrapper {
    pub track: Option<PlayableItem>,
}

/// Track or episode object (only the fields we request)
#[derive(Debug, Clone, Deserialize)]
pub struct PlayableItem {
    /// Null for local files
    pub id: Option<String>,
    pub name: Option<String>,
    /// "track" or "episode"
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub is_local: bool,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub name: Option<String>,
}

/// Entry of GET /me/player/recently-played
#[derive(Debug, Clone, Deserialize)]
pub struct PlayHistory {
    pub track: Option<PlayableItem>,
    /// RFC 3339 timestamp
    pub played_at: String,
    /// Null when playback did not start from a playlist, album or artist
    pub context: Option<Context>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Context {
    pub uri: String,
}

/// GET /me/player
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentPlayback {
    pub device: Option<Device>,
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub is_playing: bool,
    pub item: Option<PlayableItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub id: Option<String>,
    pub volume_percent: Option<u8>,
}

/// GET /me/player/currently-playing
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentlyPlaying {
    pub item: Option<PlayableItem>,
}

/// Body for POST /users/{user_id}/playlists
#[derive(Debug, Clone, Serialize)]
pub struct CreatePlaylistRequest<'a> {
    pub name: &'a str,
    pub public: bool,
}

/// Body for PUT/POST /playlists/{id}/tracks
#[derive(Debug, Clone, Serialize)]
pub struct UrisRequest {
    pub uris: Vec<String>,
}

/// Error envelope: `{"error": {"status": 403, "message": "..."}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    #[serde(default)]
    pub message: String,
    /// Player errors carry a reason such as `NO_ACTIVE_DEVICE`
    pub reason: Option<String>,
}
