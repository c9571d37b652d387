//! Core data models for playlists and playback.
//!
//! Defines the primary entities: [`Track`], [`PlaylistSummary`], [`User`],
//! [`PlaybackSnapshot`] and [`PlayedTrack`]. These are OUR types; the Spotify adapter converts
//! API responses into them and drops anything that cannot take part in
//! matching (episodes, local files, items without an id or artist).

use std::fmt;

use chrono::{DateTime, Utc};

/// A playable track as seen by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Track {
    /// Opaque catalog identifier
    pub id: String,
    /// Track title, exactly as the service reports it
    pub title: String,
    /// First credited artist
    pub primary_artist: String,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        primary_artist: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            primary_artist: primary_artist.into(),
        }
    }

    /// Matching identity. Two tracks with different ids but equal keys are
    /// the same song.
    pub fn key(&self) -> TrackKey<'_> {
        TrackKey {
            artist: &self.primary_artist,
            title: &self.title,
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} ({})", self.title, self.primary_artist, self.id)
    }
}

/// `(primary_artist, title)` pair used for approximate track identity.
///
/// Comparison is exact and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackKey<'a> {
    pub artist: &'a str,
    pub title: &'a str,
}

/// Playlist metadata without tracks, as returned by listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    /// Item count reported by the service (includes unplayable items)
    pub total_tracks: u32,
}

impl PlaylistSummary {
    /// Whether the given user owns this playlist.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}

/// Device playback state captured before the queue is walked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    /// Currently loaded track, if the service reports one
    pub current_track_id: Option<String>,
    /// Progress into the current track
    pub position_ms: u64,
    pub is_playing: bool,
    /// `None` when the device does not report a volume
    pub volume_percent: Option<u8>,
    pub device_id: Option<String>,
}

/// One entry of the user's listening history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedTrack {
    pub track: Track,
    pub played_at: DateTime<Utc>,
    /// URI of the playlist, album or artist playback started from
    pub context_uri: Option<String>,
}

impl PlayedTrack {
    /// Whether playback came from the given playlist (`spotify:playlist:{id}`).
    pub fn played_from(&self, playlist_id: &str) -> bool {
        self.context_uri.as_deref().is_some_and(|uri| {
            uri.strip_suffix(playlist_id)
                .is_some_and(|prefix| prefix.ends_with(':'))
        })
    }
}

/// The user the access token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub display_name: Option<String>,
}
