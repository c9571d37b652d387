//! Adapter layer: Convert Spotify DTOs to domain models
//!
//! This is the ONLY place where DTO types are converted to domain types.
//! It is also where unmatchable items are dropped: episodes, local files,
//! and tracks without an id or a named first artist.

use chrono::{DateTime, Utc};

use super::dto;
use crate::model::{PlaybackSnapshot, PlayedTrack, PlaylistSummary, Track, User};
use crate::service::domain::Page;

const TRACK_URI_PREFIX: &str = "spotify:track:";

/// Convert a playable item to a track, or `None` if it cannot take part in
/// matching.
pub fn to_track(item: dto::PlayableItem) -> Option<Track> {
    if item.is_local {
        return None;
    }
    if item.item_type.as_deref().is_some_and(|t| t != "track") {
        return None;
    }

    let id = item.id.filter(|id| !id.is_empty())?;
    let primary_artist = item
        .artists
        .into_iter()
        .next()
        .and_then(|a| a.name)
        .filter(|name| !name.is_empty())?;

    Some(Track {
        id,
        title: item.name.unwrap_or_default(),
        primary_artist,
    })
}

/// Convert a page of playlist items or saved tracks.
pub fn to_track_page(page: dto::Paging<dto::ItemWrapper>) -> Page<Track> {
    let items = page
        .items
        .into_iter()
        .filter_map(|wrapper| wrapper.track)
        .filter_map(to_track)
        .collect();

    Page {
        items,
        next: page.next,
    }
}

/// Convert a listening history entry. Entries with an unreadable timestamp
/// are dropped along with unmatchable tracks.
pub fn to_played(entry: dto::PlayHistory) -> Option<PlayedTrack> {
    let played_at = match DateTime::parse_from_rfc3339(&entry.played_at) {
        Ok(at) => at.with_timezone(&Utc),
        Err(e) => {
            tracing::debug!("Skipping play with timestamp {:?}: {}", entry.played_at, e);
            return None;
        }
    };
    Some(PlayedTrack {
        track: to_track(entry.track?)?,
        played_at,
        context_uri: entry.context.map(|c| c.uri),
    })
}

pub fn to_played_page(page: dto::Paging<dto::PlayHistory>) -> Page<PlayedTrack> {
    Page {
        items: page.items.into_iter().filter_map(to_played).collect(),
        next: page.next,
    }
}

pub fn to_summary(playlist: dto::SimplifiedPlaylist) -> PlaylistSummary {
    PlaylistSummary {
        id: playlist.id,
        name: playlist.name.unwrap_or_default(),
        owner_id: playlist.owner.id,
        total_tracks: playlist.tracks.map(|t| t.total).unwrap_or(0),
    }
}

pub fn to_summary_page(page: dto::Paging<dto::SimplifiedPlaylist>) -> Page<PlaylistSummary> {
    Page {
        items: page.items.into_iter().map(to_summary).collect(),
        next: page.next,
    }
}

pub fn to_user(user: dto::PrivateUser) -> User {
    User {
        id: user.id,
        display_name: user.display_name,
    }
}

pub fn to_snapshot(playback: dto::CurrentPlayback) -> PlaybackSnapshot {
    let (device_id, volume_percent) = playback
        .device
        .map(|d| (d.id, d.volume_percent))
        .unwrap_or((None, None));

    PlaybackSnapshot {
        current_track_id: playback.item.and_then(|item| item.id),
        position_ms: playback.progress_ms.unwrap_or(0),
        is_playing: playback.is_playing,
        volume_percent,
        device_id,
    }
}

/// `spotify:track:{id}` for write and queue endpoints.
pub fn track_uri(track_id: &str) -> String {
    if track_id.starts_with(TRACK_URI_PREFIX) {
        track_id.to_string()
    } else {
        format!("{TRACK_URI_PREFIX}{track_id}")
    }
}

pub fn to_uris(track_ids: &[String]) -> dto::UrisRequest {
    dto::UrisRequest {
        uris: track_ids.iter().map(|id| track_uri(id)).collect(),
    }
}
