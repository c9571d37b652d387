//! Test utilities and fixtures for playlist-minder tests.
//!
//! Track builders and a ready-made fake library to reduce boilerplate.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{track, tracks};
//!
//! let target = tracks(&[("s1", "Artist A", "Hit"), ("s2", "Artist B", "Hit")]);
//! ```

use crate::model::Track;
use crate::service::mocks::FakeService;

/// Build a single track.
pub fn track(id: &str, artist: &str, title: &str) -> Track {
    Track::new(id, artist, title)
}

/// Build tracks from `(id, artist, title)` triples.
pub fn tracks(specs: &[(&str, &str, &str)]) -> Vec<Track> {
    specs
        .iter()
        .map(|(id, artist, title)| track(id, artist, title))
        .collect()
}

/// Ids of a track list, in order.
pub fn ids(tracks: &[Track]) -> Vec<&str> {
    tracks.iter().map(|t| t.id.as_str()).collect()
}

/// A small library owned by `me`:
///
/// - `road` ("Road Trip", mine): Hit by A, Hit by B, Calm by C
/// - `gym` ("Gym", mine): Hit by A (different id), Pump by D
/// - `friend` ("Friend Mix", someone else's): Calm by C
/// - liked: Calm by C (different id)
pub fn sample_library() -> FakeService {
    FakeService::new("me")
        .with_playlist(
            "road",
            "Road Trip",
            "me",
            tracks(&[("r1", "A", "Hit"), ("r2", "B", "Hit"), ("r3", "C", "Calm")]),
        )
        .with_playlist(
            "gym",
            "Gym",
            "me",
            tracks(&[("g1", "A", "Hit"), ("g2", "D", "Pump")]),
        )
        .with_playlist(
            "friend",
            "Friend Mix",
            "someone",
            tracks(&[("f1", "C", "Calm")]),
        )
        .with_liked(tracks(&[("l1", "C", "Calm")]))
}
