//! Remote music service access.
//!
//! # Architecture
//!
//! Same separation as every external integration in this crate:
//! - **Domain types** (`domain.rs`) - pages and [`ServiceError`]
//! - **Trait** (`traits.rs`) - [`MusicService`], the seam everything else uses
//! - **Spotify** (`spotify/`) - DTOs, adapter and HTTP client
//! - **Mocks** (`mocks.rs`, tests only) - in-memory service with a simulated device
//!
//! Track listings are normalized at the adapter boundary, so nothing past
//! this module ever sees an episode, a local file, or a track without an id
//! or artist.

pub mod domain;
#[cfg(test)]
pub mod mocks;
pub mod spotify;
pub mod traits;

pub use domain::{Page, ServiceError, collect_pages};
pub use spotify::SpotifyClient;
pub use traits::{MAX_IDS_PER_SAVED_CHECK, MAX_ITEMS_PER_WRITE, MusicService};
