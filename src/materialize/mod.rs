//! Writing a track list into a playlist.
//!
//! Writes are "replace": the first batch replaces whatever the playlist held
//! (an empty batch clears it) and later batches append. Running the same
//! materialization twice leaves the playlist in the same state.

use crate::model::PlaylistSummary;
use crate::service::{MAX_ITEMS_PER_WRITE, MusicService, ServiceError, collect_pages};

/// What to do when a playlist with the requested name already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingPolicy {
    /// Fail with [`MaterializeError::NameTaken`]
    #[default]
    Refuse,
    /// Overwrite the existing playlist
    Replace,
    /// Create another playlist with the same name
    CreateAnyway,
}

/// Where the tracks go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializeMode {
    CreateNew {
        name: String,
        on_existing: ExistingPolicy,
    },
    ReplaceExisting(String),
}

impl MaterializeMode {
    pub fn create(name: impl Into<String>, on_existing: ExistingPolicy) -> Self {
        Self::CreateNew {
            name: name.into(),
            on_existing,
        }
    }
}

/// What a materialization did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeReport {
    pub playlist: PlaylistSummary,
    /// Whether the playlist was created by this call
    pub created: bool,
    /// Items the playlist held before
    pub prior_items: u32,
    /// Items cleared out (equal to `prior_items`)
    pub removed: u32,
    pub added: usize,
}

impl MaterializeReport {
    /// Signed change in item count.
    pub fn delta(&self) -> i64 {
        self.added as i64 - self.prior_items as i64
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MaterializeError {
    #[error("You already own a playlist named '{0}'")]
    NameTaken(String),

    #[error("Playlist write failed: {0}")]
    Service(#[from] ServiceError),

    #[error("Wrote {written} of {total} tracks to {playlist_id} before failing: {source}")]
    PartialWrite {
        playlist_id: String,
        written: usize,
        total: usize,
        #[source]
        source: ServiceError,
    },
}

impl MaterializeError {
    pub fn reason(&self) -> &'static str {
        match self {
            MaterializeError::NameTaken(_) => "name_taken",
            MaterializeError::Service(e) => e.reason(),
            MaterializeError::PartialWrite { .. } => "partial_write",
        }
    }
}

/// Writes track lists in service-sized batches.
pub struct Materializer<'a, S: MusicService + ?Sized> {
    service: &'a S,
    batch_size: usize,
}

impl<'a, S: MusicService + ?Sized> Materializer<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self {
            service,
            batch_size: MAX_ITEMS_PER_WRITE,
        }
    }

    /// Batch size, clamped to `1..=MAX_ITEMS_PER_WRITE`.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_ITEMS_PER_WRITE);
        self
    }

    pub async fn materialize(
        &self,
        user_id: &str,
        track_ids: &[String],
        mode: &MaterializeMode,
    ) -> Result<MaterializeReport, MaterializeError> {
        let (playlist, created) = match mode {
            MaterializeMode::ReplaceExisting(id) => (self.service.playlist(id).await?, false),
            MaterializeMode::CreateNew { name, on_existing } => {
                self.target_for(user_id, name, *on_existing).await?
            }
        };

        let prior_items = if created { 0 } else { playlist.total_tracks };
        self.write(&playlist.id, track_ids).await?;

        tracing::info!(
            "Wrote {} tracks to '{}' ({} before)",
            track_ids.len(),
            playlist.name,
            prior_items
        );

        Ok(MaterializeReport {
            playlist: PlaylistSummary {
                total_tracks: track_ids.len() as u32,
                ..playlist
            },
            created,
            prior_items,
            removed: prior_items,
            added: track_ids.len(),
        })
    }

    /// Find or create the playlist a `CreateNew` write goes to.
    async fn target_for(
        &self,
        user_id: &str,
        name: &str,
        on_existing: ExistingPolicy,
    ) -> Result<(PlaylistSummary, bool), MaterializeError> {
        if on_existing != ExistingPolicy::CreateAnyway {
            let playlists = collect_pages(|c| self.service.user_playlists(c)).await?;
            let existing = playlists
                .into_iter()
                .find(|p| p.name == name && p.is_owned_by(user_id));

            if let Some(existing) = existing {
                if on_existing == ExistingPolicy::Refuse {
                    return Err(MaterializeError::NameTaken(name.to_string()));
                }
                tracing::info!(
                    "Replacing existing playlist '{}' ({} tracks)",
                    name,
                    existing.total_tracks
                );
                return Ok((existing, false));
            }
        }

        let created = self.service.create_playlist(user_id, name, false).await?;
        tracing::debug!("Created playlist '{}' ({})", created.name, created.id);
        Ok((created, true))
    }

    /// Replace with the first batch, append the rest.
    async fn write(&self, playlist_id: &str, track_ids: &[String]) -> Result<(), MaterializeError> {
        let mut batches = track_ids.chunks(self.batch_size);
        let first = batches.next().unwrap_or_default();

        self.service
            .replace_playlist_items(playlist_id, first)
            .await
            .map_err(|source| MaterializeError::PartialWrite {
                playlist_id: playlist_id.to_string(),
                written: 0,
                total: track_ids.len(),
                source,
            })?;

        let mut written = first.len();
        for batch in batches {
            self.service
                .add_playlist_items(playlist_id, batch)
                .await
                .map_err(|source| MaterializeError::PartialWrite {
                    playlist_id: playlist_id.to_string(),
                    written,
                    total: track_ids.len(),
                    source,
                })?;
            written += batch.len();
        }
        Ok(())
    }
}

/// Write `track_ids` with the default batch size.
pub async fn materialize<S: MusicService + ?Sized>(
    service: &S,
    user_id: &str,
    track_ids: &[String],
    mode: &MaterializeMode,
) -> Result<MaterializeReport, MaterializeError> {
    Materializer::new(service)
        .materialize(user_id, track_ids, mode)
        .await
}
