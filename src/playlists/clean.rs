//! Cleaning a playlist of songs the user already has.
//!
//! A clean runs in two halves. [`PlaylistManager::preview_clean`] reads and
//! reconciles, then parks the result in the preview cache under a session
//! key. [`PlaylistManager::apply_clean`] writes a parked preview without
//! reading anything again. [`PlaylistManager::clean`] does both.

use std::sync::Arc;

use super::{PlaylistManager, WriteOptions, naming};
use crate::error::{Error, Result};
use crate::library::{CorpusRequest, build_corpus};
use crate::materialize::{MaterializeMode, MaterializeReport};
use crate::model::{PlaylistSummary, Track};
use crate::reconcile::{self, NoProgress, Reconciliation};
use crate::service::{MAX_IDS_PER_SAVED_CHECK, MusicService, ServiceError};

/// What a playlist is cleaned against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanAgainst {
    /// Liked tracks and every other owned playlist, by `(artist, title)`
    Everything,
    /// Named playlists (and optionally liked tracks), by `(artist, title)`
    Sources {
        playlists: Vec<String>,
        include_liked: bool,
    },
    /// The user's saved library, by exact track id
    SavedStatus,
}

#[derive(Debug, Clone)]
pub struct CleanRequest {
    /// Id or name of the playlist to clean
    pub target: String,
    pub against: CleanAgainst,
}

impl CleanRequest {
    pub fn everything(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            against: CleanAgainst::Everything,
        }
    }
}

/// A computed but unwritten clean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanPreview {
    pub target: PlaylistSummary,
    pub keep: Vec<Track>,
    pub removed: Vec<Track>,
}

/// Result of writing a clean.
#[derive(Debug, Clone)]
pub struct CleanReport {
    pub target: PlaylistSummary,
    pub kept: usize,
    pub removed: Vec<Track>,
    pub playlist: MaterializeReport,
    /// Playlist holding the removed tracks, when a backup was asked for
    pub backup: Option<MaterializeReport>,
}

/// Options for [`PlaylistManager::apply_clean`].
#[derive(Debug, Clone, Default)]
pub struct CleanWrite {
    pub options: WriteOptions,
    /// Overwrite the target itself instead of writing a new playlist
    pub in_place: bool,
    /// Also write removed tracks to a backup playlist
    pub backup: bool,
}

impl<S: MusicService + ?Sized> PlaylistManager<'_, S> {
    /// Read and reconcile, then store the result under `key`.
    pub async fn preview_clean(
        &self,
        key: &str,
        request: &CleanRequest,
    ) -> Result<Arc<CleanPreview>> {
        let target = self.find(&request.target).await?;
        let tracks = self.read_playlist(&target).await?;

        let split = match &request.against {
            CleanAgainst::SavedStatus => self.split_by_saved(&tracks).await?,
            CleanAgainst::Everything => {
                let corpus_request = CorpusRequest::everything_except([target.id.clone()]);
                self.split_by_corpus(tracks, &corpus_request).await?
            }
            CleanAgainst::Sources {
                playlists,
                include_liked,
            } => {
                let sources = self.find_all(playlists).await?;
                let corpus_request = CorpusRequest {
                    sources: sources.into_iter().map(|p| p.id).collect(),
                    excluded: vec![target.id.clone()],
                    include_liked: *include_liked,
                    ..Default::default()
                };
                self.split_by_corpus(tracks, &corpus_request).await?
            }
        };

        tracing::info!(
            "Clean preview for '{}': keep {}, remove {}",
            target.name,
            split.keep.len(),
            split.duplicates.len()
        );

        let preview = CleanPreview {
            target,
            keep: split.keep,
            removed: split.duplicates,
        };
        Ok(self.previews.insert(key.to_string(), preview))
    }

    /// Write the preview stored under `key`. The preview is consumed once
    /// the write succeeds; a failed write leaves it in place for a retry.
    pub async fn apply_clean(&self, key: &str, write: &CleanWrite) -> Result<CleanReport> {
        let key = key.to_string();
        let preview = self
            .previews
            .get(&key)
            .ok_or_else(|| Error::PreviewNotFound(key.clone()))?;

        let keep_ids: Vec<String> = preview.keep.iter().map(|t| t.id.clone()).collect();
        let mode = if write.in_place {
            MaterializeMode::ReplaceExisting(preview.target.id.clone())
        } else {
            write.options.mode(|| naming::cleaned(&preview.target.name))
        };

        let backup = if write.backup && !preview.removed.is_empty() {
            let removed_ids: Vec<String> =
                preview.removed.iter().map(|t| t.id.clone()).collect();
            let backup_mode = MaterializeMode::create(
                naming::backup(&preview.target.name),
                write.options.on_existing,
            );
            Some(self.write(&removed_ids, &backup_mode).await?)
        } else {
            None
        };

        let playlist = self.write(&keep_ids, &mode).await?;
        self.previews.take(&key);

        Ok(CleanReport {
            target: preview.target.clone(),
            kept: keep_ids.len(),
            removed: preview.removed.clone(),
            playlist,
            backup,
        })
    }

    /// Preview and apply in one go.
    pub async fn clean(&self, request: &CleanRequest, write: &CleanWrite) -> Result<CleanReport> {
        let key = format!("clean:{}", request.target);
        self.preview_clean(&key, request).await?;
        self.apply_clean(&key, write).await
    }

    async fn split_by_corpus(
        &self,
        tracks: Vec<Track>,
        request: &CorpusRequest,
    ) -> Result<Reconciliation> {
        let report = build_corpus(self.service, request).await?;
        let reference = report.into_complete()?.into_tracks();

        let progress = self.progress.clone();
        tokio::task::spawn_blocking(move || match progress {
            Some(sink) => reconcile::reconcile_with_progress(&tracks, &reference, &*sink),
            None => reconcile::reconcile_with_progress(&tracks, &reference, &NoProgress),
        })
        .await
        .map_err(|e| Error::TaskJoin(e.to_string()))
    }

    /// Keep tracks whose ids are not in the user's library.
    async fn split_by_saved(&self, tracks: &[Track]) -> Result<Reconciliation> {
        let mut result = Reconciliation::default();
        for batch in tracks.chunks(MAX_IDS_PER_SAVED_CHECK) {
            let ids: Vec<String> = batch.iter().map(|t| t.id.clone()).collect();
            let saved = self.service.saved_contains(&ids).await?;
            if saved.len() != batch.len() {
                return Err(ServiceError::Parse(format!(
                    "saved-status check answered {} of {} ids",
                    saved.len(),
                    batch.len()
                ))
                .into());
            }
            for (track, is_saved) in batch.iter().zip(saved) {
                if is_saved {
                    result.duplicates.push(track.clone());
                } else {
                    result.keep.push(track.clone());
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::materialize::ExistingPolicy;
    use crate::reconcile::Progress;
    use crate::service::mocks::{Call, FakeService};
    use crate::test_utils::{ids, sample_library, track, tracks};

    fn manager(service: &FakeService) -> PlaylistManager<'_, FakeService> {
        PlaylistManager::new(service, &Config::default())
    }

    #[tokio::test]
    async fn test_clean_against_everything() {
        let service = sample_library();
        let report = manager(&service)
            .clean(&CleanRequest::everything("Road Trip"), &CleanWrite::default())
            .await
            .unwrap();

        // r1 is in Gym, r3 is liked; the target never matches itself
        assert_eq!(ids(&report.removed), vec!["r1", "r3"]);
        assert_eq!(report.kept, 1);
        assert_eq!(report.playlist.playlist.name, "Cleaned: Road Trip");
        assert_eq!(service.track_ids(&report.playlist.playlist.id), vec!["r2"]);
        assert!(report.backup.is_none());
        // the original is untouched
        assert_eq!(service.track_ids("road"), vec!["r1", "r2", "r3"]);
    }

    #[tokio::test]
    async fn test_clean_against_named_sources() {
        let service = sample_library();
        let request = CleanRequest {
            target: "Road Trip".to_string(),
            against: CleanAgainst::Sources {
                playlists: vec!["Friend Mix".to_string()],
                include_liked: false,
            },
        };
        let report = manager(&service)
            .clean(&request, &CleanWrite::default())
            .await
            .unwrap();
        assert_eq!(ids(&report.removed), vec!["r3"]);
    }

    #[tokio::test]
    async fn test_clean_in_place_with_backup() {
        let service = sample_library();
        let write = CleanWrite {
            in_place: true,
            backup: true,
            ..Default::default()
        };
        let report = manager(&service)
            .clean(&CleanRequest::everything("Road Trip"), &write)
            .await
            .unwrap();

        assert_eq!(service.track_ids("road"), vec!["r2"]);
        let backup = report.backup.unwrap();
        assert_eq!(backup.playlist.name, "Dupes removed from: Road Trip");
        assert_eq!(service.track_ids(&backup.playlist.id), vec!["r1", "r3"]);
    }

    #[tokio::test]
    async fn test_clean_by_saved_status_uses_ids() {
        let service = FakeService::new("me")
            .with_playlist(
                "p",
                "Mix",
                "me",
                tracks(&[("saved", "A", "One"), ("new", "B", "Two"), ("other-id", "C", "Three")]),
            )
            .with_liked(tracks(&[("saved", "A", "One"), ("liked-id", "C", "Three")]));
        let request = CleanRequest {
            target: "Mix".to_string(),
            against: CleanAgainst::SavedStatus,
        };
        let report = manager(&service)
            .clean(&request, &CleanWrite::default())
            .await
            .unwrap();

        // same song under another id is not caught by the id check
        assert_eq!(ids(&report.removed), vec!["saved"]);
        assert_eq!(report.kept, 2);
    }

    #[tokio::test]
    async fn test_saved_status_checked_in_batches() {
        let many: Vec<Track> = (0..120)
            .map(|i| track(&format!("t{i}"), "A", &format!("Song {i}")))
            .collect();
        let service = FakeService::new("me")
            .with_page_size(50)
            .with_playlist("p", "Big", "me", many);
        let request = CleanRequest {
            target: "Big".to_string(),
            against: CleanAgainst::SavedStatus,
        };
        let report = manager(&service)
            .clean(&request, &CleanWrite::default())
            .await
            .unwrap();
        assert_eq!(report.kept, 120);
    }

    #[tokio::test]
    async fn test_preview_then_apply_without_rereading() {
        let service = sample_library();
        let manager = manager(&service);

        let preview = manager
            .preview_clean("s1", &CleanRequest::everything("Road Trip"))
            .await
            .unwrap();
        assert_eq!(ids(&preview.removed), vec!["r1", "r3"]);
        assert!(service.calls().is_empty());

        // later reads would see a different library; the preview is used as-is
        service.state().playlists.clear();
        let write = CleanWrite {
            options: WriteOptions::named("Tidy"),
            ..Default::default()
        };
        let report = manager.apply_clean("s1", &write).await.unwrap();
        assert_eq!(report.playlist.playlist.name, "Tidy");
        assert_eq!(service.track_ids(&report.playlist.playlist.id), vec!["r2"]);

        let err = manager.apply_clean("s1", &write).await.unwrap_err();
        assert_eq!(err.reason(), "preview_not_found");
    }

    #[tokio::test]
    async fn test_clean_refuses_existing_output_name() {
        let service = sample_library().with_playlist("old", "Cleaned: Road Trip", "me", vec![]);
        let err = manager(&service)
            .clean(&CleanRequest::everything("Road Trip"), &CleanWrite::default())
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "name_taken");

        let write = CleanWrite {
            options: WriteOptions::default().on_existing(ExistingPolicy::Replace),
            ..Default::default()
        };
        let report = manager(&service)
            .clean(&CleanRequest::everything("Road Trip"), &write)
            .await
            .unwrap();
        assert_eq!(report.playlist.playlist.id, "old");
    }

    #[tokio::test]
    async fn test_failed_apply_keeps_preview() {
        let service = sample_library().with_playlist("old", "Cleaned: Road Trip", "me", vec![]);
        let manager = manager(&service);
        manager
            .preview_clean("s1", &CleanRequest::everything("Road Trip"))
            .await
            .unwrap();

        let err = manager
            .apply_clean("s1", &CleanWrite::default())
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "name_taken");

        let write = CleanWrite {
            options: WriteOptions::default().on_existing(ExistingPolicy::Replace),
            ..Default::default()
        };
        let report = manager.apply_clean("s1", &write).await.unwrap();
        assert_eq!(report.playlist.playlist.id, "old");
        assert_eq!(service.track_ids("old"), vec!["r2"]);
    }

    #[tokio::test]
    async fn test_clean_with_nothing_removed_still_writes_copy() {
        let service = FakeService::new("me").with_playlist(
            "p",
            "Solo",
            "me",
            tracks(&[("a", "A", "One"), ("b", "B", "Two")]),
        );
        let report = manager(&service)
            .clean(&CleanRequest::everything("Solo"), &CleanWrite::default())
            .await
            .unwrap();

        assert!(report.removed.is_empty());
        assert_eq!(report.playlist.playlist.name, "Cleaned: Solo");
        assert_eq!(service.track_ids(&report.playlist.playlist.id), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_unreadable_reference_aborts_before_write() {
        let service = sample_library().with_unreadable("gym");
        let err = manager(&service)
            .clean(&CleanRequest::everything("Road Trip"), &CleanWrite::default())
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "source_unreadable");
        assert!(
            !service
                .calls()
                .iter()
                .any(|c| matches!(c, Call::Create(_) | Call::Replace { .. }))
        );
    }

    #[tokio::test]
    async fn test_progress_reaches_total() {
        let service = sample_library();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Progress>();
        let manager = manager(&service).with_progress(Arc::new(tx));

        manager
            .preview_clean("p", &CleanRequest::everything("Road Trip"))
            .await
            .unwrap();

        let mut last = None;
        while let Ok(progress) = rx.try_recv() {
            last = Some(progress);
        }
        assert_eq!(
            last,
            Some(Progress {
                processed: 3,
                total: 3
            })
        );
    }
}
