//! Playlist operations built on the core components.
//!
//! [`PlaylistManager`] is what the CLI talks to. Each operation follows the
//! same order: resolve playlists, read everything it needs, compute, and
//! only then write. A failed read never leaves a half-written playlist.
//!
//! - `mod.rs` - lookup, listing, merge, duplicates, remove, liked mirror
//! - [`clean`] - clean against a corpus or by saved status, with previews
//! - [`split`] - split a playlist by artist
//! - [`queue`] - save the playback queue
//! - [`history`] - plays from a playlist, plain-text id export
//! - [`naming`] - default playlist and file names

pub mod clean;
pub mod history;
pub mod naming;
pub mod queue;
pub mod split;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::cache::ResultCache;
use crate::capture::{CaptureConfig, CaptureGuard};
use crate::config::{Config, PlaylistSettings};
use crate::error::{Error, Result, ResultExt};
use crate::library::{PlaylistLookup, Resolution, Source, SourceFailure};
use crate::materialize::{ExistingPolicy, MaterializeMode, MaterializeReport, Materializer};
use crate::model::{PlaylistSummary, Track, User};
use crate::reconcile::{self, ProgressSink};
use crate::service::{MusicService, collect_pages};

pub use clean::{CleanAgainst, CleanPreview, CleanReport, CleanRequest, CleanWrite};
pub use history::{ExportReport, ListenedReport};
pub use queue::QueueReport;
pub use split::{ArtistPlaylist, SplitReport};

/// Stored clean previews, keyed by session id.
pub type PreviewCache = ResultCache<String, CleanPreview>;

/// How a computed track list is written.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Playlist name; each operation has its own default
    pub name: Option<String>,
    pub on_existing: ExistingPolicy,
}

impl WriteOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn on_existing(mut self, policy: ExistingPolicy) -> Self {
        self.on_existing = policy;
        self
    }

    fn mode(&self, default_name: impl FnOnce() -> String) -> MaterializeMode {
        let name = self.name.clone().unwrap_or_else(default_name);
        MaterializeMode::create(name, self.on_existing)
    }
}

/// Result of a merge.
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub sources: Vec<PlaylistSummary>,
    pub kept: usize,
    pub skipped: usize,
    pub playlist: MaterializeReport,
}

/// Result of removing tracks by id.
#[derive(Debug, Clone)]
pub struct RemoveReport {
    pub source: PlaylistSummary,
    pub removed: usize,
    pub playlist: MaterializeReport,
}

/// High-level playlist operations for one user.
pub struct PlaylistManager<'a, S: MusicService + ?Sized> {
    service: &'a S,
    settings: PlaylistSettings,
    capture: CaptureConfig,
    previews: Arc<PreviewCache>,
    guard: CaptureGuard,
    progress: Option<Arc<dyn ProgressSink>>,
    user: OnceCell<User>,
}

impl<'a, S: MusicService + ?Sized> PlaylistManager<'a, S> {
    pub fn new(service: &'a S, config: &Config) -> Self {
        Self {
            service,
            settings: config.playlists.clone(),
            capture: config.capture.to_capture_config(),
            previews: Arc::new(PreviewCache::new(config.cache.capacity, config.cache.ttl())),
            guard: CaptureGuard::new(),
            progress: None,
            user: OnceCell::new(),
        }
    }

    /// Share a preview store between managers.
    pub fn with_previews(mut self, previews: Arc<PreviewCache>) -> Self {
        self.previews = previews;
        self
    }

    /// Share a capture guard between managers.
    pub fn with_guard(mut self, guard: CaptureGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Receive reconciliation progress.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_capture_config(mut self, capture: CaptureConfig) -> Self {
        self.capture = capture;
        self
    }

    /// The user the credentials belong to (read once).
    pub async fn me(&self) -> Result<&User> {
        Ok(self
            .user
            .get_or_try_init(|| self.service.current_user())
            .await?)
    }

    fn materializer(&self) -> Materializer<'a, S> {
        Materializer::new(self.service).with_batch_size(self.settings.write_batch_size)
    }

    async fn write(
        &self,
        track_ids: &[String],
        mode: &MaterializeMode,
    ) -> Result<MaterializeReport> {
        let me = self.me().await?;
        Ok(self.materializer().materialize(&me.id, track_ids, mode).await?)
    }

    async fn lookup(&self) -> Result<PlaylistLookup> {
        PlaylistLookup::load(self.service)
            .await
            .with_context("listing playlists")
    }

    /// Playlists sorted by name.
    pub async fn list(&self, only_mine: bool) -> Result<Vec<PlaylistSummary>> {
        let lookup = self.lookup().await?;
        Ok(lookup.sorted(only_mine).into_iter().cloned().collect())
    }

    /// Exactly one playlist for an id or name.
    pub async fn find(&self, query: &str) -> Result<PlaylistSummary> {
        let lookup = self.lookup().await?;
        find_in(&lookup, query)
    }

    /// Every playlist matching any of the queries. A shared name selects all
    /// playlists with it; a query matching nothing is an error.
    pub async fn find_all(&self, queries: &[String]) -> Result<Vec<PlaylistSummary>> {
        let lookup = self.lookup().await?;
        let (ids, missing) = lookup.resolve_all(queries);
        if let Some(query) = missing.first() {
            return Err(Error::playlist_not_found(*query));
        }
        Ok(ids
            .iter()
            .filter_map(|id| lookup.get(id).cloned())
            .collect())
    }

    /// All tracks of one playlist, or `SourceUnreadable`.
    async fn read_playlist(&self, playlist: &PlaylistSummary) -> Result<Vec<Track>> {
        collect_pages(|c| self.service.playlist_tracks(&playlist.id, c))
            .await
            .map_err(|error| Error::SourceUnreadable {
                failures: vec![SourceFailure {
                    source: Source::Playlist(playlist.id.clone()),
                    error,
                }],
                partial: 0,
            })
    }

    async fn read_liked(&self) -> Result<Vec<Track>> {
        collect_pages(|c| self.service.liked_tracks(c))
            .await
            .map_err(|error| Error::SourceUnreadable {
                failures: vec![SourceFailure {
                    source: Source::Liked,
                    error,
                }],
                partial: 0,
            })
    }

    /// New playlist holding every source in order, without repeated songs.
    pub async fn merge(&self, queries: &[String], options: &WriteOptions) -> Result<MergeReport> {
        let sources = self.find_all(queries).await?;

        let mut lists = Vec::with_capacity(sources.len());
        for source in &sources {
            lists.push(self.read_playlist(source).await?);
        }

        let merged = reconcile::merge(&lists);
        let mode = options.mode(|| naming::merged(sources.iter().map(|s| s.name.as_str())));
        let playlist = self.write(&merged.keep_ids(), &mode).await?;

        tracing::info!(
            "Merged {} playlists: {} kept, {} repeats skipped",
            sources.len(),
            merged.keep.len(),
            merged.duplicates.len()
        );
        Ok(MergeReport {
            sources,
            kept: merged.keep.len(),
            skipped: merged.duplicates.len(),
            playlist,
        })
    }

    /// Tracks repeating an earlier `(artist, title)` in the same playlist.
    pub async fn duplicates(&self, query: &str) -> Result<(PlaylistSummary, Vec<Track>)> {
        let playlist = self.find(query).await?;
        let tracks = self.read_playlist(&playlist).await?;
        let dupes = reconcile::find_duplicates(&tracks);
        Ok((playlist, dupes))
    }

    /// New playlist without the given track ids.
    pub async fn remove(
        &self,
        query: &str,
        track_ids: &[String],
        options: &WriteOptions,
    ) -> Result<RemoveReport> {
        let source = self.find(query).await?;
        let tracks = self.read_playlist(&source).await?;

        let ids: HashSet<String> = track_ids.iter().cloned().collect();
        let split = reconcile::remove_ids(&tracks, &ids);
        let removed = split.duplicates.len();

        let mode = options.mode(|| naming::removed(removed, &source.name));
        let playlist = self.write(&split.keep_ids(), &mode).await?;

        Ok(RemoveReport {
            source,
            removed,
            playlist,
        })
    }

    /// Make the liked-tracks mirror playlist match liked tracks exactly.
    pub async fn liked_as_playlist(&self) -> Result<MaterializeReport> {
        let liked = self.read_liked().await?;
        let ids: Vec<String> = liked.iter().map(|t| t.id.clone()).collect();
        let mode =
            MaterializeMode::create(self.settings.liked_name.clone(), ExistingPolicy::Replace);
        let report = self.write(&ids, &mode).await?;
        tracing::info!("Liked mirror changed by {:+} tracks", report.delta());
        Ok(report)
    }
}

fn find_in(lookup: &PlaylistLookup, query: &str) -> Result<PlaylistSummary> {
    match lookup.resolve(query) {
        Resolution::One(p) => Ok(p.clone()),
        Resolution::NotFound => Err(Error::playlist_not_found(query)),
        Resolution::Many(matches) => Err(Error::AmbiguousPlaylist {
            query: query.to_string(),
            matches: matches.into_iter().cloned().collect(),
        }),
    }
}
