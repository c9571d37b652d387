//! Corpus builder - pulls tracks from playlists and liked tracks.
//!
//! A corpus is the reference collection a playlist is checked against. It is
//! assembled in a fixed source order (explicit playlists, liked tracks, other
//! owned playlists), follows every continuation page, and keeps the first
//! occurrence of each track id.
//!
//! Reading is all-or-report: a source that fails is listed in
//! [`CorpusReport::failures`] instead of quietly shrinking the corpus.

use std::collections::HashSet;
use std::fmt;

use crate::model::Track;
use crate::service::{MusicService, ServiceError, collect_pages};

/// Where a group of tracks came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    Playlist(String),
    Liked,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Playlist(id) => write!(f, "playlist {id}"),
            Source::Liked => write!(f, "liked tracks"),
        }
    }
}

/// How far the corpus reaches beyond the explicit sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorpusScope {
    /// Only the explicit sources (liked tracks when there are none)
    #[default]
    Sources,
    /// Liked tracks plus every playlist the user owns
    Everything,
}

/// What to read.
#[derive(Debug, Clone, Default)]
pub struct CorpusRequest {
    /// Canonical playlist ids, already resolved
    pub sources: Vec<String>,
    /// Playlist ids never read
    pub excluded: Vec<String>,
    /// Add liked tracks after explicit sources
    pub include_liked: bool,
    pub scope: CorpusScope,
}

impl CorpusRequest {
    /// Liked tracks and every owned playlist except `excluded`.
    pub fn everything_except(excluded: impl IntoIterator<Item = String>) -> Self {
        Self {
            excluded: excluded.into_iter().collect(),
            scope: CorpusScope::Everything,
            ..Default::default()
        }
    }

    /// Exactly the given playlists.
    pub fn playlists(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            sources: ids.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn with_liked(mut self) -> Self {
        self.include_liked = true;
        self
    }
}

/// Ordered, id-unique track collection.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    tracks: Vec<Track>,
    ids: HashSet<String>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a track unless its id is already present. Returns whether it was added.
    pub fn push(&mut self, track: Track) -> bool {
        if !self.ids.insert(track.id.clone()) {
            return false;
        }
        self.tracks.push(track);
        true
    }

    pub fn extend(&mut self, tracks: impl IntoIterator<Item = Track>) {
        for track in tracks {
            self.push(track);
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }
}

impl FromIterator<Track> for Corpus {
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        let mut corpus = Corpus::new();
        corpus.extend(iter);
        corpus
    }
}

/// A source that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: Source,
    pub error: ServiceError,
}

/// Result of a corpus build, including partial failures.
#[derive(Debug, Clone, Default)]
pub struct CorpusReport {
    pub corpus: Corpus,
    pub sources_read: Vec<Source>,
    pub failures: Vec<SourceFailure>,
}

impl CorpusReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// The corpus, or [`crate::error::Error::SourceUnreadable`] if any source failed.
    pub fn into_complete(self) -> crate::error::Result<Corpus> {
        if self.failures.is_empty() {
            Ok(self.corpus)
        } else {
            Err(crate::error::Error::SourceUnreadable {
                failures: self.failures,
                partial: self.corpus.len(),
            })
        }
    }
}

/// Read every requested source into a corpus.
///
/// Returns `Err` only when the list of owned playlists (needed to know what
/// "everything" means) cannot be read; individual source failures are
/// reported in the [`CorpusReport`].
pub async fn build_corpus<S: MusicService + ?Sized>(
    service: &S,
    request: &CorpusRequest,
) -> Result<CorpusReport, ServiceError> {
    let plan = plan_sources(service, request).await?;
    tracing::debug!("Building corpus from {} sources", plan.len());

    let mut report = CorpusReport::default();
    for source in plan {
        let fetched = match &source {
            Source::Playlist(id) => collect_pages(|c| service.playlist_tracks(id, c)).await,
            Source::Liked => collect_pages(|c| service.liked_tracks(c)).await,
        };

        match fetched {
            Ok(tracks) => {
                tracing::debug!("Read {} tracks from {}", tracks.len(), source);
                report.corpus.extend(tracks);
                report.sources_read.push(source);
            }
            Err(error) => {
                tracing::warn!("Could not read {}: {}", source, error);
                report.failures.push(SourceFailure { source, error });
            }
        }
    }

    tracing::info!(
        "Corpus holds {} tracks from {} sources ({} unreadable)",
        report.corpus.len(),
        report.sources_read.len(),
        report.failures.len()
    );
    Ok(report)
}

/// Decide which sources to read, in corpus order.
async fn plan_sources<S: MusicService + ?Sized>(
    service: &S,
    request: &CorpusRequest,
) -> Result<Vec<Source>, ServiceError> {
    let excluded: HashSet<&str> = request.excluded.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut plan = Vec::new();

    for id in &request.sources {
        if !excluded.contains(id.as_str()) && seen.insert(id.as_str()) {
            plan.push(Source::Playlist(id.clone()));
        }
    }

    let everything = request.scope == CorpusScope::Everything;
    if request.include_liked || everything || request.sources.is_empty() {
        plan.push(Source::Liked);
    }

    if everything {
        let me = service.current_user().await?;
        let playlists = collect_pages(|c| service.user_playlists(c)).await?;
        for playlist in playlists {
            if playlist.is_owned_by(&me.id)
                && !excluded.contains(playlist.id.as_str())
                && !seen.contains(playlist.id.as_str())
            {
                plan.push(Source::Playlist(playlist.id));
            }
        }
    }

    Ok(plan)
}
