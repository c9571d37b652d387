//! Track reconciliation - decides which tracks are duplicates.
//!
//! Identity is approximate: two tracks are the same song when their
//! `(primary_artist, title)` pairs are equal, whatever their ids. The same
//! recording routinely appears under several catalog ids (single vs album,
//! remasters, regional releases), so id equality misses most duplicates.
//!
//! # Algorithm
//!
//! Both passes bucket by title first. A track whose title appears in only one
//! side cannot collide, so it is kept without touching the pair set; only
//! candidate titles pay for `(artist, title)` hashing.
//!
//! Matching is exact and case-sensitive. `"Song"` and `"song"` are different
//! titles; no normalization is applied.

mod progress;

use std::collections::{HashMap, HashSet};

use crate::model::{Track, TrackKey};

pub use progress::{NoProgress, Progress, ProgressSink, SinkClosed};
use progress::Reporter;

/// Stable partition of a track list into kept tracks and duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub keep: Vec<Track>,
    pub duplicates: Vec<Track>,
}

impl Reconciliation {
    pub fn keep_ids(&self) -> Vec<String> {
        self.keep.iter().map(|t| t.id.clone()).collect()
    }

    pub fn duplicate_ids(&self) -> Vec<String> {
        self.duplicates.iter().map(|t| t.id.clone()).collect()
    }

    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }
}

/// Occurrences of each title.
pub fn title_counts(tracks: &[Track]) -> HashMap<&str, usize> {
    let mut counts = HashMap::with_capacity(tracks.len());
    for track in tracks {
        *counts.entry(track.title.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Partition `target` into tracks to keep and tracks already present in
/// `reference` (or earlier in `target` itself).
///
/// When `reference` is built from everything the user owns, the target
/// playlist must already be excluded from it, or every track matches itself.
pub fn reconcile(target: &[Track], reference: &[Track]) -> Reconciliation {
    reconcile_with_progress(target, reference, &NoProgress)
}

/// [`reconcile`], reporting after every processed target track.
pub fn reconcile_with_progress(
    target: &[Track],
    reference: &[Track],
    progress: &dyn ProgressSink,
) -> Reconciliation {
    let target_counts = title_counts(target);
    let reference_counts = title_counts(reference);

    let candidates: HashSet<&str> = target_counts
        .keys()
        .filter(|title| reference_counts.contains_key(*title))
        .copied()
        .collect();

    let mut seen: HashSet<TrackKey<'_>> = reference
        .iter()
        .filter(|t| candidates.contains(t.title.as_str()))
        .map(Track::key)
        .collect();

    let mut reporter = Reporter::new(progress, target.len());
    let mut result = Reconciliation::default();

    for (index, track) in target.iter().enumerate() {
        if !candidates.contains(track.title.as_str()) || seen.insert(track.key()) {
            result.keep.push(track.clone());
        } else {
            result.duplicates.push(track.clone());
        }
        reporter.report(index + 1);
    }

    tracing::debug!(
        "Reconciled {} tracks against {}: {} candidate titles, {} duplicates",
        target.len(),
        reference.len(),
        candidates.len(),
        result.duplicates.len()
    );

    result
}

/// Union of several playlists in order, without repeated songs.
///
/// A track is kept when its title occurs once across all sources, or when it
/// is the first occurrence of its `(artist, title)` pair.
pub fn merge(sources: &[Vec<Track>]) -> Reconciliation {
    let all: Vec<&Track> = sources.iter().flatten().collect();

    let mut counts: HashMap<&str, usize> = HashMap::with_capacity(all.len());
    for track in &all {
        *counts.entry(track.title.as_str()).or_insert(0) += 1;
    }

    let mut seen: HashSet<TrackKey<'_>> = HashSet::new();
    let mut result = Reconciliation::default();

    for track in all {
        let unique_title = counts.get(track.title.as_str()) == Some(&1);
        if unique_title || seen.insert(track.key()) {
            result.keep.push(track.clone());
        } else {
            result.duplicates.push(track.clone());
        }
    }

    result
}

/// Tracks that repeat an earlier `(artist, title)` pair in the same list.
pub fn find_duplicates(tracks: &[Track]) -> Vec<Track> {
    let counts = title_counts(tracks);
    let mut seen = HashSet::new();

    tracks
        .iter()
        .filter(|t| counts.get(t.title.as_str()).copied().unwrap_or(0) > 1)
        .filter(|t| !seen.insert(t.key()))
        .cloned()
        .collect()
}

/// Partition tracks by exact id membership in `ids`.
pub fn remove_ids(tracks: &[Track], ids: &HashSet<String>) -> Reconciliation {
    let (duplicates, keep) = tracks.iter().cloned().partition(|t| ids.contains(&t.id));
    Reconciliation { keep, duplicates }
}
