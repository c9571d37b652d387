//! Listening history and plain-text exports of a playlist.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::{PlaylistManager, naming};
use crate::error::{Error, Result, ResultExt};
use crate::model::{PlayedTrack, PlaylistSummary};
use crate::service::MusicService;

/// Plays that started from one playlist.
#[derive(Debug, Clone)]
pub struct ListenedReport {
    pub playlist: PlaylistSummary,
    /// Most recent first; a track played twice appears twice
    pub plays: Vec<PlayedTrack>,
    /// History entries looked at, from any context
    pub scanned: usize,
}

/// Result of exporting a playlist's track ids.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub playlist: PlaylistSummary,
    pub path: PathBuf,
    pub tracks: usize,
}

impl<S: MusicService + ?Sized> PlaylistManager<'_, S> {
    /// Tracks played from a playlist at or after `since`.
    ///
    /// History is read newest first and reading stops at the first entry
    /// older than `since`.
    pub async fn listened_from(&self, query: &str, since: DateTime<Utc>) -> Result<ListenedReport> {
        let playlist = self.find(query).await?;

        let mut plays = Vec::new();
        let mut scanned = 0;
        let mut cursor = None;
        'pages: loop {
            let page = self
                .service
                .recently_played(cursor.take())
                .await
                .with_context("reading listening history")?;

            for played in page.items {
                if played.played_at < since {
                    break 'pages;
                }
                scanned += 1;
                if played.played_from(&playlist.id) {
                    plays.push(played);
                }
            }

            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::info!(
            "{} of {} plays since {} came from '{}'",
            plays.len(),
            scanned,
            since,
            playlist.name
        );
        Ok(ListenedReport {
            playlist,
            plays,
            scanned,
        })
    }

    /// Write a playlist's track ids to a text file, one per line.
    ///
    /// Without `output` the file is named after the playlist in the current
    /// directory. The file is replaced atomically.
    pub async fn export_ids(&self, query: &str, output: Option<&Path>) -> Result<ExportReport> {
        let playlist = self.find(query).await?;
        let tracks = self.read_playlist(&playlist).await?;

        let path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(naming::export_file(&playlist.name)));
        let mut contents = String::new();
        for track in &tracks {
            contents.push_str(&track.id);
            contents.push('\n');
        }
        write_atomically(&path, &contents)?;

        tracing::info!("Exported {} ids from '{}' to {:?}", tracks.len(), playlist.name, path);
        Ok(ExportReport {
            playlist,
            path,
            tracks: tracks.len(),
        })
    }
}

fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let temp_path = path.with_extension("txt.tmp");
    std::fs::write(&temp_path, contents).map_err(|source| Error::Export {
        path: temp_path.clone(),
        source,
    })?;
    std::fs::rename(&temp_path, path).map_err(|source| Error::Export {
        path: path.to_path_buf(),
        source,
    })
}
