//! Application-wide error types.
//!
//! This module provides a unified error hierarchy for the application.
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level application error enum
//! - Module-specific errors ([`ServiceError`], [`CaptureError`],
//!   [`MaterializeError`], [`ConfigError`]) for detailed handling
//! - [`Error::reason`] gives every failure a stable code callers can act on
//!
//! # Example
//!
//! ```ignore
//! use playlist_minder::error::{Result, ResultExt};
//!
//! async fn rename_check(manager: &PlaylistManager<'_, S>) -> Result<()> {
//!     let playlist = manager.find("Road Trip").with_context("looking up source")?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use crate::capture::CaptureError;
use crate::config::ConfigError;
use crate::library::SourceFailure;
use crate::materialize::MaterializeError;
use crate::model::PlaylistSummary;
use crate::service::ServiceError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
///
/// Aggregates errors from all subsystems for unified handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Remote service call failed
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// One or more corpus sources could not be read
    #[error(
        "{} source(s) could not be read ({partial} tracks read): {}",
        failures.len(),
        describe(failures)
    )]
    SourceUnreadable {
        failures: Vec<SourceFailure>,
        partial: usize,
    },

    /// No playlist matches a name or id
    #[error("No playlist matches '{0}'")]
    PlaylistNotFound(String),

    /// More than one playlist matches a name
    #[error("'{query}' matches {} playlists: {}", matches.len(), names(matches))]
    AmbiguousPlaylist {
        query: String,
        matches: Vec<PlaylistSummary>,
    },

    /// Queue capture failed
    #[error("Queue capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Playlist write failed
    #[error("{0}")]
    Materialize(#[from] MaterializeError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Writing an export file failed
    #[error("Failed to write {}: {source}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A preview was missing or expired
    #[error("No pending preview '{0}' (it may have expired)")]
    PreviewNotFound(String),

    /// Background task panicked or was cancelled
    #[error("Background task failed: {0}")]
    TaskJoin(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

fn describe(failures: &[SourceFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.source, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}

fn names(matches: &[PlaylistSummary]) -> String {
    matches
        .iter()
        .map(|p| format!("{} [{}]", p.name, p.id))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Create a playlist-not-found error.
    pub fn playlist_not_found(query: impl Into<String>) -> Self {
        Self::PlaylistNotFound(query.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// Stable reason code for caller feedback.
    pub fn reason(&self) -> &'static str {
        match self {
            Error::Service(e) => e.reason(),
            Error::SourceUnreadable { .. } => "source_unreadable",
            Error::PlaylistNotFound(_) => "playlist_not_found",
            Error::AmbiguousPlaylist { .. } => "ambiguous_playlist",
            Error::Capture(e) => e.reason(),
            Error::Materialize(e) => e.reason(),
            Error::Config(_) => "config",
            Error::Export { .. } => "export",
            Error::PreviewNotFound(_) => "preview_not_found",
            Error::TaskJoin(_) => "internal",
            Error::WithContext { source, .. } => source.reason(),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, ServiceError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Service(e).context(ctx))
    }
}
