//! CLI command definitions and dispatch.
//!
//! Each group of subcommands lives in its own submodule:
//! - `playlists`: listing, merge, duplicates, remove, liked mirror, split
//! - `clean`: clean against other playlists or by saved status
//! - `queue`: save the playback queue
//! - `history`: plays from a playlist, id export
//! - `config`: read and write the config file

mod clean;
mod config;
mod history;
mod playlists;
mod queue;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::error::Error;
use crate::materialize::{ExistingPolicy, MaterializeReport};
use crate::model::Track;
use crate::playlists::{PlaylistManager, WriteOptions};
use crate::service::SpotifyClient;

pub use clean::{CleanArgs, cmd_clean, cmd_clean_saved};
pub use config::{ConfigAction, cmd_config};
pub use history::{cmd_export, cmd_listened};
pub use playlists::{
    cmd_duplicates, cmd_liked, cmd_merge, cmd_playlists, cmd_remove, cmd_split_artists,
};
pub use queue::cmd_save_queue;

/// Playlist Minder CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Spotify access token (or set SPOTIFY_ACCESS_TOKEN, or the config file)
    #[arg(long, global = true, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// List playlists sorted by name
    Playlists {
        /// Only playlists you own
        #[arg(long)]
        mine: bool,
        /// Loose search: exact name, then prefix, then substring (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },
    /// Merge playlists into a new one, skipping repeated songs
    Merge {
        /// Ids or names of the playlists to merge, in order
        #[arg(required = true)]
        sources: Vec<String>,
        #[command(flatten)]
        write: WriteArgs,
    },
    /// Remove songs you already have elsewhere from a playlist
    Clean {
        /// Id or name of the playlist to clean
        target: String,
        /// Compare against these playlists only (default: everything you own)
        #[arg(long = "against")]
        against: Vec<String>,
        /// Also compare against liked tracks when using --against
        #[arg(long)]
        liked: bool,
        #[command(flatten)]
        clean: CleanArgs,
    },
    /// Remove tracks already saved in your library from a playlist
    CleanSaved {
        /// Id or name of the playlist to clean
        target: String,
        #[command(flatten)]
        clean: CleanArgs,
    },
    /// Show songs repeated within a playlist
    Duplicates {
        /// Id or name of the playlist
        playlist: String,
    },
    /// Write a copy of a playlist without the given tracks
    Remove {
        /// Id or name of the playlist
        playlist: String,
        /// Track ids to leave out
        #[arg(required = true)]
        track_ids: Vec<String>,
        #[command(flatten)]
        write: WriteArgs,
    },
    /// Save the current playback queue as a playlist
    SaveQueue {
        /// Append today's date to the playlist name
        #[arg(long)]
        dated: bool,
        #[command(flatten)]
        write: WriteArgs,
    },
    /// Mirror liked tracks into a playlist
    Liked,
    /// Give every frequent artist in a playlist their own playlist
    SplitArtists {
        /// Id or name of the playlist to split
        playlist: String,
    },
    /// Show tracks recently played from a playlist
    Listened {
        /// Id or name of the playlist
        playlist: String,
        /// How many hours back to look (default from config, 24)
        #[arg(long)]
        hours: Option<u32>,
    },
    /// Write a playlist's track ids to a text file, one per line
    Export {
        /// Id or name of the playlist
        playlist: String,
        /// Output file (default: `<playlist name>.txt` in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// What to do when the playlist name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnExisting {
    /// Stop with an error
    Refuse,
    /// Overwrite the existing playlist
    Replace,
    /// Create another playlist with the same name
    Create,
}

impl From<OnExisting> for ExistingPolicy {
    fn from(value: OnExisting) -> Self {
        match value {
            OnExisting::Refuse => ExistingPolicy::Refuse,
            OnExisting::Replace => ExistingPolicy::Replace,
            OnExisting::Create => ExistingPolicy::CreateAnyway,
        }
    }
}

/// Options shared by every command that writes a playlist.
#[derive(Args, Debug, Clone)]
pub struct WriteArgs {
    /// Name of the playlist to write (each command has a default)
    #[arg(long)]
    pub name: Option<String>,
    /// What to do when a playlist with that name already exists
    #[arg(long, value_enum, default_value_t = OnExisting::Refuse)]
    pub on_existing: OnExisting,
}

impl WriteArgs {
    pub fn options(&self) -> WriteOptions {
        WriteOptions {
            name: self.name.clone(),
            on_existing: self.on_existing.into(),
        }
    }
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    if let Commands::Config { action } = &cli.command {
        return cmd_config(action);
    }

    let rt = Runtime::new()?;
    let session = Session::connect(cli.token.as_deref(), crate::config::load())?;

    match &cli.command {
        Commands::Playlists { mine, search } => {
            cmd_playlists(&rt, &session, *mine, search.as_deref())
        }
        Commands::Merge { sources, write } => cmd_merge(&rt, &session, sources, write),
        Commands::Clean {
            target,
            against,
            liked,
            clean,
        } => cmd_clean(&rt, &session, target, against, *liked, clean),
        Commands::CleanSaved { target, clean } => cmd_clean_saved(&rt, &session, target, clean),
        Commands::Duplicates { playlist } => cmd_duplicates(&rt, &session, playlist),
        Commands::Remove {
            playlist,
            track_ids,
            write,
        } => cmd_remove(&rt, &session, playlist, track_ids, write),
        Commands::SaveQueue { dated, write } => cmd_save_queue(&rt, &session, *dated, write),
        Commands::Liked => cmd_liked(&rt, &session),
        Commands::SplitArtists { playlist } => cmd_split_artists(&rt, &session, playlist),
        Commands::Listened { playlist, hours } => cmd_listened(&rt, &session, playlist, *hours),
        Commands::Export { playlist, output } => {
            cmd_export(&rt, &session, playlist, output.as_deref())
        }
        Commands::Config { .. } => Ok(()),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// An authenticated client plus the loaded config.
pub(crate) struct Session {
    pub client: SpotifyClient,
    pub config: Config,
}

impl Session {
    fn connect(token: Option<&str>, config: Config) -> anyhow::Result<Self> {
        let token = token
            .or(config.credentials.access_token.as_deref())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No access token. Pass --token, set SPOTIFY_ACCESS_TOKEN, \
                     or run `config set credentials.access_token <token>`"
                )
            })?;
        let client = SpotifyClient::new(token)?;
        Ok(Self { client, config })
    }

    pub fn manager(&self) -> PlaylistManager<'_, SpotifyClient> {
        PlaylistManager::new(&self.client, &self.config)
    }
}

/// Turn a library error into a CLI error that carries its reason code.
pub(crate) fn failed(err: Error) -> anyhow::Error {
    anyhow::anyhow!("{} [{}]", err, err.reason())
}

/// Print where a list of tracks was written.
pub(crate) fn print_written(report: &MaterializeReport) {
    let playlist = &report.playlist;
    if report.created {
        println!(
            "Created '{}' [{}] with {} tracks",
            playlist.name, playlist.id, report.added
        );
    } else {
        println!(
            "Replaced '{}' [{}]: {} tracks (was {}, {:+})",
            playlist.name,
            playlist.id,
            report.added,
            report.prior_items,
            report.delta()
        );
    }
}

pub(crate) fn print_tracks(tracks: &[Track], limit: usize) {
    for track in tracks.iter().take(limit) {
        println!("  {}", track);
    }
    if tracks.len() > limit {
        println!("  ... and {} more", tracks.len() - limit);
    }
}
