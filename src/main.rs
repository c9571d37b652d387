//! Playlist Minder - keeps Spotify playlists tidy.
//!
//! Cleans playlists of songs the user already has, merges and splits
//! playlists, mirrors liked tracks, and saves the live playback queue as a
//! playlist. Everything runs through CLI subcommands.

pub mod cache;
pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod library;
pub mod materialize;
pub mod model;
pub mod playlists;
pub mod reconcile;
pub mod service;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("playlist_minder=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    cli::run_command(&args)
}
