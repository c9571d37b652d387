//! Command-line interface for playlist-minder.
//!
//! This module provides CLI commands for listing, cleaning, merging and
//! splitting playlists and for saving the playback queue.

mod commands;

pub use commands::{Cli, Commands, run_command};
