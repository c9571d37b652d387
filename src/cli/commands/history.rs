//! Listening history and export commands.

use std::path::Path;

use chrono::{Local, TimeDelta, Utc};
use tokio::runtime::Runtime;

use super::{Session, failed};

/// Show tracks recently played from a playlist
pub fn cmd_listened(
    rt: &Runtime,
    session: &Session,
    query: &str,
    hours: Option<u32>,
) -> anyhow::Result<()> {
    let hours = hours.unwrap_or(session.config.playlists.listened_window_hours);
    let since = Utc::now() - TimeDelta::hours(i64::from(hours));

    rt.block_on(async {
        let report = session
            .manager()
            .listened_from(query, since)
            .await
            .map_err(failed)?;

        if report.plays.is_empty() {
            println!(
                "Nothing played from '{}' in the last {} hours",
                report.playlist.name, hours
            );
            return Ok(());
        }

        println!(
            "{} plays from '{}' in the last {} hours:",
            report.plays.len(),
            report.playlist.name,
            hours
        );
        for played in &report.plays {
            let at = played.played_at.with_timezone(&Local);
            println!("  {}  {}", at.format("%Y-%m-%d %H:%M"), played.track);
        }
        Ok(())
    })
}

/// Write a playlist's track ids to a text file
pub fn cmd_export(
    rt: &Runtime,
    session: &Session,
    query: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let report = session
            .manager()
            .export_ids(query, output)
            .await
            .map_err(failed)?;
        println!(
            "Saved {} track ids from '{}' to {}",
            report.tracks,
            report.playlist.name,
            report.path.display()
        );
        Ok(())
    })
}
