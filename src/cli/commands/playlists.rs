//! Listing, merging, splitting and other whole-playlist commands.

use tokio::runtime::Runtime;

use super::{Session, WriteArgs, failed, print_tracks, print_written};
use crate::library::{PlaylistLookup, Resolution};
use crate::model::PlaylistSummary;

fn print_playlist(playlist: &PlaylistSummary, user_id: &str) {
    let marker = if playlist.is_owned_by(user_id) { ' ' } else { '*' };
    println!(
        "{} {:<40} {:>5}  {}",
        marker, playlist.name, playlist.total_tracks, playlist.id
    );
}

/// List playlists, or search them by name
pub fn cmd_playlists(
    rt: &Runtime,
    session: &Session,
    mine: bool,
    search: Option<&str>,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let lookup = PlaylistLookup::load(&session.client)
            .await
            .map_err(|e| failed(e.into()))?;

        let playlists: Vec<&PlaylistSummary> = match search {
            Some(query) => match lookup.resolve_fuzzy(query) {
                Resolution::NotFound => {
                    println!("No playlist matches '{}'", query);
                    return Ok(());
                }
                found => found
                    .matches()
                    .into_iter()
                    .filter(|p| !mine || p.is_owned_by(lookup.user_id()))
                    .collect(),
            },
            None => lookup.sorted(mine),
        };

        for playlist in &playlists {
            print_playlist(playlist, lookup.user_id());
        }
        println!("\n{} playlists", playlists.len());
        if !mine {
            println!("(* = owned by someone else)");
        }
        Ok(())
    })
}

/// Merge playlists into a new one
pub fn cmd_merge(
    rt: &Runtime,
    session: &Session,
    sources: &[String],
    write: &WriteArgs,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let report = session
            .manager()
            .merge(sources, &write.options())
            .await
            .map_err(failed)?;

        let names: Vec<&str> = report.sources.iter().map(|s| s.name.as_str()).collect();
        println!("Merged {}", names.join(", "));
        println!("  {} tracks kept, {} repeats skipped", report.kept, report.skipped);
        print_written(&report.playlist);
        Ok(())
    })
}

/// Show songs repeated within one playlist
pub fn cmd_duplicates(rt: &Runtime, session: &Session, query: &str) -> anyhow::Result<()> {
    rt.block_on(async {
        let (playlist, dupes) = session
            .manager()
            .duplicates(query)
            .await
            .map_err(failed)?;

        if dupes.is_empty() {
            println!("No repeated songs in '{}'", playlist.name);
        } else {
            println!("{} repeated songs in '{}':", dupes.len(), playlist.name);
            print_tracks(&dupes, usize::MAX);
        }
        Ok(())
    })
}

/// Write a copy of a playlist without some tracks
pub fn cmd_remove(
    rt: &Runtime,
    session: &Session,
    query: &str,
    track_ids: &[String],
    write: &WriteArgs,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let report = session
            .manager()
            .remove(query, track_ids, &write.options())
            .await
            .map_err(failed)?;

        println!("Removed {} tracks from '{}'", report.removed, report.source.name);
        print_written(&report.playlist);
        Ok(())
    })
}

/// Mirror liked tracks into a playlist
pub fn cmd_liked(rt: &Runtime, session: &Session) -> anyhow::Result<()> {
    rt.block_on(async {
        let report = session
            .manager()
            .liked_as_playlist()
            .await
            .map_err(failed)?;
        print_written(&report);
        Ok(())
    })
}

/// Split a playlist by artist
pub fn cmd_split_artists(rt: &Runtime, session: &Session, query: &str) -> anyhow::Result<()> {
    rt.block_on(async {
        let report = session
            .manager()
            .split_by_artist(query)
            .await
            .map_err(failed)?;

        println!("Split '{}'", report.source.name);
        for artist in &report.artists {
            match &artist.playlist {
                Some(written) => print_written(written),
                None => println!(
                    "'{}' already up to date ({} tracks)",
                    artist.artist, artist.tracks
                ),
            }
        }
        print_written(&report.others);
        Ok(())
    })
}
