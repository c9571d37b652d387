//! Playlist cleaning commands.

use std::io::Write;
use std::sync::Arc;

use clap::Args;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use super::{Session, WriteArgs, failed, print_tracks, print_written};
use crate::playlists::{CleanAgainst, CleanRequest, CleanWrite};
use crate::reconcile::Progress;

const PREVIEW_KEY: &str = "cli";

/// Options shared by `clean` and `clean-saved`.
#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    /// Overwrite the playlist itself instead of writing a cleaned copy
    #[arg(long)]
    pub in_place: bool,
    /// Also write the removed tracks to a backup playlist
    #[arg(long)]
    pub backup: bool,
    /// Show what would be removed without writing anything
    #[arg(long)]
    pub dry_run: bool,
    /// Write without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,
    #[command(flatten)]
    pub write: WriteArgs,
}

/// Remove songs found in other playlists or liked tracks
pub fn cmd_clean(
    rt: &Runtime,
    session: &Session,
    target: &str,
    against: &[String],
    liked: bool,
    args: &CleanArgs,
) -> anyhow::Result<()> {
    let against = if against.is_empty() {
        CleanAgainst::Everything
    } else {
        CleanAgainst::Sources {
            playlists: against.to_vec(),
            include_liked: liked,
        }
    };
    run_clean(rt, session, CleanRequest { target: target.to_string(), against }, args)
}

/// Remove tracks already saved in the library
pub fn cmd_clean_saved(
    rt: &Runtime,
    session: &Session,
    target: &str,
    args: &CleanArgs,
) -> anyhow::Result<()> {
    let request = CleanRequest {
        target: target.to_string(),
        against: CleanAgainst::SavedStatus,
    };
    run_clean(rt, session, request, args)
}

fn run_clean(
    rt: &Runtime,
    session: &Session,
    request: CleanRequest,
    args: &CleanArgs,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let (tx, mut rx) = mpsc::unbounded_channel::<Progress>();
        tokio::spawn(async move {
            while let Some(progress) = rx.recv().await {
                eprint!("\rReconciling {}/{}", progress.processed, progress.total);
                if progress.processed == progress.total {
                    eprintln!();
                }
            }
        });
        let manager = session.manager().with_progress(Arc::new(tx));

        let preview = manager
            .preview_clean(PREVIEW_KEY, &request)
            .await
            .map_err(failed)?;

        if preview.removed.is_empty() {
            println!("No repeated or already saved songs in '{}'", preview.target.name);
            if args.in_place {
                return Ok(());
            }
        } else {
            println!(
                "'{}': {} tracks kept, {} to remove:",
                preview.target.name,
                preview.keep.len(),
                preview.removed.len()
            );
            print_tracks(&preview.removed, 25);
        }

        if args.dry_run {
            println!("\nDry run, nothing written.");
            return Ok(());
        }
        if !args.yes && !confirm("Write changes?")? {
            println!("Cancelled.");
            return Ok(());
        }

        let write = CleanWrite {
            options: args.write.options(),
            in_place: args.in_place,
            backup: args.backup,
        };
        let report = manager
            .apply_clean(PREVIEW_KEY, &write)
            .await
            .map_err(failed)?;

        if let Some(backup) = &report.backup {
            print_written(backup);
        }
        print_written(&report.playlist);
        Ok(())
    })
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
