//! Playback queue capture command.

use tokio::runtime::Runtime;

use super::{Session, WriteArgs, failed, print_written};
use crate::capture::CaptureOutcome;
use crate::playlists::naming;

/// Save the playback queue as a playlist
pub fn cmd_save_queue(
    rt: &Runtime,
    session: &Session,
    dated: bool,
    write: &WriteArgs,
) -> anyhow::Result<()> {
    let mut options = write.options();
    if dated {
        let base = options
            .name
            .take()
            .unwrap_or_else(|| session.config.playlists.queue_name.clone());
        options.name = Some(naming::dated(&base, chrono::Local::now().date_naive()));
    }

    rt.block_on(async {
        println!("Capturing queue (playback is muted and restored afterwards)...");
        let report = session
            .manager()
            .save_queue(&options)
            .await
            .map_err(failed)?;

        match (&report.outcome, &report.playlist) {
            (CaptureOutcome::Empty, _) => println!("Queue is empty, nothing saved."),
            (CaptureOutcome::LimitReached(ids), Some(written)) => {
                println!("Queue limit reached, saved the first {} tracks", ids.len());
                print_written(written);
            }
            (_, Some(written)) => print_written(written),
            (_, None) => {}
        }
        Ok(())
    })
}
