//! Splitting a catch-all playlist by artist.
//!
//! Every artist with more than `artist_split_threshold` tracks in the source
//! gets (or refreshes) a playlist named `"<artist> - others"`. Everything else
//! lands in the leftovers playlist.

use std::collections::{HashMap, HashSet};

use super::{PlaylistManager, naming};
use crate::error::Result;
use crate::materialize::{ExistingPolicy, MaterializeMode, MaterializeReport};
use crate::model::{PlaylistSummary, Track};
use crate::service::MusicService;

#[derive(Debug, Clone)]
pub struct ArtistPlaylist {
    pub artist: String,
    pub tracks: usize,
    /// `None` when an identical playlist already existed
    pub playlist: Option<MaterializeReport>,
}

#[derive(Debug, Clone)]
pub struct SplitReport {
    pub source: PlaylistSummary,
    pub artists: Vec<ArtistPlaylist>,
    pub others: MaterializeReport,
}

/// Track ids per artist, most tracks first; ties keep first-seen order.
fn group_by_artist(tracks: &[Track]) -> Vec<(&str, Vec<String>)> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<String>> = HashMap::new();
    for track in tracks {
        let artist = track.primary_artist.as_str();
        groups
            .entry(artist)
            .or_insert_with(|| {
                order.push(artist);
                Vec::new()
            })
            .push(track.id.clone());
    }

    let mut grouped: Vec<(&str, Vec<String>)> = order
        .into_iter()
        .filter_map(|artist| groups.remove(artist).map(|ids| (artist, ids)))
        .collect();
    grouped.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    grouped
}

enum Plan {
    Create,
    Replace(String),
    Unchanged,
}

impl<S: MusicService + ?Sized> PlaylistManager<'_, S> {
    pub async fn split_by_artist(&self, query: &str) -> Result<SplitReport> {
        let lookup = self.lookup().await?;
        let source = super::find_in(&lookup, query)?;
        let tracks = self.read_playlist(&source).await?;
        let threshold = self.settings.artist_split_threshold;

        let (big, small): (Vec<_>, Vec<_>) = group_by_artist(&tracks)
            .into_iter()
            .partition(|(_, ids)| ids.len() > threshold);

        // Read every existing artist playlist before writing anything.
        let mut plans = Vec::with_capacity(big.len());
        for (artist, ids) in &big {
            let name = naming::artist_others(artist);
            let plan = match lookup.owned_named(&name).first() {
                Some(existing) => {
                    let current: HashSet<String> = self
                        .read_playlist(existing)
                        .await?
                        .into_iter()
                        .map(|t| t.id)
                        .collect();
                    let wanted: HashSet<String> = ids.iter().cloned().collect();
                    if current == wanted {
                        Plan::Unchanged
                    } else {
                        Plan::Replace(existing.id.clone())
                    }
                }
                None => Plan::Create,
            };
            plans.push((name, plan));
        }

        let mut artists = Vec::with_capacity(big.len());
        for ((artist, ids), (name, plan)) in big.iter().zip(plans) {
            let playlist = match plan {
                Plan::Unchanged => {
                    tracing::info!("Identical playlist already exists for {}", artist);
                    None
                }
                Plan::Replace(id) => {
                    Some(self.write(ids, &MaterializeMode::ReplaceExisting(id)).await?)
                }
                Plan::Create => Some(
                    self.write(ids, &MaterializeMode::create(name, ExistingPolicy::CreateAnyway))
                        .await?,
                ),
            };
            artists.push(ArtistPlaylist {
                artist: artist.to_string(),
                tracks: ids.len(),
                playlist,
            });
        }

        let leftover: Vec<String> = small.into_iter().flat_map(|(_, ids)| ids).collect();
        let others_mode =
            MaterializeMode::create(self.settings.others_name.clone(), ExistingPolicy::Replace);
        let others = self.write(&leftover, &others_mode).await?;

        tracing::info!(
            "Split '{}': {} artist playlists, {} leftovers",
            source.name,
            artists.len(),
            leftover.len()
        );
        Ok(SplitReport {
            source,
            artists,
            others,
        })
    }
}
