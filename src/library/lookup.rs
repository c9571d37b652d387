//! Playlist lookup by id or free-text name.
//!
//! Names are not unique on the service, so a query may match zero, one or
//! many playlists. Callers decide what to do with ambiguity.

use std::cmp::Ordering;

use crate::model::PlaylistSummary;
use crate::service::{MusicService, ServiceError, collect_pages};

/// Length of a catalog id.
const ID_LEN: usize = 22;

/// Whether `s` has the shape of a catalog id: 22 alphanumeric characters
/// with at least one digit, one upper-case and one lower-case letter.
pub fn looks_like_id(s: &str) -> bool {
    s.len() == ID_LEN
        && s.chars().all(|c| c.is_ascii_alphanumeric())
        && s.chars().any(|c| c.is_ascii_digit())
        && s.chars().any(|c| c.is_ascii_uppercase())
        && s.chars().any(|c| c.is_ascii_lowercase())
}

/// How a query matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    NotFound,
    One(&'a PlaylistSummary),
    Many(Vec<&'a PlaylistSummary>),
}

impl<'a> Resolution<'a> {
    fn from_matches(mut matches: Vec<&'a PlaylistSummary>) -> Self {
        match matches.len() {
            0 => Resolution::NotFound,
            1 => Resolution::One(matches.remove(0)),
            _ => Resolution::Many(matches),
        }
    }

    /// Every matched playlist.
    pub fn matches(&self) -> Vec<&'a PlaylistSummary> {
        match self {
            Resolution::NotFound => Vec::new(),
            Resolution::One(p) => vec![*p],
            Resolution::Many(ps) => ps.clone(),
        }
    }
}

/// Snapshot of the user's playlist listing.
#[derive(Debug, Clone, Default)]
pub struct PlaylistLookup {
    user_id: String,
    playlists: Vec<PlaylistSummary>,
}

impl PlaylistLookup {
    /// Read every playlist the user follows or owns.
    pub async fn load<S: MusicService + ?Sized>(service: &S) -> Result<Self, ServiceError> {
        let me = service.current_user().await?;
        let playlists = collect_pages(|c| service.user_playlists(c)).await?;
        tracing::debug!("Loaded {} playlists for {}", playlists.len(), me.id);
        Ok(Self::new(me.id, playlists))
    }

    pub fn new(user_id: impl Into<String>, playlists: Vec<PlaylistSummary>) -> Self {
        Self {
            user_id: user_id.into(),
            playlists,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn get(&self, id: &str) -> Option<&PlaylistSummary> {
        self.playlists.iter().find(|p| p.id == id)
    }

    /// Owned playlists with exactly this name.
    pub fn owned_named(&self, name: &str) -> Vec<&PlaylistSummary> {
        self.playlists
            .iter()
            .filter(|p| p.name == name && p.is_owned_by(&self.user_id))
            .collect()
    }

    /// Resolve an id or exact name.
    ///
    /// A known id wins. Otherwise every playlist named exactly `query`
    /// matches.
    pub fn resolve(&self, query: &str) -> Resolution<'_> {
        if looks_like_id(query)
            && let Some(p) = self.get(query)
        {
            return Resolution::One(p);
        }
        Resolution::from_matches(self.playlists.iter().filter(|p| p.name == query).collect())
    }

    /// Resolve several queries into playlist ids, in query order.
    ///
    /// A name shared by several playlists contributes all of them. Queries
    /// that match nothing are returned separately.
    pub fn resolve_all<'q>(&self, queries: &'q [String]) -> (Vec<String>, Vec<&'q str>) {
        let mut found = Vec::new();
        let mut missing = Vec::new();
        for query in queries {
            let matches = self.resolve(query).matches();
            if matches.is_empty() {
                tracing::warn!("No playlist matches '{}'", query);
                missing.push(query.as_str());
            }
            for p in matches {
                if !found.contains(&p.id) {
                    found.push(p.id.clone());
                }
            }
        }
        (found, missing)
    }

    /// Forgiving name match: case-insensitive exact, then prefix, then
    /// substring. The first tier with any match decides.
    pub fn resolve_fuzzy(&self, query: &str) -> Resolution<'_> {
        if let Resolution::One(p) = self.resolve(query) {
            return Resolution::One(p);
        }
        let needle = query.to_lowercase();
        let tiers: [fn(&str, &str) -> bool; 3] = [
            |name: &str, q: &str| name == q,
            |name: &str, q: &str| name.starts_with(q),
            |name: &str, q: &str| name.contains(q),
        ];
        for tier in tiers {
            let matches: Vec<_> = self
                .playlists
                .iter()
                .filter(|p| tier(&p.name.to_lowercase(), &needle))
                .collect();
            if !matches.is_empty() {
                return Resolution::from_matches(matches);
            }
        }
        Resolution::NotFound
    }

    /// Playlists sorted case-insensitively by name, optionally only owned ones.
    pub fn sorted(&self, only_mine: bool) -> Vec<&PlaylistSummary> {
        let mut list: Vec<_> = self
            .playlists
            .iter()
            .filter(|p| !only_mine || p.is_owned_by(&self.user_id))
            .collect();
        list.sort_by(|a, b| by_name(a, b));
        list
    }
}

fn by_name(a: &PlaylistSummary, b: &PlaylistSummary) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
}
