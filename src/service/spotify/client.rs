//! Spotify Web API HTTP client
//!
//! Thin wrapper over the endpoints we need. Every call carries the bearer
//! token from configuration; token refresh is the caller's concern.
//!
//! ## API Quirks
//!
//! ### Rate limiting
//! A 429 carries a `Retry-After` header in seconds. We honour it for a small
//! number of retries and then surface [`ServiceError::RateLimited`].
//!
//! ### Player endpoints
//! `GET /me/player` answers 204 with an empty body when nothing is playing.
//! Player commands answer 403 when the device forbids the command (phones
//! commonly refuse remote volume changes) and 404 with reason
//! `NO_ACTIVE_DEVICE` when no device is active.
//!
//! ### Pagination
//! Listings return a full `next` URL. It is used verbatim as the continuation
//! cursor, so no query parameters are re-applied to it.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode, header::RETRY_AFTER};

use super::{adapter, dto};
use crate::model::{PlaybackSnapshot, PlayedTrack, PlaylistSummary, Track, User};
use crate::service::domain::{Page, ServiceError};

const DEFAULT_BASE_URL: &str = "https://api.spotify.com/v1";

/// Page size for playlist item listings (API maximum)
const PLAYLIST_PAGE_LIMIT: u32 = 100;

/// Page size for liked tracks and playlist listings (API maximum)
const LIBRARY_PAGE_LIMIT: u32 = 50;

/// Fields requested for playlist items; keeps payloads small
const PLAYLIST_ITEM_FIELDS: &str = "items(track(id,name,type,is_local,artists(name))),next,total";

/// Upper bound on a single Retry-After wait
const MAX_RETRY_WAIT_SECS: u64 = 30;

/// Which family of endpoints a request belongs to; decides how 403/404 map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Library,
    Player,
}

/// Spotify Web API client
pub struct SpotifyClient {
    http_client: reqwest::Client,
    base_url: String,
    access_token: String,
    max_retries: u32,
}

impl SpotifyClient {
    /// Create a client for the public API.
    pub fn new(access_token: impl Into<String>) -> Result<Self, ServiceError> {
        Self::with_base_url(access_token, DEFAULT_BASE_URL)
    }

    /// Create a client against a different base URL (mock servers, proxies).
    pub fn with_base_url(
        access_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        let http_client = reqwest::Client::builder()
            .gzip(true)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            max_retries: 3,
        })
    }

    /// Number of times a rate-limited call is retried before giving up.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub async fn current_user(&self) -> Result<User, ServiceError> {
        let user: dto::PrivateUser = self
            .get_json(self.request(Method::GET, "/me"), Scope::Library)
            .await?;
        Ok(adapter::to_user(user))
    }

    pub async fn user_playlists(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<PlaylistSummary>, ServiceError> {
        let request = match cursor {
            Some(next) => self.request_url(Method::GET, &next),
            None => self
                .request(Method::GET, "/me/playlists")
                .query(&[("limit", LIBRARY_PAGE_LIMIT)]),
        };
        let page: dto::Paging<dto::SimplifiedPlaylist> =
            self.get_json(request, Scope::Library).await?;
        Ok(adapter::to_summary_page(page))
    }

    pub async fn playlist(&self, playlist_id: &str) -> Result<PlaylistSummary, ServiceError> {
        let request = self
            .request(Method::GET, &format!("/playlists/{}", path_segment(playlist_id)))
            .query(&[("fields", "id,name,owner(id),tracks(total)")]);
        let playlist: dto::SimplifiedPlaylist = self.get_json(request, Scope::Library).await?;
        Ok(adapter::to_summary(playlist))
    }

    pub async fn playlist_tracks(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<Track>, ServiceError> {
        let request = match cursor {
            Some(next) => self.request_url(Method::GET, &next),
            None => self
                .request(
                    Method::GET,
                    &format!("/playlists/{}/tracks", path_segment(playlist_id)),
                )
                .query(&[
                    ("limit", PLAYLIST_PAGE_LIMIT.to_string()),
                    ("fields", PLAYLIST_ITEM_FIELDS.to_string()),
                ]),
        };
        let page: dto::Paging<dto::ItemWrapper> = self.get_json(request, Scope::Library).await?;
        Ok(adapter::to_track_page(page))
    }

    pub async fn liked_tracks(&self, cursor: Option<String>) -> Result<Page<Track>, ServiceError> {
        let request = match cursor {
            Some(next) => self.request_url(Method::GET, &next),
            None => self
                .request(Method::GET, "/me/tracks")
                .query(&[("limit", LIBRARY_PAGE_LIMIT)]),
        };
        let page: dto::Paging<dto::ItemWrapper> = self.get_json(request, Scope::Library).await?;
        Ok(adapter::to_track_page(page))
    }

    pub async fn saved_contains(&self, track_ids: &[String]) -> Result<Vec<bool>, ServiceError> {
        if track_ids.is_empty() {
            return Ok(Vec::new());
        }
        let request = self
            .request(Method::GET, "/me/tracks/contains")
            .query(&[("ids", track_ids.join(","))]);
        let flags: Vec<bool> = self.get_json(request, Scope::Library).await?;
        if flags.len() != track_ids.len() {
            return Err(ServiceError::Parse(format!(
                "expected {} saved flags, got {}",
                track_ids.len(),
                flags.len()
            )));
        }
        Ok(flags)
    }

    /// Listening history. Spotify only keeps the most recent plays, and the
    /// `next` URL walks backwards through them.
    pub async fn recently_played(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<PlayedTrack>, ServiceError> {
        let request = match cursor {
            Some(next) => self.request_url(Method::GET, &next),
            None => self
                .request(Method::GET, "/me/player/recently-played")
                .query(&[("limit", LIBRARY_PAGE_LIMIT)]),
        };
        let page: dto::Paging<dto::PlayHistory> = self.get_json(request, Scope::Library).await?;
        Ok(adapter::to_played_page(page))
    }

    pub async fn playback(&self) -> Result<Option<PlaybackSnapshot>, ServiceError> {
        let response = self
            .send(self.request(Method::GET, "/me/player"), Scope::Player)
            .await?;
        let playback: Option<dto::CurrentPlayback> = read_optional_json(response).await?;
        Ok(playback.map(adapter::to_snapshot))
    }

    pub async fn currently_playing(&self) -> Result<Option<String>, ServiceError> {
        let response = self
            .send(
                self.request(Method::GET, "/me/player/currently-playing"),
                Scope::Player,
            )
            .await?;
        let playing: Option<dto::CurrentlyPlaying> = read_optional_json(response).await?;
        Ok(playing.and_then(|p| p.item).and_then(|item| item.id))
    }

    pub async fn set_volume(&self, percent: u8) -> Result<(), ServiceError> {
        let request = self
            .request(Method::PUT, "/me/player/volume")
            .query(&[("volume_percent", percent.min(100))]);
        self.send(request, Scope::Player).await.map(drop)
    }

    pub async fn resume(&self) -> Result<(), ServiceError> {
        let request = self.request(Method::PUT, "/me/player/play");
        self.send(request, Scope::Player).await.map(drop)
    }

    pub async fn pause(&self) -> Result<(), ServiceError> {
        let request = self.request(Method::PUT, "/me/player/pause");
        self.send(request, Scope::Player).await.map(drop)
    }

    pub async fn skip_next(&self) -> Result<(), ServiceError> {
        let request = self.request(Method::POST, "/me/player/next");
        self.send(request, Scope::Player).await.map(drop)
    }

    pub async fn seek(&self, position_ms: u64) -> Result<(), ServiceError> {
        let request = self
            .request(Method::PUT, "/me/player/seek")
            .query(&[("position_ms", position_ms)]);
        self.send(request, Scope::Player).await.map(drop)
    }

    pub async fn add_to_queue(&self, track_id: &str) -> Result<(), ServiceError> {
        let url = format!(
            "/me/player/queue?uri={}",
            urlencoding::encode(&adapter::track_uri(track_id))
        );
        let request = self.request(Method::POST, &url);
        self.send(request, Scope::Player).await.map(drop)
    }

    pub async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        public: bool,
    ) -> Result<PlaylistSummary, ServiceError> {
        let request = self
            .request(
                Method::POST,
                &format!("/users/{}/playlists", path_segment(user_id)),
            )
            .json(&dto::CreatePlaylistRequest { name, public });
        let playlist: dto::SimplifiedPlaylist = self.get_json(request, Scope::Library).await?;
        Ok(adapter::to_summary(playlist))
    }

    pub async fn replace_playlist_items(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), ServiceError> {
        let request = self
            .request(
                Method::PUT,
                &format!("/playlists/{}/tracks", path_segment(playlist_id)),
            )
            .json(&adapter::to_uris(track_ids));
        self.send(request, Scope::Library).await.map(drop)
    }

    pub async fn add_playlist_items(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), ServiceError> {
        let request = self
            .request(
                Method::POST,
                &format!("/playlists/{}/tracks", path_segment(playlist_id)),
            )
            .json(&adapter::to_uris(track_ids));
        self.send(request, Scope::Library).await.map(drop)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request_url(method, &format!("{}{}", self.base_url, path))
    }

    fn request_url(&self, method: Method, url: &str) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .bearer_auth(&self.access_token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
        scope: Scope,
    ) -> Result<T, ServiceError> {
        self.send(request, scope)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))
    }

    /// Send a request, retrying rate-limited attempts after `Retry-After`.
    async fn send(&self, request: RequestBuilder, scope: Scope) -> Result<Response, ServiceError> {
        let mut attempt = 0;
        loop {
            let Some(this_attempt) = request.try_clone() else {
                return Err(ServiceError::Network(
                    "request body cannot be replayed".to_string(),
                ));
            };

            let response = this_attempt
                .send()
                .await
                .map_err(|e| ServiceError::Network(e.to_string()))?;

            match check_status(response, scope).await {
                Err(ServiceError::RateLimited { retry_after_secs })
                    if attempt < self.max_retries =>
                {
                    let wait = retry_after_secs.unwrap_or(1).min(MAX_RETRY_WAIT_SECS);
                    attempt += 1;
                    tracing::warn!(
                        "Rate limited, retrying in {}s (attempt {}/{})",
                        wait,
                        attempt,
                        self.max_retries
                    );
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                }
                result => return result,
            }
        }
    }
}

/// Map a non-success status to a [`ServiceError`].
async fn check_status(response: Response, scope: Scope) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after_secs = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());

    let body = response
        .json::<dto::ErrorEnvelope>()
        .await
        .ok()
        .map(|envelope| envelope.error);
    let reason = body.as_ref().and_then(|b| b.reason.clone());
    let message = body
        .map(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());

    Err(match status {
        StatusCode::UNAUTHORIZED => ServiceError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => ServiceError::RateLimited { retry_after_secs },
        StatusCode::FORBIDDEN if scope == Scope::Player => {
            ServiceError::DeviceControlDenied(message)
        }
        StatusCode::NOT_FOUND
            if scope == Scope::Player || reason.as_deref() == Some("NO_ACTIVE_DEVICE") =>
        {
            ServiceError::NoActiveDevice
        }
        StatusCode::NOT_FOUND => ServiceError::NotFound(message),
        _ => ServiceError::ApiError {
            status: status.as_u16(),
            message,
        },
    })
}

/// Player reads answer 204 (or an empty 200) when there is nothing to report.
async fn read_optional_json<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<Option<T>, ServiceError> {
    if response.status() == StatusCode::NO_CONTENT {
        return Ok(None);
    }
    let body = response
        .text()
        .await
        .map_err(|e| ServiceError::Network(e.to_string()))?;
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&body)
        .map(Some)
        .map_err(|e| ServiceError::Parse(e.to_string()))
}

fn path_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
