//! Domain types shared by every music service implementation.
//!
//! Remote calls return [`ServiceError`] so callers can decide per kind
//! whether a failure is recoverable in place (muting, restoring) or must be
//! propagated (reads before any write).

use std::future::Future;

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation cursor; `None` on the last page
    pub next: Option<String>,
}

impl<T> Page<T> {
    /// A final page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Errors returned by remote music service calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Access token rejected - reauthorize and try again")]
    Unauthorized,

    #[error("Device refused the command: {0}")]
    DeviceControlDenied(String),

    #[error("No active playback device")]
    NoActiveDevice,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited - try again later")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("API request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl ServiceError {
    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ServiceError::Network(_) | ServiceError::RateLimited { .. }
        ) || matches!(self, ServiceError::ApiError { status, .. } if *status >= 500)
    }

    /// Stable reason code for callers that map failures to user feedback.
    pub fn reason(&self) -> &'static str {
        match self {
            ServiceError::Network(_) => "network",
            ServiceError::Unauthorized => "unauthorized",
            ServiceError::DeviceControlDenied(_) => "device_control_denied",
            ServiceError::NoActiveDevice => "no_active_device",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::RateLimited { .. } => "rate_limited",
            ServiceError::ApiError { .. } => "api_error",
            ServiceError::Parse(_) => "parse",
        }
    }
}

/// Follow continuation cursors until the source reports no further page.
pub async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, ServiceError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, ServiceError>>,
{
    let mut items = Vec::new();
    let mut cursor = None;
    let mut pages = 0usize;

    loop {
        let page = fetch(cursor.take()).await?;
        pages += 1;
        items.extend(page.items);
        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    tracing::trace!("Collected {} items over {} pages", items.len(), pages);
    Ok(items)
}
