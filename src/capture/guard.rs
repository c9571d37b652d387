//! Single-flight guard for capture sessions.
//!
//! Two sessions walking the same device would consume each other's
//! sentinels. Callers that can start captures concurrently (one per user or
//! device key) take a [`CapturePermit`] first; the permit is released on drop.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::CaptureError;

#[derive(Debug, Clone, Default)]
pub struct CaptureGuard {
    active: Arc<Mutex<HashSet<String>>>,
}

impl CaptureGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or fail with [`CaptureError::InProgress`] if a session
    /// already holds it.
    pub fn acquire(&self, key: &str) -> Result<CapturePermit, CaptureError> {
        if !self.active.lock().insert(key.to_string()) {
            return Err(CaptureError::InProgress(key.to_string()));
        }
        Ok(CapturePermit {
            key: key.to_string(),
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.active.lock().contains(key)
    }
}

/// Held while a session runs.
#[derive(Debug)]
pub struct CapturePermit {
    key: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl Drop for CapturePermit {
    fn drop(&mut self) {
        self.active.lock().remove(&self.key);
    }
}
