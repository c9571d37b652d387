//! Bounded, expiring store for computed previews.
//!
//! A preview (for example the keep-list of a clean) is computed once, shown
//! to the user, and applied later without recomputation. Entries are keyed
//! by session id, evicted least-recently-used past `capacity`, and treated
//! as missing once older than `ttl`.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

/// Time source for expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct Entry<V> {
    value: Arc<V>,
    stored_at: Instant,
}

pub struct ResultCache<K: Hash + Eq, V> {
    entries: Mutex<LruCache<K, Entry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K: Hash + Eq, V> ResultCache<K, V> {
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self::with_clock(capacity, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            clock,
        }
    }

    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        let entry = Entry {
            value: Arc::clone(&value),
            stored_at: self.clock.now(),
        };
        let mut entries = self.entries.lock();
        if !entries.contains(&key) && entries.len() == entries.cap().get() {
            tracing::debug!("Preview cache full, evicting the oldest entry");
        }
        entries.put(key, entry);
        value
    }

    /// The live entry for `key`. Expired entries are dropped on access.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(entry) if now.duration_since(entry.stored_at) < self.ttl => {
                return Some(Arc::clone(&entry.value));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    /// Remove and return the live entry for `key`.
    pub fn take(&self, key: &K) -> Option<Arc<V>> {
        let now = self.clock.now();
        let entry = self.entries.lock().pop(key)?;
        (now.duration_since(entry.stored_at) < self.ttl).then_some(entry.value)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
