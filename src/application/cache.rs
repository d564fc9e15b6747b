//! # TTL Cache
//!
//! In-memory cache whose entries are valid until a fixed expiry instant.
//! Best effort only: a miss means the caller recomputes.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    data: V,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: TimeDelta,
    entries: HashMap<String, CacheEntry<V>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: TimeDelta) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Returns the cached value if it has not expired at `now`.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.data.clone())
    }

    /// Stores `value`, valid until `now + ttl`. Expired entries are purged first.
    pub fn put(&mut self, key: impl Into<String>, value: V, now: DateTime<Utc>) {
        self.purge_expired(now);
        let expires_at = now
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries.insert(
            key.into(),
            CacheEntry {
                data: value,
                expires_at,
            },
        );
    }

    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
