//! # Nice Counters
//!
//! Two-level tally (server id -> channel id -> count) kept in `nice_counts.json`.
//! The trigger that increments it and the command that reports it hold the same
//! `SharedCounters` handle; the orchestrator hands one module's handle to the other.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::store::KeyedStore;

pub type SharedCounters = Arc<Mutex<NiceCounts>>;

#[derive(Debug)]
pub struct NiceCounts {
    store: KeyedStore<BTreeMap<String, u64>>,
}

impl NiceCounts {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let store = KeyedStore::load(path);
        tracing::info!(
            "Loaded nice counts for {} server(s) from {}",
            store.len(),
            store.path().display()
        );
        Self { store }
    }

    pub fn shared(self) -> SharedCounters {
        Arc::new(Mutex::new(self))
    }

    /// Adds one to the channel's count and persists. Returns the new channel count.
    pub fn increment(&mut self, server_id: &str, channel_id: &str) -> u64 {
        let channels = self.store.get_or_insert_with(server_id, BTreeMap::new);
        let count = channels.entry(channel_id.to_string()).or_insert(0);
        *count += 1;
        let count = *count;
        self.store.persist();
        count
    }

    pub fn channel_count(&self, server_id: &str, channel_id: &str) -> u64 {
        self.store
            .get(server_id)
            .and_then(|channels| channels.get(channel_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn server_total(&self, server_id: &str) -> u64 {
        self.store
            .get(server_id)
            .map(|channels| channels.values().sum())
            .unwrap_or(0)
    }

    /// Channels of a server ordered by count, highest first.
    pub fn breakdown(&self, server_id: &str) -> Vec<(String, u64)> {
        let mut channels: Vec<(String, u64)> = self
            .store
            .get(server_id)
            .map(|channels| channels.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default();
        channels.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        channels
    }

    pub fn persist(&self) -> bool {
        self.store.persist()
    }
}
