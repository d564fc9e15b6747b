//! # Conversation History
//!
//! Per-user role-tagged message lists for the AI chat module, stored in
//! `chat_history.json`. Each list starts with exactly one system entry and is trimmed to
//! `max_pairs` user/assistant exchanges, oldest first. Every mutation is written through.

use anyhow::{Result, bail};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::application::store::KeyedStore;
use crate::domain::types::{ChatMessage, MessageRole};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub messages: Vec<ChatMessage>,
    pub last_interaction: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryStats {
    pub exchanges: usize,
    pub messages: usize,
    pub last_interaction: DateTime<Utc>,
}

pub struct ConversationStore {
    store: KeyedStore<ConversationRecord>,
    system_prompt: String,
    max_pairs: usize,
    retention: TimeDelta,
}

impl ConversationStore {
    pub fn load(
        path: impl Into<PathBuf>,
        system_prompt: impl Into<String>,
        max_pairs: usize,
        retention: TimeDelta,
    ) -> Result<Self> {
        if retention < TimeDelta::zero() {
            bail!("history retention must not be negative (got {})", retention);
        }
        Ok(Self {
            store: KeyedStore::load(path),
            system_prompt: system_prompt.into(),
            max_pairs,
            retention,
        })
    }

    /// Upper bound on a user's message list: the system entry plus `max_pairs` exchanges.
    pub fn max_len(&self) -> usize {
        1 + 2 * self.max_pairs
    }

    /// Returns the user's record, seeding it with the system entry if absent.
    pub fn get_or_create(&mut self, user_id: &str, now: DateTime<Utc>) -> &ConversationRecord {
        let mut changed = !self.store.contains_key(user_id);
        {
            let record = self
                .store
                .get_or_insert_with(user_id, || seed(&self.system_prompt, now));
            changed |= ensure_system_entry(&mut record.messages, &self.system_prompt);
        }

        if changed {
            self.persist(now);
        }
        self.store
            .get_or_insert_with(user_id, || seed(&self.system_prompt, now))
    }

    /// Snapshot of the user's messages, ready to send to the model.
    pub fn messages(&mut self, user_id: &str, now: DateTime<Utc>) -> Vec<ChatMessage> {
        self.get_or_create(user_id, now).messages.clone()
    }

    /// Appends one entry, stamps the interaction time and trims to `max_len`.
    pub fn append(
        &mut self,
        user_id: &str,
        role: MessageRole,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        self.get_or_create(user_id, now);
        let max_pairs = self.max_pairs;
        if let Some(record) = self.store.get_mut(user_id) {
            record.messages.push(ChatMessage {
                role,
                content: content.into(),
            });
            record.last_interaction = now;
            trim_history(&mut record.messages, max_pairs);
        }
        self.persist(now);
    }

    /// Removes the user's whole record. Returns whether one existed.
    pub fn clear(&mut self, user_id: &str, now: DateTime<Utc>) -> bool {
        let existed = self.store.remove(user_id).is_some();
        if existed {
            self.persist(now);
        }
        existed
    }

    pub fn stats(&self, user_id: &str) -> Option<HistoryStats> {
        self.store.get(user_id).map(|record| {
            let conversational = record.messages.len().saturating_sub(1);
            HistoryStats {
                exchanges: conversational / 2,
                messages: conversational,
                last_interaction: record.last_interaction,
            }
        })
    }

    pub fn users(&self) -> usize {
        self.store.len()
    }

    /// Drops users idle for longer than the retention window.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = now.checked_sub_signed(self.retention) else {
            return 0;
        };
        self.store
            .retain(|_, record| record.last_interaction >= cutoff)
    }

    fn persist(&mut self, now: DateTime<Utc>) -> bool {
        let removed = self.sweep(now);
        if removed > 0 {
            tracing::info!("Removed {} idle conversation histories", removed);
        }
        self.store.persist()
    }
}

fn seed(system_prompt: &str, now: DateTime<Utc>) -> ConversationRecord {
    ConversationRecord {
        messages: vec![ChatMessage::system(system_prompt)],
        last_interaction: now,
    }
}

fn ensure_system_entry(messages: &mut Vec<ChatMessage>, system_prompt: &str) -> bool {
    match messages.first() {
        Some(first) if first.role == MessageRole::System => false,
        _ => {
            messages.insert(0, ChatMessage::system(system_prompt));
            true
        }
    }
}

/// Keeps entry 0 plus the newest `2 * max_pairs` entries.
pub fn trim_history(messages: &mut Vec<ChatMessage>, max_pairs: usize) {
    let max_len = 1 + 2 * max_pairs;
    if messages.len() > max_len {
        let excess = messages.len() - max_len;
        messages.drain(1..1 + excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn store(dir: &TempDir, max_pairs: usize) -> ConversationStore {
        ConversationStore::load(
            dir.path().join("chat_history.json"),
            "You are a helpful assistant.",
            max_pairs,
            TimeDelta::days(30),
        )
        .unwrap()
    }

    #[test]
    fn test_trim_keeps_system_and_latest_pairs() {
        let dir = TempDir::new().unwrap();
        let mut history = store(&dir, 3);

        for i in 0..10 {
            history.append("@u:x", MessageRole::User, format!("q{i}"), t0());
            history.append("@u:x", MessageRole::Assistant, format!("a{i}"), t0());
        }

        let messages = history.messages("@u:x", t0());
        assert_eq!(messages.len(), 7);
        assert_eq!(messages[0], ChatMessage::system("You are a helpful assistant."));
        let rest: Vec<&str> = messages[1..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(rest, vec!["q7", "a7", "q8", "a8", "q9", "a9"]);
    }

    #[test]
    fn test_history_is_written_through() {
        let dir = TempDir::new().unwrap();
        let mut history = store(&dir, 3);
        history.append("@u:x", MessageRole::User, "hello", t0());

        let mut reloaded = store(&dir, 3);
        let messages = reloaded.messages("@u:x", t0());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1], ChatMessage::user("hello"));

        let raw = fs::read_to_string(dir.path().join("chat_history.json")).unwrap();
        assert!(raw.contains("last_interaction"));
    }

    #[test]
    fn test_clear_and_stats() {
        let dir = TempDir::new().unwrap();
        let mut history = store(&dir, 3);
        assert!(history.stats("@u:x").is_none());

        history.append("@u:x", MessageRole::User, "q", t0());
        history.append("@u:x", MessageRole::Assistant, "a", t0());
        let stats = history.stats("@u:x").unwrap();
        assert_eq!(stats.exchanges, 1);
        assert_eq!(stats.messages, 2);

        assert!(history.clear("@u:x", t0()));
        assert!(!history.clear("@u:x", t0()));
        assert!(history.stats("@u:x").is_none());
    }

    #[test]
    fn test_missing_system_entry_is_repaired() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("chat_history.json"),
            r#"{"@u:x": {"messages": [{"role": "user", "content": "hi"}], "last_interaction": "2024-03-01T09:00:00Z"}}"#,
        )
        .unwrap();

        let mut history = store(&dir, 3);
        let messages = history.messages("@u:x", t0());
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_idle_users_are_swept_on_save() {
        let dir = TempDir::new().unwrap();
        let mut history = store(&dir, 3);
        history.append("@old:x", MessageRole::User, "q", t0());
        history.append("@new:x", MessageRole::User, "q", t0() + TimeDelta::days(31));

        assert_eq!(history.users(), 1);
        assert!(history.stats("@old:x").is_none());
    }

    #[test]
    fn test_zero_pairs_keeps_only_system() {
        let mut messages = vec![
            ChatMessage::system("s"),
            ChatMessage::user("q"),
            ChatMessage::assistant("a"),
        ];
        trim_history(&mut messages, 0);
        assert_eq!(messages, vec![ChatMessage::system("s")]);
    }
}
