//! # Domain Traits
//!
//! Abstract interfaces for the external collaborators the modules talk to (chat, AI,
//! weather, market data, search, backup storage).
//! Allows for pluggable implementations in the Infrastructure layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::types::{ChatMessage, Forecast, SearchResult, StockQuote, WeatherReport};

/// Abstract interface for a Chat Provider (e.g., Matrix, Console)
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a message to the room, returning its event id
    async fn send_message(&self, content: &str) -> Result<String, String>;

    /// Edit a message in the room
    async fn edit_message(&self, message_id: &str, content: &str) -> Result<(), String>;

    /// Send a typing indicator
    async fn typing(&self, active: bool) -> Result<(), String>;

    /// Get the current room ID
    fn room_id(&self) -> String;
}

/// Abstract interface for an LLM Provider
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for a full conversation
    async fn completion(&self, messages: &[ChatMessage]) -> Result<String, String>;

    /// Model name shown in replies
    fn model(&self) -> &str;
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, zip_code: &str) -> Result<WeatherReport, String>;
    async fn forecast(&self, zip_code: &str) -> Result<Forecast, String>;
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn quote(&self, ticker: &str) -> Result<StockQuote, String>;
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, String>;
}

/// Destination for backup archives.
#[async_trait]
pub trait BackupSink: Send + Sync {
    /// Store one archive under `name`, replacing any archive with the same name.
    async fn upload(&self, name: &str, archive: Vec<u8>) -> Result<(), String>;

    /// Delete archives created before `cutoff`. Returns how many were removed.
    async fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize, String>;
}
