//! # Infrastructure Layer
//!
//! Handles interactions with external systems and services.
//! Implements the traits defined in the Domain layer (ChatProvider, LlmProvider,
//! WeatherProvider, MarketDataProvider, SearchProvider, BackupSink).

pub mod backup;
pub mod finance;
pub mod http;
pub mod matrix;
pub mod openai;
pub mod search;
pub mod weather;
