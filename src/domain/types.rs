//! # Domain Types
//!
//! Common data structures used across the module and store logic.

use serde::{Deserialize, Serialize};

/// Server key used for messages that do not belong to a server (direct messages).
pub const DIRECT_MESSAGE_KEY: &str = "DM";

/// An incoming chat message as seen by module handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub sender: String,
    pub channel_id: String,
    pub server_id: Option<String>,
    pub content: String,
}

impl IncomingMessage {
    /// The key this message is counted under at the server level.
    pub fn server_key(&self) -> &str {
        self.server_id.as_deref().unwrap_or(DIRECT_MESSAGE_KEY)
    }

    pub fn is_direct(&self) -> bool {
        self.server_id.is_none()
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A role-tagged chat message, as stored in conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Current conditions for a location.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub location: String,
    pub description: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u64,
    pub wind_speed: f64,
}

/// One day of a multi-day forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastDay {
    pub date: chrono::NaiveDate,
    pub high: f64,
    pub low: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub location: String,
    pub days: Vec<ForecastDay>,
}

/// Price snapshot for a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: String,
    pub name: String,
    pub currency: String,
    pub current_price: f64,
    pub previous_close: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub volume: Option<u64>,
}

impl StockQuote {
    /// Absolute and percentage change against the previous close.
    pub fn change(&self) -> (f64, f64) {
        match self.previous_close {
            Some(prev) if prev > 0.0 => {
                let change = self.current_price - prev;
                (change, change / prev * 100.0)
            }
            _ => (0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// A stored quote (`quotes.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: u64,
    pub quote: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_key_falls_back_to_dm() {
        let mut msg = IncomingMessage {
            sender: "@a:x".into(),
            channel_id: "!room:x".into(),
            server_id: None,
            content: "hi".into(),
        };
        assert_eq!(msg.server_key(), DIRECT_MESSAGE_KEY);
        msg.server_id = Some("x".into());
        assert_eq!(msg.server_key(), "x");
    }

    #[test]
    fn test_stock_change() {
        let quote = StockQuote {
            symbol: "AAPL".into(),
            name: "Apple".into(),
            currency: "USD".into(),
            current_price: 110.0,
            previous_close: Some(100.0),
            day_high: None,
            day_low: None,
            volume: None,
        };
        let (abs, pct) = quote.change();
        assert!((abs - 10.0).abs() < 1e-9);
        assert!((pct - 10.0).abs() < 1e-9);

        let flat = StockQuote {
            previous_close: None,
            ..quote
        };
        assert_eq!(flat.change(), (0.0, 0.0));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("ok")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }
}
