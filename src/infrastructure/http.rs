//! Shared HTTP client and response helpers for the outbound service adapters.

use reqwest::{Client, Response, StatusCode};
use std::sync::OnceLock;
use std::time::Duration;

/// HTTP client reused across requests
pub fn http_client() -> &'static Client {
    static CLIENT: OnceLock<Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("nicebot/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            })
    })
}

/// Reads an error body, preferring the `error.message` field JSON APIs tend to return.
pub async fn error_text(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|json| {
            let error = json.get("error")?;
            error
                .get("message")
                .and_then(|m| m.as_str())
                .or_else(|| error.as_str())
                .or_else(|| json.get("message").and_then(|m| m.as_str()))
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("HTTP {}: {}", status, body));
    (status, message)
}
