//! Yahoo Finance chart API adapter.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::traits::MarketDataProvider;
use crate::domain::types::StockQuote;
use crate::infrastructure::http::http_client;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: String,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    previous_close: Option<f64>,
    #[serde(default)]
    chart_previous_close: Option<f64>,
    #[serde(default)]
    regular_market_day_high: Option<f64>,
    #[serde(default)]
    regular_market_day_low: Option<f64>,
    #[serde(default)]
    regular_market_volume: Option<u64>,
}

pub struct YahooFinance;

#[async_trait]
impl MarketDataProvider for YahooFinance {
    async fn quote(&self, ticker: &str) -> Result<StockQuote, String> {
        let response = http_client()
            .get(format!("{}/{}", CHART_URL, ticker))
            .query(&[("range", "1d"), ("interval", "1d")])
            .send()
            .await
            .map_err(|e| format!("Error fetching stock data: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Error fetching stock data: {}", e))?;

        if status.as_u16() == 404 {
            return Err(invalid_ticker(ticker));
        }
        if !status.is_success() && !body.trim_start().starts_with('{') {
            return Err(format!("Error fetching stock data: HTTP {}", status));
        }

        parse_chart(ticker, &body)
    }
}

fn invalid_ticker(ticker: &str) -> String {
    format!("Invalid ticker: **{ticker}**\nPlease check the symbol and try again.")
}

/// Extracts a quote from a chart API body.
pub fn parse_chart(ticker: &str, body: &str) -> Result<StockQuote, String> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| format!("Error fetching stock data: {}", e))?;

    if let Some(error) = envelope.chart.error {
        tracing::debug!("Chart API error for {}: {}", ticker, error.description);
        return Err(invalid_ticker(ticker));
    }

    let meta = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .map(|result| result.meta)
        .ok_or_else(|| {
            format!(
                "No data found for ticker: **{ticker}**\nPlease check the ticker symbol and try again."
            )
        })?;

    let current_price = meta.regular_market_price.ok_or_else(|| {
        format!("Unable to get price data for: **{ticker}**\nTicker may be invalid or delisted.")
    })?;

    Ok(StockQuote {
        name: meta
            .long_name
            .or(meta.short_name)
            .unwrap_or_else(|| meta.symbol.clone()),
        symbol: meta.symbol,
        currency: meta.currency.unwrap_or_else(|| "USD".to_string()),
        current_price,
        previous_close: meta.previous_close.or(meta.chart_previous_close),
        day_high: meta.regular_market_day_high,
        day_low: meta.regular_market_day_low,
        volume: meta.regular_market_volume,
    })
}
