//! # Stock Command
//!
//! `!stock <ticker>` shows a price snapshot from the market data provider.
//! Snapshots are cached per ticker for `stock_cache_minutes`.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;

use crate::application::cache::TtlCache;
use crate::application::clock::SharedClock;
use crate::application::dispatcher::MessageHandler;
use crate::application::module::{BotModule, ModuleContext};
use crate::domain::traits::{ChatProvider, MarketDataProvider};
use crate::domain::types::{IncomingMessage, StockQuote};
use crate::infrastructure::finance::YahooFinance;
use crate::interface::modules::{edit, reply};
use crate::strings::messages;

pub const NAME: &str = "stock";
pub const DESCRIPTION: &str = "Stock price lookup command (!stock <ticker>)";

pub fn factory(ctx: &ModuleContext) -> Result<Box<dyn BotModule>> {
    Ok(Box::new(StockModule::with_provider(ctx, Arc::new(YahooFinance))))
}

pub struct StockModule {
    ctx: ModuleContext,
    provider: Arc<dyn MarketDataProvider>,
}

impl StockModule {
    pub fn with_provider(ctx: &ModuleContext, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            ctx: ctx.clone(),
            provider,
        }
    }
}

fn ticker_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Z0-9.\-]+$").ok())
        .as_ref()
}

/// Normalizes a ticker to upper case, or returns the message explaining why it is invalid.
pub fn validate_ticker(raw: &str) -> Result<String, &'static str> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(messages::STOCK_USAGE);
    }
    if ticker.chars().count() > 10 {
        return Err(messages::STOCK_BAD_LENGTH);
    }
    if !ticker_pattern().is_some_and(|re| re.is_match(&ticker)) {
        return Err(messages::STOCK_BAD_CHARS);
    }
    Ok(ticker)
}

/// Groups the integer part of `value` with commas.
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn amount(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, group_thousands(cents / 100), cents % 100)
}

fn money(value: f64, currency: &str) -> String {
    if currency == "USD" {
        format!("${}", amount(value))
    } else {
        format!("{} {}", amount(value), currency)
    }
}

pub fn format_quote(quote: &StockQuote, footer: &str) -> String {
    let (change, percent) = quote.change();
    let (emoji, direction) = if change > 0.0 {
        ("📈", "+")
    } else if change < 0.0 {
        ("📉", "-")
    } else {
        ("➡️", "")
    };

    let mut lines = vec![
        format!("{} **{}**", emoji, quote.symbol),
        format!("**{}**", quote.name),
        String::new(),
        format!("💰 **Current Price**: {}", money(quote.current_price, &quote.currency)),
        format!(
            "📊 **Change**: {}${} ({}{:.2}%)",
            direction,
            amount(change.abs()),
            direction,
            percent.abs()
        ),
    ];

    if let Some(prev) = quote.previous_close {
        lines.push(format!("📉 **Previous Close**: {}", money(prev, &quote.currency)));
    }
    if let (Some(low), Some(high)) = (quote.day_low, quote.day_high) {
        lines.push(format!(
            "📏 **Day Range**: {} - {}",
            money(low, &quote.currency),
            money(high, &quote.currency)
        ));
    }
    if let Some(volume) = quote.volume {
        lines.push(format!("📦 **Volume**: {}", group_thousands(volume)));
    }

    lines.push(String::new());
    lines.push(footer.to_string());
    lines.join("\n")
}

struct StockCommand {
    provider: Arc<dyn MarketDataProvider>,
    cache: Arc<Mutex<TtlCache<StockQuote>>>,
    clock: SharedClock,
}

#[async_trait]
impl MessageHandler for StockCommand {
    async fn handle(
        &self,
        _message: &IncomingMessage,
        args: &str,
        chat: &dyn ChatProvider,
    ) -> Result<()> {
        let ticker = match validate_ticker(args) {
            Ok(ticker) => ticker,
            Err(text) => {
                reply(chat, text).await?;
                return Ok(());
            }
        };

        let cached = self.cache.lock().await.get(&ticker, self.clock.now());
        if let Some(quote) = cached {
            tracing::debug!("Serving {} from cache", ticker);
            reply(chat, &format_quote(&quote, messages::STOCK_FOOTER_CACHED)).await?;
            return Ok(());
        }

        let pending = reply(chat, &messages::stock_fetching(&ticker)).await?;
        match self.provider.quote(&ticker).await {
            Ok(quote) => {
                self.cache
                    .lock()
                    .await
                    .put(ticker.clone(), quote.clone(), self.clock.now());
                edit(chat, &pending, &format_quote(&quote, messages::STOCK_FOOTER_LIVE)).await?;
            }
            Err(e) => {
                tracing::warn!("Stock lookup for {} failed: {}", ticker, e);
                edit(chat, &pending, &messages::stock_error(&e)).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BotModule for StockModule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    async fn setup(&mut self) -> Result<()> {
        let ttl = self.ctx.options().stock_cache_ttl()?;
        let command = StockCommand {
            provider: self.provider.clone(),
            cache: Arc::new(Mutex::new(TtlCache::new(ttl))),
            clock: self.ctx.clock.clone(),
        };
        self.ctx
            .dispatcher
            .add_command(NAME, "stock", Arc::new(command))
            .await
    }

    async fn teardown(&mut self) -> Result<()> {
        self.ctx.dispatcher.unregister_owner(NAME).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::clock::ManualClock;
    use crate::application::testing::{RecordingChat, ROOM, context_with, message, t0};
    use crate::domain::config::AppConfig;
    use chrono::TimeDelta;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FakeMarket {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketDataProvider for FakeMarket {
        async fn quote(&self, ticker: &str) -> Result<StockQuote, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if ticker == "NOPE" {
                return Err(format!("Invalid ticker: **{ticker}**"));
            }
            Ok(sample(ticker))
        }
    }

    fn sample(ticker: &str) -> StockQuote {
        StockQuote {
            symbol: ticker.to_string(),
            name: "Apple Inc.".to_string(),
            currency: "USD".to_string(),
            current_price: 1236.0,
            previous_close: Some(1200.0),
            day_high: Some(1240.0),
            day_low: Some(1190.25),
            volume: Some(52_345_678),
        }
    }

    #[test]
    fn test_validate_ticker() {
        assert_eq!(validate_ticker(" brk.b "), Ok("BRK.B".to_string()));
        assert_eq!(validate_ticker("rds-a"), Ok("RDS-A".to_string()));
        assert_eq!(validate_ticker(""), Err(messages::STOCK_USAGE));
        assert_eq!(validate_ticker("ABCDEFGHIJK"), Err(messages::STOCK_BAD_LENGTH));
        assert_eq!(validate_ticker("AA$L"), Err(messages::STOCK_BAD_CHARS));
    }

    #[test]
    fn test_format_quote() {
        let text = format_quote(&sample("AAPL"), messages::STOCK_FOOTER_LIVE);
        assert!(text.starts_with("📈 **AAPL**"));
        assert!(text.contains("$1,236.00"));
        assert!(text.contains("+$36.00 (+3.00%)"));
        assert!(text.contains("$1,190.25 - $1,240.00"));
        assert!(text.contains("52,345,678"));

        let euro = StockQuote {
            currency: "EUR".to_string(),
            previous_close: Some(1300.0),
            ..sample("SAP")
        };
        let text = format_quote(&euro, messages::STOCK_FOOTER_LIVE);
        assert!(text.starts_with("📉"));
        assert!(text.contains("1,236.00 EUR"));
        assert!(text.contains("-$64.00 (-4.92%)"));
    }

    #[tokio::test]
    async fn test_stock_cache_and_errors() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::at(t0()));
        let ctx = context_with(dir.path(), AppConfig::default(), clock.clone());
        let market = Arc::new(FakeMarket {
            calls: AtomicUsize::new(0),
        });
        let mut module = StockModule::with_provider(&ctx, market.clone());
        module.setup().await.unwrap();

        let chat = RecordingChat::new(ROOM);
        ctx.dispatcher.dispatch(&message("!stock aapl"), &chat).await;
        assert!(chat.last().unwrap().contains(messages::STOCK_FOOTER_LIVE));

        ctx.dispatcher.dispatch(&message("!stock AAPL"), &chat).await;
        assert!(chat.last().unwrap().contains(messages::STOCK_FOOTER_CACHED));
        assert_eq!(market.calls.load(Ordering::SeqCst), 1);

        clock.advance(TimeDelta::minutes(5));
        ctx.dispatcher.dispatch(&message("!stock AAPL"), &chat).await;
        assert_eq!(market.calls.load(Ordering::SeqCst), 2);

        ctx.dispatcher.dispatch(&message("!stock nope"), &chat).await;
        assert!(chat.last().unwrap().starts_with("❌ Invalid ticker"));

        ctx.dispatcher.dispatch(&message("!stock"), &chat).await;
        assert_eq!(chat.last().unwrap(), messages::STOCK_USAGE);
        assert_eq!(market.calls.load(Ordering::SeqCst), 3);
    }
}
