//! # Quote Command
//!
//! `!quote` shows a random quote, `!quote <id>` a specific one, and `!quote <text>` a
//! random quote containing the text. Quotes are read from `quotes.json` at setup.

use anyhow::Result;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::sync::Arc;

use crate::application::dispatcher::MessageHandler;
use crate::application::module::{BotModule, ModuleContext};
use crate::application::store::{load_json, save_json};
use crate::domain::paths::QUOTES_FILE;
use crate::domain::traits::ChatProvider;
use crate::domain::types::{IncomingMessage, Quote};
use crate::interface::modules::reply;
use crate::strings::messages;

pub const NAME: &str = "quote";
pub const DESCRIPTION: &str = "Search and display quotes (!quote)";

pub fn factory(ctx: &ModuleContext) -> Result<Box<dyn BotModule>> {
    Ok(Box::new(QuoteModule { ctx: ctx.clone() }))
}

pub struct QuoteModule {
    ctx: ModuleContext,
}

/// What `!quote <term>` resolves to.
#[derive(Debug, PartialEq)]
pub enum QuoteLookup<'a> {
    Empty,
    Random(&'a Quote),
    ById(&'a Quote),
    NoSuchId(u64),
    Matches { quote: &'a Quote, count: usize },
    NoMatches,
}

#[derive(Debug, Default)]
pub struct QuoteBook {
    quotes: Vec<Quote>,
}

impl QuoteBook {
    pub fn new(quotes: Vec<Quote>) -> Self {
        Self { quotes }
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn by_id(&self, id: u64) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.id == id)
    }

    /// Quotes containing `term`, ignoring case.
    pub fn search(&self, term: &str) -> Vec<&Quote> {
        let term = term.to_lowercase();
        self.quotes
            .iter()
            .filter(|q| q.quote.to_lowercase().contains(&term))
            .collect()
    }

    pub fn lookup(&self, term: &str) -> QuoteLookup<'_> {
        let term = term.trim();
        let mut rng = rand::thread_rng();

        if self.quotes.is_empty() {
            return QuoteLookup::Empty;
        }
        if term.is_empty() {
            return self
                .quotes
                .choose(&mut rng)
                .map_or(QuoteLookup::Empty, QuoteLookup::Random);
        }
        if term.chars().all(|c| c.is_ascii_digit()) {
            return match term.parse::<u64>() {
                Ok(id) => self.by_id(id).map_or(QuoteLookup::NoSuchId(id), QuoteLookup::ById),
                Err(_) => QuoteLookup::NoMatches,
            };
        }

        let matches = self.search(term);
        match matches.choose(&mut rng) {
            Some(&quote) => QuoteLookup::Matches {
                quote,
                count: matches.len(),
            },
            None => QuoteLookup::NoMatches,
        }
    }
}

struct QuoteCommand {
    book: Arc<QuoteBook>,
}

#[async_trait]
impl MessageHandler for QuoteCommand {
    async fn handle(
        &self,
        _message: &IncomingMessage,
        args: &str,
        chat: &dyn ChatProvider,
    ) -> Result<()> {
        let term = args.trim();
        let text = match self.book.lookup(term) {
            QuoteLookup::Empty => messages::QUOTES_EMPTY.to_string(),
            QuoteLookup::Random(q) => messages::quote_body(q.id, &q.quote),
            QuoteLookup::ById(q) => format!(
                "{}\n\n{}",
                messages::quote_body(q.id, &q.quote),
                messages::quote_by_id_footer(q.id)
            ),
            QuoteLookup::NoSuchId(id) => messages::quote_not_found_id(id),
            QuoteLookup::Matches { quote, count } => format!(
                "{}\n\n{}",
                messages::quote_body(quote.id, &quote.quote),
                messages::quote_matches_footer(count, term)
            ),
            QuoteLookup::NoMatches => messages::quote_not_found_text(term),
        };
        reply(chat, &text).await?;
        Ok(())
    }
}

#[async_trait]
impl BotModule for QuoteModule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    async fn setup(&mut self) -> Result<()> {
        let path = self.ctx.dataset(QUOTES_FILE);
        if !path.exists() {
            tracing::info!("Creating empty {}", path.display());
            save_json(&path, &Vec::<Quote>::new());
        }
        let book = QuoteBook::new(load_json(&path));
        tracing::info!("Loaded {} quote(s)", book.len());

        self.ctx
            .dispatcher
            .add_command(NAME, "quote", Arc::new(QuoteCommand { book: Arc::new(book) }))
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
    use crate::application::testing::{RecordingChat, ROOM, message, test_context};
    use tempfile::TempDir;

    fn book() -> QuoteBook {
        QuoteBook::new(vec![
            Quote {
                id: 1,
                quote: "Fly Eagles Fly".to_string(),
            },
            Quote {
                id: 7,
                quote: "The eagles are coming".to_string(),
            },
            Quote {
                id: 12,
                quote: "Nice.".to_string(),
            },
        ])
    }

    #[test]
    fn test_lookup_by_id() {
        let book = book();
        assert_eq!(book.lookup("7"), QuoteLookup::ById(&book.quotes[1]));
        assert_eq!(book.lookup("99"), QuoteLookup::NoSuchId(99));
    }

    #[test]
    fn test_lookup_by_text() {
        let book = book();
        match book.lookup("EAGLES") {
            QuoteLookup::Matches { quote, count } => {
                assert_eq!(count, 2);
                assert!(quote.id == 1 || quote.id == 7);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(book.lookup("dallas"), QuoteLookup::NoMatches);
        assert!(matches!(book.lookup(""), QuoteLookup::Random(_)));
        assert_eq!(QuoteBook::default().lookup("x"), QuoteLookup::Empty);
    }

    #[tokio::test]
    async fn test_missing_file_is_created_and_reported_empty() {
        let dir = TempDir::new().unwrap();
        let ctx = test_context(dir.path());
        let mut module = factory(&ctx).unwrap();
        module.setup().await.unwrap();
        assert!(dir.path().join(QUOTES_FILE).exists());

        let chat = RecordingChat::new(ROOM);
        ctx.dispatcher.dispatch(&message("!quote"), &chat).await;
        assert_eq!(chat.last().unwrap(), messages::QUOTES_EMPTY);
    }

    #[tokio::test]
    async fn test_quote_command_footers() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(QUOTES_FILE),
            r#"[{"id": 3, "quote": "Bird gang"}]"#,
        )
        .unwrap();
        let ctx = test_context(dir.path());
        let mut module = factory(&ctx).unwrap();
        module.setup().await.unwrap();

        let chat = RecordingChat::new(ROOM);
        ctx.dispatcher.dispatch(&message("!quote 3"), &chat).await;
        assert!(chat.last().unwrap().contains("**Quote #3**"));
        assert!(chat.last().unwrap().contains("retrieved by ID: 3"));

        ctx.dispatcher.dispatch(&message("!quote bird"), &chat).await;
        assert!(chat.last().unwrap().contains("Found 1 matching quote for 'bird'"));
    }
}
