//! # Search Command
//!
//! `!search <query>` posts the top results from the search provider.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::application::dispatcher::MessageHandler;
use crate::application::module::{BotModule, ModuleContext};
use crate::domain::traits::{ChatProvider, SearchProvider};
use crate::domain::types::{IncomingMessage, SearchResult};
use crate::infrastructure::search::DuckDuckGo;
use crate::interface::modules::{edit, reply};
use crate::strings::messages::{self, truncate};

pub const NAME: &str = "search";
pub const DESCRIPTION: &str = "Web search command (!search <query>)";

const SNIPPET_LIMIT: usize = 200;

pub fn factory(ctx: &ModuleContext) -> Result<Box<dyn BotModule>> {
    Ok(Box::new(SearchModule::with_provider(ctx, Arc::new(DuckDuckGo))))
}

pub struct SearchModule {
    ctx: ModuleContext,
    provider: Arc<dyn SearchProvider>,
}

impl SearchModule {
    pub fn with_provider(ctx: &ModuleContext, provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            ctx: ctx.clone(),
            provider,
        }
    }
}

pub fn format_results(query: &str, results: &[SearchResult]) -> String {
    let mut lines = vec![format!("🔍 **Search Results for: {}**", query)];
    for (i, result) in results.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!("**{}. {}**", i + 1, result.title));
        if !result.snippet.is_empty() {
            lines.push(truncate(&result.snippet, SNIPPET_LIMIT));
        }
        lines.push(format!("[🔗 Link]({})", result.url));
    }
    lines.push(String::new());
    lines.push("_Powered by DuckDuckGo_".to_string());
    lines.join("\n")
}

struct SearchCommand {
    provider: Arc<dyn SearchProvider>,
    max_results: usize,
}

#[async_trait]
impl MessageHandler for SearchCommand {
    async fn handle(
        &self,
        _message: &IncomingMessage,
        args: &str,
        chat: &dyn ChatProvider,
    ) -> Result<()> {
        let query = args.trim();
        if query.is_empty() {
            reply(chat, messages::SEARCH_USAGE).await?;
            return Ok(());
        }

        let pending = reply(chat, &messages::searching(query)).await?;
        let text = match self.provider.search(query, self.max_results).await {
            Ok(results) if results.is_empty() => messages::search_no_results(query),
            Ok(results) => format_results(query, &results),
            Err(e) => {
                tracing::warn!("Search for '{}' failed: {}", query, e);
                messages::search_failed(&e)
            }
        };
        edit(chat, &pending, &text).await
    }
}

#[async_trait]
impl BotModule for SearchModule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    async fn setup(&mut self) -> Result<()> {
        let command = SearchCommand {
            provider: self.provider.clone(),
            max_results: self.ctx.options().search_max_results,
        };
        self.ctx
            .dispatcher
            .add_command(NAME, "search", Arc::new(command))
            .await
    }

    async fn teardown(&mut self) -> Result<()> {
        self.ctx.dispatcher.unregister_owner(NAME).await;
        Ok(())
    }
}
