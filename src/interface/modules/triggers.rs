//! Triggers command: `!triggers` lists every command and passive trigger.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::application::dispatcher::MessageHandler;
use crate::application::module::{BotModule, ModuleContext};
use crate::domain::traits::ChatProvider;
use crate::domain::types::IncomingMessage;
use crate::interface::modules::reply;
use crate::strings::help;

pub const NAME: &str = "triggers";
pub const DESCRIPTION: &str = "Display all bot commands and triggers (!triggers)";

pub fn factory(ctx: &ModuleContext) -> Result<Box<dyn BotModule>> {
    Ok(Box::new(TriggersModule { ctx: ctx.clone() }))
}

pub struct TriggersModule {
    ctx: ModuleContext,
}

struct TriggersCommand {
    text: String,
}

#[async_trait]
impl MessageHandler for TriggersCommand {
    async fn handle(&self, _: &IncomingMessage, _: &str, chat: &dyn ChatProvider) -> Result<()> {
        reply(chat, &self.text).await?;
        Ok(())
    }
}

#[async_trait]
impl BotModule for TriggersModule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    async fn setup(&mut self) -> Result<()> {
        let text = help::triggers(self.ctx.dispatcher.prefix());
        self.ctx
            .dispatcher
            .add_command(NAME, "triggers", Arc::new(TriggersCommand { text }))
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
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_help_uses_configured_prefix() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.system.command_prefix = "?".to_string();
        let ctx = context_with(dir.path(), config, Arc::new(ManualClock::at(t0())));
        let mut module = factory(&ctx).unwrap();
        module.setup().await.unwrap();

        let chat = RecordingChat::new(ROOM);
        ctx.dispatcher.dispatch(&message("?triggers"), &chat).await;
        let text = chat.last().unwrap();
        assert!(text.contains("* ?weather [zip]"));
        assert!(text.contains("**fuck dallas**"));
    }
}
