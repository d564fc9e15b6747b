//! Bartender command: `!bartender` posts the song link.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::application::dispatcher::MessageHandler;
use crate::application::module::{BotModule, ModuleContext};
use crate::domain::traits::ChatProvider;
use crate::domain::types::IncomingMessage;
use crate::interface::modules::reply;
use crate::strings::messages;

pub const NAME: &str = "bartender";
pub const DESCRIPTION: &str = "Bartender video command (!bartender)";

pub fn factory(ctx: &ModuleContext) -> Result<Box<dyn BotModule>> {
    Ok(Box::new(BartenderModule { ctx: ctx.clone() }))
}

pub struct BartenderModule {
    ctx: ModuleContext,
}

struct BartenderCommand;

#[async_trait]
impl MessageHandler for BartenderCommand {
    async fn handle(&self, _: &IncomingMessage, _: &str, chat: &dyn ChatProvider) -> Result<()> {
        reply(chat, &messages::bartender()).await?;
        Ok(())
    }
}

#[async_trait]
impl BotModule for BartenderModule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    async fn setup(&mut self) -> Result<()> {
        self.ctx
            .dispatcher
            .add_command(NAME, "bartender", Arc::new(BartenderCommand))
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

    #[tokio::test]
    async fn test_bartender_link() {
        let dir = TempDir::new().unwrap();
        let ctx = test_context(dir.path());
        let mut module = factory(&ctx).unwrap();
        module.setup().await.unwrap();

        let chat = RecordingChat::new(ROOM);
        ctx.dispatcher.dispatch(&message("!BARTENDER"), &chat).await;
        assert!(chat.last().unwrap().contains(messages::BARTENDER_URL));

        module.teardown().await.unwrap();
        ctx.dispatcher.dispatch(&message("!bartender"), &chat).await;
        assert_eq!(chat.sent().len(), 1);
    }
}
