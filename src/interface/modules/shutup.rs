//! Shut-up trigger: "shut up" gets "No, u!".

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::application::dispatcher::MessageHandler;
use crate::application::module::{BotModule, ModuleContext};
use crate::domain::traits::ChatProvider;
use crate::domain::types::IncomingMessage;
use crate::interface::modules::reply;
use crate::strings::responses;

pub const NAME: &str = "shutup_trigger";
pub const DESCRIPTION: &str = "Responds 'No, u!' to messages containing 'shut up'";

pub fn factory(ctx: &ModuleContext) -> Result<Box<dyn BotModule>> {
    Ok(Box::new(ShutUpTrigger { ctx: ctx.clone() }))
}

pub struct ShutUpTrigger {
    ctx: ModuleContext,
}

struct ShutUpListener;

#[async_trait]
impl MessageHandler for ShutUpListener {
    async fn handle(
        &self,
        message: &IncomingMessage,
        _args: &str,
        chat: &dyn ChatProvider,
    ) -> Result<()> {
        if message.content.to_lowercase().contains("shut up") {
            reply(chat, responses::SHUT_UP).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BotModule for ShutUpTrigger {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    async fn setup(&mut self) -> Result<()> {
        self.ctx
            .dispatcher
            .add_listener(NAME, Arc::new(ShutUpListener))
            .await;
        Ok(())
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
    async fn test_shut_up() {
        let dir = TempDir::new().unwrap();
        let ctx = test_context(dir.path());
        let mut module = factory(&ctx).unwrap();
        module.setup().await.unwrap();

        let chat = RecordingChat::new(ROOM);
        ctx.dispatcher.dispatch(&message("oh SHUT UP bot"), &chat).await;
        ctx.dispatcher.dispatch(&message("shutup"), &chat).await;
        assert_eq!(chat.sent(), vec!["No, u!"]);
    }
}
