//! Dallas trigger: "fuck dallas" always gets a chant back, no cooldown.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::application::dispatcher::MessageHandler;
use crate::application::module::{BotModule, ModuleContext};
use crate::domain::traits::ChatProvider;
use crate::domain::types::IncomingMessage;
use crate::interface::modules::eagles::load_chants;
use crate::interface::modules::{pick, reply};

pub const NAME: &str = "dallas_trigger";
pub const DESCRIPTION: &str = "Responds to 'fuck dallas' with a random Eagles chant";

pub fn factory(ctx: &ModuleContext) -> Result<Box<dyn BotModule>> {
    Ok(Box::new(DallasTrigger { ctx: ctx.clone() }))
}

pub struct DallasTrigger {
    ctx: ModuleContext,
}

struct DallasListener {
    chants: Arc<Vec<String>>,
}

#[async_trait]
impl MessageHandler for DallasListener {
    async fn handle(
        &self,
        message: &IncomingMessage,
        _args: &str,
        chat: &dyn ChatProvider,
    ) -> Result<()> {
        if message.content.to_lowercase().contains("fuck dallas")
            && let Some(chant) = pick(self.chants.as_slice())
        {
            reply(chat, &chant).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BotModule for DallasTrigger {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    async fn setup(&mut self) -> Result<()> {
        let listener = DallasListener {
            chants: load_chants(&self.ctx),
        };
        self.ctx
            .dispatcher
            .add_listener(NAME, Arc::new(listener))
            .await;
        Ok(())
    }

    async fn teardown(&mut self) -> Result<()> {
        self.ctx.dispatcher.unregister_owner(NAME).await;
        Ok(())
    }
}
