//! # Nice Trigger
//!
//! Replies with a "Nice!" variant to any message containing "nice" and counts it per
//! server and channel. Owns the counter map the `count` module reads.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::application::counters::{NiceCounts, SharedCounters};
use crate::application::dispatcher::MessageHandler;
use crate::application::module::{BotModule, ModuleContext};
use crate::domain::paths::NICE_COUNTS_FILE;
use crate::domain::traits::ChatProvider;
use crate::domain::types::IncomingMessage;
use crate::interface::modules::{pick, reply};
use crate::strings::responses;

pub const NAME: &str = "nice_trigger";
pub const DESCRIPTION: &str = "Responds 'Nice!' to messages containing 'nice'";

pub fn factory(ctx: &ModuleContext) -> Result<Box<dyn BotModule>> {
    Ok(Box::new(NiceTrigger {
        ctx: ctx.clone(),
        counters: None,
    }))
}

pub struct NiceTrigger {
    ctx: ModuleContext,
    counters: Option<SharedCounters>,
}

struct NiceListener {
    counters: SharedCounters,
}

#[async_trait]
impl MessageHandler for NiceListener {
    async fn handle(
        &self,
        message: &IncomingMessage,
        _args: &str,
        chat: &dyn ChatProvider,
    ) -> Result<()> {
        if !message.content.to_lowercase().contains("nice") {
            return Ok(());
        }

        let count = self
            .counters
            .lock()
            .await
            .increment(message.server_key(), &message.channel_id);
        tracing::debug!("Nice #{} in {}", count, message.channel_id);

        if let Some(response) = pick(responses::NICE) {
            reply(chat, &response).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BotModule for NiceTrigger {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    async fn setup(&mut self) -> Result<()> {
        let counters = NiceCounts::load(self.ctx.dataset(NICE_COUNTS_FILE)).shared();
        self.ctx
            .dispatcher
            .add_listener(
                NAME,
                Arc::new(NiceListener {
                    counters: counters.clone(),
                }),
            )
            .await;
        self.counters = Some(counters);
        Ok(())
    }

    async fn teardown(&mut self) -> Result<()> {
        if let Some(counters) = &self.counters {
            counters.lock().await.persist();
        }
        self.ctx.dispatcher.unregister_owner(NAME).await;
        Ok(())
    }

    fn shared_counters(&self) -> Option<SharedCounters> {
        self.counters.clone()
    }
}
