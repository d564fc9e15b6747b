//! # Eagles Trigger
//!
//! Answers "eagles" with a random chant, at most once per channel per cooldown window.
//! Last-fire times persist in `eagles_timestamp.json` so a restart does not reset them.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::clock::SharedClock;
use crate::application::dispatcher::MessageHandler;
use crate::application::expiry::CooldownTracker;
use crate::application::module::{BotModule, ModuleContext};
use crate::application::store::read_json;
use crate::domain::paths::{EAGLES_COOLDOWN_FILE, EAGLES_RESPONSES_FILE};
use crate::domain::traits::ChatProvider;
use crate::domain::types::IncomingMessage;
use crate::interface::modules::{pick, reply};
use crate::strings::responses;

pub const NAME: &str = "eagles_trigger";
pub const DESCRIPTION: &str = "Responds to 'eagles' with random Eagles chants (per-channel cooldown)";

pub fn factory(ctx: &ModuleContext) -> Result<Box<dyn BotModule>> {
    Ok(Box::new(EaglesTrigger {
        ctx: ctx.clone(),
        cooldown: None,
    }))
}

/// Chant pool: `eagles_responses.json` if it holds a non-empty list, else the built-ins.
pub fn load_chants(ctx: &ModuleContext) -> Arc<Vec<String>> {
    let path = ctx.dataset(EAGLES_RESPONSES_FILE);
    let chants = match read_json::<Vec<String>>(&path) {
        Some(custom) if !custom.is_empty() => {
            tracing::info!("Loaded {} custom chants from {}", custom.len(), path.display());
            custom
        }
        _ => responses::EAGLES.iter().map(|s| s.to_string()).collect(),
    };
    Arc::new(chants)
}

pub struct EaglesTrigger {
    ctx: ModuleContext,
    cooldown: Option<Arc<Mutex<CooldownTracker>>>,
}

struct EaglesListener {
    cooldown: Arc<Mutex<CooldownTracker>>,
    chants: Arc<Vec<String>>,
    clock: SharedClock,
}

#[async_trait]
impl MessageHandler for EaglesListener {
    async fn handle(
        &self,
        message: &IncomingMessage,
        _args: &str,
        chat: &dyn ChatProvider,
    ) -> Result<()> {
        if !message.content.to_lowercase().contains("eagles") {
            return Ok(());
        }

        let fired = self
            .cooldown
            .lock()
            .await
            .try_fire(&message.channel_id, self.clock.now());
        if !fired {
            tracing::debug!("Eagles trigger cooling down in {}", message.channel_id);
            return Ok(());
        }

        if let Some(chant) = pick(self.chants.as_slice()) {
            reply(chat, &chant).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BotModule for EaglesTrigger {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    async fn setup(&mut self) -> Result<()> {
        let options = self.ctx.options();
        let cooldown = Arc::new(Mutex::new(CooldownTracker::load(
            self.ctx.dataset(EAGLES_COOLDOWN_FILE),
            options.eagles_cooldown_window()?,
            options.eagles_retention()?,
        )?));

        self.ctx
            .dispatcher
            .add_listener(
                NAME,
                Arc::new(EaglesListener {
                    cooldown: cooldown.clone(),
                    chants: load_chants(&self.ctx),
                    clock: self.ctx.clock.clone(),
                }),
            )
            .await;
        self.cooldown = Some(cooldown);
        Ok(())
    }

    async fn teardown(&mut self) -> Result<()> {
        if let Some(cooldown) = &self.cooldown {
            cooldown.lock().await.save(self.ctx.clock.now());
        }
        self.ctx.dispatcher.unregister_owner(NAME).await;
        Ok(())
    }
}
