//! # Friday Command
//!
//! `!friday` posts the Friday video, only on Fridays and only once per channel per day.
//! Any other day it says how long is left.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::clock::SharedClock;
use crate::application::dispatcher::MessageHandler;
use crate::application::expiry::DailyGate;
use crate::application::module::{BotModule, ModuleContext};
use crate::domain::paths::FRIDAY_USAGE_FILE;
use crate::domain::traits::ChatProvider;
use crate::domain::types::IncomingMessage;
use crate::interface::modules::reply;
use crate::strings::messages;

pub const NAME: &str = "friday";
pub const DESCRIPTION: &str = "Friday video command (!friday) - only works on Fridays";

pub fn factory(ctx: &ModuleContext) -> Result<Box<dyn BotModule>> {
    Ok(Box::new(FridayModule {
        ctx: ctx.clone(),
        gate: None,
    }))
}

/// Days from `today` to the next Friday; a Friday counts as a week away.
pub fn days_until_friday(today: NaiveDate) -> u32 {
    let day = today.weekday().num_days_from_monday();
    let friday = Weekday::Fri.num_days_from_monday();
    if day < friday {
        friday - day
    } else {
        7 - day + friday
    }
}

fn day_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub struct FridayModule {
    ctx: ModuleContext,
    gate: Option<Arc<Mutex<DailyGate>>>,
}

struct FridayCommand {
    gate: Arc<Mutex<DailyGate>>,
    clock: SharedClock,
}

#[async_trait]
impl MessageHandler for FridayCommand {
    async fn handle(
        &self,
        message: &IncomingMessage,
        _args: &str,
        chat: &dyn ChatProvider,
    ) -> Result<()> {
        let today = self.clock.today();

        if today.weekday() != Weekday::Fri {
            let text = messages::friday_not_yet(day_name(today), days_until_friday(today));
            reply(chat, &text).await?;
            return Ok(());
        }

        let fired = self.gate.lock().await.try_fire(&message.channel_id, today);
        if fired {
            reply(chat, &messages::friday_celebration()).await?;
        } else {
            reply(chat, messages::FRIDAY_ALREADY_USED).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BotModule for FridayModule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    async fn setup(&mut self) -> Result<()> {
        let gate = DailyGate::load(
            self.ctx.dataset(FRIDAY_USAGE_FILE),
            self.ctx.options().friday_retention()?,
        )?;
        tracing::info!("Loaded Friday usage data for {} channel(s)", gate.len());
        let gate = Arc::new(Mutex::new(gate));

        self.ctx
            .dispatcher
            .add_command(
                NAME,
                "friday",
                Arc::new(FridayCommand {
                    gate: gate.clone(),
                    clock: self.ctx.clock.clone(),
                }),
            )
            .await?;
        self.gate = Some(gate);
        Ok(())
    }

    async fn teardown(&mut self) -> Result<()> {
        if let Some(gate) = &self.gate {
            gate.lock().await.save(self.ctx.clock.today());
        }
        self.ctx.dispatcher.unregister_owner(NAME).await;
        Ok(())
    }
}
