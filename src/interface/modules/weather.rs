//! # Weather Commands
//!
//! `!weather [zip]`, `!forecast [zip]` and `!setlocation <zip>`.
//! A saved zip per user (`user_locations.json`) stands in when none is given.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::dispatcher::MessageHandler;
use crate::application::module::{BotModule, ModuleContext};
use crate::application::store::KeyedStore;
use crate::domain::paths::USER_LOCATIONS_FILE;
use crate::domain::traits::{ChatProvider, WeatherProvider};
use crate::domain::types::{Forecast, IncomingMessage, WeatherReport};
use crate::infrastructure::weather::OpenWeatherMap;
use crate::interface::modules::reply;
use crate::strings::messages;

pub const NAME: &str = "weather";
pub const DESCRIPTION: &str =
    "Weather commands (!weather [zip], !forecast [zip], !setlocation <zip>)";

pub fn factory(ctx: &ModuleContext) -> Result<Box<dyn BotModule>> {
    let provider = ctx
        .options()
        .weather_api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(|key| Arc::new(OpenWeatherMap::new(key)) as Arc<dyn WeatherProvider>);
    Ok(Box::new(WeatherModule::with_provider(ctx, provider)))
}

pub struct WeatherModule {
    ctx: ModuleContext,
    provider: Option<Arc<dyn WeatherProvider>>,
}

impl WeatherModule {
    pub fn with_provider(ctx: &ModuleContext, provider: Option<Arc<dyn WeatherProvider>>) -> Self {
        Self {
            ctx: ctx.clone(),
            provider,
        }
    }
}

pub fn is_valid_zip(zip: &str) -> bool {
    zip.len() == 5 && zip.chars().all(|c| c.is_ascii_digit())
}

fn condition_emoji(condition: &str) -> &'static str {
    let condition = condition.to_lowercase();
    if condition.contains("thunder") {
        "⛈️"
    } else if condition.contains("drizzle") {
        "🌦️"
    } else if condition.contains("rain") {
        "🌧️"
    } else if condition.contains("snow") {
        "❄️"
    } else if condition.contains("cloud") {
        "☁️"
    } else if condition.contains("clear") {
        "☀️"
    } else if condition.contains("mist") || condition.contains("fog") || condition.contains("haze") {
        "🌫️"
    } else {
        "🌤️"
    }
}

pub fn format_report(report: &WeatherReport, zip: &str) -> String {
    [
        format!(
            "{} **Weather in {}**",
            condition_emoji(&report.description),
            report.location
        ),
        format!("**{}**", report.description),
        String::new(),
        format!(
            "🌡️ **{:.0}°F** (feels like **{:.0}°F**)",
            report.temperature, report.feels_like
        ),
        format!("💧 Humidity: **{}%**", report.humidity),
        format!("💨 Wind: **{:.1} mph**", report.wind_speed),
        String::new(),
        format!("_📍 Zip Code: {} • Powered by OpenWeatherMap_", zip),
    ]
    .join("\n")
}

pub fn format_forecast(forecast: &Forecast, zip: &str) -> String {
    let mut lines = vec![format!("📅 **5-Day Forecast for {}**", forecast.location)];
    for (i, day) in forecast.days.iter().enumerate() {
        let label = match i {
            0 => "Today".to_string(),
            1 => "Tomorrow".to_string(),
            _ => day.date.format("%A").to_string(),
        };
        lines.push(String::new());
        lines.push(format!(
            "{} **{} ({})**",
            condition_emoji(&day.description),
            label,
            day.date.format("%m/%d")
        ));
        lines.push(format!(
            "High: **{:.0}°F** | Low: **{:.0}°F**",
            day.high, day.low
        ));
        lines.push(day.description.clone());
    }
    lines.push(String::new());
    lines.push(format!("_📍 Zip Code: {} • Powered by OpenWeatherMap_", zip));
    lines.join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WeatherAction {
    Current,
    Forecast,
    SetLocation,
}

struct WeatherCommand {
    action: WeatherAction,
    provider: Option<Arc<dyn WeatherProvider>>,
    locations: Arc<Mutex<KeyedStore<String>>>,
}

impl WeatherCommand {
    /// The zip to look up: the argument if present, otherwise the user's saved one.
    async fn resolve_zip(&self, user: &str, args: &str) -> Result<String, &'static str> {
        let zip = match args.split_whitespace().next() {
            Some(zip) => zip.to_string(),
            None => self
                .locations
                .lock()
                .await
                .get(user)
                .cloned()
                .ok_or(messages::WEATHER_NEED_LOCATION)?,
        };
        if is_valid_zip(&zip) {
            Ok(zip)
        } else {
            Err(messages::WEATHER_BAD_ZIP)
        }
    }

    async fn set_location(
        &self,
        provider: &dyn WeatherProvider,
        user: &str,
        args: &str,
    ) -> String {
        let Some(zip) = args.split_whitespace().next() else {
            return messages::SETLOCATION_USAGE.to_string();
        };
        if !is_valid_zip(zip) {
            return messages::WEATHER_BAD_ZIP.to_string();
        }

        match provider.current(zip).await {
            Ok(report) => {
                let mut locations = self.locations.lock().await;
                locations.insert(user, zip.to_string());
                locations.persist();
                tracing::info!("Saved location {} for {}", zip, user);
                messages::location_saved(&report.location, zip)
            }
            Err(e) => messages::location_unverified(&e),
        }
    }
}

#[async_trait]
impl MessageHandler for WeatherCommand {
    async fn handle(
        &self,
        message: &IncomingMessage,
        args: &str,
        chat: &dyn ChatProvider,
    ) -> Result<()> {
        let Some(provider) = &self.provider else {
            reply(chat, messages::WEATHER_DISABLED).await?;
            return Ok(());
        };
        let user = message.sender.as_str();

        let text = match self.action {
            WeatherAction::SetLocation => self.set_location(provider.as_ref(), user, args).await,
            action => match self.resolve_zip(user, args).await {
                Err(text) => text.to_string(),
                Ok(zip) if action == WeatherAction::Current => match provider.current(&zip).await {
                    Ok(report) => format_report(&report, &zip),
                    Err(e) => messages::weather_error(&e),
                },
                Ok(zip) => match provider.forecast(&zip).await {
                    Ok(forecast) => format_forecast(&forecast, &zip),
                    Err(e) => messages::weather_error(&e),
                },
            },
        };
        reply(chat, &text).await?;
        Ok(())
    }
}

#[async_trait]
impl BotModule for WeatherModule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    async fn setup(&mut self) -> Result<()> {
        if self.provider.is_none() {
            tracing::warn!("weather_api_key not configured; weather commands will only reply with a hint");
        }

        let locations: KeyedStore<String> = KeyedStore::load(self.ctx.dataset(USER_LOCATIONS_FILE));
        tracing::info!("Loaded {} saved location(s)", locations.len());
        let locations = Arc::new(Mutex::new(locations));

        for (name, action) in [
            ("weather", WeatherAction::Current),
            ("forecast", WeatherAction::Forecast),
            ("setlocation", WeatherAction::SetLocation),
        ] {
            let command = WeatherCommand {
                action,
                provider: self.provider.clone(),
                locations: locations.clone(),
            };
            self.ctx
                .dispatcher
                .add_command(NAME, name, Arc::new(command))
                .await?;
        }
        Ok(())
    }

    async fn teardown(&mut self) -> Result<()> {
        self.ctx.dispatcher.unregister_owner(NAME).await;
        Ok(())
    }
}
