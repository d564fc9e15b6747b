//! OpenWeatherMap adapter (imperial units, US zip codes).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeDelta};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::domain::traits::WeatherProvider;
use crate::domain::types::{Forecast, ForecastDay, WeatherReport};
use crate::infrastructure::http::http_client;

const BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const FORECAST_DAYS: usize = 5;

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    name: String,
    main: MainBlock,
    weather: Vec<ConditionBlock>,
    #[serde(default)]
    wind: WindBlock,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    #[serde(default)]
    feels_like: f64,
    #[serde(default)]
    humidity: u64,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct WindBlock {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastEntry>,
    city: CityBlock,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt: i64,
    main: MainBlock,
    weather: Vec<ConditionBlock>,
}

#[derive(Debug, Deserialize)]
struct CityBlock {
    name: String,
    #[serde(default)]
    timezone: i64,
}

pub struct OpenWeatherMap {
    api_key: String,
}

impl OpenWeatherMap {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.trim().to_string(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        zip_code: &str,
    ) -> Result<T, String> {
        let response = http_client()
            .get(format!("{}/{}", BASE_URL, endpoint))
            .query(&[
                ("zip", format!("{},US", zip_code)),
                ("appid", self.api_key.clone()),
                ("units", "imperial".to_string()),
            ])
            .send()
            .await
            .map_err(|e| format!("Error fetching weather: {}", e))?;

        match response.status().as_u16() {
            200 => response
                .json()
                .await
                .map_err(|e| format!("Unexpected weather response: {}", e)),
            404 => Err("Invalid zip code. Please check and try again.".to_string()),
            401 => Err("Invalid API key. Please check your OpenWeatherMap API key.".to_string()),
            status => Err(format!("Weather service error (status {})", status)),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMap {
    async fn current(&self, zip_code: &str) -> Result<WeatherReport, String> {
        let data: CurrentResponse = self.get("weather", zip_code).await?;
        let description = data
            .weather
            .first()
            .map(|w| capitalize(&w.description))
            .unwrap_or_default();

        Ok(WeatherReport {
            location: data.name,
            description,
            temperature: data.main.temp,
            feels_like: data.main.feels_like,
            humidity: data.main.humidity,
            wind_speed: data.wind.speed,
        })
    }

    async fn forecast(&self, zip_code: &str) -> Result<Forecast, String> {
        let data: ForecastResponse = self.get("forecast", zip_code).await?;
        let samples: Vec<(i64, f64, String)> = data
            .list
            .into_iter()
            .map(|entry| {
                let condition = entry
                    .weather
                    .into_iter()
                    .next()
                    .map(|w| w.main)
                    .unwrap_or_default();
                (entry.dt, entry.main.temp, condition)
            })
            .collect();

        Ok(Forecast {
            location: data.city.name,
            days: aggregate_daily(&samples, data.city.timezone),
        })
    }
}

/// Folds 3-hourly samples `(unix time, temp, condition)` into per-day summaries.
/// Days follow the location's UTC offset; each day reports its high, low and most
/// frequent condition (earliest wins ties).
pub fn aggregate_daily(samples: &[(i64, f64, String)], utc_offset_secs: i64) -> Vec<ForecastDay> {
    let offset = TimeDelta::try_seconds(utc_offset_secs).unwrap_or_default();
    let mut days: BTreeMap<NaiveDate, Vec<(f64, &str)>> = BTreeMap::new();

    for (dt, temp, condition) in samples {
        let Some(at) =
            DateTime::from_timestamp(*dt, 0).and_then(|at| at.checked_add_signed(offset))
        else {
            continue;
        };
        let date = at.date_naive();
        days.entry(date).or_default().push((*temp, condition.as_str()));
    }

    days.into_iter()
        .take(FORECAST_DAYS)
        .map(|(date, readings)| {
            let high = readings.iter().map(|r| r.0).fold(f64::MIN, f64::max);
            let low = readings.iter().map(|r| r.0).fold(f64::MAX, f64::min);
            ForecastDay {
                date,
                high,
                low,
                description: most_common(readings.iter().map(|r| r.1)),
            }
        })
        .collect()
}

fn most_common<'a>(conditions: impl Iterator<Item = &'a str>) -> String {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for condition in conditions {
        match tally.iter_mut().find(|(c, _)| *c == condition) {
            Some(entry) => entry.1 += 1,
            None => tally.push((condition, 1)),
        }
    }
    // max_by_key keeps the last maximum, so scan in reverse to favour the earliest.
    tally
        .into_iter()
        .rev()
        .max_by_key(|(_, n)| *n)
        .map(|(c, _)| c.to_string())
        .unwrap_or_default()
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
