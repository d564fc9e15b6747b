//! # Configuration
//!
//! Manages the loading and parsing of the bot's configuration file (`config.yaml`).
//! Every module option is optional and carries a default, so a module never has to
//! assume a particular subset of keys exists.

use anyhow::{Context, Result, anyhow, bail};
use chrono::TimeDelta;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct AppConfig {
    pub services: ServicesConfig,
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub modules: ModulesConfig,
}

impl AppConfig {
    /// Reads and parses the YAML configuration at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse YAML")
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.system.data_dir)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.system
            .admin
            .iter()
            .any(|a| a.eq_ignore_ascii_case(user_id))
    }
}

/// Configuration for the connected chat service.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct ServicesConfig {
    pub matrix: MatrixConfig,
}

/// Specific configuration for the Matrix service.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct MatrixConfig {
    pub username: String,
    pub password: String,
    pub homeserver: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Which calendar the once-per-day gates use to decide where a day ends.
#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DayBoundary {
    #[default]
    Local,
    Utc,
}

/// System-level settings for the bot.
#[derive(Debug, Deserialize, Clone)]
pub struct SystemConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    #[serde(default)]
    pub timezone: DayBoundary,
    #[serde(default)]
    pub admin: Vec<String>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            command_prefix: default_command_prefix(),
            timezone: DayBoundary::default(),
            admin: Vec::new(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_command_prefix() -> String {
    "!".to_string()
}

/// Module enablement list plus the flat per-module option keys.
#[derive(Debug, Deserialize, Clone)]
pub struct ModulesConfig {
    #[serde(default)]
    pub enabled: Vec<String>,

    // eagles_trigger
    #[serde(default = "default_eagles_cooldown")]
    pub eagles_cooldown: u64, // seconds
    #[serde(default = "default_eagles_retention_days")]
    pub eagles_retention_days: i64,

    // friday
    #[serde(default = "default_friday_cleanup_days")]
    pub friday_cleanup_days: i64,

    // stock
    #[serde(default = "default_stock_cache_minutes")]
    pub stock_cache_minutes: u64,

    // chatgpt
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub openai_endpoint: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_chat_max_pairs")]
    pub chat_max_pairs: usize,
    #[serde(default = "default_chat_system_prompt")]
    pub chat_system_prompt: String,
    #[serde(default = "default_chat_history_retention_days")]
    pub chat_history_retention_days: i64,

    // weather
    #[serde(default)]
    pub weather_api_key: Option<String>,

    // search
    #[serde(default = "default_search_max_results")]
    pub search_max_results: usize,

    // backup
    #[serde(default = "default_true")]
    pub backup_enabled: bool,
    #[serde(default = "default_backup_folder")]
    pub backup_folder: String,
    #[serde(default = "default_backup_interval_hours")]
    pub backup_interval_hours: u64,
    #[serde(default = "default_true")]
    pub backup_on_startup: bool,
    #[serde(default = "default_backup_retention_days")]
    pub backup_retention_days: i64,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            enabled: Vec::new(),
            eagles_cooldown: default_eagles_cooldown(),
            eagles_retention_days: default_eagles_retention_days(),
            friday_cleanup_days: default_friday_cleanup_days(),
            stock_cache_minutes: default_stock_cache_minutes(),
            openai_api_key: None,
            openai_endpoint: None,
            openai_model: default_openai_model(),
            chat_max_pairs: default_chat_max_pairs(),
            chat_system_prompt: default_chat_system_prompt(),
            chat_history_retention_days: default_chat_history_retention_days(),
            weather_api_key: None,
            search_max_results: default_search_max_results(),
            backup_enabled: true,
            backup_folder: default_backup_folder(),
            backup_interval_hours: default_backup_interval_hours(),
            backup_on_startup: true,
            backup_retention_days: default_backup_retention_days(),
        }
    }
}

impl ModulesConfig {
    pub fn eagles_cooldown_window(&self) -> Result<TimeDelta> {
        span("eagles_cooldown", self.eagles_cooldown, TimeDelta::try_seconds)
    }

    pub fn eagles_retention(&self) -> Result<TimeDelta> {
        span("eagles_retention_days", self.eagles_retention_days, TimeDelta::try_days)
    }

    pub fn friday_retention(&self) -> Result<TimeDelta> {
        span("friday_cleanup_days", self.friday_cleanup_days, TimeDelta::try_days)
    }

    pub fn stock_cache_ttl(&self) -> Result<TimeDelta> {
        span("stock_cache_minutes", self.stock_cache_minutes, TimeDelta::try_minutes)
    }

    pub fn chat_history_retention(&self) -> Result<TimeDelta> {
        span(
            "chat_history_retention_days",
            self.chat_history_retention_days,
            TimeDelta::try_days,
        )
    }

    pub fn backup_interval(&self) -> Result<TimeDelta> {
        span("backup_interval_hours", self.backup_interval_hours, TimeDelta::try_hours)
    }

    pub fn backup_retention(&self) -> Result<TimeDelta> {
        span("backup_retention_days", self.backup_retention_days, TimeDelta::try_days)
    }
}

/// Converts a whole number of `unit`s into a span, rejecting negative counts and counts
/// `chrono` cannot represent.
fn span(
    key: &str,
    value: impl Into<i128>,
    unit: fn(i64) -> Option<TimeDelta>,
) -> Result<TimeDelta> {
    let value: i128 = value.into();
    if value < 0 {
        bail!("modules.{} must not be negative (got {})", key, value);
    }
    i64::try_from(value)
        .ok()
        .and_then(unit)
        .ok_or_else(|| anyhow!("modules.{} is out of range (got {})", key, value))
}

fn default_true() -> bool {
    true
}
fn default_eagles_cooldown() -> u64 {
    600
}
fn default_eagles_retention_days() -> i64 {
    7
}
fn default_friday_cleanup_days() -> i64 {
    30
}
fn default_stock_cache_minutes() -> u64 {
    5
}
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_chat_max_pairs() -> usize {
    10
}
fn default_chat_system_prompt() -> String {
    "You are a helpful assistant.".to_string()
}
fn default_chat_history_retention_days() -> i64 {
    30
}
fn default_search_max_results() -> usize {
    5
}
fn default_backup_folder() -> String {
    "backups".to_string()
}
fn default_backup_interval_hours() -> u64 {
    6
}
fn default_backup_retention_days() -> i64 {
    30
}
