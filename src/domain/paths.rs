//! # Dataset Paths
//!
//! Centralized definitions for the files each module keeps in the data directory.
//! Acts as the Single Source of Truth for where state is persisted.

use std::path::{Path, PathBuf};

pub const NICE_COUNTS_FILE: &str = "nice_counts.json";
pub const EAGLES_COOLDOWN_FILE: &str = "eagles_timestamp.json";
pub const EAGLES_RESPONSES_FILE: &str = "eagles_responses.json";
pub const FRIDAY_USAGE_FILE: &str = "friday_usage.json";
pub const CHAT_HISTORY_FILE: &str = "chat_history.json";
pub const USER_LOCATIONS_FILE: &str = "user_locations.json";
pub const QUOTES_FILE: &str = "quotes.json";
pub const SESSION_LOG_FILE: &str = "session.log";

/// Returns the full path of a dataset file inside the data directory
pub fn dataset_path(data_dir: &Path, file: &str) -> PathBuf {
    data_dir.join(file)
}
