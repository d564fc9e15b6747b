//! # Expiry Policies
//!
//! Per-key temporal gates layered on the keyed store:
//! - `CooldownTracker`: a key may fire once every `window`.
//! - `DailyGate`: a key may fire once per calendar date.
//!
//! Both persist write-through after every fire and run a bounded-age sweep before each
//! save, so datasets keyed by channel do not grow for the lifetime of the bot.

use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::application::store::{KeyedStore, read_json};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Shapes a cooldown file can take on disk.
/// Older releases kept one global timestamp instead of one per channel.
#[derive(Deserialize)]
#[serde(untagged)]
enum CooldownFile {
    Global(GlobalTimestamp),
    Scalar(f64),
    PerKey(BTreeMap<String, f64>),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct GlobalTimestamp {
    #[allow(dead_code)]
    last_response: f64,
}

fn unix_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}

fn unix_millis(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

fn ensure_non_negative(what: &str, span: TimeDelta) -> Result<()> {
    if span < TimeDelta::zero() {
        bail!("{} must not be negative (got {})", what, span);
    }
    Ok(())
}

/// Tracks the last time each key fired.
#[derive(Debug)]
pub struct CooldownTracker {
    store: KeyedStore<f64>,
    window: TimeDelta,
    retention: TimeDelta,
}

impl CooldownTracker {
    /// Loads the dataset at `path`. A legacy global timestamp is discarded: no key can
    /// claim it, so every key starts as never fired.
    ///
    /// Entries are kept for at least one `window`, whatever `retention` says, so the sweep
    /// never releases a key that is still cooling down.
    pub fn load(
        path: impl Into<PathBuf>,
        window: TimeDelta,
        retention: TimeDelta,
    ) -> Result<Self> {
        ensure_non_negative("cooldown window", window)?;
        ensure_non_negative("cooldown retention", retention)?;
        let path = path.into();
        let entries = match read_json::<CooldownFile>(&path) {
            Some(CooldownFile::PerKey(entries)) => entries,
            Some(CooldownFile::Global(_)) | Some(CooldownFile::Scalar(_)) => {
                tracing::info!(
                    "Discarding legacy global cooldown in {}; tracking per channel from now on",
                    path.display()
                );
                BTreeMap::new()
            }
            None => BTreeMap::new(),
        };

        Ok(Self {
            store: KeyedStore::from_entries(path, entries),
            window,
            retention: retention.max(window),
        })
    }

    /// Time left before `key` may fire again, or `None` if it may fire now.
    pub fn remaining(&self, key: &str, now: DateTime<Utc>) -> Option<TimeDelta> {
        let last = self.store.get(key)?;
        let elapsed = now.timestamp_millis().saturating_sub(unix_millis(*last));
        let window = self.window.num_milliseconds();
        (elapsed < window).then(|| TimeDelta::milliseconds(window.saturating_sub(elapsed)))
    }

    pub fn is_ready(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.remaining(key, now).is_none()
    }

    /// Fires `key` if its cooldown has elapsed, recording `now` and persisting.
    pub fn try_fire(&mut self, key: &str, now: DateTime<Utc>) -> bool {
        if !self.is_ready(key, now) {
            return false;
        }
        self.store.insert(key, unix_seconds(now));
        self.save(now);
        true
    }

    /// Drops keys that last fired before the retention horizon.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        // A horizon before the earliest representable instant keeps everything.
        let Some(cutoff) = now.checked_sub_signed(self.retention) else {
            return 0;
        };
        let cutoff = cutoff.timestamp_millis();
        let removed = self.store.retain(|_, last| unix_millis(*last) >= cutoff);
        if removed > 0 {
            tracing::debug!("Swept {} stale cooldown entries", removed);
        }
        removed
    }

    pub fn save(&mut self, now: DateTime<Utc>) -> bool {
        self.sweep(now);
        self.store.persist()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }
}

/// Allows each key to fire once per calendar date.
#[derive(Debug)]
pub struct DailyGate {
    store: KeyedStore<String>,
    retention: TimeDelta,
}

impl DailyGate {
    pub fn load(path: impl Into<PathBuf>, retention: TimeDelta) -> Result<Self> {
        ensure_non_negative("daily retention", retention)?;
        Ok(Self {
            store: KeyedStore::load(path),
            retention,
        })
    }

    pub fn has_fired(&self, key: &str, today: NaiveDate) -> bool {
        self.store
            .get(key)
            .is_some_and(|date| *date == today.format(DATE_FORMAT).to_string())
    }

    /// Fires `key` unless it already fired on `today`, recording the date and persisting.
    pub fn try_fire(&mut self, key: &str, today: NaiveDate) -> bool {
        if self.has_fired(key, today) {
            return false;
        }
        self.store.insert(key, today.format(DATE_FORMAT).to_string());
        self.save(today);
        true
    }

    /// Drops keys whose date is older than the retention horizon or unreadable.
    pub fn sweep(&mut self, today: NaiveDate) -> usize {
        let Some(cutoff) = today.checked_sub_signed(self.retention) else {
            return 0;
        };
        let removed = self.store.retain(|_, date| {
            NaiveDate::parse_from_str(date, DATE_FORMAT).is_ok_and(|d| d >= cutoff)
        });
        if removed > 0 {
            tracing::info!("Cleaned up {} old daily usage records", removed);
        }
        removed
    }

    pub fn save(&mut self, today: NaiveDate) -> bool {
        self.sweep(today);
        self.store.persist()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + TimeDelta::milliseconds(123)
    }

    fn tracker(dir: &TempDir) -> CooldownTracker {
        CooldownTracker::load(
            dir.path().join("cooldown.json"),
            TimeDelta::seconds(600),
            TimeDelta::days(7),
        )
        .unwrap()
    }

    #[test]
    fn test_cooldown_blocks_within_window_and_allows_at_window() {
        let dir = TempDir::new().unwrap();
        let mut cooldown = tracker(&dir);

        assert!(cooldown.try_fire("!a:x", t0()));
        assert!(!cooldown.try_fire("!a:x", t0()));
        assert!(!cooldown.try_fire("!a:x", t0() + TimeDelta::seconds(599)));
        assert!(cooldown.try_fire("!a:x", t0() + TimeDelta::seconds(600)));
    }

    #[test]
    fn test_cooldown_keys_are_independent() {
        let dir = TempDir::new().unwrap();
        let mut cooldown = tracker(&dir);

        assert!(cooldown.try_fire("!a:x", t0()));
        assert!(cooldown.try_fire("!b:x", t0()));
        assert_eq!(
            cooldown.remaining("!a:x", t0() + TimeDelta::seconds(100)),
            Some(TimeDelta::seconds(500))
        );
    }

    #[test]
    fn test_cooldown_survives_reload() {
        let dir = TempDir::new().unwrap();
        tracker(&dir).try_fire("!a:x", t0());

        let mut reloaded = tracker(&dir);
        assert!(!reloaded.try_fire("!a:x", t0() + TimeDelta::seconds(10)));
    }

    #[test]
    fn test_legacy_global_timestamp_loads_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cooldown.json");
        fs::write(&path, r#"{"last_response": 1709294400.5}"#).unwrap();

        let mut cooldown = tracker(&dir);
        assert_eq!(cooldown.len(), 0);
        assert!(cooldown.try_fire("last_response", t0()));
        assert!(cooldown.try_fire("!a:x", t0()));
    }

    #[test]
    fn test_bare_scalar_loads_as_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("cooldown.json"), "1709294400").unwrap();
        assert_eq!(tracker(&dir).len(), 0);
    }

    #[test]
    fn test_cooldown_sweep_drops_stale_keys() {
        let dir = TempDir::new().unwrap();
        let mut cooldown = tracker(&dir);
        cooldown.try_fire("!old:x", t0());
        cooldown.try_fire("!new:x", t0() + TimeDelta::days(6));

        // Saving eight days in sweeps the first entry only.
        cooldown.try_fire("!other:x", t0() + TimeDelta::days(8));
        assert_eq!(cooldown.len(), 2);
        assert!(cooldown.is_ready("!old:x", t0() + TimeDelta::days(8)));

        let reloaded = tracker(&dir);
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn test_short_retention_never_releases_cooling_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cooldown.json");
        let mut cooldown =
            CooldownTracker::load(&path, TimeDelta::seconds(600), TimeDelta::zero()).unwrap();

        assert!(cooldown.try_fire("!a:x", t0()));
        // Firing another channel saves, and so sweeps, while "!a:x" is still cooling down.
        assert!(cooldown.try_fire("!b:x", t0() + TimeDelta::seconds(30)));
        assert!(!cooldown.try_fire("!a:x", t0() + TimeDelta::seconds(60)));
        assert!(!cooldown.try_fire("!b:x", t0() + TimeDelta::seconds(60)));

        let mut reloaded =
            CooldownTracker::load(&path, TimeDelta::seconds(600), TimeDelta::zero()).unwrap();
        assert!(!reloaded.try_fire("!a:x", t0() + TimeDelta::seconds(90)));
        assert!(reloaded.try_fire("!a:x", t0() + TimeDelta::seconds(600)));
    }

    #[test]
    fn test_negative_spans_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cooldown.json");
        let window = TimeDelta::seconds(600);
        assert!(CooldownTracker::load(&path, window, TimeDelta::days(-1)).is_err());
        assert!(CooldownTracker::load(&path, -window, TimeDelta::days(7)).is_err());
        assert!(DailyGate::load(dir.path().join("daily.json"), TimeDelta::days(-1)).is_err());
    }

    #[test]
    fn test_huge_retention_keeps_everything_without_overflow() {
        let dir = TempDir::new().unwrap();
        let mut cooldown = CooldownTracker::load(
            dir.path().join("cooldown.json"),
            TimeDelta::seconds(600),
            TimeDelta::max_value(),
        )
        .unwrap();
        assert!(cooldown.try_fire("!a:x", t0()));
        assert!(cooldown.try_fire("!b:x", t0() + TimeDelta::days(365)));
        assert_eq!(cooldown.len(), 2);

        let forever = TimeDelta::max_value();
        let mut gate = DailyGate::load(dir.path().join("daily.json"), forever).unwrap();
        assert!(gate.try_fire("!a:x", date(2024, 3, 1)));
        assert_eq!(gate.len(), 1);
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn gate(path: &std::path::Path) -> DailyGate {
        DailyGate::load(path, TimeDelta::days(30)).unwrap()
    }

    #[test]
    fn test_daily_gate_allows_once_per_date() {
        let dir = TempDir::new().unwrap();
        let mut gate = gate(&dir.path().join("daily.json"));

        assert!(gate.try_fire("!a:x", date(2024, 3, 1)));
        assert!(!gate.try_fire("!a:x", date(2024, 3, 1)));
        assert!(gate.try_fire("!a:x", date(2024, 3, 2)));
        assert!(gate.try_fire("!b:x", date(2024, 3, 2)));
    }

    #[test]
    fn test_daily_gate_persists_dates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("daily.json");
        gate(&path).try_fire("!a:x", date(2024, 3, 1));

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("2024-03-01"));
        assert!(gate(&path).has_fired("!a:x", date(2024, 3, 1)));
    }

    #[test]
    fn test_daily_sweep_drops_old_and_invalid_dates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("daily.json");
        fs::write(
            &path,
            r#"{"!old:x": "2024-01-01", "!bad:x": "not-a-date", "!recent:x": "2024-02-20"}"#,
        )
        .unwrap();

        let mut gate = gate(&path);
        assert_eq!(gate.len(), 3);
        assert!(gate.try_fire("!new:x", date(2024, 3, 1)));
        assert_eq!(gate.len(), 2);
        assert!(gate.has_fired("!new:x", date(2024, 3, 1)));
    }
}
