//! Engine configuration
//!
//! All options are resolved into a fresh immutable [`MobilityConfig`] before a
//! batch runs. Caller-supplied overrides are read-only inputs; nothing is ever
//! written back into them, so no defaults leak between calls.

use crate::error::MobilityError;
use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default motion threshold: 0.277 m/s, roughly 1 km/h
pub const DEFAULT_SPEED_THRESHOLD: f64 = 0.277;

/// Default minimum cluster membership for a dense neighborhood
pub const DEFAULT_MIN_SAMPLES: usize = 5;

/// Default clustering neighborhood radius in meters
pub const DEFAULT_EPS: f64 = 200.0;

/// Default home proximity radius in meters
pub const DEFAULT_HOME_RADIUS: f64 = 50.0;

/// Time-window specification for resampling fixes.
///
/// Calendar months have variable length, so they get their own variant;
/// every other rule is a fixed duration truncated against the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRule {
    /// One calendar month, starting at the first of the month 00:00 UTC
    Month,
    /// Fixed-length window of this many seconds, anchored at the Unix epoch
    Fixed(i64),
}

impl WindowRule {
    /// Map a timestamp to the start of its window.
    pub fn window_start(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            WindowRule::Month => Utc
                .with_ymd_and_hms(time.year(), time.month(), 1, 0, 0, 0)
                .unwrap(),
            WindowRule::Fixed(len) => {
                let secs = time.timestamp();
                let start = secs - secs.rem_euclid(*len);
                Utc.timestamp_opt(start, 0).unwrap()
            }
        }
    }
}

impl FromStr for WindowRule {
    type Err = MobilityError;

    /// Parse a pandas-style rule string: `"M"`/`"1M"` for calendar months,
    /// `<n>w`, `<n>d`, `<n>h`, or `<n>min` for fixed windows.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rule = s.trim();
        if rule == "M" || rule == "1M" {
            return Ok(WindowRule::Month);
        }

        let unit_start = rule
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| MobilityError::InvalidWindowRule(s.to_string()))?;
        let (count, unit) = rule.split_at(unit_start);
        let count: i64 = if count.is_empty() {
            1
        } else {
            count
                .parse()
                .map_err(|_| MobilityError::InvalidWindowRule(s.to_string()))?
        };

        let unit_seconds = match unit {
            "w" | "W" => 7 * 86_400,
            "d" | "D" => 86_400,
            "h" | "H" => 3_600,
            "min" => 60,
            _ => return Err(MobilityError::InvalidWindowRule(s.to_string())),
        };

        if count <= 0 {
            return Err(MobilityError::InvalidWindowRule(s.to_string()));
        }
        Ok(WindowRule::Fixed(count * unit_seconds))
    }
}

/// Resolved, immutable configuration for one batch run
#[derive(Debug, Clone)]
pub struct MobilityConfig {
    /// Source field holding latitude (used by record mapping at the boundary)
    pub latitude_column: String,
    /// Source field holding longitude
    pub longitude_column: String,
    /// Source field holding reported speed
    pub speed_column: String,
    /// Speed below which a fix counts as static (m/s)
    pub speed_threshold: f64,
    /// Minimum eps-neighborhood size for a core point
    pub min_samples: usize,
    /// Clustering neighborhood radius (meters)
    pub eps: f64,
    /// Home proximity radius (meters)
    pub home_radius: f64,
    /// Participant's UTC offset; the nocturnal hour test runs in local time
    pub utc_offset: FixedOffset,
    /// Time-window rule for resampling
    pub resample_rule: WindowRule,
    /// Group by (user, device) instead of user alone
    pub group_by_device: bool,
}

impl Default for MobilityConfig {
    fn default() -> Self {
        Self {
            latitude_column: "latitude".to_string(),
            longitude_column: "longitude".to_string(),
            speed_column: "speed".to_string(),
            speed_threshold: DEFAULT_SPEED_THRESHOLD,
            min_samples: DEFAULT_MIN_SAMPLES,
            eps: DEFAULT_EPS,
            home_radius: DEFAULT_HOME_RADIUS,
            utc_offset: FixedOffset::east_opt(0).unwrap(),
            resample_rule: WindowRule::Month,
            group_by_device: false,
        }
    }
}

/// Caller-facing overrides, typically deserialized from a config file.
///
/// Every field is optional; [`ConfigOverrides::resolve`] fills the gaps with
/// defaults and returns a fresh [`MobilityConfig`], leaving the overrides
/// untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigOverrides {
    pub latitude_column: Option<String>,
    pub longitude_column: Option<String>,
    pub speed_column: Option<String>,
    pub speed_threshold: Option<f64>,
    pub min_samples: Option<usize>,
    pub eps: Option<f64>,
    pub home_radius: Option<f64>,
    /// UTC offset string, e.g. "+02:00" or "-05:30"
    pub utc_offset: Option<String>,
    /// Window rule string, e.g. "M", "1w", "1d", "4h", "30min"
    pub resample_rule: Option<String>,
    pub group_by_device: Option<bool>,
}

impl ConfigOverrides {
    /// Resolve overrides against defaults into an immutable config.
    pub fn resolve(&self) -> Result<MobilityConfig, MobilityError> {
        let defaults = MobilityConfig::default();
        let resample_rule = match &self.resample_rule {
            Some(rule) => rule.parse()?,
            None => defaults.resample_rule,
        };
        let utc_offset = match &self.utc_offset {
            Some(offset) => offset
                .parse()
                .map_err(|_| MobilityError::InvalidTimezone(offset.clone()))?,
            None => defaults.utc_offset,
        };

        Ok(MobilityConfig {
            latitude_column: self
                .latitude_column
                .clone()
                .unwrap_or(defaults.latitude_column),
            longitude_column: self
                .longitude_column
                .clone()
                .unwrap_or(defaults.longitude_column),
            speed_column: self.speed_column.clone().unwrap_or(defaults.speed_column),
            speed_threshold: self.speed_threshold.unwrap_or(defaults.speed_threshold),
            min_samples: self.min_samples.unwrap_or(defaults.min_samples),
            eps: self.eps.unwrap_or(defaults.eps),
            home_radius: self.home_radius.unwrap_or(defaults.home_radius),
            utc_offset,
            resample_rule,
            group_by_device: self.group_by_device.unwrap_or(defaults.group_by_device),
        })
    }
}
