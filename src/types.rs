//! Core types for the Placemetrics feature engine
//!
//! This module defines the data structures that flow through the engine:
//! raw position fixes, the per-window column view they are reshaped into,
//! the typed feature bundles, and the long-format output rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single timestamped position observation for one study participant.
///
/// Created by the ingestion collaborator and consumed read-only by the
/// engine. Latitude/longitude are WGS84 degrees, speed is m/s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionFix {
    /// Participant identifier
    pub user: String,
    /// Device identifier, when the study tracks more than one per user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Observation time (UTC)
    pub time: DateTime<Utc>,
    /// Latitude in degrees, [-90, 90]
    pub latitude: f64,
    /// Longitude in degrees, [-180, 180]
    pub longitude: f64,
    /// Instantaneous speed in m/s, when the platform reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Study-group label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Column view of one (grouping key, window)'s fixes, sorted ascending by time.
///
/// The speed column is only populated when every fix in the window carries a
/// reported speed; otherwise computers derive speeds from consecutive fixes.
#[derive(Debug, Clone)]
pub struct FixSeries {
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    pub times: Vec<DateTime<Utc>>,
    pub speeds: Option<Vec<f64>>,
}

impl FixSeries {
    /// Build a column view from fixes, sorting by timestamp.
    pub fn from_fixes(fixes: &[&PositionFix]) -> Self {
        let mut ordered: Vec<&PositionFix> = fixes.to_vec();
        ordered.sort_by_key(|f| f.time);

        let latitudes = ordered.iter().map(|f| f.latitude).collect();
        let longitudes = ordered.iter().map(|f| f.longitude).collect();
        let times = ordered.iter().map(|f| f.time).collect();
        let speeds = if !ordered.is_empty() && ordered.iter().all(|f| f.speed.is_some()) {
            Some(ordered.iter().map(|f| f.speed.unwrap_or(f64::NAN)).collect())
        } else {
            None
        };

        Self {
            latitudes,
            longitudes,
            times,
            speeds,
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Inferred home centroid for one (user, window).
///
/// Undefined homes are represented as (NaN, NaN) rather than an error, so
/// downstream proximity features degrade to NaN instead of aborting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HomeLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl HomeLocation {
    /// Home for a window with no qualifying nocturnal fixes
    pub fn undefined() -> Self {
        Self {
            latitude: f64::NAN,
            longitude: f64::NAN,
        }
    }

    pub fn is_defined(&self) -> bool {
        !self.latitude.is_nan() && !self.longitude.is_nan()
    }
}

/// Speed and distance statistics for one window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobilityFeatures {
    /// Sum of consecutive point-to-point distances (meters)
    pub dist_total: f64,
    /// Number of fixes in the window
    pub n_bins: u32,
    /// Mean instantaneous speed, NaN speeds ignored (m/s)
    pub speed_average: f64,
    /// Population variance of instantaneous speed, NaN speeds ignored
    pub speed_variance: f64,
    /// Maximum instantaneous speed, NaN speeds ignored (m/s)
    pub speed_max: f64,
    /// Latitude variance plus longitude variance (degrees squared)
    pub variance: f64,
    /// Natural log of `variance`; negative infinity when variance is 0
    pub log_variance: f64,
}

impl MobilityFeatures {
    /// Named output columns, in contract order
    pub fn columns(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("dist_total", self.dist_total),
            ("n_bins", f64::from(self.n_bins)),
            ("speed_average", self.speed_average),
            ("speed_variance", self.speed_variance),
            ("speed_max", self.speed_max),
            ("variance", self.variance),
            ("log_variance", self.log_variance),
        ]
    }
}

/// Significant-place visitation features for one window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceFeatures {
    /// Number of distinct significant places (non-noise clusters)
    pub n_sps: u32,
    /// Number of static fixes (speed below the motion threshold)
    pub n_static: u32,
    /// Number of moving fixes
    pub n_moving: u32,
    /// Static fixes not assigned to any significant place
    pub n_rare: u32,
    /// Static fixes within the home radius; NaN when home is undefined
    pub n_home: f64,
    /// Largest static-fix distance from home (meters); NaN when undefined
    pub max_dist_home: f64,
    /// Adjacent cluster-label changes in the static sequence
    pub n_transitions: u32,
    /// Five largest per-place stay times, descending, zero-padded
    pub n_top1: u32,
    pub n_top2: u32,
    pub n_top3: u32,
    pub n_top4: u32,
    pub n_top5: u32,
    /// Shannon entropy of the stay-time distribution; 0 below two places
    pub entropy: f64,
    /// Entropy divided by ln(number of places); 0 when undefined
    pub normalized_entropy: f64,
}

impl PlaceFeatures {
    /// Named output columns, in contract order
    pub fn columns(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("n_sps", f64::from(self.n_sps)),
            ("n_static", f64::from(self.n_static)),
            ("n_moving", f64::from(self.n_moving)),
            ("n_rare", f64::from(self.n_rare)),
            ("n_home", self.n_home),
            ("max_dist_home", self.max_dist_home),
            ("n_transitions", f64::from(self.n_transitions)),
            ("n_top1", f64::from(self.n_top1)),
            ("n_top2", f64::from(self.n_top2)),
            ("n_top3", f64::from(self.n_top3)),
            ("n_top4", f64::from(self.n_top4)),
            ("n_top5", f64::from(self.n_top5)),
            ("entropy", self.entropy),
            ("normalized_entropy", self.normalized_entropy),
        ]
    }
}

/// One long-format output record per (grouping key, window)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRow {
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    pub window_start: DateTime<Utc>,
    /// Named numeric feature columns
    pub values: BTreeMap<String, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fix(time_sec: u32, lat: f64, lon: f64, speed: Option<f64>) -> PositionFix {
        PositionFix {
            user: "u1".to_string(),
            device: None,
            time: Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, time_sec).unwrap(),
            latitude: lat,
            longitude: lon,
            speed,
            group: None,
        }
    }

    #[test]
    fn test_fix_series_sorts_by_time() {
        let a = fix(30, 60.1, 24.0, None);
        let b = fix(10, 60.0, 24.0, None);
        let series = FixSeries::from_fixes(&[&a, &b]);

        assert_eq!(series.latitudes, vec![60.0, 60.1]);
        assert!(series.times[0] < series.times[1]);
    }

    #[test]
    fn test_fix_series_speed_column_requires_all_fixes() {
        let a = fix(0, 60.0, 24.0, Some(1.0));
        let b = fix(10, 60.0, 24.0, None);
        let series = FixSeries::from_fixes(&[&a, &b]);
        assert!(series.speeds.is_none());

        let c = fix(10, 60.0, 24.0, Some(2.0));
        let series = FixSeries::from_fixes(&[&a, &c]);
        assert_eq!(series.speeds, Some(vec![1.0, 2.0]));
    }

    #[test]
    fn test_home_location_undefined() {
        let home = HomeLocation::undefined();
        assert!(!home.is_defined());

        let home = HomeLocation {
            latitude: 60.0,
            longitude: 24.0,
        };
        assert!(home.is_defined());
    }

    #[test]
    fn test_position_fix_json_round_trip() {
        let json = r#"{
            "user": "u1",
            "time": "2024-03-10T12:00:00Z",
            "latitude": 60.17,
            "longitude": 24.94,
            "speed": 0.5
        }"#;
        let parsed: PositionFix = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.user, "u1");
        assert_eq!(parsed.speed, Some(0.5));
        assert!(parsed.device.is_none());
    }
}
