//! Home location inference
//!
//! Home is taken to be where a participant spends the night: fixes observed
//! at hour-of-day <= 6 are clustered, and the centroid of the most-visited
//! group becomes the home location. The hour cutoff is a stated heuristic
//! for "asleep at home", not a derived night-time detector.

use crate::cluster::DensityClusterer;
use crate::config::MobilityConfig;
use crate::error::MobilityError;
use crate::geodesy::DistanceMatrix;
use crate::types::HomeLocation;
use chrono::{DateTime, Timelike, Utc};
use std::collections::BTreeMap;

/// Latest hour-of-day (inclusive) counted as nocturnal
pub const NOCTURNAL_HOUR_MAX: u32 = 6;

/// Infer the home centroid for one window of time-ordered fixes.
///
/// The hour test runs in the participant's local time: timestamps are
/// shifted by the configured UTC offset before the cutoff is applied.
/// Returns an undefined home (NaN, NaN) when the window has no nocturnal
/// fixes. Noise (-1) participates as a candidate group when picking the
/// most-visited label, matching the engine's historical behavior; ties are
/// broken by the smallest label.
pub fn locate(
    latitudes: &[f64],
    longitudes: &[f64],
    times: &[DateTime<Utc>],
    clusterer: &dyn DensityClusterer,
    config: &MobilityConfig,
) -> Result<HomeLocation, MobilityError> {
    let nocturnal: Vec<usize> = times
        .iter()
        .enumerate()
        .filter(|(_, t)| t.with_timezone(&config.utc_offset).hour() <= NOCTURNAL_HOUR_MAX)
        .map(|(i, _)| i)
        .collect();

    if nocturnal.is_empty() {
        return Ok(HomeLocation::undefined());
    }

    let night_lats: Vec<f64> = nocturnal.iter().map(|&i| latitudes[i]).collect();
    let night_lons: Vec<f64> = nocturnal.iter().map(|&i| longitudes[i]).collect();

    let distances = DistanceMatrix::from_degrees(&night_lats, &night_lons)?;
    let labels = clusterer.cluster(&distances, config.min_samples, config.eps);

    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for &label in &labels {
        *counts.entry(label).or_insert(0) += 1;
    }

    // Strictly-greater comparison keeps the smallest label on ties, since
    // BTreeMap iterates labels in ascending order.
    let mut top_label = 0;
    let mut top_count = 0;
    for (&label, &count) in &counts {
        if count > top_count {
            top_label = label;
            top_count = count;
        }
    }

    let members: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, &l)| l == top_label)
        .map(|(i, _)| i)
        .collect();
    let count = members.len() as f64;

    Ok(HomeLocation {
        latitude: members.iter().map(|&i| night_lats[i]).sum::<f64>() / count,
        longitude: members.iter().map(|&i| night_lons[i]).sum::<f64>() / count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::DistanceDbscan;
    use chrono::TimeZone;

    fn at_hour(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, hour, minute, 0).unwrap()
    }

    fn config(min_samples: usize) -> MobilityConfig {
        MobilityConfig {
            min_samples,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_nocturnal_fixes_means_no_home() {
        let lats = [60.0, 60.1];
        let lons = [24.0, 24.1];
        let times = [at_hour(12, 0), at_hour(18, 30)];

        let home = locate(&lats, &lons, &times, &DistanceDbscan, &config(2)).unwrap();
        assert!(!home.is_defined());
        assert!(home.latitude.is_nan());
        assert!(home.longitude.is_nan());
    }

    #[test]
    fn test_nocturnal_hours_are_local_hours() {
        // 01:00 at UTC+2 normalizes to 23:00 UTC on parse; the configured
        // offset must bring it back inside the nocturnal window.
        let time = DateTime::parse_from_rfc3339("2024-03-10T01:00:00+02:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(time.hour(), 23);

        let lats = [60.0];
        let lons = [24.0];
        let helsinki = MobilityConfig {
            min_samples: 1,
            utc_offset: chrono::FixedOffset::east_opt(2 * 3600).unwrap(),
            ..Default::default()
        };
        let home = locate(&lats, &lons, &[time], &DistanceDbscan, &helsinki).unwrap();
        assert!(home.is_defined());

        // Same fix under the default UTC offset sits at hour 23 and is
        // excluded.
        let home = locate(&lats, &lons, &[time], &DistanceDbscan, &config(1)).unwrap();
        assert!(!home.is_defined());
    }

    #[test]
    fn test_hour_boundary_is_inclusive() {
        let lats = [60.0];
        let lons = [24.0];
        let times = [at_hour(6, 59)];

        let home = locate(&lats, &lons, &times, &DistanceDbscan, &config(1)).unwrap();
        assert!(home.is_defined());
    }

    #[test]
    fn test_home_is_centroid_of_biggest_nocturnal_cluster() {
        // Four fixes at home overnight, two at a gym in the evening that
        // also squeak under the hour cutoff, the rest daytime.
        let lats = [60.0, 60.0001, 60.0002, 60.0001, 60.5, 60.5001, 61.0];
        let lons = [24.0, 24.0, 24.0, 24.0, 24.5, 24.5, 25.0];
        let times = [
            at_hour(1, 0),
            at_hour(2, 0),
            at_hour(3, 0),
            at_hour(4, 0),
            at_hour(5, 0),
            at_hour(6, 0),
            at_hour(14, 0),
        ];

        let home = locate(&lats, &lons, &times, &DistanceDbscan, &config(3)).unwrap();
        assert!((home.latitude - 60.0001).abs() < 1e-6);
        assert!((home.longitude - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_noise_falls_back_to_mean_of_nocturnal_fixes() {
        // min_samples too high for any cluster: every fix is noise, and the
        // noise group itself becomes the most-visited label.
        let lats = [60.0, 60.2];
        let lons = [24.0, 24.2];
        let times = [at_hour(2, 0), at_hour(3, 0)];

        let home = locate(&lats, &lons, &times, &DistanceDbscan, &config(5)).unwrap();
        assert!((home.latitude - 60.1).abs() < 1e-9);
        assert!((home.longitude - 24.1).abs() < 1e-9);
    }

    #[test]
    fn test_tie_breaks_to_smallest_label() {
        // Two equally sized nocturnal clusters; the one formed first (label
        // 0, containing the lowest fix index) wins.
        let lats = [60.0, 60.0001, 60.5, 60.5001];
        let lons = [24.0, 24.0, 24.5, 24.5];
        let times = [at_hour(1, 0), at_hour(2, 0), at_hour(3, 0), at_hour(4, 0)];

        let home = locate(&lats, &lons, &times, &DistanceDbscan, &config(2)).unwrap();
        assert!((home.latitude - 60.00005).abs() < 1e-6);
    }
}
