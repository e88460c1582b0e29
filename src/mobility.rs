//! Speed and distance statistics per window
//!
//! Computes instantaneous speeds between consecutive fixes and summarizes
//! them together with positional spread. Windows too small for a meaningful
//! statistic degrade to NaN rather than erroring.

use crate::geodesy::haversine;
use crate::types::MobilityFeatures;
use chrono::{DateTime, Utc};

/// Computer for per-window speed/distance features
pub struct MobilityComputer;

impl MobilityComputer {
    /// Instantaneous speed per fix, in m/s.
    ///
    /// The first fix has no predecessor and is assigned 0.0. A fix whose
    /// elapsed time from the previous one is not positive gets NaN: it is
    /// excluded from statistics but still occupies a position, so the
    /// output always matches the input length.
    pub fn speeds(latitudes: &[f64], longitudes: &[f64], times: &[DateTime<Utc>]) -> Vec<f64> {
        let n = times.len();
        if n == 0 {
            return Vec::new();
        }

        let mut speeds = Vec::with_capacity(n);
        speeds.push(0.0);
        for i in 1..n {
            let dist = haversine(
                latitudes[i - 1],
                longitudes[i - 1],
                latitudes[i],
                longitudes[i],
            );
            let elapsed = (times[i] - times[i - 1]).num_milliseconds() as f64 / 1000.0;
            speeds.push(if elapsed > 0.0 { dist / elapsed } else { f64::NAN });
        }
        speeds
    }

    /// Compute the full mobility feature bundle for one time-sorted window.
    pub fn compute(
        latitudes: &[f64],
        longitudes: &[f64],
        times: &[DateTime<Utc>],
    ) -> MobilityFeatures {
        let n = times.len();

        let mut dist_total = 0.0;
        for i in 1..n {
            dist_total += haversine(
                latitudes[i - 1],
                longitudes[i - 1],
                latitudes[i],
                longitudes[i],
            );
        }

        // Speed statistics need at least one consecutive pair
        let (speed_average, speed_variance, speed_max) = if n <= 1 {
            (f64::NAN, f64::NAN, f64::NAN)
        } else {
            let speeds = Self::speeds(latitudes, longitudes, times);
            (nan_mean(&speeds), nan_variance(&speeds), nan_max(&speeds))
        };

        let variance = if n == 0 {
            f64::NAN
        } else {
            population_variance(latitudes) + population_variance(longitudes)
        };
        let log_variance = if variance == 0.0 {
            f64::NEG_INFINITY
        } else {
            variance.ln()
        };

        MobilityFeatures {
            dist_total,
            n_bins: n as u32,
            speed_average,
            speed_variance,
            speed_max,
            variance,
            log_variance,
        }
    }
}

fn nan_mean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values {
        if !v.is_nan() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

fn nan_variance(values: &[f64]) -> f64 {
    let mean = nan_mean(values);
    if mean.is_nan() {
        return f64::NAN;
    }
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values {
        if !v.is_nan() {
            sum += (v - mean).powi(2);
            count += 1;
        }
    }
    sum / count as f64
}

fn nan_max(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NAN, f64::max)
}

fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}
