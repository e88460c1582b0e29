//! Significant-place visitation features per window
//!
//! The heart of the engine: fixes are split into static and moving by the
//! motion threshold, static fixes are clustered into significant places, and
//! the visitation pattern over those places is summarized together with home
//! proximity. Moving fixes are never clustered.

use crate::cluster::{DensityClusterer, NOISE};
use crate::config::MobilityConfig;
use crate::error::MobilityError;
use crate::geodesy::{haversine, DistanceMatrix};
use crate::home;
use crate::mobility::MobilityComputer;
use crate::types::{FixSeries, PlaceFeatures};
use std::collections::BTreeMap;

/// Computer for per-window significant-place features
pub struct PlaceComputer;

impl PlaceComputer {
    /// Compute the place feature bundle for one time-sorted window.
    ///
    /// Returns `Ok(None)` for an empty window; the aggregator drops the row.
    /// Uses the window's reported speed column when present, otherwise
    /// derives speeds from consecutive fixes.
    pub fn compute(
        series: &FixSeries,
        clusterer: &dyn DensityClusterer,
        config: &MobilityConfig,
    ) -> Result<Option<PlaceFeatures>, MobilityError> {
        if series.is_empty() {
            return Ok(None);
        }

        let speeds = match &series.speeds {
            Some(reported) => reported.clone(),
            None => MobilityComputer::speeds(&series.latitudes, &series.longitudes, &series.times),
        };

        // NaN speeds fail the comparison and land in the moving partition,
        // so the static/moving split always covers every fix.
        let static_idx: Vec<usize> = (0..series.len())
            .filter(|&i| speeds[i] < config.speed_threshold)
            .collect();
        let n_static = static_idx.len() as u32;
        let n_moving = series.len() as u32 - n_static;

        let static_lats: Vec<f64> = static_idx.iter().map(|&i| series.latitudes[i]).collect();
        let static_lons: Vec<f64> = static_idx.iter().map(|&i| series.longitudes[i]).collect();

        let distances = DistanceMatrix::from_degrees(&static_lats, &static_lons)?;
        let labels = clusterer.cluster(&distances, config.min_samples, config.eps);

        let n_rare = labels.iter().filter(|&&l| l == NOISE).count() as u32;
        let n_transitions = labels.windows(2).filter(|pair| pair[0] != pair[1]).count() as u32;

        // Stay times: static-fix counts per significant place
        let mut stay_times: BTreeMap<i32, u32> = BTreeMap::new();
        for &label in &labels {
            if label != NOISE {
                *stay_times.entry(label).or_insert(0) += 1;
            }
        }
        let n_sps = stay_times.len() as u32;

        let mut ranked: Vec<u32> = stay_times.values().copied().collect();
        ranked.sort_unstable_by(|a, b| b.cmp(a));
        let top = |rank: usize| ranked.get(rank).copied().unwrap_or(0);

        let (entropy, normalized_entropy) = stay_entropy(&ranked);

        let home = home::locate(
            &series.latitudes,
            &series.longitudes,
            &series.times,
            clusterer,
            config,
        )?;
        let (n_home, max_dist_home) = if home.is_defined() {
            let dists: Vec<f64> = static_idx
                .iter()
                .map(|&i| {
                    haversine(
                        series.latitudes[i],
                        series.longitudes[i],
                        home.latitude,
                        home.longitude,
                    )
                })
                .collect();
            let n_home = dists.iter().filter(|&&d| d <= config.home_radius).count() as f64;
            let max_dist_home = dists.iter().copied().fold(f64::NAN, f64::max);
            (n_home, max_dist_home)
        } else {
            (f64::NAN, f64::NAN)
        };

        Ok(Some(PlaceFeatures {
            n_sps,
            n_static,
            n_moving,
            n_rare,
            n_home,
            max_dist_home,
            n_transitions,
            n_top1: top(0),
            n_top2: top(1),
            n_top3: top(2),
            n_top4: top(3),
            n_top5: top(4),
            entropy,
            normalized_entropy,
        }))
    }
}

/// Shannon entropy over the stay-time counts, with its ln(k)-normalized form.
///
/// Both are 0 when fewer than two places exist.
fn stay_entropy(counts: &[u32]) -> (f64, f64) {
    if counts.len() <= 1 {
        return (0.0, 0.0);
    }
    let total: f64 = counts.iter().map(|&c| f64::from(c)).sum();
    let entropy: f64 = counts
        .iter()
        .map(|&c| {
            let p = f64::from(c) / total;
            -p * p.ln()
        })
        .sum();
    (entropy, entropy / (counts.len() as f64).ln())
}
