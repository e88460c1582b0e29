//! Density-based clustering over a precomputed distance matrix
//!
//! Clustering is behind the [`DensityClusterer`] trait so an alternative
//! algorithm can be swapped in without touching the feature computers. The
//! default [`DistanceDbscan`] implements standard DBSCAN semantics: core
//! points have at least `min_samples` points (self included) within `eps`,
//! clusters grow by connecting core points, border points join the first
//! core cluster that reaches them, and everything else is noise.

use crate::geodesy::DistanceMatrix;
use std::collections::VecDeque;

/// Label for points that belong to no cluster
pub const NOISE: i32 = -1;

const UNCLASSIFIED: i32 = -2;

/// Capability interface for density clustering over a distance matrix.
///
/// Returns one label per point: a cluster id >= 0, or [`NOISE`].
pub trait DensityClusterer {
    fn cluster(&self, distances: &DistanceMatrix, min_samples: usize, eps: f64) -> Vec<i32>;
}

/// DBSCAN over a precomputed distance matrix.
///
/// Expansion order is ascending point index, so labels are deterministic:
/// cluster 0 is the one whose first core point has the lowest index.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceDbscan;

impl DensityClusterer for DistanceDbscan {
    fn cluster(&self, distances: &DistanceMatrix, min_samples: usize, eps: f64) -> Vec<i32> {
        let n = distances.len();
        if n == 0 {
            return Vec::new();
        }

        let neighborhoods: Vec<Vec<usize>> =
            (0..n).map(|i| distances.neighbors_within(i, eps)).collect();
        let is_core: Vec<bool> = neighborhoods
            .iter()
            .map(|nb| nb.len() >= min_samples)
            .collect();

        let mut labels = vec![UNCLASSIFIED; n];
        let mut next_label = 0;

        for seed in 0..n {
            if labels[seed] != UNCLASSIFIED || !is_core[seed] {
                continue;
            }

            labels[seed] = next_label;
            let mut frontier: VecDeque<usize> = neighborhoods[seed].iter().copied().collect();
            while let Some(point) = frontier.pop_front() {
                if labels[point] != UNCLASSIFIED {
                    continue;
                }
                labels[point] = next_label;
                // Only core points extend the cluster; border points stop it
                if is_core[point] {
                    frontier.extend(neighborhoods[point].iter().copied());
                }
            }

            next_label += 1;
        }

        for label in labels.iter_mut() {
            if *label == UNCLASSIFIED {
                *label = NOISE;
            }
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(lats: &[f64], lons: &[f64]) -> DistanceMatrix {
        DistanceMatrix::from_degrees(lats, lons).unwrap()
    }

    // One step is ~111 m of latitude
    const LAT_STEP: f64 = 0.001;

    #[test]
    fn test_empty_input_yields_empty_labels() {
        let distances = matrix(&[], &[]);
        let labels = DistanceDbscan.cluster(&distances, 5, 200.0);
        assert!(labels.is_empty());
    }

    #[test]
    fn test_fewer_points_than_min_samples_is_all_noise() {
        let lats = [60.0, 60.0, 60.0];
        let lons = [24.0, 24.0, 24.0];
        let labels = DistanceDbscan.cluster(&matrix(&lats, &lons), 5, 200.0);
        assert_eq!(labels, vec![NOISE, NOISE, NOISE]);
    }

    #[test]
    fn test_two_clusters_and_an_outlier() {
        // Cluster A around 60.0N, cluster B around 60.1N, one point far away
        let lats = [
            60.0,
            60.0 + LAT_STEP,
            60.0 - LAT_STEP,
            60.1,
            60.1 + LAT_STEP,
            60.1 - LAT_STEP,
            62.0,
        ];
        let lons = [24.0; 7];
        let labels = DistanceDbscan.cluster(&matrix(&lats, &lons), 3, 500.0);

        assert_eq!(labels[0], 0);
        assert_eq!(labels[1], 0);
        assert_eq!(labels[2], 0);
        assert_eq!(labels[3], 1);
        assert_eq!(labels[4], 1);
        assert_eq!(labels[5], 1);
        assert_eq!(labels[6], NOISE);
    }

    #[test]
    fn test_border_point_joins_core_cluster() {
        // Points strung along a line. The last one reaches only one core
        // point, so its own neighborhood is too small to make it core.
        let lats = [60.0, 60.0 + 1.2 * LAT_STEP, 60.0 + 0.6 * LAT_STEP, 60.0 + 2.4 * LAT_STEP];
        let lons = [24.0; 4];
        let labels = DistanceDbscan.cluster(&matrix(&lats, &lons), 3, 150.0);

        assert_eq!(labels[0], 0);
        assert_eq!(labels[1], 0);
        assert_eq!(labels[2], 0);
        // Border point: within eps of core point 1 only
        assert_eq!(labels[3], 0);
    }

    #[test]
    fn test_labels_are_deterministic_by_index_order() {
        let lats = [
            60.1,
            60.1 + LAT_STEP,
            60.1 - LAT_STEP,
            60.0,
            60.0 + LAT_STEP,
            60.0 - LAT_STEP,
        ];
        let lons = [24.0; 6];
        let labels = DistanceDbscan.cluster(&matrix(&lats, &lons), 3, 500.0);

        // The cluster containing point 0 gets label 0 regardless of geography
        assert_eq!(labels[0], 0);
        assert_eq!(labels[3], 1);
    }

    #[test]
    fn test_all_points_coincident_form_one_cluster() {
        let lats = [60.0; 6];
        let lons = [24.0; 6];
        let labels = DistanceDbscan.cluster(&matrix(&lats, &lons), 5, 200.0);
        assert!(labels.iter().all(|&l| l == 0));
    }
}
