//! Geodesy - great-circle distance computations over position fixes
//!
//! Two distance functions live here on purpose. The pairwise matrix uses the
//! spherical law of cosines with the engine's historical Earth radius, because
//! clustering results must stay bit-compatible with earlier feature runs. The
//! point-to-point [`haversine`] uses the conventional mean radius and is
//! numerically stable for the short hops between consecutive fixes.

use crate::error::MobilityError;
use std::f64::consts::PI;

/// Degrees to radians conversion factor
const DTOR: f64 = PI / 180.0;

/// Earth radius used by the pairwise matrix, in meters.
///
/// A non-standard value sitting between the mean and quadratic-mean radii,
/// kept exactly as-is so distance matrices reproduce historical clusterings.
pub const EARTH_RADIUS_M: f64 = 6_372_795.477_598;

/// Mean spherical radius for the haversine distance, in meters
const SPHERICAL_R: f64 = 6_371_000.0;

/// Square, symmetric matrix of great-circle distances in meters.
///
/// Entry (i, j) is the distance between points i and j; the diagonal is zero.
/// Ephemeral: recomputed for every clustering call, never persisted.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    n: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Compute all pairwise distances from latitude/longitude columns in degrees.
    ///
    /// Fails fast on a length mismatch or any NaN coordinate, naming the
    /// offending column and row. Residual NaN distances from floating-point
    /// error are replaced with 0.0 rather than propagated; this masks rather
    /// than surfaces numerical trouble and is preserved for compatibility.
    pub fn from_degrees(latitudes: &[f64], longitudes: &[f64]) -> Result<Self, MobilityError> {
        if latitudes.len() != longitudes.len() {
            return Err(MobilityError::LengthMismatch {
                left: "latitude",
                left_len: latitudes.len(),
                right: "longitude",
                right_len: longitudes.len(),
            });
        }
        for (row, value) in latitudes.iter().enumerate() {
            if value.is_nan() {
                return Err(MobilityError::InvalidValue {
                    column: "latitude",
                    row,
                    reason: "NaN coordinate".to_string(),
                });
            }
        }
        for (row, value) in longitudes.iter().enumerate() {
            if value.is_nan() {
                return Err(MobilityError::InvalidValue {
                    column: "longitude",
                    row,
                    reason: "NaN coordinate".to_string(),
                });
            }
        }

        let n = latitudes.len();
        let lat_rad: Vec<f64> = latitudes.iter().map(|v| v * DTOR).collect();
        let lon_rad: Vec<f64> = longitudes.iter().map(|v| v * DTOR).collect();

        let mut values = vec![0.0; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                // Spherical law of cosines; the clamp keeps acos in domain
                // when floating-point error pushes the cosine past 1.0.
                let cos_angle = lat_rad[i].sin() * lat_rad[j].sin()
                    + lat_rad[i].cos() * lat_rad[j].cos() * (lon_rad[i] - lon_rad[j]).cos();
                let mut dist = cos_angle.min(1.0).acos() * EARTH_RADIUS_M;
                if dist.is_nan() {
                    dist = 0.0;
                }
                values[i * n + j] = dist;
                values[j * n + i] = dist;
            }
        }

        Ok(Self { n, values })
    }

    /// Distance in meters between points i and j
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n + j]
    }

    /// Number of points the matrix covers
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Indices of all points within `eps` meters of point i, i itself included
    pub fn neighbors_within(&self, i: usize, eps: f64) -> Vec<usize> {
        (0..self.n).filter(|&j| self.get(i, j) <= eps).collect()
    }
}

/// Haversine distance in meters between two lat/lon points in degrees.
///
/// Assumes a spherical Earth and ignores altitude; accuracy is well within
/// 1% over the scales the engine deals with.
pub fn haversine(lat0: f64, lon0: f64, lat1: f64, lon1: f64) -> f64 {
    let lat0_rad = lat0 * DTOR;
    let lat1_rad = lat1 * DTOR;
    let dlat = (lat1 - lat0) * DTOR;
    let dlon = (lon1 - lon0) * DTOR;

    let a = (dlat / 2.0).sin().powi(2)
        + lat0_rad.cos() * lat1_rad.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * SPHERICAL_R * a.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_is_symmetric_with_zero_diagonal() {
        let lats = [60.17, 60.19, 60.45, 61.0];
        let lons = [24.94, 24.83, 25.1, 24.0];
        let matrix = DistanceMatrix::from_degrees(&lats, &lons).unwrap();

        for i in 0..4 {
            assert_eq!(matrix.get(i, i), 0.0);
            for j in 0..4 {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
    }

    #[test]
    fn test_matrix_reference_distances() {
        // 0.1 degree of latitude is ~11.1 km; 0.1 degree of longitude at
        // 60N is about half that.
        let lats = [60.0, 60.0, 60.1];
        let lons = [24.0, 24.1, 24.0];
        let matrix = DistanceMatrix::from_degrees(&lats, &lons).unwrap();

        let lon_step = matrix.get(0, 1);
        let lat_step = matrix.get(0, 2);
        assert!((lon_step - 5_560.0).abs() / 5_560.0 < 0.01, "got {lon_step}");
        assert!((lat_step - 11_120.0).abs() / 11_120.0 < 0.01, "got {lat_step}");
    }

    #[test]
    fn test_identical_points_stay_zero() {
        // cos of the central angle overshoots 1.0 here without the clamp
        let lats = [60.123456, 60.123456];
        let lons = [24.654321, 24.654321];
        let matrix = DistanceMatrix::from_degrees(&lats, &lons).unwrap();
        assert_eq!(matrix.get(0, 1), 0.0);
    }

    #[test]
    fn test_single_point_matrix() {
        let matrix = DistanceMatrix::from_degrees(&[60.0], &[24.0]).unwrap();
        assert_eq!(matrix.len(), 1);
        assert_eq!(matrix.get(0, 0), 0.0);
    }

    #[test]
    fn test_nan_coordinate_is_rejected() {
        let result = DistanceMatrix::from_degrees(&[60.0, f64::NAN], &[24.0, 24.1]);
        match result {
            Err(MobilityError::InvalidValue { column, row, .. }) => {
                assert_eq!(column, "latitude");
                assert_eq!(row, 1);
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let result = DistanceMatrix::from_degrees(&[60.0, 60.1], &[24.0]);
        assert!(matches!(result, Err(MobilityError::LengthMismatch { .. })));
    }

    #[test]
    fn test_neighbors_within_includes_self() {
        let lats = [60.0, 60.0001, 60.5];
        let lons = [24.0, 24.0, 24.0];
        let matrix = DistanceMatrix::from_degrees(&lats, &lons).unwrap();
        let neighbors = matrix.neighbors_within(0, 200.0);
        assert_eq!(neighbors, vec![0, 1]);
    }

    #[test]
    fn test_haversine_agrees_with_matrix_within_tolerance() {
        let matrix = DistanceMatrix::from_degrees(&[60.0, 60.1], &[24.0, 24.1]).unwrap();
        let point_dist = haversine(60.0, 24.0, 60.1, 24.1);
        let matrix_dist = matrix.get(0, 1);
        // Different radii and formulas, same distance within 1%
        assert!((point_dist - matrix_dist).abs() / matrix_dist < 0.01);
    }

    #[test]
    fn test_haversine_same_point_is_zero() {
        assert_eq!(haversine(60.0, 24.0, 60.0, 24.0), 0.0);
    }
}
