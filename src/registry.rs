//! Explicit feature registry
//!
//! Feature computers are wired up by explicit registration calls rather than
//! discovered by scanning for name prefixes. Every entry conforms to the same
//! interface: given one window's column view and the resolved configuration,
//! produce named columns (or nothing, when the window cannot support the
//! feature).

use crate::cluster::{DensityClusterer, DistanceDbscan};
use crate::config::MobilityConfig;
use crate::error::MobilityError;
use crate::mobility::MobilityComputer;
use crate::places::PlaceComputer;
use crate::types::FixSeries;
use std::sync::Arc;

/// Named columns produced by one feature function for one window
pub type FeatureColumns = Vec<(&'static str, f64)>;

/// A registered feature function
pub type FeatureFn =
    Box<dyn Fn(&FixSeries, &MobilityConfig) -> Result<Option<FeatureColumns>, MobilityError> + Send + Sync>;

/// Ordered registry of feature functions
pub struct FeatureRegistry {
    entries: Vec<(String, FeatureFn)>,
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl FeatureRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The standard feature set: mobility statistics and significant places,
    /// clustered with [`DistanceDbscan`].
    pub fn with_defaults() -> Self {
        Self::with_clusterer(Arc::new(DistanceDbscan))
    }

    /// The standard feature set over a caller-supplied clustering algorithm.
    pub fn with_clusterer(clusterer: Arc<dyn DensityClusterer + Send + Sync>) -> Self {
        let mut registry = Self::new();

        registry.register(
            "mobility",
            Box::new(|series, _config| {
                if series.is_empty() {
                    return Ok(None);
                }
                let features = MobilityComputer::compute(
                    &series.latitudes,
                    &series.longitudes,
                    &series.times,
                );
                Ok(Some(features.columns()))
            }),
        );

        registry.register(
            "significant_places",
            Box::new(move |series, config| {
                let features = PlaceComputer::compute(series, clusterer.as_ref(), config)?;
                Ok(features.map(|f| f.columns()))
            }),
        );

        registry
    }

    /// Register a feature function under a name; later registrations append
    /// their columns after earlier ones.
    pub fn register(&mut self, name: impl Into<String>, function: FeatureFn) {
        self.entries.push((name.into(), function));
    }

    /// Registered feature names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Run every registered function over one window and merge the columns.
    ///
    /// Returns `Ok(None)` when no function produced output, which drops the
    /// window from the result table.
    pub fn compute_all(
        &self,
        series: &FixSeries,
        config: &MobilityConfig,
    ) -> Result<Option<FeatureColumns>, MobilityError> {
        let mut merged = Vec::new();
        let mut produced = false;
        for (_, function) in &self.entries {
            if let Some(columns) = function(series, config)? {
                produced = true;
                merged.extend(columns);
            }
        }
        Ok(if produced { Some(merged) } else { None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PositionFix;
    use chrono::{TimeZone, Utc};

    fn sample_series() -> FixSeries {
        let fixes: Vec<PositionFix> = (0..3)
            .map(|i| PositionFix {
                user: "u1".to_string(),
                device: None,
                time: Utc.with_ymd_and_hms(2024, 3, 10, 12, i * 10, 0).unwrap(),
                latitude: 60.0,
                longitude: 24.0,
                speed: Some(0.0),
                group: None,
            })
            .collect();
        let refs: Vec<&PositionFix> = fixes.iter().collect();
        FixSeries::from_fixes(&refs)
    }

    #[test]
    fn test_default_registry_names() {
        let registry = FeatureRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["mobility", "significant_places"]);
    }

    #[test]
    fn test_compute_all_merges_columns() {
        let registry = FeatureRegistry::with_defaults();
        let config = MobilityConfig::default();
        let columns = registry
            .compute_all(&sample_series(), &config)
            .unwrap()
            .unwrap();

        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        assert!(names.contains(&"dist_total"));
        assert!(names.contains(&"n_sps"));
        assert!(names.contains(&"entropy"));
    }

    #[test]
    fn test_empty_window_produces_nothing() {
        let registry = FeatureRegistry::with_defaults();
        let config = MobilityConfig::default();
        let empty = FixSeries::from_fixes(&[]);
        assert!(registry.compute_all(&empty, &config).unwrap().is_none());
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = FeatureRegistry::new();
        registry.register(
            "fix_count",
            Box::new(|series, _| Ok(Some(vec![("fix_count", series.len() as f64)]))),
        );

        let config = MobilityConfig::default();
        let columns = registry
            .compute_all(&sample_series(), &config)
            .unwrap()
            .unwrap();
        assert_eq!(columns, vec![("fix_count", 3.0)]);
    }
}
