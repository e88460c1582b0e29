//! Windowed aggregation
//!
//! Groups a multi-user fix table by user (optionally device), resamples each
//! group into time windows, runs the registered feature functions per window,
//! and reassembles the rows into one long-format table. Input validation is
//! fail-fast; per-window computation failures only omit that window's row.

use crate::config::MobilityConfig;
use crate::error::MobilityError;
use crate::registry::FeatureRegistry;
use crate::types::{FeatureRow, FixSeries, PositionFix};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Aggregator producing one [`FeatureRow`] per (grouping key, window)
pub struct WindowedAggregator {
    registry: FeatureRegistry,
}

impl Default for WindowedAggregator {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl WindowedAggregator {
    /// Aggregator over a caller-assembled registry
    pub fn new(registry: FeatureRegistry) -> Self {
        Self { registry }
    }

    /// Aggregator over the standard mobility + significant-place feature set
    pub fn with_defaults() -> Self {
        Self::new(FeatureRegistry::with_defaults())
    }

    /// Compute the feature table for a batch of fixes.
    ///
    /// Rows come back sorted by (user, device, window start). Windows whose
    /// feature functions produce nothing, or fail internally, are absent
    /// from the output; the rest of the batch is unaffected.
    pub fn compute(
        &self,
        fixes: &[PositionFix],
        config: &MobilityConfig,
    ) -> Result<Vec<FeatureRow>, MobilityError> {
        validate_fixes(fixes)?;

        type GroupKey = (String, Option<String>, DateTime<Utc>);
        let mut groups: BTreeMap<GroupKey, Vec<&PositionFix>> = BTreeMap::new();
        for fix in fixes {
            let device = if config.group_by_device {
                fix.device.clone()
            } else {
                None
            };
            let window_start = config.resample_rule.window_start(fix.time);
            groups
                .entry((fix.user.clone(), device, window_start))
                .or_default()
                .push(fix);
        }

        let mut rows = Vec::with_capacity(groups.len());
        for ((user, device, window_start), members) in groups {
            let series = FixSeries::from_fixes(&members);
            match self.registry.compute_all(&series, config) {
                Ok(Some(columns)) => rows.push(FeatureRow {
                    user,
                    device,
                    window_start,
                    values: columns
                        .into_iter()
                        .map(|(name, value)| (name.to_string(), value))
                        .collect(),
                }),
                Ok(None) => {}
                // A failed window is omitted, never fatal for the batch
                Err(_) => {}
            }
        }
        Ok(rows)
    }
}

/// Validate coordinates across the whole batch before any computation runs.
///
/// NaN or out-of-range latitude/longitude fails fast, naming the offending
/// column and row.
pub fn validate_fixes(fixes: &[PositionFix]) -> Result<(), MobilityError> {
    for (row, fix) in fixes.iter().enumerate() {
        if fix.latitude.is_nan() {
            return Err(MobilityError::InvalidValue {
                column: "latitude",
                row,
                reason: "NaN coordinate".to_string(),
            });
        }
        if !(-90.0..=90.0).contains(&fix.latitude) {
            return Err(MobilityError::InvalidValue {
                column: "latitude",
                row,
                reason: format!("{} outside [-90, 90]", fix.latitude),
            });
        }
        if fix.longitude.is_nan() {
            return Err(MobilityError::InvalidValue {
                column: "longitude",
                row,
                reason: "NaN coordinate".to_string(),
            });
        }
        if !(-180.0..=180.0).contains(&fix.longitude) {
            return Err(MobilityError::InvalidValue {
                column: "longitude",
                row,
                reason: format!("{} outside [-180, 180]", fix.longitude),
            });
        }
    }
    Ok(())
}
