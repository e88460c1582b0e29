//! Placemetrics - mobility and significant-place feature engine
//!
//! Placemetrics turns streams of raw device position fixes from mobile-sensing
//! study participants into per-user, per-window behavioral features through a
//! deterministic pipeline: validation → windowed grouping → speed derivation →
//! density clustering of static fixes → feature assembly.
//!
//! ## Modules
//!
//! - **geodesy**: pairwise great-circle distance matrices and point-to-point
//!   haversine distances
//! - **cluster**: density-based clustering behind a swappable trait
//! - **home**: home centroid inference from nocturnal fixes
//! - **mobility**: per-window speed/distance statistics
//! - **places**: per-window significant-place visitation features
//! - **aggregate**: grouping, windowing, and result-table assembly

pub mod aggregate;
pub mod cluster;
pub mod config;
pub mod error;
pub mod geodesy;
pub mod home;
pub mod mobility;
pub mod places;
pub mod registry;
pub mod types;

pub use aggregate::WindowedAggregator;
pub use cluster::{DensityClusterer, DistanceDbscan, NOISE};
pub use config::{ConfigOverrides, MobilityConfig, WindowRule};
pub use error::MobilityError;
pub use geodesy::{haversine, DistanceMatrix};
pub use mobility::MobilityComputer;
pub use places::PlaceComputer;
pub use registry::FeatureRegistry;
pub use types::{FeatureRow, FixSeries, HomeLocation, MobilityFeatures, PlaceFeatures, PositionFix};

/// Engine version embedded in CLI output
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
