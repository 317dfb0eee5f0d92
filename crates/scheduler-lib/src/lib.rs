//! Carbon-aware scheduling decision engine
//!
//! This crate provides the core functionality for:
//! - Resolving carbon intensity per region from prioritized sources
//! - Ranking candidate regions under weighted criteria
//! - Choosing an optimal execution window inside a deadline
//! - Detecting energy regressions and phase hotspots
//! - Health checks and observability

pub mod carbon;
pub mod engine;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod optimizer;
pub mod ranker;
pub mod regression;
pub mod source;

pub use engine::DecisionEngine;
pub use error::EngineError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::EngineMetrics;
pub use optimizer::{OptimizerConfig, RegionOutlook, WindowOptimizer};
pub use ranker::{RankCandidate, RegionRanker};
pub use regression::{
    BaselineStore, DetectorConfig, MemoryBaselineStore, RegressionDetector, RegressionThresholds,
};
pub use source::{IntensityResolver, IntensitySource, RegionRegistry, ResolverConfig};
