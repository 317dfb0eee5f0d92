//! Scheduler service configuration

use anyhow::Result;
use scheduler_lib::regression::{DetectorConfig, RegressionThresholds};
use scheduler_lib::source::RegionRegistry;
use scheduler_lib::{OptimizerConfig, RankWeights, ResolverConfig};
use serde::Deserialize;
use std::time::Duration;

/// Service configuration, loaded from `SCHEDULER_`-prefixed environment
/// variables with documented defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// API server port for decisions, health, and metrics.
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Optional path to a JSON region profile table; the built-in table
    /// is used when unset.
    #[serde(default)]
    pub region_table_path: Option<String>,

    /// Timeout for each individual intensity source call.
    #[serde(default = "default_source_timeout_secs")]
    pub source_timeout_secs: u64,

    /// Overall budget for a batch resolution.
    #[serde(default = "default_batch_timeout_secs")]
    pub batch_timeout_secs: u64,

    /// Horizon forecast series are bounded to.
    #[serde(default = "default_forecast_horizon_hours")]
    pub forecast_horizon_hours: u32,

    /// Intensity at or below which running immediately is acceptable.
    #[serde(default = "default_acceptable_intensity")]
    pub acceptable_intensity: f64,

    /// Minimum savings before a deferral is recommended.
    #[serde(default = "default_min_savings_percent")]
    pub min_savings_percent_defer: f64,

    /// Minimum savings before a relocation is recommended.
    #[serde(default = "default_min_savings_percent")]
    pub min_savings_percent_relocate: f64,

    /// Regression severity band edges, in delta-percent.
    #[serde(default = "default_regression_minor")]
    pub regression_minor_percent: f64,
    #[serde(default = "default_regression_major")]
    pub regression_major_percent: f64,
    #[serde(default = "default_regression_critical")]
    pub regression_critical_percent: f64,

    /// Share of total energy above which a phase is a hotspot.
    #[serde(default = "default_hotspot_threshold")]
    pub hotspot_threshold_percent: f64,

    /// Rolling window of accepted measurements backing each baseline.
    #[serde(default = "default_baseline_window_size")]
    pub baseline_window_size: usize,

    /// Default ranking weights (w1 current, w2 forecast, w3 efficiency,
    /// w4 schedule weight); callers may override per request.
    #[serde(default = "default_rank_w1")]
    pub rank_weight_w1: f64,
    #[serde(default = "default_rank_w2")]
    pub rank_weight_w2: f64,
    #[serde(default = "default_rank_w3")]
    pub rank_weight_w3: f64,
    #[serde(default = "default_rank_w4")]
    pub rank_weight_w4: f64,
}

fn default_api_port() -> u16 {
    8080
}

fn default_source_timeout_secs() -> u64 {
    3
}

fn default_batch_timeout_secs() -> u64 {
    10
}

fn default_forecast_horizon_hours() -> u32 {
    48
}

fn default_acceptable_intensity() -> f64 {
    100.0
}

fn default_min_savings_percent() -> f64 {
    15.0
}

fn default_regression_minor() -> f64 {
    5.0
}

fn default_regression_major() -> f64 {
    15.0
}

fn default_regression_critical() -> f64 {
    30.0
}

fn default_hotspot_threshold() -> f64 {
    20.0
}

fn default_baseline_window_size() -> usize {
    10
}

fn default_rank_w1() -> f64 {
    0.4
}

fn default_rank_w2() -> f64 {
    0.4
}

fn default_rank_w3() -> f64 {
    0.3
}

fn default_rank_w4() -> f64 {
    0.1
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            region_table_path: None,
            source_timeout_secs: default_source_timeout_secs(),
            batch_timeout_secs: default_batch_timeout_secs(),
            forecast_horizon_hours: default_forecast_horizon_hours(),
            acceptable_intensity: default_acceptable_intensity(),
            min_savings_percent_defer: default_min_savings_percent(),
            min_savings_percent_relocate: default_min_savings_percent(),
            regression_minor_percent: default_regression_minor(),
            regression_major_percent: default_regression_major(),
            regression_critical_percent: default_regression_critical(),
            hotspot_threshold_percent: default_hotspot_threshold(),
            baseline_window_size: default_baseline_window_size(),
            rank_weight_w1: default_rank_w1(),
            rank_weight_w2: default_rank_w2(),
            rank_weight_w3: default_rank_w3(),
            rank_weight_w4: default_rank_w4(),
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("SCHEDULER"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            source_timeout: Duration::from_secs(self.source_timeout_secs),
            batch_timeout: Duration::from_secs(self.batch_timeout_secs),
            forecast_horizon_hours: self.forecast_horizon_hours,
        }
    }

    pub fn optimizer_config(&self) -> OptimizerConfig {
        OptimizerConfig {
            acceptable_intensity: self.acceptable_intensity,
            min_savings_percent_defer: self.min_savings_percent_defer,
            min_savings_percent_relocate: self.min_savings_percent_relocate,
        }
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            thresholds: RegressionThresholds {
                minor: self.regression_minor_percent,
                major: self.regression_major_percent,
                critical: self.regression_critical_percent,
            },
            hotspot_threshold_percent: self.hotspot_threshold_percent,
            baseline_window_size: self.baseline_window_size,
            ..DetectorConfig::default()
        }
    }

    pub fn rank_weights(&self) -> RankWeights {
        RankWeights {
            w1: self.rank_weight_w1,
            w2: self.rank_weight_w2,
            w3: self.rank_weight_w3,
            w4: self.rank_weight_w4,
        }
    }

    /// Region profile table: the configured file, or the built-in set.
    pub fn region_registry(&self) -> Result<RegionRegistry> {
        match &self.region_table_path {
            Some(path) => RegionRegistry::load_from_file(path),
            None => Ok(RegionRegistry::with_defaults()),
        }
    }
}
