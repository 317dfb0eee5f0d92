//! Baseline storage interface
//!
//! The detector only assumes atomic per-key reads and writes; the
//! storage technology behind the trait is a deployment choice. The
//! in-memory implementation backs the default service wiring and tests.

use crate::models::{EnergyMeasurement, RegressionBaseline};
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

/// Storage consumed by the regression detector.
#[async_trait]
pub trait BaselineStore: Send + Sync {
    /// Load the baseline for a (branch, workload) series, if one exists.
    async fn load_baseline(
        &self,
        branch: &str,
        workload: &str,
    ) -> Result<Option<RegressionBaseline>>;

    /// Persist a baseline, replacing any previous record for its key.
    async fn save_baseline(&self, baseline: RegressionBaseline) -> Result<()>;

    /// Append a measurement to its series. Measurements are append-only.
    async fn append_measurement(&self, measurement: EnergyMeasurement) -> Result<()>;
}

fn series_key(branch: &str, workload: &str) -> String {
    format!("{branch}/{workload}")
}

/// In-memory baseline store keyed by (branch, workload).
///
/// dashmap's per-entry locking gives the atomic per-key read/write the
/// detector relies on.
#[derive(Debug, Default)]
pub struct MemoryBaselineStore {
    baselines: DashMap<String, RegressionBaseline>,
    measurements: DashMap<String, Vec<EnergyMeasurement>>,
}

impl MemoryBaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of measurements recorded for a series.
    pub fn measurement_count(&self, branch: &str, workload: &str) -> usize {
        self.measurements
            .get(&series_key(branch, workload))
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Number of series with a baseline.
    pub fn baseline_count(&self) -> usize {
        self.baselines.len()
    }
}

#[async_trait]
impl BaselineStore for MemoryBaselineStore {
    async fn load_baseline(
        &self,
        branch: &str,
        workload: &str,
    ) -> Result<Option<RegressionBaseline>> {
        Ok(self
            .baselines
            .get(&series_key(branch, workload))
            .map(|b| b.clone()))
    }

    async fn save_baseline(&self, baseline: RegressionBaseline) -> Result<()> {
        let key = series_key(&baseline.branch, &baseline.workload);
        self.baselines.insert(key, baseline);
        Ok(())
    }

    async fn append_measurement(&self, measurement: EnergyMeasurement) -> Result<()> {
        let key = series_key(&measurement.branch, &measurement.workload);
        self.measurements.entry(key).or_default().push(measurement);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComponentBreakdown;

    fn measurement(branch: &str, workload: &str, total: f64) -> EnergyMeasurement {
        EnergyMeasurement {
            workload: workload.to_string(),
            branch: branch.to_string(),
            commit_sha: "deadbeef".to_string(),
            total_energy_j: total,
            components: ComponentBreakdown {
                cpu_j: total,
                ..Default::default()
            },
            phases: vec![],
            recorded_at: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn test_load_missing_baseline_is_none() {
        let store = MemoryBaselineStore::new();
        let loaded = store.load_baseline("main", "suite").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let store = MemoryBaselineStore::new();
        let baseline = RegressionBaseline::seed(&measurement("main", "suite", 5000.0));
        store.save_baseline(baseline).await.unwrap();

        let loaded = store.load_baseline("main", "suite").await.unwrap().unwrap();
        assert_eq!(loaded.baseline_energy_j, 5000.0);
        assert_eq!(loaded.sample_count, 1);
    }

    #[tokio::test]
    async fn test_series_are_isolated_by_key() {
        let store = MemoryBaselineStore::new();
        store
            .save_baseline(RegressionBaseline::seed(&measurement("main", "suite", 1000.0)))
            .await
            .unwrap();
        store
            .save_baseline(RegressionBaseline::seed(&measurement("dev", "suite", 9000.0)))
            .await
            .unwrap();

        let main = store.load_baseline("main", "suite").await.unwrap().unwrap();
        let dev = store.load_baseline("dev", "suite").await.unwrap().unwrap();
        assert_eq!(main.baseline_energy_j, 1000.0);
        assert_eq!(dev.baseline_energy_j, 9000.0);
        assert_eq!(store.baseline_count(), 2);
    }

    #[tokio::test]
    async fn test_measurements_append_only() {
        let store = MemoryBaselineStore::new();
        for total in [1000.0, 1100.0, 1200.0] {
            store
                .append_measurement(measurement("main", "suite", total))
                .await
                .unwrap();
        }
        assert_eq!(store.measurement_count("main", "suite"), 3);
        assert_eq!(store.measurement_count("main", "other"), 0);
    }
}
