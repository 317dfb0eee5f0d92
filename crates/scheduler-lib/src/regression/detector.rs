//! Regression classification and hotspot decomposition
//!
//! Compares each measurement against the rolling baseline of its
//! (branch, workload) series. Only measurements classified as clean
//! shift the baseline, so a regression cannot normalize itself away.

use super::store::BaselineStore;
use crate::carbon::to_co2_grams;
use crate::error::EngineError;
use crate::models::{
    EnergyMeasurement, Hotspot, RegressionBaseline, RegressionResult, Severity,
};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Severity band edges in delta-percent. Each band is inclusive at its
/// lower edge: a delta of exactly 15% classifies as Major.
#[derive(Debug, Clone, Copy)]
pub struct RegressionThresholds {
    pub minor: f64,
    pub major: f64,
    pub critical: f64,
}

impl Default for RegressionThresholds {
    fn default() -> Self {
        Self {
            minor: 5.0,
            major: 15.0,
            critical: 30.0,
        }
    }
}

/// Configuration for the regression detector.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub thresholds: RegressionThresholds,
    /// A phase is a hotspot when its share of total energy strictly
    /// exceeds this percentage.
    pub hotspot_threshold_percent: f64,
    /// Rolling window of accepted measurements backing the baseline.
    pub baseline_window_size: usize,
    /// Allowed mismatch between the total and the component/phase sums.
    pub sum_tolerance_percent: f64,
    /// Intensity used for the presentational CO2 figure, gCO2/kWh.
    pub display_intensity_g_per_kwh: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            thresholds: RegressionThresholds::default(),
            hotspot_threshold_percent: 20.0,
            baseline_window_size: 10,
            sum_tolerance_percent: 5.0,
            display_intensity_g_per_kwh: crate::carbon::GLOBAL_AVERAGE_INTENSITY,
        }
    }
}

/// Detects energy regressions and phase hotspots for workload series.
pub struct RegressionDetector {
    store: Arc<dyn BaselineStore>,
    config: DetectorConfig,
    /// Serializes baseline read-modify-write per series key so two
    /// measurements for the same key cannot lose updates.
    update_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RegressionDetector {
    pub fn new(store: Arc<dyn BaselineStore>, config: DetectorConfig) -> Self {
        Self {
            store,
            config,
            update_locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn BaselineStore> {
        &self.store
    }

    /// Evaluate a measurement against its stored baseline.
    ///
    /// Read-only and idempotent: calling it twice without an intervening
    /// baseline update yields the same result. A series with no baseline
    /// yet evaluates as clean (first-sample case, not an error).
    pub async fn evaluate(
        &self,
        measurement: &EnergyMeasurement,
    ) -> Result<RegressionResult, EngineError> {
        self.validate(measurement)?;
        let baseline = self
            .store
            .load_baseline(&measurement.branch, &measurement.workload)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        Ok(self.classify(measurement, baseline.as_ref()))
    }

    /// Evaluate a measurement, record it, and shift the baseline when it
    /// is accepted as non-anomalous.
    ///
    /// The first measurement of a series seeds the baseline
    /// unconditionally; after that only clean (severity None)
    /// measurements enter the rolling window, so a spike cannot corrupt
    /// the reference it is judged against.
    pub async fn ingest(
        &self,
        measurement: &EnergyMeasurement,
    ) -> Result<RegressionResult, EngineError> {
        self.validate(measurement)?;

        let key = format!("{}/{}", measurement.branch, measurement.workload);
        let lock = self
            .update_locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let baseline = self
            .store
            .load_baseline(&measurement.branch, &measurement.workload)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        let result = self.classify(measurement, baseline.as_ref());

        self.store
            .append_measurement(measurement.clone())
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;

        match baseline {
            None => {
                debug!(
                    branch = %measurement.branch,
                    workload = %measurement.workload,
                    energy_j = measurement.total_energy_j,
                    "Seeding baseline from first measurement"
                );
                self.store
                    .save_baseline(RegressionBaseline::seed(measurement))
                    .await
                    .map_err(|e| EngineError::Storage(e.to_string()))?;
            }
            Some(mut baseline) if result.severity == Severity::None => {
                baseline.accept(measurement, self.config.baseline_window_size);
                self.store
                    .save_baseline(baseline)
                    .await
                    .map_err(|e| EngineError::Storage(e.to_string()))?;
            }
            Some(_) => {
                info!(
                    branch = %measurement.branch,
                    workload = %measurement.workload,
                    delta_percent = result.delta_percent,
                    severity = %result.severity,
                    "Regressed measurement kept out of baseline window"
                );
            }
        }

        Ok(result)
    }

    /// Structural validation. Negative/NaN energies and sums inconsistent
    /// with the total beyond tolerance are rejected before any state is
    /// touched.
    fn validate(&self, measurement: &EnergyMeasurement) -> Result<(), EngineError> {
        let total = measurement.total_energy_j;
        if !total.is_finite() || total <= 0.0 {
            return Err(EngineError::InvalidMeasurement(format!(
                "total energy must be a positive number, got {total}"
            )));
        }

        let component_values = [
            measurement.components.cpu_j,
            measurement.components.gpu_j,
            measurement.components.ram_j,
            measurement.components.disk_j,
            measurement.components.network_j,
        ];
        if component_values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(EngineError::InvalidMeasurement(
                "component energies must be finite and non-negative".to_string(),
            ));
        }

        let component_sum = measurement.components.total();
        if percent_off(component_sum, total) > self.config.sum_tolerance_percent {
            return Err(EngineError::InvalidMeasurement(format!(
                "component sum {component_sum:.1} J inconsistent with total {total:.1} J"
            )));
        }

        if measurement
            .phases
            .iter()
            .any(|p| !p.energy_j.is_finite() || p.energy_j < 0.0)
        {
            return Err(EngineError::InvalidMeasurement(
                "phase energies must be finite and non-negative".to_string(),
            ));
        }
        if !measurement.phases.is_empty() {
            let phase_sum: f64 = measurement.phases.iter().map(|p| p.energy_j).sum();
            if percent_off(phase_sum, total) > self.config.sum_tolerance_percent {
                return Err(EngineError::InvalidMeasurement(format!(
                    "phase sum {phase_sum:.1} J inconsistent with total {total:.1} J"
                )));
            }
        }

        Ok(())
    }

    fn classify(
        &self,
        measurement: &EnergyMeasurement,
        baseline: Option<&RegressionBaseline>,
    ) -> RegressionResult {
        let (baseline_energy, baseline_samples, delta_percent) = match baseline {
            Some(b) => {
                // Multiply before dividing so exact boundary deltas stay exact.
                let delta =
                    (measurement.total_energy_j - b.baseline_energy_j) * 100.0 / b.baseline_energy_j;
                (b.baseline_energy_j, b.sample_count, delta)
            }
            // First sample of a series: the measurement is its own reference.
            None => (measurement.total_energy_j, 0, 0.0),
        };

        RegressionResult {
            workload: measurement.workload.clone(),
            branch: measurement.branch.clone(),
            commit_sha: measurement.commit_sha.clone(),
            total_energy_j: measurement.total_energy_j,
            baseline_energy_j: baseline_energy,
            baseline_samples,
            delta_percent,
            severity: self.severity_for(delta_percent),
            hotspots: self.hotspots(measurement),
            co2_grams: to_co2_grams(
                measurement.total_energy_j,
                self.config.display_intensity_g_per_kwh,
            ),
        }
    }

    fn severity_for(&self, delta_percent: f64) -> Severity {
        let t = &self.config.thresholds;
        if delta_percent < t.minor {
            Severity::None
        } else if delta_percent < t.major {
            Severity::Minor
        } else if delta_percent < t.critical {
            Severity::Major
        } else {
            Severity::Critical
        }
    }

    /// Phases whose share of the total strictly exceeds the hotspot
    /// threshold, ordered descending by share. An empty list is a valid
    /// outcome, not an error.
    fn hotspots(&self, measurement: &EnergyMeasurement) -> Vec<Hotspot> {
        let total = measurement.total_energy_j;
        let mut hotspots: Vec<Hotspot> = measurement
            .phases
            .iter()
            .map(|p| Hotspot {
                phase: p.name.clone(),
                energy_j: p.energy_j,
                percent_of_total: p.energy_j * 100.0 / total,
            })
            .filter(|h| h.percent_of_total > self.config.hotspot_threshold_percent)
            .collect();
        hotspots.sort_by(|a, b| {
            b.percent_of_total
                .partial_cmp(&a.percent_of_total)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hotspots
    }
}

/// Relative mismatch between `value` and `reference`, in percent of the
/// reference.
fn percent_off(value: f64, reference: f64) -> f64 {
    ((value - reference) / reference).abs() * 100.0
}
