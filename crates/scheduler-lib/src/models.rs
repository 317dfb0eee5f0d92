//! Core data models for the scheduling decision engine

use serde::{Deserialize, Serialize};

/// A single carbon-intensity observation for a region.
///
/// Produced by intensity source adapters and by the resolver's fallback
/// path. Immutable once created; `confidence == 0.0` always pairs with
/// `is_realtime == false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntensityReading {
    pub region: String,
    /// Carbon intensity in gCO2 per kWh.
    pub value_g_per_kwh: f64,
    /// Source confidence in [0, 1]. Zero means fallback data.
    pub confidence: f32,
    pub source_id: String,
    /// Unix timestamp (seconds) of the observation.
    pub observed_at: i64,
    pub is_realtime: bool,
}

impl IntensityReading {
    /// Build the explicit fallback reading for a region from its profile.
    pub fn fallback(profile: &RegionProfile, observed_at: i64) -> Self {
        Self {
            region: profile.region.clone(),
            value_g_per_kwh: profile.static_intensity_fallback,
            confidence: 0.0,
            source_id: FALLBACK_SOURCE_ID.to_string(),
            observed_at,
            is_realtime: false,
        }
    }

    /// A reading is usable when its value is a finite non-negative number
    /// and its confidence sits in [0, 1].
    pub fn is_valid(&self) -> bool {
        self.value_g_per_kwh.is_finite()
            && self.value_g_per_kwh >= 0.0
            && (0.0..=1.0).contains(&self.confidence)
    }
}

/// Source id reported on resolver fallback readings.
pub const FALLBACK_SOURCE_ID: &str = "static-fallback";

/// One predicted intensity value on a region's forecast curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub region: String,
    /// Unix timestamp (seconds) the prediction applies to.
    pub timestamp: i64,
    pub predicted_value: f64,
    pub confidence: f32,
}

/// Static metadata for a schedulable region.
///
/// Loaded once per process lifetime and read-only at decision time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionProfile {
    pub region: String,
    pub code: String,
    pub location: String,
    /// Power Usage Effectiveness of the facility (>= 1.0).
    pub pue: f64,
    /// Renewable share of the grid mix in [0, 1].
    pub renewable_pct: f64,
    /// Intensity used when no live source answers, in gCO2/kWh.
    pub static_intensity_fallback: f64,
}

/// Tunable weights for the region ranking formula.
///
/// `rank_value = w1*cfp + w2*forecasted_cfp - w3*efficiency_ratio
///             + w4*schedule_weight`. The defaults sum to the documented
/// reference total of 1.2 so component magnitudes stay interpretable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RankWeights {
    pub w1: f64,
    pub w2: f64,
    pub w3: f64,
    pub w4: f64,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            w1: 0.4,
            w2: 0.4,
            w3: 0.3,
            w4: 0.1,
        }
    }
}

/// The scored components behind a region's rank value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreComponents {
    /// Current carbon footprint proxy for one unit workload.
    pub cfp: f64,
    /// Mean forecasted footprint proxy over the ranking horizon.
    pub forecasted_cfp: f64,
    /// Renewable share divided by PUE; higher is better.
    pub efficiency_ratio: f64,
    /// Caller-supplied urgency factor.
    pub schedule_weight: f64,
}

/// Ranking output for one region. Lower `rank_value` is better; callers
/// read index 0 of the ranked sequence as the top pick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionScore {
    pub region: String,
    pub rank_value: f64,
    pub components: ScoreComponents,
}

/// Terminal outcome of the window optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    RunNow,
    Defer,
    Relocate,
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionKind::RunNow => write!(f, "run_now"),
            DecisionKind::Defer => write!(f, "defer"),
            DecisionKind::Relocate => write!(f, "relocate"),
        }
    }
}

/// The optimizer's recommendation for one scheduling request.
///
/// Immutable result value; never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDecision {
    pub decision: DecisionKind,
    pub chosen_region: String,
    /// Unix timestamp (seconds) the workload should start at.
    pub chosen_start_time: i64,
    /// Expected mean intensity over the execution window, gCO2/kWh.
    pub expected_intensity: f64,
    /// Savings vs running in the current region right now, in percent.
    pub expected_savings_percent: f64,
    pub reason: String,
}

/// Per-component energy split of a measurement, in joules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentBreakdown {
    pub cpu_j: f64,
    pub gpu_j: f64,
    pub ram_j: f64,
    pub disk_j: f64,
    pub network_j: f64,
}

impl ComponentBreakdown {
    pub fn total(&self) -> f64 {
        self.cpu_j + self.gpu_j + self.ram_j + self.disk_j + self.network_j
    }
}

/// Energy attributed to one execution phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseEnergy {
    pub name: String,
    pub energy_j: f64,
    pub duration_s: f64,
}

/// One measured workload run. Append-only; each measurement belongs to
/// exactly one (branch, workload) series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyMeasurement {
    pub workload: String,
    pub branch: String,
    pub commit_sha: String,
    pub total_energy_j: f64,
    pub components: ComponentBreakdown,
    pub phases: Vec<PhaseEnergy>,
    /// Unix timestamp (seconds) the run was recorded at.
    pub recorded_at: i64,
}

/// Rolling reference energy for a (branch, workload) series.
///
/// Mutated only by the detector when a measurement is accepted into the
/// window; readers never write it. `baseline_energy_j` is the mean of
/// `window`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionBaseline {
    pub branch: String,
    pub workload: String,
    pub baseline_energy_j: f64,
    /// Total accepted measurements over the series lifetime.
    pub sample_count: u64,
    /// Last N accepted energies, oldest first.
    pub window: Vec<f64>,
    pub last_updated: i64,
}

impl RegressionBaseline {
    /// Seed a baseline from the first measurement of a series.
    pub fn seed(measurement: &EnergyMeasurement) -> Self {
        Self {
            branch: measurement.branch.clone(),
            workload: measurement.workload.clone(),
            baseline_energy_j: measurement.total_energy_j,
            sample_count: 1,
            window: vec![measurement.total_energy_j],
            last_updated: measurement.recorded_at,
        }
    }

    /// Accept a measurement into the rolling window of size `window_size`
    /// and recompute the mean.
    pub fn accept(&mut self, measurement: &EnergyMeasurement, window_size: usize) {
        self.window.push(measurement.total_energy_j);
        if self.window.len() > window_size {
            let overflow = self.window.len() - window_size;
            self.window.drain(0..overflow);
        }
        self.baseline_energy_j = self.window.iter().sum::<f64>() / self.window.len() as f64;
        self.sample_count += 1;
        self.last_updated = measurement.recorded_at;
    }
}

/// Regression severity band for one evaluated measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Minor,
    Major,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::None => write!(f, "none"),
            Severity::Minor => write!(f, "minor"),
            Severity::Major => write!(f, "major"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A phase consuming a disproportionate share of total energy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotspot {
    pub phase: String,
    pub energy_j: f64,
    pub percent_of_total: f64,
}

/// Outcome of evaluating one measurement against its baseline.
///
/// Derived per measurement; the measurement and baseline are the durable
/// entities, this result is not stored as authoritative state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionResult {
    pub workload: String,
    pub branch: String,
    pub commit_sha: String,
    pub total_energy_j: f64,
    pub baseline_energy_j: f64,
    /// Accepted samples backing the baseline at evaluation time.
    pub baseline_samples: u64,
    pub delta_percent: f64,
    pub severity: Severity,
    /// Hotspots ordered descending by share of total energy.
    pub hotspots: Vec<Hotspot>,
    /// CO2 mass of the run at the configured display intensity, grams.
    pub co2_grams: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> RegionProfile {
        RegionProfile {
            region: "eu-north".to_string(),
            code: "eu-north".to_string(),
            location: "Stockholm".to_string(),
            pue: 1.1,
            renewable_pct: 0.9,
            static_intensity_fallback: 45.0,
        }
    }

    #[test]
    fn test_fallback_reading_has_zero_confidence() {
        let reading = IntensityReading::fallback(&profile(), 1_700_000_000);
        assert_eq!(reading.confidence, 0.0);
        assert!(!reading.is_realtime);
        assert_eq!(reading.source_id, FALLBACK_SOURCE_ID);
        assert_eq!(reading.value_g_per_kwh, 45.0);
        assert!(reading.is_valid());
    }

    #[test]
    fn test_invalid_readings_rejected() {
        let mut reading = IntensityReading::fallback(&profile(), 0);
        reading.value_g_per_kwh = f64::NAN;
        assert!(!reading.is_valid());

        reading.value_g_per_kwh = -12.0;
        assert!(!reading.is_valid());

        reading.value_g_per_kwh = 100.0;
        reading.confidence = 1.5;
        assert!(!reading.is_valid());
    }

    #[test]
    fn test_default_weights_reference_total() {
        let w = RankWeights::default();
        assert!((w.w1 + w.w2 + w.w3 + w.w4 - 1.2).abs() < f64::EPSILON);
    }

    fn measurement(total: f64) -> EnergyMeasurement {
        EnergyMeasurement {
            workload: "integration-suite".to_string(),
            branch: "main".to_string(),
            commit_sha: "abc1234".to_string(),
            total_energy_j: total,
            components: ComponentBreakdown {
                cpu_j: total,
                ..Default::default()
            },
            phases: vec![],
            recorded_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_baseline_seed_and_rolling_mean() {
        let mut baseline = RegressionBaseline::seed(&measurement(1000.0));
        assert_eq!(baseline.baseline_energy_j, 1000.0);
        assert_eq!(baseline.sample_count, 1);

        baseline.accept(&measurement(2000.0), 10);
        assert_eq!(baseline.sample_count, 2);
        assert!((baseline.baseline_energy_j - 1500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_baseline_window_caps_at_size() {
        let mut baseline = RegressionBaseline::seed(&measurement(100.0));
        for _ in 0..20 {
            baseline.accept(&measurement(200.0), 5);
        }
        assert_eq!(baseline.window.len(), 5);
        assert!((baseline.baseline_energy_j - 200.0).abs() < f64::EPSILON);
        assert_eq!(baseline.sample_count, 21);
    }

    #[test]
    fn test_component_breakdown_total() {
        let components = ComponentBreakdown {
            cpu_j: 1.0,
            gpu_j: 2.0,
            ram_j: 3.0,
            disk_j: 4.0,
            network_j: 5.0,
        };
        assert!((components.total() - 15.0).abs() < f64::EPSILON);
    }
}
