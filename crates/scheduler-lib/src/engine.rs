//! Decision engine facade
//!
//! Bundles the resolver, ranker, optimizer, and regression detector
//! behind the three operations the API surface exposes: rank regions,
//! optimize a schedule, evaluate a measurement. Every request is
//! stateless and independently dispatchable; the baseline store is the
//! only shared mutable state underneath.

use crate::error::EngineError;
use crate::models::{
    EnergyMeasurement, RankWeights, RegionScore, RegressionBaseline, RegressionResult,
    ScheduleDecision, Severity,
};
use crate::observability::EngineMetrics;
use crate::optimizer::{RegionOutlook, WindowOptimizer};
use crate::ranker::{RankCandidate, RegionRanker};
use crate::regression::RegressionDetector;
use crate::source::IntensityResolver;
use tokio::time::Instant;
use tracing::info;

/// The decision engine's API surface.
pub struct DecisionEngine {
    resolver: IntensityResolver,
    ranker: RegionRanker,
    optimizer: WindowOptimizer,
    detector: RegressionDetector,
    default_weights: RankWeights,
    metrics: EngineMetrics,
}

impl DecisionEngine {
    pub fn new(
        resolver: IntensityResolver,
        optimizer: WindowOptimizer,
        detector: RegressionDetector,
        default_weights: RankWeights,
    ) -> Self {
        let metrics = EngineMetrics::new();
        metrics.set_regions_configured(resolver.registry().len() as i64);
        Self {
            resolver,
            ranker: RegionRanker::new(),
            optimizer,
            detector,
            default_weights,
            metrics,
        }
    }

    pub fn resolver(&self) -> &IntensityResolver {
        &self.resolver
    }

    /// Rank regions by expected carbon cost, best first.
    pub async fn rank(
        &self,
        regions: &[String],
        weights: Option<RankWeights>,
        schedule_weight: f64,
    ) -> Result<Vec<RegionScore>, EngineError> {
        let candidates = self.outlooks(regions).await?;
        let weights = weights.unwrap_or(self.default_weights);
        let rank_candidates: Vec<RankCandidate> = candidates
            .into_iter()
            .map(|outlook| {
                // Known region: outlooks() resolved it from the registry.
                let profile = self
                    .resolver
                    .registry()
                    .get(&outlook.region)
                    .unwrap()
                    .clone();
                RankCandidate {
                    profile,
                    current: outlook.current,
                    forecast: outlook.forecast,
                }
            })
            .collect();
        Ok(self.ranker.rank(&rank_candidates, &weights, schedule_weight))
    }

    /// Decide when and where to run a workload.
    ///
    /// The candidate list is ordered by the ranker before the optimizer
    /// sees it; the current region is always part of the set.
    pub async fn optimize(
        &self,
        candidates: &[String],
        duration_minutes: u32,
        deadline: i64,
        current_region: &str,
        portable: bool,
    ) -> Result<ScheduleDecision, EngineError> {
        let started = Instant::now();

        let mut regions: Vec<String> = candidates.to_vec();
        if !regions.iter().any(|r| r == current_region) {
            regions.insert(0, current_region.to_string());
        }

        let outlooks = self.outlooks(&regions).await?;
        let ranked = self.ranked_order(&outlooks);
        let ordered: Vec<RegionOutlook> = ranked
            .into_iter()
            .map(|region| {
                outlooks
                    .iter()
                    .find(|o| o.region == region)
                    .cloned()
                    .unwrap()
            })
            .collect();

        let now = chrono::Utc::now().timestamp();
        let duration_secs = i64::from(duration_minutes) * 60;
        let decision = self.optimizer.optimize(
            &ordered,
            duration_secs,
            deadline,
            now,
            current_region,
            portable,
        )?;

        self.metrics
            .observe_decision_latency(started.elapsed().as_secs_f64());
        self.metrics.inc_decisions(&decision.decision.to_string());
        info!(
            decision = %decision.decision,
            region = %decision.chosen_region,
            start = decision.chosen_start_time,
            savings_percent = decision.expected_savings_percent,
            "Schedule decision"
        );
        Ok(decision)
    }

    /// Evaluate a measurement, record it, and update the baseline when
    /// it is accepted as clean.
    pub async fn evaluate_measurement(
        &self,
        measurement: &EnergyMeasurement,
    ) -> Result<RegressionResult, EngineError> {
        let result = match self.detector.ingest(measurement).await {
            Ok(result) => result,
            Err(e) => {
                if matches!(e, EngineError::InvalidMeasurement(_)) {
                    self.metrics.inc_measurements_rejected();
                }
                return Err(e);
            }
        };

        self.metrics.inc_measurements_evaluated();
        if result.severity != Severity::None {
            self.metrics.inc_regressions(&result.severity.to_string());
            info!(
                workload = %result.workload,
                branch = %result.branch,
                delta_percent = result.delta_percent,
                severity = %result.severity,
                "Energy regression detected"
            );
        }
        Ok(result)
    }

    /// Stored baseline for a (branch, workload) series, if any.
    pub async fn baseline(
        &self,
        branch: &str,
        workload: &str,
    ) -> Result<Option<RegressionBaseline>, EngineError> {
        self.detector
            .store()
            .load_baseline(branch, workload)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))
    }

    /// Resolve current readings and forecasts for a region set.
    async fn outlooks(&self, regions: &[String]) -> Result<Vec<RegionOutlook>, EngineError> {
        let readings = self.resolver.resolve_batch(regions).await?;
        let forecasts = self.resolver.forecast_batch(regions).await?;
        Ok(regions
            .iter()
            .zip(readings)
            .zip(forecasts)
            .map(|((region, current), forecast)| RegionOutlook {
                region: region.clone(),
                current,
                forecast,
            })
            .collect())
    }

    /// Region codes ordered best-first by the ranker under the default
    /// weights.
    fn ranked_order(&self, outlooks: &[RegionOutlook]) -> Vec<String> {
        let candidates: Vec<RankCandidate> = outlooks
            .iter()
            .filter_map(|o| {
                self.resolver
                    .registry()
                    .get(&o.region)
                    .map(|profile| RankCandidate {
                        profile: profile.clone(),
                        current: o.current.clone(),
                        forecast: o.forecast.clone(),
                    })
            })
            .collect();
        self.ranker
            .rank(&candidates, &self.default_weights, 1.0)
            .into_iter()
            .map(|score| score.region)
            .collect()
    }
}
