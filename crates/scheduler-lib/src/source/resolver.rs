//! Priority-ordered intensity resolution
//!
//! Merges adapter outputs into one authoritative reading per region.
//! Sources are tried in priority order under individual timeouts; batch
//! resolution fans out one task per region under a bounded overall
//! timeout. Absence of live data is a valid, explicit result: the
//! resolver degrades to the profile's static fallback with zero
//! confidence and never raises a source failure upward.

use super::{IntensitySource, RegionRegistry};
use crate::error::EngineError;
use crate::models::{ForecastPoint, IntensityReading};
use crate::observability::EngineMetrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

/// Configuration for the intensity resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Timeout applied to each individual source call.
    pub source_timeout: Duration,
    /// Overall budget for a batch resolution; slower regions fall back.
    pub batch_timeout: Duration,
    /// Horizon that forecast series are bounded to.
    pub forecast_horizon_hours: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_secs(3),
            batch_timeout: Duration::from_secs(10),
            forecast_horizon_hours: 48,
        }
    }
}

/// Resolves current and forecast intensity per region from a prioritized
/// set of sources.
#[derive(Clone)]
pub struct IntensityResolver {
    sources: Vec<Arc<dyn IntensitySource>>,
    registry: Arc<RegionRegistry>,
    config: ResolverConfig,
    metrics: EngineMetrics,
}

impl IntensityResolver {
    pub fn new(
        sources: Vec<Arc<dyn IntensitySource>>,
        registry: Arc<RegionRegistry>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            sources,
            registry,
            config,
            metrics: EngineMetrics::new(),
        }
    }

    pub fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Sources covering the region, highest priority first.
    fn covering_sources(&self, region: &str) -> Vec<Arc<dyn IntensitySource>> {
        let mut covering: Vec<Arc<dyn IntensitySource>> = self
            .sources
            .iter()
            .filter(|s| s.covers(region))
            .cloned()
            .collect();
        covering.sort_by_key(|s| s.priority(region));
        covering
    }

    /// Resolve the current intensity for one region.
    ///
    /// The first covering source that answers within its timeout with a
    /// valid reading and `confidence > 0` wins; lower-priority sources
    /// are skipped for this call. When every source fails or times out,
    /// the profile's static fallback is returned with zero confidence.
    /// The only error is a region the registry does not know.
    pub async fn resolve(&self, region: &str) -> Result<IntensityReading, EngineError> {
        let profile = self
            .registry
            .get(region)
            .ok_or_else(|| EngineError::UnknownRegion(region.to_string()))?;

        let start = Instant::now();
        for source in self.covering_sources(region) {
            match timeout(self.config.source_timeout, source.current(region)).await {
                Ok(Ok(reading)) => {
                    if !reading.is_valid() {
                        warn!(
                            region = %region,
                            source = source.id(),
                            value = reading.value_g_per_kwh,
                            "Discarding invalid reading"
                        );
                        self.metrics.inc_source_failures(source.id());
                        continue;
                    }
                    if reading.confidence <= 0.0 {
                        debug!(
                            region = %region,
                            source = source.id(),
                            "Skipping zero-confidence reading"
                        );
                        continue;
                    }
                    self.metrics
                        .observe_resolve_latency(start.elapsed().as_secs_f64());
                    return Ok(reading);
                }
                Ok(Err(e)) => {
                    warn!(region = %region, source = source.id(), error = %e, "Source failed");
                    self.metrics.inc_source_failures(source.id());
                }
                Err(_) => {
                    warn!(
                        region = %region,
                        source = source.id(),
                        timeout_ms = self.config.source_timeout.as_millis() as u64,
                        "Source timed out"
                    );
                    self.metrics.inc_source_failures(source.id());
                }
            }
        }

        debug!(region = %region, "All sources exhausted, using static fallback");
        self.metrics.inc_fallback_resolutions();
        self.metrics
            .observe_resolve_latency(start.elapsed().as_secs_f64());
        Ok(IntensityReading::fallback(
            profile,
            chrono::Utc::now().timestamp(),
        ))
    }

    /// Resolve a batch of regions concurrently.
    ///
    /// One task per region, each with independent source timeouts, all
    /// collected under the batch timeout. A region still pending when
    /// the budget elapses is reported with its fallback reading; pending
    /// source calls are abandoned, not awaited. The output has exactly
    /// one entry per requested region, in request order.
    pub async fn resolve_batch(
        &self,
        regions: &[String],
    ) -> Result<Vec<IntensityReading>, EngineError> {
        for region in regions {
            if !self.registry.contains(region) {
                return Err(EngineError::UnknownRegion(region.clone()));
            }
        }

        let mut tasks = JoinSet::new();
        for (idx, region) in regions.iter().enumerate() {
            let resolver = self.clone();
            let region = region.clone();
            tasks.spawn(async move { (idx, resolver.resolve(&region).await.ok()) });
        }

        let deadline = Instant::now() + self.config.batch_timeout;
        let mut slots: Vec<Option<IntensityReading>> = vec![None; regions.len()];
        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((idx, reading)))) => slots[idx] = reading,
                Ok(Some(Err(e))) => warn!(error = %e, "Resolution task failed"),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        pending = tasks.len(),
                        timeout_ms = self.config.batch_timeout.as_millis() as u64,
                        "Batch timeout elapsed, filling remaining regions with fallback"
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        let now = chrono::Utc::now().timestamp();
        let readings = regions
            .iter()
            .zip(slots)
            .map(|(region, slot)| {
                slot.unwrap_or_else(|| {
                    self.metrics.inc_fallback_resolutions();
                    // Known region: validated above.
                    IntensityReading::fallback(self.registry.get(region).unwrap(), now)
                })
            })
            .collect();
        Ok(readings)
    }

    /// Resolve the forecast curve for one region.
    ///
    /// Same priority walk as `resolve`; the first source returning a
    /// non-empty series wins. Points are sanitized (non-finite values
    /// dropped), sorted by timestamp, and bounded to the configured
    /// horizon. Total failure yields an empty series, never fabricated
    /// or extrapolated points.
    pub async fn forecast(&self, region: &str) -> Result<Vec<ForecastPoint>, EngineError> {
        if !self.registry.contains(region) {
            return Err(EngineError::UnknownRegion(region.to_string()));
        }

        let horizon = self.config.forecast_horizon_hours;
        for source in self.covering_sources(region) {
            match timeout(self.config.source_timeout, source.forecast(region, horizon)).await {
                Ok(Ok(points)) if !points.is_empty() => {
                    return Ok(sanitize_forecast(points, horizon));
                }
                Ok(Ok(_)) => {
                    debug!(region = %region, source = source.id(), "Empty forecast, trying next");
                }
                Ok(Err(e)) => {
                    warn!(region = %region, source = source.id(), error = %e, "Forecast failed");
                    self.metrics.inc_source_failures(source.id());
                }
                Err(_) => {
                    warn!(region = %region, source = source.id(), "Forecast timed out");
                    self.metrics.inc_source_failures(source.id());
                }
            }
        }

        debug!(region = %region, "No forecast available");
        Ok(Vec::new())
    }

    /// Resolve forecasts for a batch of regions concurrently, under the
    /// same batch budget as `resolve_batch`. Regions that miss the
    /// budget get an empty series.
    pub async fn forecast_batch(
        &self,
        regions: &[String],
    ) -> Result<Vec<Vec<ForecastPoint>>, EngineError> {
        for region in regions {
            if !self.registry.contains(region) {
                return Err(EngineError::UnknownRegion(region.clone()));
            }
        }

        let mut tasks = JoinSet::new();
        for (idx, region) in regions.iter().enumerate() {
            let resolver = self.clone();
            let region = region.clone();
            tasks.spawn(async move { (idx, resolver.forecast(&region).await.unwrap_or_default()) });
        }

        let deadline = Instant::now() + self.config.batch_timeout;
        let mut slots: Vec<Vec<ForecastPoint>> = vec![Vec::new(); regions.len()];
        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((idx, points)))) => slots[idx] = points,
                Ok(Some(Err(e))) => warn!(error = %e, "Forecast task failed"),
                Ok(None) => break,
                Err(_) => {
                    tasks.abort_all();
                    break;
                }
            }
        }
        Ok(slots)
    }
}

/// Drop non-finite points, order by timestamp, and bound to the horizon
/// measured from the earliest point.
fn sanitize_forecast(mut points: Vec<ForecastPoint>, horizon_hours: u32) -> Vec<ForecastPoint> {
    points.retain(|p| p.predicted_value.is_finite() && p.predicted_value >= 0.0);
    points.sort_by_key(|p| p.timestamp);
    if let Some(first) = points.first() {
        let cutoff = first.timestamp + i64::from(horizon_hours) * 3600;
        points.retain(|p| p.timestamp <= cutoff);
    }
    points
}
