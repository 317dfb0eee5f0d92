//! Slack-aware execution window optimization
//!
//! Decides between RUN_NOW, DEFER, and RELOCATE for one scheduling
//! request by scanning forecast curves for the cheapest feasible
//! execution window inside the deadline. The decision logic is an
//! explicit state machine over three named guards so each condition is
//! independently testable. Pure computation over already-resolved data.

use crate::carbon::{to_co2_grams, JOULES_PER_KWH};
use crate::error::EngineError;
use crate::models::{DecisionKind, ForecastPoint, IntensityReading, ScheduleDecision};

/// Default forecast spacing assumed when a curve has a single point.
const DEFAULT_STEP_SECS: i64 = 3600;

/// Configuration for the window optimizer.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Intensity at or below which running immediately is always fine,
    /// in gCO2/kWh. Default derived from the "Low" carbon-intensity band.
    pub acceptable_intensity: f64,
    /// Minimum savings vs running now before a deferral is worth it.
    pub min_savings_percent_defer: f64,
    /// Minimum savings vs the best same-region option before a
    /// relocation is worth it.
    pub min_savings_percent_relocate: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            acceptable_intensity: 100.0,
            min_savings_percent_defer: 15.0,
            min_savings_percent_relocate: 15.0,
        }
    }
}

/// One candidate region's resolved state for a scheduling request.
#[derive(Debug, Clone)]
pub struct RegionOutlook {
    pub region: String,
    pub current: IntensityReading,
    pub forecast: Vec<ForecastPoint>,
}

/// A feasible execution window on some region's forecast curve.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Window {
    start: i64,
    expected_intensity: f64,
}

/// Chooses the (region, start time) pair minimizing expected emissions
/// inside the deadline.
#[derive(Debug, Clone, Default)]
pub struct WindowOptimizer {
    config: OptimizerConfig,
}

impl WindowOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Decide when and where to run a workload of `duration_secs`
    /// finishing no later than `deadline`.
    ///
    /// `candidates` must include an outlook for `current_region`.
    /// Guarantees `now <= chosen_start_time <= deadline - duration_secs`
    /// on every decision. Fails with `InfeasibleSchedule` when the
    /// duration does not fit the deadline window; never silently
    /// truncates.
    pub fn optimize(
        &self,
        candidates: &[RegionOutlook],
        duration_secs: i64,
        deadline: i64,
        now: i64,
        current_region: &str,
        portable: bool,
    ) -> Result<ScheduleDecision, EngineError> {
        if duration_secs <= 0 {
            return Err(EngineError::InfeasibleSchedule(
                "workload duration must be positive".to_string(),
            ));
        }
        let latest_start = deadline - duration_secs;
        if latest_start < now {
            return Err(EngineError::InfeasibleSchedule(format!(
                "duration {}s exceeds the {}s window before the deadline",
                duration_secs,
                (deadline - now).max(0)
            )));
        }

        let current = candidates
            .iter()
            .find(|c| c.region == current_region)
            .ok_or_else(|| EngineError::UnknownRegion(current_region.to_string()))?;
        let baseline = current.current.value_g_per_kwh;

        // Guard 1: the grid is already clean enough, run immediately.
        if self.run_now_acceptable(baseline) {
            return Ok(ScheduleDecision {
                decision: DecisionKind::RunNow,
                chosen_region: current_region.to_string(),
                chosen_start_time: now,
                expected_intensity: baseline,
                expected_savings_percent: 0.0,
                reason: format!(
                    "current intensity {:.1} gCO2/kWh is within the acceptable band (<= {:.1})",
                    baseline, self.config.acceptable_intensity
                ),
            });
        }

        // Guard 2: the cheapest strictly-later start in the current region.
        let deferred = best_window(&current.forecast, now, latest_start, duration_secs, false);
        let defer_savings = deferred
            .map(|w| savings_percent(baseline, w.expected_intensity))
            .unwrap_or(0.0);
        let defer_worthwhile = defer_savings >= self.config.min_savings_percent_defer;

        // Guard 3: a materially cheaper window in another region. Regions
        // whose forecast does not cover [now, deadline] are excluded, not
        // extrapolated.
        let best_same = deferred
            .map(|w| w.expected_intensity.min(baseline))
            .unwrap_or(baseline);
        let relocation = if portable {
            self.best_relocation(candidates, current_region, now, deadline, duration_secs)
        } else {
            None
        };
        let relocate_worthwhile = relocation
            .map(|(_, w)| {
                savings_percent(best_same, w.expected_intensity)
                    >= self.config.min_savings_percent_relocate
            })
            .unwrap_or(false);

        // Precedence on equivalent outcomes: RUN_NOW > DEFER > RELOCATE.
        // Each guard already demands improvement beyond its threshold
        // over the less disruptive alternative.
        if relocate_worthwhile {
            let (region, window) = relocation.unwrap();
            let savings = savings_percent(baseline, window.expected_intensity);
            return Ok(ScheduleDecision {
                decision: DecisionKind::Relocate,
                chosen_region: region.clone(),
                chosen_start_time: window.start,
                expected_intensity: window.expected_intensity,
                expected_savings_percent: savings,
                reason: format!(
                    "relocating to {} at {:.1} gCO2/kWh beats the best {} option \
                     ({:.1} gCO2/kWh), saving {:.0} g CO2 per kWh of compute",
                    region,
                    window.expected_intensity,
                    current_region,
                    best_same,
                    to_co2_grams(JOULES_PER_KWH, baseline - window.expected_intensity)
                ),
            });
        }

        if defer_worthwhile {
            let window = deferred.unwrap();
            let wait_hours = (window.start - now) as f64 / 3600.0;
            return Ok(ScheduleDecision {
                decision: DecisionKind::Defer,
                chosen_region: current_region.to_string(),
                chosen_start_time: window.start,
                expected_intensity: window.expected_intensity,
                expected_savings_percent: defer_savings,
                reason: format!(
                    "deferring {:.1}h lowers expected intensity from {:.1} to {:.1} gCO2/kWh \
                     ({:.1}% savings)",
                    wait_hours, baseline, window.expected_intensity, defer_savings
                ),
            });
        }

        Ok(ScheduleDecision {
            decision: DecisionKind::RunNow,
            chosen_region: current_region.to_string(),
            chosen_start_time: now,
            expected_intensity: baseline,
            expected_savings_percent: 0.0,
            reason: format!(
                "no feasible window improves on {:.1} gCO2/kWh by at least {:.0}%",
                baseline, self.config.min_savings_percent_defer
            ),
        })
    }

    fn run_now_acceptable(&self, current_intensity: f64) -> bool {
        current_intensity <= self.config.acceptable_intensity
    }

    /// Cheapest feasible window across the portable candidate regions.
    /// Ties resolve to the earliest start, then region code order.
    fn best_relocation<'a>(
        &self,
        candidates: &'a [RegionOutlook],
        current_region: &str,
        now: i64,
        deadline: i64,
        duration_secs: i64,
    ) -> Option<(&'a String, Window)> {
        let latest_start = deadline - duration_secs;
        let mut ordered: Vec<&RegionOutlook> = candidates
            .iter()
            .filter(|c| c.region != current_region)
            .collect();
        ordered.sort_by(|a, b| a.region.cmp(&b.region));

        let mut best: Option<(&String, Window)> = None;
        for candidate in ordered {
            if !covers_horizon(&candidate.forecast, now, deadline) {
                continue;
            }
            let Some(window) = best_window(&candidate.forecast, now, latest_start, duration_secs, true)
            else {
                continue;
            };
            let better = match &best {
                None => true,
                Some((_, current_best)) => {
                    window.expected_intensity < current_best.expected_intensity
                        || (window.expected_intensity == current_best.expected_intensity
                            && window.start < current_best.start)
                }
            };
            if better {
                best = Some((&candidate.region, window));
            }
        }
        best
    }
}

/// Scan feasible start times in `[earliest, latest_start]` and return
/// the window with minimum expected intensity, earliest start on ties.
///
/// Candidate starts are `earliest` itself (when `include_earliest`) and
/// every forecast timestamp after it. Windows the forecast does not
/// fully cover are skipped.
fn best_window(
    forecast: &[ForecastPoint],
    earliest: i64,
    latest_start: i64,
    duration_secs: i64,
    include_earliest: bool,
) -> Option<Window> {
    let mut starts: Vec<i64> = Vec::new();
    if include_earliest {
        starts.push(earliest);
    }
    starts.extend(
        forecast
            .iter()
            .map(|p| p.timestamp)
            .filter(|ts| *ts > earliest && *ts <= latest_start),
    );

    let mut best: Option<Window> = None;
    for start in starts {
        let Some(expected_intensity) = window_mean(forecast, start, duration_secs) else {
            continue;
        };
        let better = match &best {
            None => true,
            Some(b) => {
                expected_intensity < b.expected_intensity
                    || (expected_intensity == b.expected_intensity && start < b.start)
            }
        };
        if better {
            best = Some(Window {
                start,
                expected_intensity,
            });
        }
    }
    best
}

/// Mean forecasted intensity over `[start, start + duration)`, or `None`
/// when the curve does not cover the window.
fn window_mean(forecast: &[ForecastPoint], start: i64, duration_secs: i64) -> Option<f64> {
    let step = infer_step(forecast);
    let last = forecast.last()?.timestamp;
    if last + step < start + duration_secs {
        return None;
    }

    let in_window: Vec<f64> = forecast
        .iter()
        .filter(|p| p.timestamp >= start && p.timestamp < start + duration_secs)
        .map(|p| p.predicted_value)
        .collect();
    if in_window.is_empty() {
        return None;
    }
    Some(in_window.iter().sum::<f64>() / in_window.len() as f64)
}

/// A forecast covers the horizon when its points span `[now, deadline]`
/// at their native spacing.
fn covers_horizon(forecast: &[ForecastPoint], now: i64, deadline: i64) -> bool {
    let (Some(first), Some(last)) = (forecast.first(), forecast.last()) else {
        return false;
    };
    let step = infer_step(forecast);
    first.timestamp <= now + step && last.timestamp + step >= deadline
}

fn infer_step(forecast: &[ForecastPoint]) -> i64 {
    match forecast {
        [a, b, ..] if b.timestamp > a.timestamp => b.timestamp - a.timestamp,
        _ => DEFAULT_STEP_SECS,
    }
}

/// Percent saved moving from `baseline` to `chosen` intensity.
pub fn savings_percent(baseline: f64, chosen: f64) -> f64 {
    if baseline <= 0.0 {
        return 0.0;
    }
    (baseline - chosen) * 100.0 / baseline
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;
    const HOUR: i64 = 3600;

    fn outlook(region: &str, current: f64, hourly: &[f64]) -> RegionOutlook {
        RegionOutlook {
            region: region.to_string(),
            current: IntensityReading {
                region: region.to_string(),
                value_g_per_kwh: current,
                confidence: 0.9,
                source_id: "test".to_string(),
                observed_at: NOW,
                is_realtime: true,
            },
            forecast: hourly
                .iter()
                .enumerate()
                .map(|(h, v)| ForecastPoint {
                    region: region.to_string(),
                    timestamp: NOW + h as i64 * HOUR,
                    predicted_value: *v,
                    confidence: 0.8,
                })
                .collect(),
        }
    }

    fn optimizer() -> WindowOptimizer {
        WindowOptimizer::new(OptimizerConfig::default())
    }

    #[test]
    fn test_duration_exceeding_deadline_is_infeasible() {
        let candidates = vec![outlook("us-east", 320.0, &[320.0, 300.0])];
        let err = optimizer()
            .optimize(&candidates, 3 * HOUR, NOW + HOUR, NOW, "us-east", false)
            .unwrap_err();
        assert!(matches!(err, EngineError::InfeasibleSchedule(_)));
    }

    #[test]
    fn test_run_now_when_within_acceptable_band() {
        let candidates = vec![outlook("eu-north", 45.0, &[45.0, 40.0, 30.0, 20.0])];
        let decision = optimizer()
            .optimize(&candidates, HOUR, NOW + 4 * HOUR, NOW, "eu-north", false)
            .unwrap();

        assert_eq!(decision.decision, DecisionKind::RunNow);
        assert_eq!(decision.chosen_start_time, NOW);
        assert_eq!(decision.expected_savings_percent, 0.0);
    }

    #[test]
    fn test_run_now_when_current_is_forecast_minimum() {
        // Intensity only rises before the deadline; waiting never helps.
        let candidates = vec![outlook("us-east", 320.0, &[320.0, 340.0, 390.0, 410.0])];
        let decision = optimizer()
            .optimize(&candidates, HOUR, NOW + 3 * HOUR, NOW, "us-east", false)
            .unwrap();

        assert_eq!(decision.decision, DecisionKind::RunNow);
        assert_eq!(decision.chosen_region, "us-east");
    }

    #[test]
    fn test_defer_to_forecast_dip() {
        // 60-minute workload, deadline in 3h, dip to 180 at +2h.
        let candidates = vec![outlook("us-east", 320.0, &[320.0, 300.0, 180.0, 190.0])];
        let decision = optimizer()
            .optimize(&candidates, HOUR, NOW + 3 * HOUR, NOW, "us-east", false)
            .unwrap();

        assert_eq!(decision.decision, DecisionKind::Defer);
        assert_eq!(decision.chosen_start_time, NOW + 2 * HOUR);
        assert_eq!(decision.expected_intensity, 180.0);
        assert!((decision.expected_savings_percent - 43.75).abs() < 0.01);
    }

    #[test]
    fn test_defer_tie_breaks_to_earliest_start() {
        let candidates = vec![outlook(
            "us-east",
            400.0,
            &[400.0, 200.0, 350.0, 200.0, 380.0],
        )];
        let decision = optimizer()
            .optimize(&candidates, HOUR, NOW + 5 * HOUR, NOW, "us-east", false)
            .unwrap();

        assert_eq!(decision.decision, DecisionKind::Defer);
        // Both +1h and +3h windows average 200; prefer not to wait longer.
        assert_eq!(decision.chosen_start_time, NOW + HOUR);
    }

    #[test]
    fn test_start_time_never_violates_bounds() {
        let candidates = vec![outlook(
            "us-east",
            400.0,
            &[400.0, 390.0, 380.0, 150.0, 140.0, 130.0],
        )];
        let deadline = NOW + 4 * HOUR;
        let duration = 2 * HOUR;
        let decision = optimizer()
            .optimize(&candidates, duration, deadline, NOW, "us-east", false)
            .unwrap();

        assert!(decision.chosen_start_time >= NOW);
        assert!(decision.chosen_start_time <= deadline - duration);
    }

    #[test]
    fn test_relocate_to_materially_cleaner_region() {
        let candidates = vec![
            outlook("us-east", 420.0, &[420.0, 410.0, 400.0, 415.0]),
            outlook("eu-north", 180.0, &[60.0, 55.0, 50.0, 58.0]),
        ];
        let decision = optimizer()
            .optimize(&candidates, HOUR, NOW + 3 * HOUR, NOW, "us-east", true)
            .unwrap();

        assert_eq!(decision.decision, DecisionKind::Relocate);
        assert_eq!(decision.chosen_region, "eu-north");
        assert!(decision.expected_savings_percent > 80.0);
    }

    #[test]
    fn test_no_relocation_when_not_portable() {
        let candidates = vec![
            outlook("us-east", 420.0, &[420.0, 410.0, 400.0, 415.0]),
            outlook("eu-north", 60.0, &[60.0, 55.0, 50.0, 58.0]),
        ];
        let decision = optimizer()
            .optimize(&candidates, HOUR, NOW + 3 * HOUR, NOW, "us-east", false)
            .unwrap();

        assert_eq!(decision.chosen_region, "us-east");
        assert_ne!(decision.decision, DecisionKind::Relocate);
    }

    #[test]
    fn test_region_without_coverage_excluded_from_relocation() {
        // eu-north is cheaper but its forecast stops well before the
        // deadline; it must be excluded rather than extrapolated.
        let candidates = vec![
            outlook("us-east", 420.0, &[420.0, 410.0, 400.0, 415.0]),
            outlook("eu-north", 60.0, &[60.0]),
        ];
        let decision = optimizer()
            .optimize(&candidates, HOUR, NOW + 3 * HOUR, NOW, "us-east", true)
            .unwrap();

        assert_ne!(decision.decision, DecisionKind::Relocate);
    }

    #[test]
    fn test_equivalent_relocation_loses_to_defer() {
        // Deferring reaches 200; relocating reaches 195 (2.5% better,
        // under the 15% relocation threshold) so the less disruptive
        // deferral wins.
        let candidates = vec![
            outlook("us-east", 400.0, &[400.0, 380.0, 200.0, 210.0]),
            outlook("eu-west", 300.0, &[250.0, 230.0, 195.0, 205.0]),
        ];
        let decision = optimizer()
            .optimize(&candidates, HOUR, NOW + 3 * HOUR, NOW, "us-east", true)
            .unwrap();

        assert_eq!(decision.decision, DecisionKind::Defer);
        assert_eq!(decision.chosen_region, "us-east");
    }

    #[test]
    fn test_empty_forecast_degrades_to_run_now() {
        let candidates = vec![outlook("us-east", 380.0, &[])];
        let decision = optimizer()
            .optimize(&candidates, HOUR, NOW + 3 * HOUR, NOW, "us-east", true)
            .unwrap();

        assert_eq!(decision.decision, DecisionKind::RunNow);
        assert_eq!(decision.chosen_start_time, NOW);
    }

    #[test]
    fn test_missing_current_region_is_unknown() {
        let candidates = vec![outlook("eu-west", 200.0, &[200.0])];
        let err = optimizer()
            .optimize(&candidates, HOUR, NOW + 3 * HOUR, NOW, "us-east", false)
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownRegion(_)));
    }

    #[test]
    fn test_savings_percent_formula() {
        assert!((savings_percent(320.0, 180.0) - 43.75).abs() < 1e-9);
        assert_eq!(savings_percent(0.0, 100.0), 0.0);
        assert!(savings_percent(100.0, 120.0) < 0.0);
    }

    #[test]
    fn test_window_mean_requires_coverage() {
        let forecast: Vec<ForecastPoint> = (0..3)
            .map(|h| ForecastPoint {
                region: "r".to_string(),
                timestamp: NOW + h * HOUR,
                predicted_value: 100.0,
                confidence: 0.8,
            })
            .collect();

        // Window fully inside the curve.
        assert!(window_mean(&forecast, NOW, 2 * HOUR).is_some());
        // Window extending past the last point plus one step.
        assert!(window_mean(&forecast, NOW + 2 * HOUR, 3 * HOUR).is_none());
    }
}
