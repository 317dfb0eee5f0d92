//! Weighted multi-criteria region ranking
//!
//! Scores candidate regions from their resolved current intensity,
//! forecasted trend, and efficiency metadata. Pure computation over
//! already-resolved data; never mutates profiles, never performs I/O.

use crate::carbon::{to_co2_grams, JOULES_PER_KWH};
use crate::models::{
    ForecastPoint, IntensityReading, RankWeights, RegionProfile, RegionScore, ScoreComponents,
};

/// Fixed unit workload used for footprint proxies: one kWh of compute.
/// With this constant the cfp components are numerically gCO2 per unit
/// workload, directly comparable across regions.
pub const UNIT_WORKLOAD_ENERGY_J: f64 = JOULES_PER_KWH;

/// One region's inputs to the ranking pass.
#[derive(Debug, Clone)]
pub struct RankCandidate {
    pub profile: RegionProfile,
    pub current: IntensityReading,
    pub forecast: Vec<ForecastPoint>,
}

/// Scores and orders regions; lower rank value is better.
#[derive(Debug, Clone, Default)]
pub struct RegionRanker;

impl RegionRanker {
    pub fn new() -> Self {
        Self
    }

    /// Rank candidates under the given weights.
    ///
    /// The output is a total order: sorted ascending by `rank_value`
    /// (index 0 is the top pick) with ties broken by region code, so
    /// reordering the input never changes the output.
    pub fn rank(
        &self,
        candidates: &[RankCandidate],
        weights: &RankWeights,
        schedule_weight: f64,
    ) -> Vec<RegionScore> {
        let mut scores: Vec<RegionScore> = candidates
            .iter()
            .map(|c| self.score(c, weights, schedule_weight))
            .collect();

        scores.sort_by(|a, b| {
            a.rank_value
                .partial_cmp(&b.rank_value)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.region.cmp(&b.region))
        });
        scores
    }

    /// Score a single candidate.
    fn score(
        &self,
        candidate: &RankCandidate,
        weights: &RankWeights,
        schedule_weight: f64,
    ) -> RegionScore {
        let cfp = to_co2_grams(UNIT_WORKLOAD_ENERGY_J, candidate.current.value_g_per_kwh);
        let forecasted_cfp = to_co2_grams(
            UNIT_WORKLOAD_ENERGY_J,
            mean_forecast(&candidate.forecast)
                .unwrap_or(candidate.current.value_g_per_kwh),
        );
        let efficiency_ratio = if candidate.profile.pue > 0.0 {
            candidate.profile.renewable_pct / candidate.profile.pue
        } else {
            0.0
        };

        let rank_value = weights.w1 * cfp + weights.w2 * forecasted_cfp
            - weights.w3 * efficiency_ratio
            + weights.w4 * schedule_weight;

        RegionScore {
            region: candidate.profile.code.clone(),
            rank_value,
            components: ScoreComponents {
                cfp,
                forecasted_cfp,
                efficiency_ratio,
                schedule_weight,
            },
        }
    }
}

/// Mean predicted value of a forecast series; `None` when empty.
fn mean_forecast(points: &[ForecastPoint]) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    Some(points.iter().map(|p| p.predicted_value).sum::<f64>() / points.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(code: &str, intensity: f64, renewable: f64, pue: f64) -> RankCandidate {
        let profile = RegionProfile {
            region: code.to_string(),
            code: code.to_string(),
            location: "test".to_string(),
            pue,
            renewable_pct: renewable,
            static_intensity_fallback: intensity,
        };
        RankCandidate {
            current: IntensityReading {
                region: code.to_string(),
                value_g_per_kwh: intensity,
                confidence: 0.9,
                source_id: "test".to_string(),
                observed_at: 1_700_000_000,
                is_realtime: true,
            },
            forecast: (0..4)
                .map(|h| ForecastPoint {
                    region: code.to_string(),
                    timestamp: 1_700_000_000 + h * 3600,
                    predicted_value: intensity,
                    confidence: 0.8,
                })
                .collect(),
            profile,
        }
    }

    #[test]
    fn test_lower_intensity_ranks_first() {
        let ranker = RegionRanker::new();
        let scores = ranker.rank(
            &[
                candidate("dirty", 600.0, 0.3, 1.2),
                candidate("clean", 50.0, 0.3, 1.2),
            ],
            &RankWeights::default(),
            1.0,
        );

        assert_eq!(scores[0].region, "clean");
        assert!(scores[0].rank_value < scores[1].rank_value);
    }

    #[test]
    fn test_efficiency_is_subtracted() {
        let ranker = RegionRanker::new();
        // Same intensity; the greener, denser facility must win.
        let scores = ranker.rank(
            &[
                candidate("wasteful", 200.0, 0.1, 1.6),
                candidate("efficient", 200.0, 0.9, 1.1),
            ],
            &RankWeights::default(),
            1.0,
        );

        assert_eq!(scores[0].region, "efficient");
    }

    #[test]
    fn test_reordering_inputs_is_deterministic() {
        let ranker = RegionRanker::new();
        let a = candidate("aa", 300.0, 0.4, 1.2);
        let b = candidate("bb", 120.0, 0.6, 1.1);
        let c = candidate("cc", 480.0, 0.2, 1.4);

        let forward = ranker.rank(
            &[a.clone(), b.clone(), c.clone()],
            &RankWeights::default(),
            1.0,
        );
        let backward = ranker.rank(&[c, b, a], &RankWeights::default(), 1.0);

        let forward_regions: Vec<_> = forward.iter().map(|s| s.region.clone()).collect();
        let backward_regions: Vec<_> = backward.iter().map(|s| s.region.clone()).collect();
        assert_eq!(forward_regions, backward_regions);
    }

    #[test]
    fn test_exact_ties_break_by_region_code() {
        let ranker = RegionRanker::new();
        let scores = ranker.rank(
            &[
                candidate("zeta", 200.0, 0.5, 1.2),
                candidate("alpha", 200.0, 0.5, 1.2),
            ],
            &RankWeights::default(),
            1.0,
        );

        assert_eq!(scores[0].region, "alpha");
        assert_eq!(scores[1].region, "zeta");
    }

    #[test]
    fn test_empty_forecast_falls_back_to_current() {
        let ranker = RegionRanker::new();
        let mut c = candidate("no-forecast", 240.0, 0.5, 1.2);
        c.forecast.clear();

        let scores = ranker.rank(&[c], &RankWeights::default(), 1.0);
        assert_eq!(
            scores[0].components.forecasted_cfp,
            scores[0].components.cfp
        );
    }

    #[test]
    fn test_unit_workload_makes_cfp_equal_intensity() {
        let ranker = RegionRanker::new();
        let scores = ranker.rank(&[candidate("r", 317.0, 0.5, 1.2)], &RankWeights::default(), 1.0);
        assert!((scores[0].components.cfp - 317.0).abs() < 1e-9);
    }

    #[test]
    fn test_scores_are_finite() {
        let ranker = RegionRanker::new();
        let scores = ranker.rank(
            &[candidate("r", 0.0, 1.0, 1.0), candidate("s", 900.0, 0.0, 2.0)],
            &RankWeights::default(),
            0.0,
        );
        assert!(scores.iter().all(|s| s.rank_value.is_finite()));
    }

    #[test]
    fn test_schedule_weight_shifts_all_scores_equally() {
        let ranker = RegionRanker::new();
        let relaxed = ranker.rank(
            &[candidate("r", 200.0, 0.5, 1.2)],
            &RankWeights::default(),
            1.0,
        );
        let urgent = ranker.rank(
            &[candidate("r", 200.0, 0.5, 1.2)],
            &RankWeights::default(),
            5.0,
        );

        let w4 = RankWeights::default().w4;
        let expected = w4 * (5.0 - 1.0);
        assert!((urgent[0].rank_value - relaxed[0].rank_value - expected).abs() < 1e-9);
    }
}
