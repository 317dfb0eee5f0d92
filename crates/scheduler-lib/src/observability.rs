//! Observability infrastructure for the decision engine
//!
//! Prometheus metrics covering resolution latency and fallbacks,
//! decision outcomes, and regression evaluations. Structured logging is
//! handled by `tracing` at the call sites; the service binary installs
//! the JSON subscriber.

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;

/// Histogram buckets for resolution and decision latency (seconds).
/// Resolution includes network sources, so the range runs to 10s.
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once per process).
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    resolve_latency_seconds: Histogram,
    decision_latency_seconds: Histogram,
    decisions_total: IntCounterVec,
    source_failures_total: IntCounterVec,
    fallback_resolutions_total: IntCounter,
    measurements_evaluated_total: IntCounter,
    measurements_rejected_total: IntCounter,
    regressions_detected_total: IntCounterVec,
    regions_configured: IntGauge,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            resolve_latency_seconds: register_histogram!(
                "carbon_scheduler_resolve_latency_seconds",
                "Time spent resolving a region's carbon intensity",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register resolve_latency_seconds"),

            decision_latency_seconds: register_histogram!(
                "carbon_scheduler_decision_latency_seconds",
                "End-to-end time for one scheduling decision",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register decision_latency_seconds"),

            decisions_total: register_int_counter_vec!(
                "carbon_scheduler_decisions_total",
                "Scheduling decisions by outcome",
                &["kind"]
            )
            .expect("Failed to register decisions_total"),

            source_failures_total: register_int_counter_vec!(
                "carbon_scheduler_source_failures_total",
                "Intensity source failures and timeouts by source",
                &["source"]
            )
            .expect("Failed to register source_failures_total"),

            fallback_resolutions_total: register_int_counter!(
                "carbon_scheduler_fallback_resolutions_total",
                "Resolutions that degraded to the static fallback value"
            )
            .expect("Failed to register fallback_resolutions_total"),

            measurements_evaluated_total: register_int_counter!(
                "carbon_scheduler_measurements_evaluated_total",
                "Energy measurements evaluated against a baseline"
            )
            .expect("Failed to register measurements_evaluated_total"),

            measurements_rejected_total: register_int_counter!(
                "carbon_scheduler_measurements_rejected_total",
                "Energy measurements rejected by structural validation"
            )
            .expect("Failed to register measurements_rejected_total"),

            regressions_detected_total: register_int_counter_vec!(
                "carbon_scheduler_regressions_detected_total",
                "Regressions detected by severity band",
                &["severity"]
            )
            .expect("Failed to register regressions_detected_total"),

            regions_configured: register_int_gauge!(
                "carbon_scheduler_regions_configured",
                "Regions present in the profile registry"
            )
            .expect("Failed to register regions_configured"),
        }
    }
}

/// Cloneable handle to the engine's Prometheus metrics.
///
/// All clones share the single globally registered instance.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    /// Create a handle, initializing the global metrics on first use.
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_resolve_latency(&self, duration_secs: f64) {
        self.inner().resolve_latency_seconds.observe(duration_secs);
    }

    pub fn observe_decision_latency(&self, duration_secs: f64) {
        self.inner().decision_latency_seconds.observe(duration_secs);
    }

    pub fn inc_decisions(&self, kind: &str) {
        self.inner().decisions_total.with_label_values(&[kind]).inc();
    }

    pub fn inc_source_failures(&self, source: &str) {
        self.inner()
            .source_failures_total
            .with_label_values(&[source])
            .inc();
    }

    pub fn inc_fallback_resolutions(&self) {
        self.inner().fallback_resolutions_total.inc();
    }

    pub fn inc_measurements_evaluated(&self) {
        self.inner().measurements_evaluated_total.inc();
    }

    pub fn inc_measurements_rejected(&self) {
        self.inner().measurements_rejected_total.inc();
    }

    pub fn inc_regressions(&self, severity: &str) {
        self.inner()
            .regressions_detected_total
            .with_label_values(&[severity])
            .inc();
    }

    pub fn set_regions_configured(&self, count: i64) {
        self.inner().regions_configured.set(count);
    }
}
