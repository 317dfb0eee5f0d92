//! Carbon-aware scheduler service
//!
//! Serves the decision API (rank, schedule, measurements) plus health
//! and metrics endpoints. Intensity source adapters are wired here at
//! startup; a build with none registered degrades every resolution to
//! the region table's static fallback, which is a valid, explicitly
//! flagged mode of operation.

use anyhow::Result;
use scheduler_lib::health::components;
use scheduler_lib::regression::{MemoryBaselineStore, RegressionDetector};
use scheduler_lib::source::{IntensityResolver, IntensitySource};
use scheduler_lib::{DecisionEngine, EngineMetrics, HealthRegistry, WindowOptimizer};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting carbon-schedulerd");

    let config = config::SchedulerConfig::load()?;
    let registry = Arc::new(config.region_registry()?);
    info!(regions = registry.len(), port = config.api_port, "Scheduler configured");

    // Intensity source adapters register here; deployments plug their
    // providers in and the resolver orders them by per-region priority.
    let sources: Vec<Arc<dyn IntensitySource>> = Vec::new();
    let degraded = sources.is_empty();

    let resolver = IntensityResolver::new(sources, registry, config.resolver_config());
    let detector = RegressionDetector::new(
        Arc::new(MemoryBaselineStore::new()),
        config.detector_config(),
    );
    let engine = Arc::new(DecisionEngine::new(
        resolver,
        WindowOptimizer::new(config.optimizer_config()),
        detector,
        config.rank_weights(),
    ));

    let health_registry = HealthRegistry::new();
    health_registry.register(components::RESOLVER).await;
    health_registry.register(components::SOURCES).await;
    health_registry.register(components::DETECTOR).await;
    health_registry.register(components::BASELINE_STORE).await;
    if degraded {
        health_registry
            .set_degraded(components::SOURCES, "no sources registered, using static fallbacks")
            .await;
    }

    let metrics = EngineMetrics::new();
    let app_state = Arc::new(api::AppState::new(
        engine,
        health_registry.clone(),
        metrics,
    ));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    api_handle.abort();

    Ok(())
}
