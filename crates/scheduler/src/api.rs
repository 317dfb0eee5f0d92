//! HTTP API for scheduling decisions, health checks, and metrics

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use scheduler_lib::carbon;
use scheduler_lib::{
    ComponentStatus, DecisionEngine, EnergyMeasurement, EngineError, EngineMetrics,
    HealthRegistry, RankWeights,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DecisionEngine>,
    pub health_registry: HealthRegistry,
    pub metrics: EngineMetrics,
}

impl AppState {
    pub fn new(
        engine: Arc<DecisionEngine>,
        health_registry: HealthRegistry,
        metrics: EngineMetrics,
    ) -> Self {
        Self {
            engine,
            health_registry,
            metrics,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(err: EngineError) -> (StatusCode, Json<ErrorBody>) {
    let status = match &err {
        EngineError::InfeasibleSchedule(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::UnknownRegion(_) | EngineError::InvalidMeasurement(_) => {
            StatusCode::BAD_REQUEST
        }
        EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}

/// Request body for POST /api/v1/rank
#[derive(Debug, Deserialize)]
pub struct RankRequest {
    pub regions: Vec<String>,
    #[serde(default)]
    pub weights: Option<RankWeights>,
    #[serde(default = "default_schedule_weight")]
    pub schedule_weight: f64,
}

fn default_schedule_weight() -> f64 {
    1.0
}

/// Request body for POST /api/v1/schedule
#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    /// Candidate regions for relocation; the current region is always
    /// considered even when absent from this list.
    #[serde(default)]
    pub candidates: Vec<String>,
    pub duration_minutes: u32,
    /// Unix timestamp (seconds) the workload must finish by.
    pub deadline: i64,
    pub current_region: String,
    #[serde(default)]
    pub portable: bool,
}

/// Response body for POST /api/v1/measurements
#[derive(Debug, Serialize)]
pub struct MeasurementResponse {
    #[serde(flatten)]
    pub result: scheduler_lib::RegressionResult,
    pub equivalents: carbon::Equivalents,
}

async fn rank(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RankRequest>,
) -> impl IntoResponse {
    match state
        .engine
        .rank(&request.regions, request.weights, request.schedule_weight)
        .await
    {
        Ok(scores) => (StatusCode::OK, Json(scores)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn schedule(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScheduleRequest>,
) -> impl IntoResponse {
    match state
        .engine
        .optimize(
            &request.candidates,
            request.duration_minutes,
            request.deadline,
            &request.current_region,
            request.portable,
        )
        .await
    {
        Ok(decision) => (StatusCode::OK, Json(decision)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn submit_measurement(
    State(state): State<Arc<AppState>>,
    Json(measurement): Json<EnergyMeasurement>,
) -> impl IntoResponse {
    match state.engine.evaluate_measurement(&measurement).await {
        Ok(result) => {
            let equivalents = carbon::to_equivalents(result.co2_grams);
            (
                StatusCode::OK,
                Json(MeasurementResponse {
                    result,
                    equivalents,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

async fn get_baseline(
    State(state): State<Arc<AppState>>,
    Path((branch, workload)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.engine.baseline(&branch, &workload).await {
        Ok(Some(baseline)) => (StatusCode::OK, Json(baseline)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("no baseline for {branch}/{workload}"),
            }),
        )
            .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/rank", post(rank))
        .route("/api/v1/schedule", post(schedule))
        .route("/api/v1/measurements", post(submit_measurement))
        .route("/api/v1/baselines/:branch/:workload", get(get_baseline))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
