//! HTTP API: health probes, Prometheus metrics, ingestion and reports

use analyzer_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    ingest::{elements_from_pod, record_pod},
    observability::AnalyzerMetrics,
    AnalyzerError, DisplacementReport, OwnerKey, PlacementAnalyzer, PodElement, ReportFilter,
};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use k8s_openapi::api::core::v1::Pod;
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Body limit used unless configured otherwise
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<PlacementAnalyzer>,
    pub health_registry: HealthRegistry,
    pub metrics: AnalyzerMetrics,
    /// Applied when a report request does not name a minimum length
    pub default_min_chain_length: usize,
    /// Request body limit for ingestion and snapshot import
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(
        analyzer: Arc<PlacementAnalyzer>,
        health_registry: HealthRegistry,
        metrics: AnalyzerMetrics,
    ) -> Self {
        Self {
            analyzer,
            health_registry,
            metrics,
            default_min_chain_length: 1,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_default_min_chain_length(mut self, min_chain_length: usize) -> Self {
        self.default_min_chain_length = min_chain_length;
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// JSON error body with a status code
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<AnalyzerError> for ApiError {
    fn from(e: AnalyzerError) -> Self {
        let status = if e.is_input_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

/// Outcome of an ingestion request
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub accepted: usize,
    pub rejected: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DisplacementQuery {
    pub min_length: Option<usize>,
    pub namespace: Option<String>,
    pub owner: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub owners: usize,
    pub records: usize,
    pub generation: u64,
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_recompute: Option<analyzer_lib::RecomputeSummary>,
}

/// Health check: 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        })?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

async fn ingest_records(
    State(state): State<Arc<AppState>>,
    Json(records): Json<Vec<PodElement>>,
) -> impl IntoResponse {
    let mut response = IngestResponse {
        accepted: 0,
        rejected: 0,
        errors: Vec::new(),
    };

    for record in records {
        match state.analyzer.record(record) {
            Ok(()) => response.accepted += 1,
            Err(e) => {
                response.rejected += 1;
                response.errors.push(e.to_string());
            }
        }
    }
    state
        .metrics
        .set_owners_tracked(state.analyzer.store().owner_count());

    (StatusCode::ACCEPTED, Json(response))
}

async fn ingest_pods(
    State(state): State<Arc<AppState>>,
    Json(pods): Json<Vec<Pod>>,
) -> impl IntoResponse {
    let mut response = IngestResponse {
        accepted: 0,
        rejected: 0,
        errors: Vec::new(),
    };

    for pod in &pods {
        let derived = elements_from_pod(pod).len();
        let accepted = record_pod(state.analyzer.as_ref(), pod);
        response.accepted += accepted;
        response.rejected += derived - accepted;
    }
    state
        .metrics
        .set_owners_tracked(state.analyzer.store().owner_count());

    (StatusCode::ACCEPTED, Json(response))
}

async fn recompute(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let analyzer = Arc::clone(&state.analyzer);
    let summary = tokio::task::spawn_blocking(move || analyzer.recompute())
        .await
        .map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("Recompute task failed: {}", e),
        })?;

    if summary.conflicts > 0 {
        state
            .health_registry
            .set_degraded(
                components::ANALYZER,
                format!("{} conflicting observations", summary.conflicts),
            )
            .await;
    } else {
        state.health_registry.set_healthy(components::ANALYZER).await;
    }

    Ok(Json(summary))
}

async fn displacements(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DisplacementQuery>,
) -> Result<Json<DisplacementReport>, ApiError> {
    let mut filter = ReportFilter::default()
        .with_min_chain_length(query.min_length.unwrap_or(state.default_min_chain_length));
    if let Some(namespace) = query.namespace {
        filter = filter.with_namespace(namespace);
    }
    if let Some(owner) = query.owner {
        let owner: OwnerKey = owner
            .parse()
            .map_err(|e: AnalyzerError| ApiError::bad_request(e.to_string()))?;
        filter = filter.with_owner(owner);
    }

    Ok(Json(DisplacementReport::build(
        &state.analyzer.result(),
        &filter,
    )))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let store = state.analyzer.store();
    Json(StatusResponse {
        owners: store.owner_count(),
        records: store.record_count(),
        generation: store.generation(),
        stale: state.analyzer.is_stale(),
        last_recompute: state.analyzer.last_summary(),
    })
}

async fn export_snapshot(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.analyzer.export_snapshot()?;
    Ok((
        StatusCode::OK,
        [("content-type", "application/json")],
        bytes,
    ))
}

async fn import_snapshot(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = state.analyzer.import_snapshot(&body) {
        warn!(error = %e, "Rejected snapshot import");
        return Err(e.into());
    }
    state
        .metrics
        .set_owners_tracked(state.analyzer.store().owner_count());
    state.health_registry.set_healthy(components::STORE).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/records", post(ingest_records))
        .route("/api/v1/pods", post(ingest_pods))
        .route("/api/v1/recompute", post(recompute))
        .route("/api/v1/displacements", get(displacements))
        .route("/api/v1/status", get(status))
        .route("/api/v1/snapshot", get(export_snapshot).put(import_snapshot))
        .layer(body_limit)
        .with_state(state)
}

/// Start the API server; returns once `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
