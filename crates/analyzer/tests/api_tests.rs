//! Integration tests for the analyzer API endpoints

use analyzer_lib::{
    health::{components, HealthRegistry},
    observability::{AnalyzerMetrics, StructuredLogger},
    PlacementAnalyzer, PodElement,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use placement_analyzer::api::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::STORE).await;
    health_registry.register(components::ANALYZER).await;

    let analyzer = Arc::new(PlacementAnalyzer::new(StructuredLogger::new("test-cluster")));
    let state = Arc::new(AppState::new(analyzer, health_registry, AnalyzerMetrics::new()));
    let router = create_router(state.clone());

    (router, state)
}

fn record(owner: &str, pod: &str, created: &str, deleted: Option<&str>) -> Value {
    json!({
        "namespace": "shop",
        "kind": "ReplicaSet",
        "kindName": owner,
        "podName": pod,
        "node": "worker-1",
        "creationTimestamp": created,
        "deletionTimestamp": deleted,
    })
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;

    let (status, body) = send(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);

    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app().await;
    state
        .health_registry
        .set_unhealthy(components::STORE, "Snapshot unreadable")
        .await;

    let (status, body) = send(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_follows_registry() {
    let (app, state) = setup_test_app().await;

    let (status, _) = send(&app, get("/readyz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    state.health_registry.set_ready(true).await;
    let (status, body) = send(&app, get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);

    let readiness: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _state) = setup_test_app().await;

    let (status, body) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("placement_analyzer_records_ingested_total"));
}

#[tokio::test]
async fn test_ingest_recompute_and_report() {
    let (app, _state) = setup_test_app().await;

    let records = json!([
        record("web", "web-1", "2024-05-01T10:00:00Z", None),
        record("web", "web-1", "2024-05-01T10:00:00Z", Some("2024-05-01T11:00:00Z")),
        record("web", "web-2", "2024-05-01T11:00:05Z", Some("2024-05-01T12:00:00Z")),
        record("web", "web-3", "2024-05-01T12:00:01Z", None),
        record("api", "api-1", "2024-05-01T10:00:00Z", None),
    ]);
    let (status, body) = send(&app, json_request("POST", "/api/v1/records", &records)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let ingest: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(ingest["accepted"], 5);
    assert_eq!(ingest["rejected"], 0);

    // Nothing is computed until asked
    let (_, body) = send(&app, get("/api/v1/displacements")).await;
    let report: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(report["owners"].as_array().unwrap().len(), 0);

    let (status, body) = send(&app, post("/api/v1/recompute")).await;
    assert_eq!(status, StatusCode::OK);
    let summary: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(summary["owners"], 2);
    assert_eq!(summary["edges"], 2);
    assert_eq!(summary["chains"], 1);

    let (status, body) = send(&app, get("/api/v1/displacements")).await;
    assert_eq!(status, StatusCode::OK);
    let report: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(report["owners"][0]["owner"], "shop/ReplicaSet/web");
    assert_eq!(report["owners"][0]["chains"][0]["length"], 2);
    assert_eq!(report["owners"][0]["chains"][0]["hops"][2]["pod_name"], "web-3");

    let (_, body) = send(&app, get("/api/v1/displacements?min_length=3")).await;
    let report: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(report["total_chains"], 0);
}

#[tokio::test]
async fn test_ingest_rejects_invalid_records() {
    let (app, _state) = setup_test_app().await;

    let records = json!([
        record("web", "", "2024-05-01T10:00:00Z", None),
        record("web", "web-1", "2024-05-01T10:00:00Z", Some("2024-05-01T09:00:00Z")),
        record("web", "web-2", "2024-05-01T10:00:00Z", None),
    ]);
    let (status, body) = send(&app, json_request("POST", "/api/v1/records", &records)).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let ingest: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(ingest["accepted"], 1);
    assert_eq!(ingest["rejected"], 2);
    assert_eq!(ingest["errors"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_ingest_pod_objects() {
    let (app, state) = setup_test_app().await;

    let pods = json!([{
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": "web-1",
            "namespace": "shop",
            "creationTimestamp": "2024-05-01T10:00:00Z",
            "ownerReferences": [{
                "apiVersion": "apps/v1",
                "kind": "ReplicaSet",
                "name": "web",
                "uid": "8d3c2f0e"
            }]
        },
        "spec": { "nodeName": "worker-2", "containers": [] }
    }]);
    let (status, body) = send(&app, json_request("POST", "/api/v1/pods", &pods)).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let ingest: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(ingest["accepted"], 1);
    assert_eq!(state.analyzer.store().record_count(), 1);
}

#[tokio::test]
async fn test_bad_owner_filter() {
    let (app, _state) = setup_test_app().await;

    let (status, body) = send(&app, get("/api/v1/displacements?owner=not-a-key")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert!(error["error"].as_str().unwrap().contains("not-a-key"));
}

#[tokio::test]
async fn test_snapshot_export_and_import() {
    let (app, state) = setup_test_app().await;

    let records = json!([
        record("web", "web-1", "2024-05-01T10:00:00Z", Some("2024-05-01T11:00:00Z")),
        record("web", "web-2", "2024-05-01T11:00:05Z", None),
    ]);
    send(&app, json_request("POST", "/api/v1/records", &records)).await;

    let (status, snapshot) = send(&app, get("/api/v1/snapshot")).await;
    assert_eq!(status, StatusCode::OK);
    let decoded: Value = serde_json::from_slice(&snapshot).unwrap();
    assert_eq!(decoded["shop/ReplicaSet/web"].as_array().unwrap().len(), 2);

    let (other_app, other_state) = setup_test_app().await;
    let request = Request::builder()
        .method("PUT")
        .uri("/api/v1/snapshot")
        .header("content-type", "application/json")
        .body(Body::from(snapshot))
        .unwrap();
    let (status, _) = send(&other_app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(
        other_state.analyzer.store().record_count(),
        state.analyzer.store().record_count()
    );
}

#[tokio::test]
async fn test_malformed_snapshot_is_rejected() {
    let (app, state) = setup_test_app().await;
    let records = json!([record("web", "web-1", "2024-05-01T10:00:00Z", None)]);
    send(&app, json_request("POST", "/api/v1/records", &records)).await;

    let request = Request::builder()
        .method("PUT")
        .uri("/api/v1/snapshot")
        .body(Body::from("{\"shop/ReplicaSet/web\": [{\"podName\": \"x\"}]}"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let error: Value = serde_json::from_slice(&body).unwrap();
    assert!(error["error"].as_str().unwrap().contains("decode"));
    assert_eq!(state.analyzer.store().record_count(), 1);
}

#[tokio::test]
async fn test_status_reports_staleness() {
    let (app, _state) = setup_test_app().await;
    let records = json!([record("web", "web-1", "2024-05-01T10:00:00Z", None)]);
    send(&app, json_request("POST", "/api/v1/records", &records)).await;

    let (_, body) = send(&app, get("/api/v1/status")).await;
    let status: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status["records"], 1);
    assert_eq!(status["stale"], true);

    send(&app, post("/api/v1/recompute")).await;
    let (_, body) = send(&app, get("/api/v1/status")).await;
    let status: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status["stale"], false);
    assert_eq!(status["last_recompute"]["records"], 1);
}

#[tokio::test]
async fn test_large_snapshot_round_trip() {
    let (app, state) = setup_test_app().await;
    for i in 0..20_000 {
        let element: PodElement = serde_json::from_value(record(
            "web",
            &format!("web-{}", i),
            "2024-05-01T10:00:00Z",
            None,
        ))
        .unwrap();
        state.analyzer.record(element).unwrap();
    }

    let (status, snapshot) = send(&app, get("/api/v1/snapshot")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(snapshot.len() > 2 * 1024 * 1024, "snapshot is {} bytes", snapshot.len());

    let (other_app, other_state) = setup_test_app().await;
    let request = Request::builder()
        .method("PUT")
        .uri("/api/v1/snapshot")
        .header("content-type", "application/json")
        .body(Body::from(snapshot))
        .unwrap();
    let (status, _) = send(&other_app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(other_state.analyzer.store().record_count(), 20_000);
}

#[tokio::test]
async fn test_body_over_configured_limit_is_rejected() {
    let health_registry = HealthRegistry::new();
    let analyzer = Arc::new(PlacementAnalyzer::new(StructuredLogger::new("test-cluster")));
    let state = Arc::new(
        AppState::new(analyzer, health_registry, AnalyzerMetrics::new()).with_max_body_bytes(1024),
    );
    let app = create_router(state.clone());

    let records: Vec<Value> = (0..50)
        .map(|i| record("web", &format!("web-{}", i), "2024-05-01T10:00:00Z", None))
        .collect();
    let (status, _) = send(&app, json_request("POST", "/api/v1/records", &json!(records))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(state.analyzer.store().record_count(), 0);
}

#[tokio::test]
async fn test_report_counts_unmatched_deletions_without_chains() {
    let (app, _state) = setup_test_app().await;

    let records = json!([
        record("etl", "etl-1", "2024-05-01T10:00:00Z", Some("2024-05-01T11:00:00Z")),
        record("etl", "etl-2", "2024-05-01T10:30:00Z", None),
    ]);
    send(&app, json_request("POST", "/api/v1/records", &records)).await;
    send(&app, post("/api/v1/recompute")).await;

    let (_, body) = send(&app, get("/api/v1/displacements")).await;
    let report: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(report["total_chains"], 0);
    assert_eq!(report["owners"].as_array().unwrap().len(), 0);
    assert_eq!(report["total_unmatched_deletions"], 1);
}
