//! Integration tests for the dashboard API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use fleet_dashboard::api::{create_router, AppState, ACTOR_HEADER};
use fleet_lib::{
    analysis::SimulatedAnalyzer,
    fleet::{FleetState, FleetStore},
    health::{components, HealthRegistry},
    lifecycle::{ImageRegistry, LifecycleControllerBuilder, UserDirectory, VolumeRegistry},
    observability::FleetMetrics,
    reconcile::{ManualRefresh, OfflineSource},
    seed,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::RECONCILER).await;
    health_registry.register(components::SOURCE_ADAPTER).await;

    let store = FleetStore::new(FleetState::with_containers(seed::demo_containers()));
    let controller = LifecycleControllerBuilder::new()
        .store(store.clone())
        .users(UserDirectory::new(seed::demo_users()))
        .images(ImageRegistry::new(seed::demo_images()))
        .volumes(VolumeRegistry::new(seed::demo_volumes()))
        .delete_latency(Duration::from_millis(20))
        .user_delete_latency(Duration::from_millis(20))
        .build()
        .unwrap();
    let refresh = ManualRefresh::new(Arc::new(OfflineSource), store, Duration::from_millis(20));

    let state = Arc::new(AppState::new(
        health_registry,
        FleetMetrics::new(),
        controller,
        refresh,
        Arc::new(SimulatedAnalyzer),
    ));
    (create_router(state.clone()), state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(ACTOR_HEADER, user);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn container_id(state: &AppState, name: &str) -> String {
    state
        .store
        .read()
        .await
        .containers()
        .iter()
        .find(|c| c.name == name)
        .map(|c| c.id.clone())
        .unwrap()
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let (app, state) = setup_test_app().await;
    state
        .health_registry
        .set_degraded(components::SOURCE_ADAPTER, "simulating")
        .await;

    let (status, body) = send(&app, "GET", "/healthz", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert!(body["components"]["reconciler"].is_object());
}

#[tokio::test]
async fn test_readyz_tracks_ready_flag() {
    let (app, state) = setup_test_app().await;

    let (status, body) = send(&app, "GET", "/readyz", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);

    state.health_registry.set_ready(true).await;
    let (status, _) = send(&app, "GET", "/readyz", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup_test_app().await;
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/plain; charset=utf-8"
    );
}

#[tokio::test]
async fn test_view_requires_known_user() {
    let (app, _) = setup_test_app().await;

    let (status, body) = send(&app, "GET", "/api/v1/view", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let (status, _) = send(&app, "GET", "/api/v1/view", Some("mallory"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_view_filters_and_sorts() {
    let (app, _) = setup_test_app().await;

    let (status, body) = send(&app, "GET", "/api/v1/view", Some("viewer"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 8);
    assert_eq!(body["mode"], "simulated");
    assert_eq!(body["canManage"], false);
    assert_eq!(body["containers"][0]["name"], "api-gateway");

    let (_, body) = send(
        &app,
        "GET",
        "/api/v1/view?status=STOPPED&sort=cpu&direction=desc",
        Some("admin"),
        None,
    )
    .await;
    assert_eq!(body["containers"].as_array().unwrap().len(), 1);
    assert_eq!(body["canManage"], true);

    let (status, _) = send(&app, "GET", "/api/v1/view?sort=size", Some("admin"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_viewer_action_is_forbidden() {
    let (app, state) = setup_test_app().await;
    let id = container_id(&state, "redis-cache").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/containers/{}/actions", id),
        Some("viewer"),
        Some(json!({"action": "stop"})),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
    assert_eq!(state.store.container(&id).await.unwrap().status.to_string(), "RUNNING");

    let (_, view) = send(&app, "GET", "/api/v1/view", Some("viewer"), None).await;
    assert_eq!(view["notifications"][0]["severity"], "error");
    assert!(view["pending"].is_null());
}

#[tokio::test]
async fn test_stop_request_confirm_flow() {
    let (app, state) = setup_test_app().await;
    let id = container_id(&state, "redis-cache").await;

    let (status, pending) = send(
        &app,
        "POST",
        &format!("/api/v1/containers/{}/actions", id),
        Some("admin"),
        Some(json!({"action": "stop"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["phase"], "requested");
    assert_eq!(pending["targetName"], "redis-cache");

    let (_, view) = send(&app, "GET", "/api/v1/view", Some("admin"), None).await;
    assert_eq!(view["pending"]["action"], "stop");

    let (status, receipt) = send(&app, "POST", "/api/v1/actions/confirm", Some("admin"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["message"], "Container redis-cache stopped successfully");

    let (_, container) = send(
        &app,
        "GET",
        &format!("/api/v1/containers/{}", id),
        Some("viewer"),
        None,
    )
    .await;
    assert_eq!(container["status"], "STOPPED");
    assert_eq!(container["health"], "none");

    let (_, audit) = send(&app, "GET", "/api/v1/audit", Some("viewer"), None).await;
    assert!(audit[0].as_str().unwrap().starts_with("[audit] STOP initiated by 'admin'"));
}

#[tokio::test]
async fn test_viewer_cannot_cancel_admin_action() {
    let (app, state) = setup_test_app().await;
    let id = container_id(&state, "redis-cache").await;

    send(
        &app,
        "POST",
        &format!("/api/v1/containers/{}/actions", id),
        Some("admin"),
        Some(json!({"action": "stop"})),
    )
    .await;

    let (status, body) = send(&app, "POST", "/api/v1/actions/cancel", Some("viewer"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");

    let (_, view) = send(&app, "GET", "/api/v1/view", Some("admin"), None).await;
    assert_eq!(view["pending"]["phase"], "requested");
}

#[tokio::test]
async fn test_confirm_without_pending_is_conflict() {
    let (app, _) = setup_test_app().await;
    let (status, body) = send(&app, "POST", "/api/v1/actions/confirm", Some("admin"), None).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "no_pending_action");
}

#[tokio::test]
async fn test_delete_clears_detail_view() {
    let (app, state) = setup_test_app().await;
    let id = container_id(&state, "grafana-ui").await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/containers/{}/view", id),
        Some("admin"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    send(
        &app,
        "POST",
        &format!("/api/v1/containers/{}/actions", id),
        Some("admin"),
        Some(json!({"action": "delete"})),
    )
    .await;
    let (status, _) = send(&app, "POST", "/api/v1/actions/confirm", Some("admin"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, view) = send(&app, "GET", "/api/v1/view", Some("admin"), None).await;
    assert!(view["detail"].is_null());
    assert_eq!(view["total"], 7);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/v1/containers/{}", id),
        Some("admin"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_self_deletion_is_conflict() {
    let (app, _) = setup_test_app().await;
    let (status, body) = send(&app, "POST", "/api/v1/users/1/delete", Some("admin"), None).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "self_deletion_forbidden");
}

#[tokio::test]
async fn test_login() {
    let (app, _) = setup_test_app().await;

    let (status, user) = send(
        &app,
        "POST",
        "/api/v1/login",
        None,
        Some(json!({"username": "viewer", "password": "view"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["role"], "viewer");
    assert!(user.get("password").is_none());

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/login",
        None,
        Some(json!({"username": "viewer", "password": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deploy_validation_and_success() {
    let (app, _) = setup_test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/containers",
        Some("admin"),
        Some(json!({"name": "bad name", "image": "nginx"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "validation_error");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/containers",
        Some("admin"),
        Some(json!({"name": "cache-2", "image": "memcached:1.6", "memoryLimit": 256.0})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "RUNNING");
    assert_eq!(body["memoryLimit"], 256.0);

    let (_, images) = send(&app, "GET", "/api/v1/images", Some("admin"), None).await;
    assert!(images
        .as_array()
        .unwrap()
        .iter()
        .any(|i| i["repository"] == "memcached" && i["tag"] == "1.6"));
}

#[tokio::test]
async fn test_pull_and_delete_volume() {
    let (app, _) = setup_test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/images/pull",
        Some("admin"),
        Some(json!({"reference": "alpine:3.19"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pulled"], true);

    let (status, _) = send(&app, "DELETE", "/api/v1/volumes/pg_data", Some("viewer"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", "/api/v1/volumes/pg_data", Some("admin"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_and_analysis() {
    let (app, state) = setup_test_app().await;
    let id = container_id(&state, "worker-queue").await;

    let (status, body) = send(&app, "POST", "/api/v1/refresh", Some("viewer"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "simulated");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/containers/{}/analysis", id),
        Some("viewer"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestedFix"], "docker restart worker-queue");
}
