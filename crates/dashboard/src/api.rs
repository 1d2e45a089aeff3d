//! HTTP API: health, metrics, the dashboard view and every operator action

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use fleet_lib::{
    analysis::{AnalysisResult, LogAnalyzer},
    health::{ComponentStatus, HealthRegistry},
    lifecycle::{
        ActionKind, ActionReceipt, ContainerUpdate, DeploySpec, LifecycleController, NewUser,
        PendingAction, PullOutcome, UserUpdate,
    },
    observability::FleetMetrics,
    reconcile::ManualRefresh,
    view::{FleetView, Notification, SortDirection, SortField, ViewQuery},
    Actor, ConnectionMode, Container, DockerImage, DockerVolume, FleetError, FleetStore, User,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Header carrying the acting user's name
pub const ACTOR_HEADER: &str = "x-fleet-user";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: FleetMetrics,
    pub store: FleetStore,
    pub controller: LifecycleController,
    pub refresh: ManualRefresh,
    pub analyzer: Arc<dyn LogAnalyzer>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: FleetMetrics,
        controller: LifecycleController,
        refresh: ManualRefresh,
        analyzer: Arc<dyn LogAnalyzer>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            store: controller.store().clone(),
            controller,
            refresh,
            analyzer,
        }
    }
}

// ---- errors ----------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    Fleet(FleetError),
    Unauthorized(String),
    BadRequest(String),
    Internal(String),
}

impl From<FleetError> for ApiError {
    fn from(err: FleetError) -> Self {
        ApiError::Fleet(err)
    }
}

fn status_for(err: &FleetError) -> StatusCode {
    match err {
        FleetError::Forbidden { .. } => StatusCode::FORBIDDEN,
        FleetError::NotFound { .. } => StatusCode::NOT_FOUND,
        FleetError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FleetError::SelfDeletionForbidden
        | FleetError::NoPendingAction
        | FleetError::ActionInFlight { .. } => StatusCode::CONFLICT,
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Fleet(err) => (status_for(&err), err.code(), err.to_string()),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, "unauthorized", message),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };

        let body = ErrorBody {
            error: message,
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ---- actor extraction ------------------------------------------------------

/// The user named by the `x-fleet-user` header
pub struct CurrentActor(pub Actor);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let username = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", ACTOR_HEADER)))?;

        let user = state
            .controller
            .users()
            .find_by_username(username)
            .await
            .ok_or_else(|| ApiError::Unauthorized(format!("unknown user '{}'", username)))?;

        Ok(CurrentActor(Actor::from(&user)))
    }
}

// ---- health and metrics ----------------------------------------------------

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Simulated mode is still serving
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
async fn metrics() -> ApiResult<impl IntoResponse> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        ApiError::Internal("failed to encode metrics".to_string())
    })?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

// ---- fleet view ------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ViewParams {
    pub search: Option<String>,
    pub status: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

impl ViewParams {
    fn into_query(self) -> ApiResult<ViewQuery> {
        let status = match self.status.as_deref() {
            None | Some("") => None,
            Some(s) if s.eq_ignore_ascii_case("all") => None,
            Some(s) => Some(s.parse().map_err(ApiError::BadRequest)?),
        };
        let sort = match self.sort.as_deref() {
            None | Some("") => SortField::default(),
            Some(s) => s.parse().map_err(ApiError::BadRequest)?,
        };
        let direction = match self.direction.as_deref() {
            None | Some("") => SortDirection::default(),
            Some(s) => s.parse().map_err(ApiError::BadRequest)?,
        };

        Ok(ViewQuery {
            search: self.search.unwrap_or_default(),
            status,
            sort,
            direction,
        })
    }
}

async fn get_view(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Query(params): Query<ViewParams>,
) -> ApiResult<Json<FleetView>> {
    let query = params.into_query()?;
    let pending = state.controller.pending().await;
    let notifications = state.controller.notifications().active();

    let fleet = state.store.read().await;
    Ok(Json(FleetView::build(
        &fleet,
        &query,
        actor.role,
        pending,
        notifications,
    )))
}

async fn get_container(
    State(state): State<Arc<AppState>>,
    CurrentActor(_): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<Container>> {
    state
        .store
        .container(&id)
        .await
        .map(Json)
        .ok_or_else(|| FleetError::container_not_found(id).into())
}

async fn open_detail(
    State(state): State<Arc<AppState>>,
    CurrentActor(_): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<Container>> {
    if !state.store.open_detail(&id).await {
        return Err(FleetError::container_not_found(id).into());
    }
    state
        .store
        .container(&id)
        .await
        .map(Json)
        .ok_or_else(|| FleetError::container_not_found(id).into())
}

async fn close_detail(
    State(state): State<Arc<AppState>>,
    CurrentActor(_): CurrentActor,
) -> StatusCode {
    state.store.close_detail().await;
    StatusCode::NO_CONTENT
}

// ---- container mutations ---------------------------------------------------

async fn deploy_container(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Json(spec): Json<DeploySpec>,
) -> ApiResult<(StatusCode, Json<Container>)> {
    let container = state.controller.deploy(&actor, spec).await?;
    Ok((StatusCode::CREATED, Json(container)))
}

async fn update_container(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Json(update): Json<ContainerUpdate>,
) -> ApiResult<Json<Container>> {
    let container = state.controller.update_container(&actor, &id, update).await?;
    Ok(Json(container))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionBody {
    pub action: ActionKind,
}

async fn request_action(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Json(body): Json<ActionBody>,
) -> ApiResult<Json<PendingAction>> {
    let pending = state
        .controller
        .request_action(&actor, &id, body.action)
        .await?;
    Ok(Json(pending))
}

async fn confirm_action(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Json<ActionReceipt>> {
    Ok(Json(state.controller.confirm(&actor).await?))
}

async fn cancel_action(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Json<PendingAction>> {
    Ok(Json(state.controller.cancel(&actor).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub mode: ConnectionMode,
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> Json<RefreshResponse> {
    let outcome = state.refresh.run().await;
    state
        .controller
        .notifications()
        .success("Dashboard data refreshed");
    info!(actor = %actor.username, outcome = ?outcome, "Manual refresh");

    Json(RefreshResponse {
        mode: outcome.mode(),
    })
}

async fn analyze_container(
    State(state): State<Arc<AppState>>,
    CurrentActor(_): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<AnalysisResult>> {
    let container = state
        .store
        .container(&id)
        .await
        .ok_or_else(|| FleetError::container_not_found(&id))?;

    Ok(Json(
        state
            .analyzer
            .analyze(&container.name, &container.logs)
            .await,
    ))
}

// ---- users -----------------------------------------------------------------

async fn list_users(
    State(state): State<Arc<AppState>>,
    CurrentActor(_): CurrentActor,
) -> Json<Vec<User>> {
    Json(state.controller.users().list().await)
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Json(new_user): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.controller.add_user(&actor, new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Json(update): Json<UserUpdate>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.controller.update_user(&actor, &id, update).await?))
}

async fn request_user_deletion(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<PendingAction>> {
    Ok(Json(
        state.controller.request_user_deletion(&actor, &id).await?,
    ))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<User>> {
    state
        .controller
        .users()
        .authenticate(&request.username, &request.password)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::Unauthorized("Invalid username or password".to_string()))
}

// ---- images and volumes ----------------------------------------------------

async fn list_images(
    State(state): State<Arc<AppState>>,
    CurrentActor(_): CurrentActor,
) -> Json<Vec<DockerImage>> {
    Json(state.controller.images().list().await)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PullRequest {
    pub reference: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PullResponse {
    pub pulled: bool,
    pub image: DockerImage,
}

async fn pull_image(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<PullRequest>,
) -> ApiResult<Json<PullResponse>> {
    let outcome = state
        .controller
        .pull_image(&actor, &request.reference)
        .await?;
    let pulled = matches!(outcome, PullOutcome::Pulled(_));

    Ok(Json(PullResponse {
        pulled,
        image: outcome.image().clone(),
    }))
}

async fn delete_image(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<DockerImage>> {
    Ok(Json(state.controller.delete_image(&actor, &id).await?))
}

async fn list_volumes(
    State(state): State<Arc<AppState>>,
    CurrentActor(_): CurrentActor,
) -> Json<Vec<DockerVolume>> {
    Json(state.controller.volumes().list().await)
}

async fn delete_volume(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(name): Path<String>,
) -> ApiResult<Json<DockerVolume>> {
    Ok(Json(state.controller.delete_volume(&actor, &name).await?))
}

// ---- notifications and audit -----------------------------------------------

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    CurrentActor(_): CurrentActor,
) -> Json<Vec<Notification>> {
    Json(state.controller.notifications().active())
}

async fn dismiss_notification(
    State(state): State<Arc<AppState>>,
    CurrentActor(_): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.controller.notifications().dismiss(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(FleetError::NotFound {
            kind: "notification",
            id,
        }
        .into())
    }
}

async fn audit_trail(
    State(state): State<Arc<AppState>>,
    CurrentActor(_): CurrentActor,
) -> Json<Vec<String>> {
    Json(state.controller.audit_trail().await)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/view", get(get_view))
        .route("/api/v1/view/detail", delete(close_detail))
        .route("/api/v1/containers", post(deploy_container))
        .route(
            "/api/v1/containers/:id",
            get(get_container).patch(update_container),
        )
        .route("/api/v1/containers/:id/view", post(open_detail))
        .route("/api/v1/containers/:id/actions", post(request_action))
        .route("/api/v1/containers/:id/analysis", get(analyze_container))
        .route("/api/v1/actions/confirm", post(confirm_action))
        .route("/api/v1/actions/cancel", post(cancel_action))
        .route("/api/v1/refresh", post(refresh))
        .route("/api/v1/login", post(login))
        .route("/api/v1/users", get(list_users).post(create_user))
        .route("/api/v1/users/:id", patch(update_user))
        .route("/api/v1/users/:id/delete", post(request_user_deletion))
        .route("/api/v1/images", get(list_images))
        .route("/api/v1/images/pull", post(pull_image))
        .route("/api/v1/images/:id", delete(delete_image))
        .route("/api/v1/volumes", get(list_volumes))
        .route("/api/v1/volumes/:name", delete(delete_volume))
        .route("/api/v1/notifications", get(list_notifications))
        .route("/api/v1/notifications/:id", delete(dismiss_notification))
        .route("/api/v1/audit", get(audit_trail))
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
