//! Confirm-then-apply controller for operator actions

use super::action::{
    ActionKind, ActionPhase, ActionReceipt, ActionRequest, PendingAction, TargetType,
};
use super::deploy::{ContainerUpdate, DeploySpec};
use super::directory::{now_rfc3339, NewUser, UserDirectory, UserUpdate};
use super::registry::{
    estimate_size_mb, parse_reference, ImageRegistry, PullOutcome, VolumeRegistry,
};
use crate::error::{FleetError, FleetResult};
use crate::fleet::FleetStore;
use crate::health::{components, HealthRegistry};
use crate::models::{
    Actor, Container, ContainerStatus, DockerImage, DockerVolume, HealthStatus, User,
};
use crate::observability::{FleetMetrics, StructuredLogger};
use crate::reconcile::{RandomSource, TelemetrySimulator, ThreadRandom};
use crate::view::NotificationQueue;
use anyhow::Result;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Audit line recorded for every applied transition
pub fn audit_entry(action: &str, actor: &str, at: &str) -> String {
    format!(
        "[audit] {} initiated by '{}' at {}",
        action.to_uppercase(),
        actor,
        at
    )
}

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Simulated latency before a container delete lands (default: 2.5s)
    pub delete_latency: Duration,
    /// Simulated latency before a user delete lands (default: 1.5s)
    pub user_delete_latency: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            delete_latency: Duration::from_millis(2500),
            user_delete_latency: Duration::from_millis(1500),
        }
    }
}

/// Mediates every operator mutation of the fleet.
///
/// Actions are staged as a single [`PendingAction`] and only applied on
/// `confirm`. All collaborators are shared handles, so the controller is
/// cheap to clone and a confirmed delete keeps running in its own task even
/// if the caller goes away.
#[derive(Clone)]
pub struct LifecycleController {
    store: FleetStore,
    users: UserDirectory,
    images: ImageRegistry,
    volumes: VolumeRegistry,
    notifications: NotificationQueue,
    pending: Arc<Mutex<Option<PendingAction>>>,
    audit: Arc<RwLock<Vec<String>>>,
    config: LifecycleConfig,
    rng: Arc<StdMutex<Box<dyn RandomSource>>>,
    health: Option<HealthRegistry>,
    metrics: Option<FleetMetrics>,
    logger: Option<StructuredLogger>,
}

impl LifecycleController {
    pub fn new(store: FleetStore, users: UserDirectory, config: LifecycleConfig) -> Self {
        Self {
            store,
            users,
            images: ImageRegistry::default(),
            volumes: VolumeRegistry::default(),
            notifications: NotificationQueue::default(),
            pending: Arc::new(Mutex::new(None)),
            audit: Arc::new(RwLock::new(Vec::new())),
            config,
            rng: Arc::new(StdMutex::new(Box::new(ThreadRandom::new()))),
            health: None,
            metrics: None,
            logger: None,
        }
    }

    pub fn store(&self) -> &FleetStore {
        &self.store
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn images(&self) -> &ImageRegistry {
        &self.images
    }

    pub fn volumes(&self) -> &VolumeRegistry {
        &self.volumes
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// The action awaiting confirmation or being applied, if any
    pub async fn pending(&self) -> Option<PendingAction> {
        self.pending.lock().await.clone()
    }

    /// Every audit entry recorded so far, oldest first
    pub async fn audit_trail(&self) -> Vec<String> {
        self.audit.read().await.clone()
    }

    // ---- requests ----------------------------------------------------------

    /// Stage a container action for confirmation
    pub async fn request_action(
        &self,
        actor: &Actor,
        container_id: &str,
        action: ActionKind,
    ) -> FleetResult<PendingAction> {
        self.authorize(actor, action.as_str(), container_id)?;

        let container = match self.store.container(container_id).await {
            Some(container) => container,
            None => {
                return Err(self.reject(
                    actor,
                    action.as_str(),
                    container_id,
                    FleetError::container_not_found(container_id),
                ))
            }
        };

        self.stage(
            actor,
            ActionRequest {
                target_id: container.id,
                target_type: TargetType::Container,
                action,
                target_name: container.name,
                requested_by: actor.username.clone(),
            },
        )
        .await
    }

    /// Stage deletion of a user account. Deleting yourself is refused before
    /// any confirmation is shown.
    pub async fn request_user_deletion(
        &self,
        actor: &Actor,
        user_id: &str,
    ) -> FleetResult<PendingAction> {
        self.authorize(actor, "delete user", user_id)?;

        if actor.user_id == user_id {
            return Err(self.reject(
                actor,
                "delete user",
                user_id,
                FleetError::SelfDeletionForbidden,
            ));
        }

        let user = match self.users.get(user_id).await {
            Some(user) => user,
            None => {
                return Err(self.reject(
                    actor,
                    "delete user",
                    user_id,
                    FleetError::user_not_found(user_id),
                ))
            }
        };

        self.stage(
            actor,
            ActionRequest {
                target_id: user.id,
                target_type: TargetType::User,
                action: ActionKind::Delete,
                target_name: user.username,
                requested_by: actor.username.clone(),
            },
        )
        .await
    }

    async fn stage(&self, actor: &Actor, request: ActionRequest) -> FleetResult<PendingAction> {
        let mut pending = self.pending.lock().await;
        if let Some(current) = pending.as_ref() {
            if current.phase.is_in_flight() {
                let target = current.request.target_name.clone();
                drop(pending);
                return Err(self.reject(
                    actor,
                    request.action.as_str(),
                    &request.target_id,
                    FleetError::ActionInFlight { target },
                ));
            }
        }

        let staged = PendingAction::new(request);
        info!(
            actor = %actor.username,
            action = %staged.request.action,
            target = %staged.request.target_name,
            "Action awaiting confirmation"
        );
        *pending = Some(staged.clone());
        Ok(staged)
    }

    /// Drop the staged action without side effects
    pub async fn cancel(&self, actor: &Actor) -> FleetResult<PendingAction> {
        let mut pending = self.pending.lock().await;
        if !actor.is_admin() {
            let target = pending
                .as_ref()
                .map(|p| p.request.target_id.clone())
                .unwrap_or_default();
            drop(pending);
            return Err(self.forbid(actor, "cancel", &target));
        }
        match pending.as_ref().map(|p| p.phase) {
            None => Err(FleetError::NoPendingAction),
            Some(phase) if phase.is_in_flight() => {
                let target = pending
                    .as_ref()
                    .map(|p| p.request.target_name.clone())
                    .unwrap_or_default();
                Err(FleetError::ActionInFlight { target })
            }
            Some(_) => {
                let mut cancelled = match pending.take() {
                    Some(p) => p,
                    None => return Err(FleetError::NoPendingAction),
                };
                cancelled.phase = ActionPhase::Cancelled;
                info!(
                    actor = %actor.username,
                    action = %cancelled.request.action,
                    target = %cancelled.request.target_name,
                    "Action cancelled"
                );
                Ok(cancelled)
            }
        }
    }

    // ---- confirmation ------------------------------------------------------

    /// Apply the staged action.
    ///
    /// Start/stop/restart land synchronously. Deletes run in a spawned task
    /// after the configured latency; this call waits for it, but dropping the
    /// returned future does not abort the delete.
    pub async fn confirm(&self, actor: &Actor) -> FleetResult<ActionReceipt> {
        let request = {
            let mut pending = self.pending.lock().await;
            let current = match pending.as_mut() {
                Some(current) => current,
                None => return Err(FleetError::NoPendingAction),
            };
            if current.phase.is_in_flight() {
                return Err(FleetError::ActionInFlight {
                    target: current.request.target_name.clone(),
                });
            }
            if !actor.is_admin() {
                let request = current.request.clone();
                drop(pending);
                return Err(self.forbid(actor, request.action.as_str(), &request.target_id));
            }

            current.phase = ActionPhase::Confirmed;
            current.request.clone()
        };

        let result = match (request.target_type, request.action) {
            (_, ActionKind::Delete) => self.apply_delete(actor, request.clone()).await,
            (TargetType::Container, kind) => {
                self.apply_transition(actor, request.clone(), kind).await
            }
            (TargetType::User, kind) => Err(FleetError::Validation(format!(
                "cannot {} a user",
                kind
            ))),
        };

        match result {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                self.pending.lock().await.take();
                Err(self.reject(actor, request.action.as_str(), &request.target_id, err))
            }
        }
    }

    async fn mark_applying(&self) {
        if let Some(pending) = self.pending.lock().await.as_mut() {
            pending.phase = ActionPhase::Applying;
        }
    }

    async fn apply_transition(
        &self,
        actor: &Actor,
        request: ActionRequest,
        kind: ActionKind,
    ) -> FleetResult<ActionReceipt> {
        let entry = audit_entry(kind.as_str(), &actor.username, &now_rfc3339());

        self.mark_applying().await;
        {
            let mut state = self.store.write().await;
            let container = state
                .get_mut(&request.target_id)
                .ok_or_else(|| FleetError::container_not_found(&request.target_id))?;

            container.logs.push(entry.clone());
            match kind {
                ActionKind::Stop => stop(container),
                ActionKind::Start => {
                    let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
                    start(container, rng.as_mut());
                }
                ActionKind::Restart => restart(container),
                ActionKind::Delete => {}
            }
        }

        self.audit.write().await.push(entry.clone());
        let message = format!(
            "Container {} {} successfully",
            request.target_name,
            kind.past_tense()
        );
        Ok(self.finish(actor, request, entry, message).await)
    }

    async fn apply_delete(
        &self,
        actor: &Actor,
        request: ActionRequest,
    ) -> FleetResult<ActionReceipt> {
        let entry = audit_entry(
            ActionKind::Delete.as_str(),
            &actor.username,
            &now_rfc3339(),
        );

        let latency = match request.target_type {
            TargetType::Container => {
                let mut state = self.store.write().await;
                let container = state
                    .get_mut(&request.target_id)
                    .ok_or_else(|| FleetError::container_not_found(&request.target_id))?;
                container.logs.push(entry.clone());
                self.config.delete_latency
            }
            TargetType::User => {
                if self.users.get(&request.target_id).await.is_none() {
                    return Err(FleetError::user_not_found(&request.target_id));
                }
                self.config.user_delete_latency
            }
        };
        self.audit.write().await.push(entry.clone());
        self.mark_applying().await;

        let controller = self.clone();
        let actor = actor.clone();
        let target = request.target_name.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(latency).await;

            // The target may already be gone (e.g. pruned by a live tick);
            // the delete still completes.
            match request.target_type {
                TargetType::Container => {
                    controller.store.write().await.remove(&request.target_id);
                }
                TargetType::User => {
                    controller.users.remove(&request.target_id).await;
                }
            }

            let message = format!(
                "{} {} deleted successfully",
                request.target_type.label(),
                request.target_name
            );
            controller.finish(&actor, request, entry, message).await
        });

        match task.await {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                warn!(error = %err, target = %target, "Delete task did not complete");
                if let Some(health) = &self.health {
                    health
                        .set_degraded(components::LIFECYCLE, format!("delete failed: {}", err))
                        .await;
                }
                Err(FleetError::ActionInFlight { target })
            }
        }
    }

    async fn finish(
        &self,
        actor: &Actor,
        request: ActionRequest,
        entry: String,
        message: String,
    ) -> ActionReceipt {
        self.pending.lock().await.take();
        self.notifications.success(message.clone());

        if let Some(metrics) = &self.metrics {
            metrics.inc_action_applied(request.action.as_str());
        }
        if let Some(logger) = &self.logger {
            logger.log_action_applied(&actor.username, request.action.as_str(), &request.target_name);
        }
        if let Some(health) = &self.health {
            health.set_healthy(components::LIFECYCLE).await;
        }

        ActionReceipt {
            request,
            phase: ActionPhase::Applied,
            audit_entry: entry,
            message,
        }
    }

    // ---- direct mutations --------------------------------------------------

    /// Create and start a container
    pub async fn deploy(&self, actor: &Actor, spec: DeploySpec) -> FleetResult<Container> {
        self.authorize(actor, "deploy", &spec.name)?;

        let image = spec.image.trim().to_string();
        let now = now_rfc3339();
        let entry = audit_entry("create", &actor.username, &now);
        let id = uuid::Uuid::new_v4().simple().to_string()[..12].to_string();

        let container = {
            let mut state = self.store.write().await;
            let name = spec.name.clone();
            match spec.build(&state, id, now, entry.clone()) {
                Ok(container) => {
                    state.insert(container.clone());
                    container
                }
                Err(err) => return Err(self.reject(actor, "deploy", &name, err)),
            }
        };

        if let Some(added) = self.images.ensure(&image).await {
            info!(image = %added.reference(), "Registered image from deployment");
        }
        self.audit.write().await.push(entry);
        self.notifications
            .success(format!("Container {} deployed successfully", container.name));

        if let Some(metrics) = &self.metrics {
            metrics.inc_action_applied("deploy");
        }
        if let Some(logger) = &self.logger {
            logger.log_container_deployed(&actor.username, &container.name, &container.image);
        }

        Ok(container)
    }

    /// Reconfigure an existing container
    pub async fn update_container(
        &self,
        actor: &Actor,
        id: &str,
        update: ContainerUpdate,
    ) -> FleetResult<Container> {
        self.authorize(actor, "update", id)?;

        let result = {
            let mut state = self.store.write().await;
            update.apply(&mut state, id)
        };
        let container = result.map_err(|err| self.reject(actor, "update", id, err))?;

        self.notifications.success("Container configuration updated");
        if let Some(logger) = &self.logger {
            logger.log_action_applied(&actor.username, "update", &container.name);
        }
        Ok(container)
    }

    pub async fn add_user(&self, actor: &Actor, new_user: NewUser) -> FleetResult<User> {
        self.authorize(actor, "create user", &new_user.username)?;

        let username = new_user.username.clone();
        let user = self
            .users
            .create(new_user)
            .await
            .map_err(|err| self.reject(actor, "create user", &username, err))?;

        self.notifications
            .success(format!("User {} created successfully", user.username));
        Ok(user)
    }

    pub async fn update_user(
        &self,
        actor: &Actor,
        id: &str,
        update: UserUpdate,
    ) -> FleetResult<User> {
        self.authorize(actor, "update user", id)?;

        let user = self
            .users
            .update(id, update)
            .await
            .map_err(|err| self.reject(actor, "update user", id, err))?;

        self.notifications.success("User updated successfully");
        Ok(user)
    }

    pub async fn pull_image(&self, actor: &Actor, reference: &str) -> FleetResult<PullOutcome> {
        self.authorize(actor, "pull image", reference)?;
        if reference.trim().is_empty() {
            return Err(self.reject(
                actor,
                "pull image",
                reference,
                FleetError::Validation("Repository is required".to_string()),
            ));
        }

        let (repository, _) = parse_reference(reference);
        let size_mb = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            estimate_size_mb(&repository, rng.as_mut())
        };
        let outcome = self.images.pull(reference, size_mb).await;
        match &outcome {
            PullOutcome::AlreadyPresent(image) => {
                self.notifications
                    .info(format!("Image {} is already up to date", image.reference()));
            }
            PullOutcome::Pulled(image) => {
                self.notifications
                    .success(format!("Image {} pulled successfully", image.reference()));
            }
        }
        Ok(outcome)
    }

    pub async fn delete_image(&self, actor: &Actor, id: &str) -> FleetResult<DockerImage> {
        self.authorize(actor, "delete image", id)?;

        let image = match self.images.remove(id).await {
            Some(image) => image,
            None => {
                return Err(self.reject(
                    actor,
                    "delete image",
                    id,
                    FleetError::NotFound {
                        kind: "image",
                        id: id.to_string(),
                    },
                ))
            }
        };
        self.notifications.info("Image deleted successfully");
        Ok(image)
    }

    pub async fn delete_volume(&self, actor: &Actor, name: &str) -> FleetResult<DockerVolume> {
        self.authorize(actor, "delete volume", name)?;

        let volume = match self.volumes.remove(name).await {
            Some(volume) => volume,
            None => {
                return Err(self.reject(
                    actor,
                    "delete volume",
                    name,
                    FleetError::NotFound {
                        kind: "volume",
                        id: name.to_string(),
                    },
                ))
            }
        };
        self.notifications.info("Volume removed successfully");
        Ok(volume)
    }

    // ---- authorization -----------------------------------------------------

    fn authorize(&self, actor: &Actor, operation: &str, target: &str) -> FleetResult<()> {
        if actor.is_admin() {
            Ok(())
        } else {
            Err(self.forbid(actor, operation, target))
        }
    }

    fn forbid(&self, actor: &Actor, operation: &str, target: &str) -> FleetError {
        self.reject(actor, operation, target, FleetError::forbidden(operation))
    }

    /// Surface a refused operation to the operator and hand the error back
    fn reject(&self, actor: &Actor, operation: &str, target: &str, err: FleetError) -> FleetError {
        self.notifications.error(notification_text(&err));
        self.record_rejection(actor, operation, target, &err);
        err
    }

    fn record_rejection(&self, actor: &Actor, operation: &str, target: &str, err: &FleetError) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_action_rejected(err.code());
        }
        if let Some(logger) = &self.logger {
            logger.log_action_rejected(&actor.username, operation, target, &err.to_string());
        }
    }
}

fn notification_text(err: &FleetError) -> String {
    match err {
        FleetError::Forbidden { operation } => {
            format!("Permission denied: only admins can {}", operation)
        }
        FleetError::SelfDeletionForbidden => "You cannot delete your own account".to_string(),
        other => {
            let text = other.to_string();
            let mut chars = text.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => text,
            }
        }
    }
}

fn stop(container: &mut Container) {
    container.status = ContainerStatus::Stopped;
    container.logs.push("[info] Stopping container...".to_string());
    container.logs.push("[info] Process exited 0".to_string());
    container.settle_if_not_running();
}

fn start(container: &mut Container, rng: &mut dyn RandomSource) {
    container.status = ContainerStatus::Running;
    container.health = HealthStatus::Starting;
    container.uptime = "Just now".to_string();

    let (cpu, memory) =
        TelemetrySimulator::new().seed_usage(container.cpu_limit, container.memory_limit, rng);
    container.cpu = cpu;
    container.memory = memory;
    container.logs.push("[info] Container started.".to_string());
}

fn restart(container: &mut Container) {
    container.logs.push("[warn] Restart signal received".to_string());
    container.logs.push("[info] Restarting...".to_string());
    if container.is_running() {
        container.health = HealthStatus::Starting;
        container.uptime = "Just now".to_string();
    }
    container.settle_if_not_running();
}

/// Builder for the lifecycle controller
pub struct LifecycleControllerBuilder {
    store: Option<FleetStore>,
    users: UserDirectory,
    images: ImageRegistry,
    volumes: VolumeRegistry,
    notifications: NotificationQueue,
    config: LifecycleConfig,
    rng: Option<Box<dyn RandomSource>>,
    health: Option<HealthRegistry>,
    metrics: Option<FleetMetrics>,
    logger: Option<StructuredLogger>,
}

impl LifecycleControllerBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            users: UserDirectory::default(),
            images: ImageRegistry::default(),
            volumes: VolumeRegistry::default(),
            notifications: NotificationQueue::default(),
            config: LifecycleConfig::default(),
            rng: None,
            health: None,
            metrics: None,
            logger: None,
        }
    }

    /// Fleet store shared with the reconciler
    pub fn store(mut self, store: FleetStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn users(mut self, users: UserDirectory) -> Self {
        self.users = users;
        self
    }

    pub fn images(mut self, images: ImageRegistry) -> Self {
        self.images = images;
        self
    }

    pub fn volumes(mut self, volumes: VolumeRegistry) -> Self {
        self.volumes = volumes;
        self
    }

    pub fn notifications(mut self, notifications: NotificationQueue) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn delete_latency(mut self, latency: Duration) -> Self {
        self.config.delete_latency = latency;
        self
    }

    pub fn user_delete_latency(mut self, latency: Duration) -> Self {
        self.config.user_delete_latency = latency;
        self
    }

    pub fn random(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn metrics(mut self, metrics: FleetMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> Result<LifecycleController> {
        let store = self
            .store
            .ok_or_else(|| anyhow::anyhow!("Fleet store is required"))?;

        let mut controller = LifecycleController::new(store, self.users, self.config);
        controller.images = self.images;
        controller.volumes = self.volumes;
        controller.notifications = self.notifications;
        if let Some(rng) = self.rng {
            controller.rng = Arc::new(StdMutex::new(rng));
        }
        controller.health = self.health;
        controller.metrics = self.metrics;
        controller.logger = self.logger;

        Ok(controller)
    }
}

impl Default for LifecycleControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
