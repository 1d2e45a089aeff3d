//! Container deployment and reconfiguration payloads

use crate::error::{FleetError, FleetResult};
use crate::fleet::FleetState;
use crate::models::{Container, ContainerStatus, HealthStatus, RestartPolicy, Volume};
use crate::reconcile::MEMORY_FLOOR;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const DEFAULT_DEPLOY_CPU_LIMIT: f64 = 100.0;
pub const DEFAULT_DEPLOY_MEMORY_LIMIT: f64 = 512.0;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9-]+$").expect("valid container name regex"))
}

/// Everything needed to create a container
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploySpec {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub cpu_limit: Option<f64>,
    #[serde(default)]
    pub memory_limit: Option<f64>,
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    #[serde(default)]
    pub restart_policy: Option<RestartPolicy>,
}

/// Partial reconfiguration of an existing container
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub cpu_limit: Option<f64>,
    #[serde(default)]
    pub memory_limit: Option<f64>,
    #[serde(default)]
    pub env_vars: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub volumes: Option<Vec<Volume>>,
    #[serde(default)]
    pub restart_policy: Option<RestartPolicy>,
}

/// Check a container name against the fleet; `except_id` skips the
/// container being renamed.
pub fn validate_name(state: &FleetState, name: &str, except_id: Option<&str>) -> FleetResult<()> {
    if name.is_empty() {
        return Err(FleetError::Validation("Container name is required".to_string()));
    }
    if !name_pattern().is_match(name) {
        return Err(FleetError::Validation(
            "Container name can only contain alphanumeric characters (a-z, 0-9) and hyphens (-)."
                .to_string(),
        ));
    }
    let taken = state
        .containers()
        .iter()
        .any(|c| c.name == name && Some(c.id.as_str()) != except_id);
    if taken {
        return Err(FleetError::Validation(format!(
            "A container with the name \"{}\" already exists. Please choose a unique name.",
            name
        )));
    }
    Ok(())
}

fn validate_limits(cpu_limit: f64, memory_limit: f64) -> FleetResult<()> {
    if !cpu_limit.is_finite() || cpu_limit <= 0.0 {
        return Err(FleetError::Validation(
            "CPU limit must be greater than 0".to_string(),
        ));
    }
    if !memory_limit.is_finite() || memory_limit < MEMORY_FLOOR {
        return Err(FleetError::Validation(format!(
            "Memory limit must be at least {}MB",
            MEMORY_FLOOR
        )));
    }
    Ok(())
}

fn clean_volumes(volumes: Vec<Volume>) -> Vec<Volume> {
    volumes
        .into_iter()
        .filter(|v| !v.host_path.trim().is_empty() && !v.mount_path.trim().is_empty())
        .collect()
}

fn clean_env(env: BTreeMap<String, String>) -> BTreeMap<String, String> {
    env.into_iter().filter(|(k, _)| !k.trim().is_empty()).collect()
}

impl DeploySpec {
    /// Validate against the current fleet and build the new container
    pub fn build(
        self,
        state: &FleetState,
        id: String,
        created: String,
        audit_entry: String,
    ) -> FleetResult<Container> {
        let name = self.name.trim().to_string();
        validate_name(state, &name, None)?;

        let image = self.image.trim().to_string();
        if image.is_empty() {
            return Err(FleetError::Validation("Image is required".to_string()));
        }

        let cpu_limit = self.cpu_limit.unwrap_or(DEFAULT_DEPLOY_CPU_LIMIT);
        let memory_limit = self.memory_limit.unwrap_or(DEFAULT_DEPLOY_MEMORY_LIMIT);
        validate_limits(cpu_limit, memory_limit)?;

        let port = self
            .port
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        let restart_policy = self.restart_policy.unwrap_or_default();

        let logs = vec![
            audit_entry,
            format!("[info] Container created at {}", created),
            "[info] Starting application...".to_string(),
            format!(
                "[info] Listening on {}",
                port.as_deref().unwrap_or("default port")
            ),
            format!("[info] Restart Policy: {}", restart_policy),
            format!(
                "[info] Resource Limits: CPU={}%, MEM={}MB",
                cpu_limit, memory_limit
            ),
        ];

        Ok(Container {
            id,
            name,
            image,
            status: ContainerStatus::Running,
            health: HealthStatus::Starting,
            created,
            uptime: "Just now".to_string(),
            port: port.unwrap_or_else(|| "-".to_string()),
            cpu: 0.5_f64.min(cpu_limit),
            cpu_limit,
            memory: 30.0_f64.min(memory_limit),
            memory_limit,
            logs,
            env_vars: clean_env(self.env_vars),
            volumes: clean_volumes(self.volumes),
            restart_policy,
        })
    }
}

impl ContainerUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.image.is_none()
            && self.port.is_none()
            && self.cpu_limit.is_none()
            && self.memory_limit.is_none()
            && self.env_vars.is_none()
            && self.volumes.is_none()
            && self.restart_policy.is_none()
    }

    /// Validate and apply in place, re-clamping usage to the new limits
    pub fn apply(self, state: &mut FleetState, id: &str) -> FleetResult<Container> {
        let current = state
            .get(id)
            .ok_or_else(|| FleetError::container_not_found(id))?;

        let name = self.name.map(|n| n.trim().to_string());
        if let Some(name) = &name {
            validate_name(state, name, Some(id))?;
        }
        if let Some(image) = &self.image {
            if image.trim().is_empty() {
                return Err(FleetError::Validation("Image is required".to_string()));
            }
        }
        let cpu_limit = self.cpu_limit.unwrap_or(current.cpu_limit);
        let memory_limit = self.memory_limit.unwrap_or(current.memory_limit);
        validate_limits(cpu_limit, memory_limit)?;

        let container = state
            .get_mut(id)
            .ok_or_else(|| FleetError::container_not_found(id))?;

        if let Some(name) = name {
            container.name = name;
        }
        if let Some(image) = self.image {
            container.image = image.trim().to_string();
        }
        if let Some(port) = self.port {
            let port = port.trim();
            container.port = if port.is_empty() { "-".to_string() } else { port.to_string() };
        }
        if let Some(env) = self.env_vars {
            container.env_vars = clean_env(env);
        }
        if let Some(volumes) = self.volumes {
            container.volumes = clean_volumes(volumes);
        }
        if let Some(policy) = self.restart_policy {
            container.restart_policy = policy;
        }

        container.cpu_limit = cpu_limit;
        container.memory_limit = memory_limit;
        if container.is_running() {
            container.cpu = container.cpu.clamp(0.0, cpu_limit);
            container.memory = container.memory.clamp(MEMORY_FLOOR.min(memory_limit), memory_limit);
        }
        container.settle_if_not_running();

        Ok(container.clone())
    }
}
