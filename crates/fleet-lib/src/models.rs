//! Core data models for the fleet dashboard

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle state of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContainerStatus {
    Running,
    Stopped,
    Exited,
    Error,
}

impl ContainerStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerStatus::Running)
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerStatus::Running => write!(f, "RUNNING"),
            ContainerStatus::Stopped => write!(f, "STOPPED"),
            ContainerStatus::Exited => write!(f, "EXITED"),
            ContainerStatus::Error => write!(f, "ERROR"),
        }
    }
}

impl std::str::FromStr for ContainerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RUNNING" => Ok(ContainerStatus::Running),
            "STOPPED" => Ok(ContainerStatus::Stopped),
            "EXITED" => Ok(ContainerStatus::Exited),
            "ERROR" => Ok(ContainerStatus::Error),
            other => Err(format!("unknown container status: {}", other)),
        }
    }
}

/// Health probe state of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Starting,
    None,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
            HealthStatus::Starting => write!(f, "starting"),
            HealthStatus::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    #[default]
    No,
    Always,
    OnFailure,
    UnlessStopped,
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartPolicy::No => write!(f, "no"),
            RestartPolicy::Always => write!(f, "always"),
            RestartPolicy::OnFailure => write!(f, "on-failure"),
            RestartPolicy::UnlessStopped => write!(f, "unless-stopped"),
        }
    }
}

/// A bind mount or named volume attached to a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub host_path: String,
    pub mount_path: String,
    pub mode: String,
}

/// A tracked container.
///
/// `cpu` is a percentage bounded by `cpu_limit`; `memory` is in MB bounded by
/// `memory_limit`. Both are zero and `health` is `None` whenever the
/// container is not running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: ContainerStatus,
    pub health: HealthStatus,
    pub created: String,
    pub uptime: String,
    pub port: String,
    pub cpu: f64,
    pub cpu_limit: f64,
    pub memory: f64,
    pub memory_limit: f64,
    pub logs: Vec<String>,
    pub env_vars: BTreeMap<String, String>,
    pub volumes: Vec<Volume>,
    pub restart_policy: RestartPolicy,
}

impl Container {
    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    /// Force the resting-state invariant for a non-running container
    pub fn settle_if_not_running(&mut self) {
        if !self.is_running() {
            self.cpu = 0.0;
            self.memory = 0.0;
            self.health = HealthStatus::None;
        }
    }

    /// Last `n` log lines, oldest first
    pub fn tail_logs(&self, n: usize) -> &[String] {
        let start = self.logs.len().saturating_sub(n);
        &self.logs[start..]
    }
}

/// One point of the system-wide telemetry window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Display timestamp (HH:MM:SS)
    pub time: String,
    /// Aggregate CPU
    pub value: f64,
    /// Aggregate memory in MB
    pub value2: f64,
}

/// Whether the fleet view is driven by a live source or by simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    Live,
    #[default]
    Simulated,
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionMode::Live => write!(f, "live"),
            ConnectionMode::Simulated => write!(f, "simulated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Viewer,
}

/// A dashboard account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub avatar: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub created: String,
}

/// The identity on whose behalf a mutation is performed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor::new(user.id.clone(), user.username.clone(), user.role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerImage {
    pub id: String,
    pub repository: String,
    pub tag: String,
    pub size: String,
    pub created: String,
}

impl DockerImage {
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeState {
    InUse,
    Available,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerVolume {
    pub name: String,
    pub driver: String,
    pub mountpoint: String,
    pub created: String,
    pub status: VolumeState,
}
