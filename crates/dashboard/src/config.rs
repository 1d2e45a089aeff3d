//! Dashboard configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Dashboard configuration, read from `FLEET_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Name used to tag structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// HTTP API port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Base URL of the container telemetry source
    #[serde(default = "default_source_endpoint")]
    pub source_endpoint: String,

    /// Reconciliation tick interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Upper bound on one telemetry fetch in milliseconds
    #[serde(default = "default_source_timeout")]
    pub source_timeout_ms: u64,

    /// Simulated container delete latency in milliseconds
    #[serde(default = "default_delete_latency")]
    pub delete_latency_ms: u64,

    /// Simulated user delete latency in milliseconds
    #[serde(default = "default_user_delete_latency")]
    pub user_delete_latency_ms: u64,

    /// How long notifications stay visible in milliseconds
    #[serde(default = "default_notification_ttl")]
    pub notification_ttl_ms: u64,

    /// Text-generation endpoint for log analysis; simulated when unset
    #[serde(default)]
    pub analysis_endpoint: Option<String>,

    #[serde(default)]
    pub analysis_api_key: Option<String>,

    /// Seed demo containers, images and volumes on startup
    #[serde(default = "default_seed_demo_fleet")]
    pub seed_demo_fleet: bool,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "fleet-dashboard".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_source_endpoint() -> String {
    "http://localhost:3001".to_string()
}

fn default_tick_interval() -> u64 {
    2000
}

fn default_source_timeout() -> u64 {
    1000
}

fn default_delete_latency() -> u64 {
    2500
}

fn default_user_delete_latency() -> u64 {
    1500
}

fn default_notification_ttl() -> u64 {
    4000
}

fn default_seed_demo_fleet() -> bool {
    true
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            source_endpoint: default_source_endpoint(),
            tick_interval_ms: default_tick_interval(),
            source_timeout_ms: default_source_timeout(),
            delete_latency_ms: default_delete_latency(),
            user_delete_latency_ms: default_user_delete_latency(),
            notification_ttl_ms: default_notification_ttl(),
            analysis_endpoint: None,
            analysis_api_key: None,
            seed_demo_fleet: default_seed_demo_fleet(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("FLEET").try_parsing(true))
            .build()
            .context("Failed to read FLEET_* environment")?;

        config
            .try_deserialize()
            .context("Invalid FLEET_* configuration")
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    pub fn delete_latency(&self) -> Duration {
        Duration::from_millis(self.delete_latency_ms)
    }

    pub fn user_delete_latency(&self) -> Duration {
        Duration::from_millis(self.user_delete_latency_ms)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }
}
