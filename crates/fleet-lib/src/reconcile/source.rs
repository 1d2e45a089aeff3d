//! HTTP telemetry source adapter
//!
//! Fetches the raw container list and system-wide stats from the external
//! source of truth and translates the foreign (Docker Engine style) schema
//! into the domain model.

use super::SnapshotSource;
use crate::models::{Container, ContainerStatus, HealthStatus, RestartPolicy, Volume};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Default CPU limit assigned to translated containers (percent)
pub const DEFAULT_CPU_LIMIT: f64 = 100.0;
/// Default memory limit assigned to translated containers (MB)
pub const DEFAULT_MEMORY_LIMIT: f64 = 1024.0;

const CONTAINERS_PATH: &str = "api/containers";
const STATS_PATH: &str = "api/stats";

/// Why a snapshot could not be obtained
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("telemetry source unreachable: {0}")]
    Unreachable(String),
    #[error("telemetry source protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawPort {
    #[serde(default)]
    pub public_port: Option<u16>,
    pub private_port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawMount {
    pub source: String,
    pub destination: String,
    #[serde(default)]
    pub mode: String,
}

/// Container record as reported by the telemetry source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawContainer {
    pub id: String,
    #[serde(default)]
    pub names: Vec<String>,
    pub image: String,
    pub state: String,
    /// Human readable status, e.g. "Up 2 hours"
    #[serde(default)]
    pub status: String,
    /// Creation time in Unix seconds
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub ports: Vec<RawPort>,
    #[serde(default)]
    pub mounts: Vec<RawMount>,
    /// Per-container CPU percentage, when the source exposes it
    #[serde(default)]
    pub cpu_percent: Option<f64>,
    /// Per-container memory in MB, when the source exposes it
    #[serde(default)]
    pub memory_mb: Option<f64>,
}

impl RawContainer {
    /// Whether the source supplied per-container usage
    pub fn has_usage(&self) -> bool {
        self.cpu_percent.is_some() || self.memory_mb.is_some()
    }
}

/// System-wide stats
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    #[serde(default)]
    pub cpu: f64,
    /// Memory in bytes
    #[serde(default)]
    pub memory: u64,
}

impl SystemStats {
    pub fn memory_mb(&self) -> f64 {
        self.memory as f64 / 1024.0 / 1024.0
    }
}

/// One successful fetch from the source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub containers: Vec<RawContainer>,
    pub stats: SystemStats,
}

/// Map a raw lifecycle state onto the domain status
pub fn translate_state(state: &str) -> ContainerStatus {
    match state {
        "running" => ContainerStatus::Running,
        "exited" => ContainerStatus::Exited,
        "dead" | "restarting" => ContainerStatus::Error,
        _ => ContainerStatus::Stopped,
    }
}

/// Port display: `public:private` of the first mapping, `-` when none
pub fn format_port(ports: &[RawPort]) -> String {
    match ports.first() {
        Some(RawPort {
            public_port: Some(public),
            private_port,
        }) => format!("{}:{}", public, private_port),
        Some(RawPort {
            public_port: None,
            private_port,
        }) => private_port.to_string(),
        None => "-".to_string(),
    }
}

/// Translate a raw record into a domain container.
///
/// Health is derived from run state only; the source has no probe, so a
/// `healthy` here is not ground truth for alerting.
pub fn translate(raw: &RawContainer) -> Container {
    let status = translate_state(&raw.state);
    let health = if status.is_running() {
        HealthStatus::Healthy
    } else {
        HealthStatus::None
    };

    let name = raw
        .names
        .first()
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let created = DateTime::<Utc>::from_timestamp(raw.created, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    let mut container = Container {
        id: raw.id.clone(),
        name,
        image: raw.image.clone(),
        status,
        health,
        created,
        uptime: raw.status.clone(),
        port: format_port(&raw.ports),
        cpu: 0.0,
        cpu_limit: DEFAULT_CPU_LIMIT,
        memory: 0.0,
        memory_limit: DEFAULT_MEMORY_LIMIT,
        logs: Vec::new(),
        env_vars: BTreeMap::new(),
        volumes: raw
            .mounts
            .iter()
            .map(|m| Volume {
                host_path: m.source.clone(),
                mount_path: m.destination.clone(),
                mode: m.mode.clone(),
            })
            .collect(),
        restart_policy: RestartPolicy::No,
    };
    container.settle_if_not_running();
    container
}

/// Adapter for the two read endpoints of the telemetry source
pub struct HttpSourceAdapter {
    client: Client,
    base_url: Url,
}

impl HttpSourceAdapter {
    /// Create an adapter; every request is bounded by `timeout`
    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let mut base_url = Url::parse(endpoint)
            .with_context(|| format!("Invalid telemetry source URL: {}", endpoint))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| SourceError::Protocol(format!("invalid path {}: {}", path, e)))?;

        let response = self.client.get(url).send().await.map_err(|e| {
            debug!(error = %e, path = %path, "Telemetry source request failed");
            SourceError::Unreachable(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Protocol(format!("{} returned {}", path, status)));
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Unreachable(e.to_string())
            } else {
                SourceError::Protocol(format!("malformed {} body: {}", path, e))
            }
        })
    }
}

#[async_trait]
impl SnapshotSource for HttpSourceAdapter {
    async fn fetch_snapshot(&self) -> Result<Snapshot, SourceError> {
        let (containers, stats) = tokio::join!(
            self.get_json::<Vec<RawContainer>>(CONTAINERS_PATH),
            self.get_json::<SystemStats>(STATS_PATH)
        );

        Ok(Snapshot {
            containers: containers?,
            stats: stats?,
        })
    }

    fn describe(&self) -> String {
        self.base_url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(state: &str) -> RawContainer {
        RawContainer {
            id: "abc123".to_string(),
            names: vec!["/web".to_string()],
            image: "nginx:latest".to_string(),
            state: state.to_string(),
            status: "Up 2 hours".to_string(),
            created: 1_698_220_800,
            ports: vec![RawPort {
                public_port: Some(8080),
                private_port: 80,
            }],
            mounts: vec![RawMount {
                source: "/srv/www".to_string(),
                destination: "/usr/share/nginx/html".to_string(),
                mode: "ro".to_string(),
            }],
            cpu_percent: None,
            memory_mb: None,
        }
    }

    #[test]
    fn test_translate_state_mapping() {
        assert_eq!(translate_state("running"), ContainerStatus::Running);
        assert_eq!(translate_state("exited"), ContainerStatus::Exited);
        assert_eq!(translate_state("dead"), ContainerStatus::Error);
        assert_eq!(translate_state("restarting"), ContainerStatus::Error);
        assert_eq!(translate_state("created"), ContainerStatus::Stopped);
        assert_eq!(translate_state("paused"), ContainerStatus::Stopped);
    }

    #[test]
    fn test_translate_running_container() {
        let container = translate(&raw("running"));

        assert_eq!(container.name, "web");
        assert_eq!(container.status, ContainerStatus::Running);
        assert_eq!(container.health, HealthStatus::Healthy);
        assert_eq!(container.port, "8080:80");
        assert_eq!(container.uptime, "Up 2 hours");
        assert_eq!(container.created, "2023-10-25T08:00:00.000Z");
        assert_eq!(container.restart_policy, RestartPolicy::No);
        assert_eq!(container.volumes.len(), 1);
        assert_eq!(container.volumes[0].host_path, "/srv/www");
        assert_eq!(container.volumes[0].mode, "ro");
    }

    #[test]
    fn test_translate_non_running_has_no_health() {
        let container = translate(&raw("exited"));
        assert_eq!(container.health, HealthStatus::None);
        assert_eq!(container.cpu, 0.0);
        assert_eq!(container.memory, 0.0);
    }

    #[test]
    fn test_format_port_variants() {
        assert_eq!(format_port(&[]), "-");
        assert_eq!(
            format_port(&[RawPort {
                public_port: None,
                private_port: 6379
            }]),
            "6379"
        );
    }

    #[test]
    fn test_raw_container_parses_engine_schema() {
        let json = r#"[{
            "Id": "f00",
            "Names": ["/db"],
            "Image": "postgres:14",
            "State": "running",
            "Status": "Up 3 days",
            "Created": 0,
            "Ports": [{"PrivatePort": 5432, "PublicPort": 5432, "Type": "tcp"}],
            "Mounts": [],
            "Labels": {}
        }]"#;

        let parsed: Vec<RawContainer> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].names, vec!["/db".to_string()]);
        assert!(!parsed[0].has_usage());
    }

    #[tokio::test]
    async fn test_fetch_snapshot_from_source() {
        let mut server = mockito::Server::new_async().await;
        let containers = server
            .mock("GET", "/api/containers")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"Id":"a","Names":["/a"],"Image":"redis","State":"running"}]"#)
            .create_async()
            .await;
        let stats = server
            .mock("GET", "/api/stats")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"cpu": 12.5, "memory": 2097152}"#)
            .create_async()
            .await;

        let adapter = HttpSourceAdapter::new(&server.url(), Duration::from_secs(1)).unwrap();
        let snapshot = adapter.fetch_snapshot().await.unwrap();

        containers.assert_async().await;
        stats.assert_async().await;
        assert_eq!(snapshot.containers.len(), 1);
        assert_eq!(snapshot.stats.cpu, 12.5);
        assert_eq!(snapshot.stats.memory_mb(), 2.0);
    }

    #[tokio::test]
    async fn test_non_success_status_is_protocol_error() {
        let mut server = mockito::Server::new_async().await;
        let _containers = server
            .mock("GET", "/api/containers")
            .with_status(500)
            .create_async()
            .await;
        let _stats = server
            .mock("GET", "/api/stats")
            .with_status(200)
            .with_body(r#"{"cpu": 1.0, "memory": 0}"#)
            .create_async()
            .await;

        let adapter = HttpSourceAdapter::new(&server.url(), Duration::from_secs(1)).unwrap();
        let err = adapter.fetch_snapshot().await.unwrap_err();

        assert!(matches!(err, SourceError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_protocol_error() {
        let mut server = mockito::Server::new_async().await;
        let _containers = server
            .mock("GET", "/api/containers")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;
        let _stats = server
            .mock("GET", "/api/stats")
            .with_status(200)
            .with_body(r#"{"cpu": 1.0, "memory": 0}"#)
            .create_async()
            .await;

        let adapter = HttpSourceAdapter::new(&server.url(), Duration::from_secs(1)).unwrap();
        let err = adapter.fetch_snapshot().await.unwrap_err();

        assert!(matches!(err, SourceError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_closed_port_is_unreachable() {
        // Port 9 (discard) is not expected to have a listener in CI
        let adapter =
            HttpSourceAdapter::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let err = adapter.fetch_snapshot().await.unwrap_err();

        assert!(matches!(err, SourceError::Unreachable(_)));
    }
}
