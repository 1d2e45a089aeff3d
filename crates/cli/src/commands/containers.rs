//! Fleet listing, inspection and deployment commands

use anyhow::{bail, Result};
use colored::Colorize;
use std::collections::BTreeMap;
use tabled::Tabled;

use crate::client::{AnalysisResult, ApiClient, Container, DeployRequest, FleetView, RefreshResponse};
use crate::output::{
    color_status, format_cpu, format_memory, print_info, print_json, print_success, print_table,
    print_warning, OutputFormat,
};

/// Row for the container table
#[derive(Tabled)]
struct ContainerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Image")]
    image: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Health")]
    health: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Ports")]
    port: String,
    #[tabled(rename = "Uptime")]
    uptime: String,
}

impl From<&Container> for ContainerRow {
    fn from(c: &Container) -> Self {
        Self {
            id: c.id.chars().take(12).collect(),
            name: c.name.clone(),
            image: c.image.clone(),
            status: color_status(&c.status),
            health: color_status(&c.health),
            cpu: format_cpu(c.cpu, c.cpu_limit),
            memory: format!("{} / {}", format_memory(c.memory), format_memory(c.memory_limit)),
            port: c.port.clone(),
            uptime: c.uptime.clone(),
        }
    }
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
}

/// Query string for the view endpoint
pub fn view_path(
    search: Option<&str>,
    status: Option<&str>,
    sort: Option<&str>,
    descending: bool,
) -> String {
    let mut params = Vec::new();
    if let Some(search) = search {
        params.push(format!("search={}", encode(search)));
    }
    if let Some(status) = status {
        params.push(format!("status={}", encode(status)));
    }
    if let Some(sort) = sort {
        params.push(format!("sort={}", encode(sort)));
    }
    if descending {
        params.push("direction=desc".to_string());
    }

    if params.is_empty() {
        "api/v1/view".to_string()
    } else {
        format!("api/v1/view?{}", params.join("&"))
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Find a container by id, id prefix or exact name
pub async fn resolve(client: &ApiClient, key: &str) -> Result<Container> {
    let view: FleetView = client.get("api/v1/view").await?;
    let matches: Vec<&Container> = view
        .containers
        .iter()
        .filter(|c| c.id == key || c.name == key || c.id.starts_with(key))
        .collect();

    match matches.as_slice() {
        [] => bail!("No container matches '{}'", key),
        [one] => Ok((*one).clone()),
        _ => match matches.iter().find(|c| c.name == key || c.id == key) {
            Some(exact) => Ok((*exact).clone()),
            None => bail!("'{}' matches {} containers", key, matches.len()),
        },
    }
}

pub async fn list(
    client: &ApiClient,
    search: Option<String>,
    status: Option<String>,
    sort: Option<String>,
    descending: bool,
    format: OutputFormat,
) -> Result<()> {
    let path = view_path(search.as_deref(), status.as_deref(), sort.as_deref(), descending);
    let view: FleetView = client.get(&path).await?;

    match format {
        OutputFormat::Json => print_json(&view.containers)?,
        OutputFormat::Table => {
            let rows: Vec<ContainerRow> = view.containers.iter().map(ContainerRow::from).collect();
            print_table(&rows);
            println!(
                "{} of {} containers ({} running, {} stopped, {} exited, {} error) [{}]",
                view.containers.len(),
                view.total,
                view.breakdown.running,
                view.breakdown.stopped,
                view.breakdown.exited,
                view.breakdown.error,
                color_status(&view.mode)
            );
            if let Some(pending) = &view.pending {
                print_warning(&format!(
                    "Pending {} of '{}' ({}). Run `fleetctl confirm` or `fleetctl cancel`.",
                    pending.action, pending.target_name, pending.phase
                ));
            }
        }
    }

    Ok(())
}

pub async fn inspect(client: &ApiClient, key: &str, logs: usize, format: OutputFormat) -> Result<()> {
    let container = resolve(client, key).await?;
    // Binds the server-side detail view so a concurrent delete clears it
    let container: Container = client
        .post_empty(&format!("api/v1/containers/{}/view", container.id))
        .await?;

    match format {
        OutputFormat::Json => print_json(&container)?,
        OutputFormat::Table => {
            println!("{}", container.name.bold());
            println!("{}", "=".repeat(50));
            println!("ID:             {}", container.id);
            println!("Image:          {}", container.image.cyan());
            println!("Status:         {}", color_status(&container.status));
            println!("Health:         {}", color_status(&container.health));
            println!("Created:        {}", container.created);
            println!("Uptime:         {}", container.uptime);
            println!("Ports:          {}", container.port);
            println!("Restart:        {}", container.restart_policy);
            println!("CPU:            {}", format_cpu(container.cpu, container.cpu_limit));
            println!(
                "Memory:         {} / {}",
                format_memory(container.memory),
                format_memory(container.memory_limit)
            );

            if !container.env_vars.is_empty() {
                println!();
                println!("{}", "Environment".bold());
                for (key, value) in &container.env_vars {
                    println!("  {}={}", key, value);
                }
            }

            println!();
            println!("{}", "Logs".bold());
            let start = container.logs.len().saturating_sub(logs);
            for line in &container.logs[start..] {
                println!("  {}", line.dimmed());
            }
        }
    }

    Ok(())
}

/// Parse `KEY=VALUE` pairs
pub fn parse_env(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();
    for pair in pairs {
        match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                env.insert(key.to_string(), value.to_string());
            }
            _ => bail!("Invalid environment variable '{}', expected KEY=VALUE", pair),
        }
    }
    Ok(env)
}

pub async fn deploy(client: &ApiClient, request: DeployRequest, format: OutputFormat) -> Result<()> {
    let container: Container = client.post("api/v1/containers", &request).await?;

    match format {
        OutputFormat::Json => print_json(&container)?,
        OutputFormat::Table => {
            print_success(&format!(
                "Container {} deployed ({})",
                container.name.bold(),
                container.id
            ));
        }
    }

    Ok(())
}

pub async fn metrics(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let view: FleetView = client.get("api/v1/view").await?;

    match format {
        OutputFormat::Json => print_json(&view.metrics)?,
        OutputFormat::Table => {
            let rows: Vec<MetricRow> = view
                .metrics
                .iter()
                .map(|p| MetricRow {
                    time: p.time.clone(),
                    cpu: format!("{:.1}%", p.value),
                    memory: format_memory(p.value2),
                })
                .collect();
            print_table(&rows);
            print_info(&format!("Mode: {}", color_status(&view.mode)));
        }
    }

    Ok(())
}

pub async fn analyze(client: &ApiClient, key: &str, format: OutputFormat) -> Result<()> {
    let container = resolve(client, key).await?;
    let result: AnalysisResult = client
        .get(&format!("api/v1/containers/{}/analysis", container.id))
        .await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{} {}", "Analysis of".bold(), container.name.bold());
            println!("{}", "-".repeat(50));
            println!("Severity:       {}", color_status(&result.severity));
            println!("Summary:        {}", result.summary);
            println!("Suggested fix:  {}", result.suggested_fix.cyan());
        }
    }

    Ok(())
}

pub async fn refresh(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let response: RefreshResponse = client.post_empty("api/v1/refresh").await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => print_success(&format!("Dashboard data refreshed ({})", response.mode)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_path_builds_query() {
        assert_eq!(view_path(None, None, None, false), "api/v1/view");
        assert_eq!(
            view_path(Some("web server"), Some("running"), Some("cpu"), true),
            "api/v1/view?search=web+server&status=running&sort=cpu&direction=desc"
        );
    }

    #[test]
    fn test_parse_env() {
        let env = parse_env(&["A=1".to_string(), "URL=postgres://x?a=b".to_string()]).unwrap();
        assert_eq!(env["A"], "1");
        assert_eq!(env["URL"], "postgres://x?a=b");
        assert!(parse_env(&["novalue".to_string()]).is_err());
        assert!(parse_env(&["=1".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_resolve_by_name_and_prefix() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/view")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "containers": [
                        container_json("a1b2c3d4e5f6", "api-gateway"),
                        container_json("a1ffffffffff", "auth"),
                    ],
                    "mode": "simulated",
                    "metrics": [],
                    "breakdown": {"running": 2, "stopped": 0, "exited": 0, "error": 0},
                    "total": 2,
                    "pending": null,
                    "notifications": [],
                    "detail": null,
                    "canManage": true
                })
                .to_string(),
            )
            .expect_at_least(1)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), "admin").unwrap();

        assert_eq!(resolve(&client, "auth").await.unwrap().id, "a1ffffffffff");
        assert_eq!(resolve(&client, "a1b2").await.unwrap().name, "api-gateway");
        assert!(resolve(&client, "a1").await.is_err());
        assert!(resolve(&client, "zzz").await.is_err());
    }

    fn container_json(id: &str, name: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "name": name,
            "image": "nginx:latest",
            "status": "RUNNING",
            "health": "healthy",
            "created": "2 days ago",
            "uptime": "Up 2 days",
            "port": "80:80",
            "cpu": 1.5,
            "cpuLimit": 100.0,
            "memory": 64.0,
            "memoryLimit": 512.0,
            "logs": [],
            "envVars": {},
            "volumes": [],
            "restartPolicy": "always"
        })
    }
}
