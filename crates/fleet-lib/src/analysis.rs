//! Log analysis collaborator
//!
//! Sends a container's recent log lines to a text-generation service and
//! parses a structured verdict. The call never fails outward: without an
//! endpoint a canned simulated verdict is returned, and any transport or
//! parse failure yields a degraded low-severity verdict.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Number of trailing log lines sent for analysis
pub const ANALYSIS_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    pub suggested_fix: String,
    pub severity: Severity,
}

impl AnalysisResult {
    /// Verdict used when no analysis service is configured
    pub fn simulated(container_name: &str) -> Self {
        Self {
            summary: "API Key missing. This is a simulated analysis. The logs indicate a connection timeout."
                .to_string(),
            suggested_fix: format!("docker restart {}", container_name),
            severity: Severity::Medium,
        }
    }

    /// Verdict used when the analysis service could not be reached
    pub fn degraded() -> Self {
        Self {
            summary: "Failed to analyze logs using the analysis service.".to_string(),
            suggested_fix: "Check internet connection and API Key.".to_string(),
            severity: Severity::Low,
        }
    }
}

#[async_trait]
pub trait LogAnalyzer: Send + Sync {
    async fn analyze(&self, container_name: &str, logs: &[String]) -> AnalysisResult;
}

/// Analyzer used when no endpoint is configured
pub struct SimulatedAnalyzer;

#[async_trait]
impl LogAnalyzer for SimulatedAnalyzer {
    async fn analyze(&self, container_name: &str, _logs: &[String]) -> AnalysisResult {
        AnalysisResult::simulated(container_name)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisRequest<'a> {
    container_name: &'a str,
    prompt: String,
    logs: &'a [String],
}

pub struct HttpLogAnalyzer {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpLogAnalyzer {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid analysis endpoint: {}", endpoint))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    async fn request(&self, container_name: &str, logs: &[String]) -> anyhow::Result<AnalysisResult> {
        let tail = &logs[logs.len().saturating_sub(ANALYSIS_WINDOW)..];
        let body = AnalysisRequest {
            container_name,
            prompt: build_prompt(container_name, tail),
            logs: tail,
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.json::<AnalysisResult>().await?)
    }
}

#[async_trait]
impl LogAnalyzer for HttpLogAnalyzer {
    async fn analyze(&self, container_name: &str, logs: &[String]) -> AnalysisResult {
        match self.request(container_name, logs).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, container = %container_name, "Log analysis failed");
                AnalysisResult::degraded()
            }
        }
    }
}

fn build_prompt(container_name: &str, lines: &[String]) -> String {
    format!(
        "You are a DevOps expert. Analyze the following Docker container logs for container \"{}\".\n\
         Identify the root cause of any errors and suggest a specific fix (e.g., a docker command or config change).\n\n\
         Logs:\n{}",
        container_name,
        lines.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logs(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("line {}", i)).collect()
    }

    #[tokio::test]
    async fn test_simulated_analyzer_suggests_restart() {
        let result = SimulatedAnalyzer.analyze("worker-queue", &logs(3)).await;
        assert_eq!(result.severity, Severity::Medium);
        assert_eq!(result.suggested_fix, "docker restart worker-queue");
    }

    #[tokio::test]
    async fn test_http_analyzer_sends_tail_and_parses_verdict() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/analyze")
            .match_header("authorization", "Bearer key-123")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"containerName":"api-gateway","logs":["line 5","line 6","line 7","line 8","line 9","line 10","line 11","line 12","line 13","line 14","line 15","line 16","line 17","line 18","line 19","line 20","line 21","line 22","line 23","line 24"]}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"summary":"DB unreachable","suggestedFix":"check DB_HOST","severity":"high"}"#)
            .create_async()
            .await;

        let analyzer = HttpLogAnalyzer::new(
            &format!("{}/analyze", server.url()),
            Some("key-123".to_string()),
            Duration::from_secs(2),
        )
        .unwrap();

        let result = analyzer.analyze("api-gateway", &logs(25)).await;
        mock.assert_async().await;
        assert_eq!(result.severity, Severity::High);
        assert_eq!(result.suggested_fix, "check DB_HOST");
    }

    #[tokio::test]
    async fn test_http_analyzer_degrades_on_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/analyze")
            .with_status(500)
            .create_async()
            .await;

        let analyzer = HttpLogAnalyzer::new(
            &format!("{}/analyze", server.url()),
            None,
            Duration::from_secs(2),
        )
        .unwrap();

        assert_eq!(
            analyzer.analyze("web", &logs(2)).await,
            AnalysisResult::degraded()
        );
    }

    #[test]
    fn test_prompt_includes_container_and_lines() {
        let prompt = build_prompt("db", &logs(2));
        assert!(prompt.contains("\"db\""));
        assert!(prompt.ends_with("line 0\nline 1"));
    }
}
