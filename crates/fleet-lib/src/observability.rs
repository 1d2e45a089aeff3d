//! Observability infrastructure for the fleet dashboard
//!
//! Provides:
//! - Prometheus metrics (tick latency, connection mode, fleet size, actions)
//! - Structured JSON logging of fleet events with tracing

use crate::models::ConnectionMode;
use crate::reconcile::SourceError;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for tick latency (in seconds)
const TICK_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<FleetMetricsInner> = OnceLock::new();

struct FleetMetricsInner {
    tick_latency_seconds: Histogram,
    ticks: IntCounter,
    source_errors: IntCounter,
    connection_live: IntGauge,
    containers_tracked: IntGauge,
    containers_running: IntGauge,
    actions_applied: IntCounterVec,
    actions_rejected: IntCounterVec,
}

impl FleetMetricsInner {
    fn new() -> Self {
        Self {
            tick_latency_seconds: register_histogram!(
                "fleet_reconcile_tick_latency_seconds",
                "Time spent in one reconciliation tick, including the source fetch",
                TICK_BUCKETS.to_vec()
            )
            .expect("Failed to register tick_latency_seconds"),

            ticks: register_int_counter!(
                "fleet_reconcile_ticks_total",
                "Total number of reconciliation ticks"
            )
            .expect("Failed to register ticks_total"),

            source_errors: register_int_counter!(
                "fleet_source_errors_total",
                "Ticks where the telemetry source was unreachable or malformed"
            )
            .expect("Failed to register source_errors_total"),

            connection_live: register_int_gauge!(
                "fleet_connection_live",
                "1 while driven by the live source, 0 while simulated"
            )
            .expect("Failed to register connection_live"),

            containers_tracked: register_int_gauge!(
                "fleet_containers_tracked",
                "Number of containers in the fleet view"
            )
            .expect("Failed to register containers_tracked"),

            containers_running: register_int_gauge!(
                "fleet_containers_running",
                "Number of running containers in the fleet view"
            )
            .expect("Failed to register containers_running"),

            actions_applied: register_int_counter_vec!(
                "fleet_actions_applied_total",
                "Lifecycle actions applied, by action",
                &["action"]
            )
            .expect("Failed to register actions_applied_total"),

            actions_rejected: register_int_counter_vec!(
                "fleet_actions_rejected_total",
                "Mutations rejected before any state change, by reason",
                &["reason"]
            )
            .expect("Failed to register actions_rejected_total"),
        }
    }
}

/// Handle to the global fleet metrics; clones share the same registry entries
#[derive(Clone)]
pub struct FleetMetrics {
    _private: (),
}

impl std::fmt::Debug for FleetMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetMetrics").finish()
    }
}

impl Default for FleetMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(FleetMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &FleetMetricsInner {
        GLOBAL_METRICS.get_or_init(FleetMetricsInner::new)
    }

    pub fn observe_tick_latency(&self, duration_secs: f64) {
        self.inner().tick_latency_seconds.observe(duration_secs);
    }

    pub fn inc_ticks(&self) {
        self.inner().ticks.inc();
    }

    pub fn inc_source_errors(&self) {
        self.inner().source_errors.inc();
    }

    pub fn set_connection_mode(&self, mode: ConnectionMode) {
        self.inner()
            .connection_live
            .set(i64::from(mode == ConnectionMode::Live));
    }

    pub fn set_containers(&self, tracked: i64, running: i64) {
        self.inner().containers_tracked.set(tracked);
        self.inner().containers_running.set(running);
    }

    pub fn inc_action_applied(&self, action: &str) {
        self.inner()
            .actions_applied
            .with_label_values(&[action])
            .inc();
    }

    pub fn inc_action_rejected(&self, reason: &str) {
        self.inner()
            .actions_rejected
            .with_label_values(&[reason])
            .inc();
    }
}

/// Structured logger for fleet events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_startup(&self, version: &str, source: &str) {
        info!(
            event = "dashboard_started",
            instance = %self.instance,
            version = %version,
            source = %source,
            "Fleet dashboard started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "dashboard_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Fleet dashboard shutting down"
        );
    }

    pub fn log_mode_change(
        &self,
        from: ConnectionMode,
        to: ConnectionMode,
        cause: Option<&SourceError>,
    ) {
        match to {
            ConnectionMode::Live => info!(
                event = "connection_mode_changed",
                instance = %self.instance,
                from = %from,
                to = %to,
                "Telemetry source reachable, switching to live data"
            ),
            ConnectionMode::Simulated => warn!(
                event = "connection_mode_changed",
                instance = %self.instance,
                from = %from,
                to = %to,
                cause = ?cause.map(|e| e.to_string()),
                "Telemetry source unavailable, falling back to simulation"
            ),
        }
    }

    pub fn log_action_applied(&self, actor: &str, action: &str, target: &str) {
        info!(
            event = "action_applied",
            instance = %self.instance,
            actor = %actor,
            action = %action,
            target = %target,
            "Lifecycle action applied"
        );
    }

    pub fn log_action_rejected(&self, actor: &str, action: &str, target: &str, reason: &str) {
        warn!(
            event = "action_rejected",
            instance = %self.instance,
            actor = %actor,
            action = %action,
            target = %target,
            reason = %reason,
            "Mutation rejected"
        );
    }

    pub fn log_container_deployed(&self, actor: &str, name: &str, image: &str) {
        info!(
            event = "container_deployed",
            instance = %self.instance,
            actor = %actor,
            name = %name,
            image = %image,
            "Container deployed"
        );
    }
}
