//! Fleet reconciliation
//!
//! This module keeps the in-memory fleet synchronized with an external
//! telemetry source that may be intermittently unreachable. Each tick tries
//! the source and either merges its snapshot (live) or advances a simulated
//! telemetry walk (simulated), appending one point to the telemetry window
//! either way.

mod r#loop;
mod refresh;
mod simulator;
mod source;
mod strategy;

#[cfg(test)]
mod tests;

pub use r#loop::{Reconciler, ReconcilerBuilder, ReconcilerConfig};
pub use refresh::{ManualRefresh, RefreshOutcome};
pub use simulator::{
    next_health, RandomSource, ScriptedRandom, TelemetrySimulator, TelemetryStep, ThreadRandom,
    CPU_STEP, MEMORY_FLOOR, MEMORY_STEP,
};
pub use source::{
    format_port, translate, translate_state, HttpSourceAdapter, RawContainer, RawMount, RawPort,
    Snapshot, SourceError, SystemStats, DEFAULT_CPU_LIMIT, DEFAULT_MEMORY_LIMIT,
};
pub use strategy::{LiveStrategy, ReconcileStrategy, SimulatedStrategy, TickOutcome};

pub use async_trait::async_trait;

/// Trait for telemetry source implementations
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the container list and system-wide stats
    async fn fetch_snapshot(&self) -> Result<Snapshot, SourceError>;

    /// Human readable description for logs
    fn describe(&self) -> String;
}

/// Source that is never reachable; keeps the dashboard in simulated mode
pub struct OfflineSource;

#[async_trait]
impl SnapshotSource for OfflineSource {
    async fn fetch_snapshot(&self) -> Result<Snapshot, SourceError> {
        Err(SourceError::Unreachable("no telemetry source configured".to_string()))
    }

    fn describe(&self) -> String {
        "offline".to_string()
    }
}
