//! Operator-triggered refresh
//!
//! Live mode: fetch and merge immediately instead of waiting for the next
//! tick. Simulated mode (or a failed fetch): re-sample every running
//! container so the operator sees fresh numbers.

use super::simulator::{RandomSource, TelemetrySimulator, ThreadRandom};
use super::strategy::{LiveStrategy, ReconcileStrategy};
use super::SnapshotSource;
use crate::fleet::FleetStore;
use crate::models::ConnectionMode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// What a manual refresh ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A snapshot was fetched and merged
    Fetched,
    /// Running containers were re-sampled locally
    Resampled { containers: usize },
}

impl RefreshOutcome {
    pub fn mode(&self) -> ConnectionMode {
        match self {
            RefreshOutcome::Fetched => ConnectionMode::Live,
            RefreshOutcome::Resampled { .. } => ConnectionMode::Simulated,
        }
    }
}

/// Cloneable handle that refreshes the fleet out of band
#[derive(Clone)]
pub struct ManualRefresh {
    source: Arc<dyn SnapshotSource>,
    store: FleetStore,
    source_timeout: Duration,
    rng: Arc<Mutex<Box<dyn RandomSource>>>,
}

impl ManualRefresh {
    pub fn new(source: Arc<dyn SnapshotSource>, store: FleetStore, source_timeout: Duration) -> Self {
        Self::with_random(source, store, source_timeout, Box::new(ThreadRandom::new()))
    }

    pub fn with_random(
        source: Arc<dyn SnapshotSource>,
        store: FleetStore,
        source_timeout: Duration,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        Self {
            source,
            store,
            source_timeout,
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    pub async fn run(&self) -> RefreshOutcome {
        let live = self.store.mode().await == ConnectionMode::Live;

        if live {
            match timeout(self.source_timeout, self.source.fetch_snapshot()).await {
                Ok(Ok(snapshot)) => {
                    let time_label = chrono::Local::now().format("%H:%M:%S").to_string();
                    let mut state = self.store.write().await;
                    let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
                    LiveStrategy::new(snapshot).apply(&mut state, rng.as_mut(), &time_label);
                    return RefreshOutcome::Fetched;
                }
                Ok(Err(err)) => debug!(error = %err, "Manual refresh fetch failed, resampling"),
                Err(_) => debug!("Manual refresh fetch timed out, resampling"),
            }
        }

        let simulator = TelemetrySimulator::new();
        let mut state = self.store.write().await;
        state.mode = ConnectionMode::Simulated;
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let mut containers = 0;
        for container in state.containers_mut().iter_mut() {
            if container.is_running() {
                simulator.reroll(container, rng.as_mut()).apply_to(container);
                containers += 1;
            }
        }

        RefreshOutcome::Resampled { containers }
    }
}
