//! Reconciliation loop
//!
//! Runs one tick per fixed interval until shut down. A tick always completes
//! (including its network call) before the next one is scheduled, and source
//! failures never escape it: they only flip the connection mode.

use super::refresh::ManualRefresh;
use super::simulator::{RandomSource, ThreadRandom};
use super::strategy::{LiveStrategy, ReconcileStrategy, SimulatedStrategy, TickOutcome};
use super::{SnapshotSource, SourceError};
use crate::fleet::FleetStore;
use crate::health::{components, HealthRegistry};
use crate::models::ConnectionMode;
use crate::observability::{FleetMetrics, StructuredLogger};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Configuration for the reconciliation loop
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Tick interval (default: 2 seconds)
    pub interval: Duration,
    /// Upper bound on one source fetch (default: 1 second)
    pub source_timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            source_timeout: Duration::from_secs(1),
        }
    }
}

/// Owner of the authoritative fleet state
pub struct Reconciler {
    source: Arc<dyn SnapshotSource>,
    store: FleetStore,
    config: ReconcilerConfig,
    rng: Box<dyn RandomSource>,
    health: Option<HealthRegistry>,
    metrics: Option<FleetMetrics>,
    logger: Option<StructuredLogger>,
    tick_count: u64,
}

impl Reconciler {
    pub fn new(source: Arc<dyn SnapshotSource>, store: FleetStore, config: ReconcilerConfig) -> Self {
        Self {
            source,
            store,
            config,
            rng: Box::new(ThreadRandom::new()),
            health: None,
            metrics: None,
            logger: None,
            tick_count: 0,
        }
    }

    /// Handle to the fleet state; lifecycle mutations go through it
    pub fn store(&self) -> FleetStore {
        self.store.clone()
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Out-of-band refresh sharing this reconciler's source and store
    pub fn manual_refresh(&self) -> ManualRefresh {
        ManualRefresh::new(self.source.clone(), self.store.clone(), self.config.source_timeout)
    }

    /// Run ticks until `shutdown` fires
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            source = %self.source.describe(),
            "Starting fleet reconciliation loop"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.tick().await;

                    if self.tick_count % 30 == 0 {
                        debug!(
                            mode = %outcome.mode,
                            containers = outcome.containers,
                            running = outcome.running,
                            "Reconciliation cycle complete"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down fleet reconciliation loop");
                    break;
                }
            }
        }
    }

    /// One reconciliation cycle. Never fails.
    pub async fn tick(&mut self) -> TickOutcome {
        let start = Instant::now();
        let fetched = match timeout(self.config.source_timeout, self.source.fetch_snapshot()).await
        {
            Ok(result) => result,
            Err(_) => Err(SourceError::Unreachable(format!(
                "no response within {}ms",
                self.config.source_timeout.as_millis()
            ))),
        };

        let source_error = fetched.as_ref().err().cloned();
        let mut strategy: Box<dyn ReconcileStrategy> = match fetched {
            Ok(snapshot) => Box::new(LiveStrategy::new(snapshot)),
            Err(_) => Box::new(SimulatedStrategy::new()),
        };

        let time_label = chrono::Local::now().format("%H:%M:%S").to_string();
        let (previous_mode, outcome) = {
            let mut state = self.store.write().await;
            let previous_mode = state.mode;
            let outcome = strategy.apply(&mut state, self.rng.as_mut(), &time_label);
            (previous_mode, outcome)
        };
        self.tick_count += 1;

        if let Some(err) = &source_error {
            debug!(error = %err, "Telemetry source unavailable, simulating");
        }
        self.report(previous_mode, &outcome, source_error.as_ref(), start.elapsed())
            .await;

        outcome
    }

    async fn report(
        &self,
        previous_mode: ConnectionMode,
        outcome: &TickOutcome,
        source_error: Option<&SourceError>,
        elapsed: Duration,
    ) {
        if let Some(metrics) = &self.metrics {
            metrics.observe_tick_latency(elapsed.as_secs_f64());
            metrics.inc_ticks();
            metrics.set_connection_mode(outcome.mode);
            metrics.set_containers(outcome.containers as i64, outcome.running as i64);
            if source_error.is_some() {
                metrics.inc_source_errors();
            }
        }

        if previous_mode != outcome.mode {
            if let Some(logger) = &self.logger {
                logger.log_mode_change(previous_mode, outcome.mode, source_error);
            }
        }

        if let Some(health) = &self.health {
            health.set_healthy(components::RECONCILER).await;
            match source_error {
                None => health.set_healthy(components::SOURCE_ADAPTER).await,
                Some(err) => {
                    health
                        .set_degraded(components::SOURCE_ADAPTER, format!("simulating: {}", err))
                        .await
                }
            }
        }
    }
}

/// Builder for creating the reconciler
pub struct ReconcilerBuilder {
    source: Option<Arc<dyn SnapshotSource>>,
    store: Option<FleetStore>,
    config: ReconcilerConfig,
    rng: Option<Box<dyn RandomSource>>,
    health: Option<HealthRegistry>,
    metrics: Option<FleetMetrics>,
    logger: Option<StructuredLogger>,
}

impl ReconcilerBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            store: None,
            config: ReconcilerConfig::default(),
            rng: None,
            health: None,
            metrics: None,
            logger: None,
        }
    }

    /// Set the telemetry source
    pub fn source(mut self, source: Arc<dyn SnapshotSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Start from an existing fleet store (defaults to an empty fleet)
    pub fn store(mut self, store: FleetStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the tick interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Set the per-tick source timeout
    pub fn source_timeout(mut self, timeout: Duration) -> Self {
        self.config.source_timeout = timeout;
        self
    }

    /// Inject the random source driving the simulation
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

    /// Build the reconciler
    pub fn build(self) -> Result<Reconciler> {
        let source = self
            .source
            .ok_or_else(|| anyhow::anyhow!("Telemetry source is required"))?;

        let mut reconciler =
            Reconciler::new(source, self.store.unwrap_or_default(), self.config);
        if let Some(rng) = self.rng {
            reconciler.rng = rng;
        }
        reconciler.health = self.health;
        reconciler.metrics = self.metrics;
        reconciler.logger = self.logger;

        Ok(reconciler)
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
