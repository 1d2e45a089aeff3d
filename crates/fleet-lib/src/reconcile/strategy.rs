//! Reconciliation strategies
//!
//! One tick applies exactly one strategy to the fleet, chosen by whether the
//! source answered: [`LiveStrategy`] merges a snapshot, [`SimulatedStrategy`]
//! advances the simulated telemetry walk.

use super::simulator::{clamp_cpu, clamp_memory, RandomSource, TelemetrySimulator};
use super::source::{translate, Snapshot};
use crate::fleet::FleetState;
use crate::models::{ConnectionMode, Container, MetricPoint};
use std::collections::HashMap;

/// Maximum jitter added to the simulated aggregate CPU
const AGGREGATE_CPU_JITTER: f64 = 2.5;
/// Maximum jitter added to the simulated aggregate memory (MB)
const AGGREGATE_MEMORY_JITTER: f64 = 5.0;

/// What one tick did to the fleet
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub mode: ConnectionMode,
    pub containers: usize,
    pub running: usize,
    /// Containers dropped because the source no longer reports them
    pub pruned: usize,
    pub point: MetricPoint,
}

/// A way of advancing the fleet by one tick
pub trait ReconcileStrategy: Send {
    fn mode(&self) -> ConnectionMode;

    /// Apply the tick inside the fleet's critical section
    fn apply(
        &mut self,
        state: &mut FleetState,
        rng: &mut dyn RandomSource,
        time_label: &str,
    ) -> TickOutcome;
}

/// Merge a fresh snapshot from the live source
pub struct LiveStrategy {
    snapshot: Option<Snapshot>,
    simulator: TelemetrySimulator,
}

impl LiveStrategy {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            simulator: TelemetrySimulator::new(),
        }
    }

    /// Adapter values win when present. A value the adapter left out keeps
    /// walking from the previous one, or is seeded for a fresh container.
    fn merge_usage(
        &self,
        incoming: &mut Container,
        previous: Option<&Container>,
        cpu: Option<f64>,
        memory: Option<f64>,
        rng: &mut dyn RandomSource,
    ) {
        if !incoming.is_running() {
            return;
        }

        if let (Some(cpu), Some(memory)) = (cpu, memory) {
            incoming.cpu = clamp_cpu(cpu, incoming.cpu_limit);
            incoming.memory = clamp_memory(memory, incoming.memory_limit);
            return;
        }

        let (walked_cpu, walked_memory) = match previous.filter(|p| p.is_running()) {
            Some(prev) => self.simulator.walk_usage(
                prev.cpu,
                prev.memory,
                incoming.cpu_limit,
                incoming.memory_limit,
                rng,
            ),
            None => self
                .simulator
                .seed_usage(incoming.cpu_limit, incoming.memory_limit, rng),
        };
        incoming.cpu = clamp_cpu(cpu.unwrap_or(walked_cpu), incoming.cpu_limit);
        incoming.memory = clamp_memory(memory.unwrap_or(walked_memory), incoming.memory_limit);
    }
}

impl ReconcileStrategy for LiveStrategy {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::Live
    }

    fn apply(
        &mut self,
        state: &mut FleetState,
        rng: &mut dyn RandomSource,
        time_label: &str,
    ) -> TickOutcome {
        let snapshot = self.snapshot.take().unwrap_or_default();

        let mut previous: HashMap<String, Container> = state
            .containers_mut()
            .drain(..)
            .map(|c| (c.id.clone(), c))
            .collect();

        let mut merged = Vec::with_capacity(snapshot.containers.len());
        for raw in &snapshot.containers {
            let mut incoming = translate(raw);
            let prev = previous.remove(&raw.id);

            self.merge_usage(
                &mut incoming,
                prev.as_ref(),
                raw.cpu_percent,
                raw.memory_mb,
                rng,
            );

            if let Some(prev) = prev {
                // The source has no log endpoint; local history (audit
                // entries included) is append-only and survives the merge.
                incoming.logs = prev.logs;
                if incoming.env_vars.is_empty() {
                    incoming.env_vars = prev.env_vars;
                }
            }

            incoming.settle_if_not_running();
            merged.push(incoming);
        }

        let pruned = previous.len();
        *state.containers_mut() = merged;

        if let Some(id) = state.detail_view.clone() {
            if state.get(&id).is_none() {
                state.detail_view = None;
            }
        }

        state.mode = ConnectionMode::Live;
        let point = MetricPoint {
            time: time_label.to_string(),
            value: snapshot.stats.cpu,
            value2: snapshot.stats.memory_mb(),
        };
        state.series.push(point.clone());

        TickOutcome {
            mode: ConnectionMode::Live,
            containers: state.len(),
            running: state.running().count(),
            pruned,
            point,
        }
    }
}

/// Advance every running container through the simulator
#[derive(Default)]
pub struct SimulatedStrategy {
    simulator: TelemetrySimulator,
}

impl SimulatedStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReconcileStrategy for SimulatedStrategy {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::Simulated
    }

    fn apply(
        &mut self,
        state: &mut FleetState,
        rng: &mut dyn RandomSource,
        time_label: &str,
    ) -> TickOutcome {
        state.mode = ConnectionMode::Simulated;

        let mut total_cpu = 0.0;
        let mut total_memory = 0.0;
        let mut running = 0;

        for container in state.containers_mut().iter_mut() {
            if container.is_running() {
                self.simulator.step(container, rng).apply_to(container);
                total_cpu += container.cpu;
                total_memory += container.memory;
                running += 1;
            } else {
                container.settle_if_not_running();
            }
        }

        let point = MetricPoint {
            time: time_label.to_string(),
            value: (total_cpu + rng.uniform(-AGGREGATE_CPU_JITTER, AGGREGATE_CPU_JITTER)).max(0.0),
            value2: (total_memory + rng.uniform(-AGGREGATE_MEMORY_JITTER, AGGREGATE_MEMORY_JITTER))
                .max(0.0),
        };
        state.series.push(point.clone());

        TickOutcome {
            mode: ConnectionMode::Simulated,
            containers: state.len(),
            running,
            pruned: 0,
            point,
        }
    }
}
