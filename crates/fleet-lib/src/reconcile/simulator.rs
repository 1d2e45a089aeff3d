//! Simulated telemetry
//!
//! Produces plausible per-container CPU/memory/health deltas while no live
//! source is reachable. All randomness flows through [`RandomSource`] so the
//! walk is reproducible under test.

use crate::models::{Container, HealthStatus};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Maximum CPU change per tick (percentage points)
pub const CPU_STEP: f64 = 2.0;
/// Maximum memory change per tick (MB)
pub const MEMORY_STEP: f64 = 10.0;
/// Memory never drops below this while running (MB)
pub const MEMORY_FLOOR: f64 = 10.0;
/// Smallest CPU a freshly started container reports
pub const SEED_CPU_MIN: f64 = 0.1;

/// Source of uniform draws in `[0, 1)`
pub trait RandomSource: Send + Sync {
    fn next_f64(&mut self) -> f64;

    /// Uniform draw in `[low, high)`
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }
}

/// OS-seeded random source used in production
pub struct ThreadRandom {
    rng: StdRng,
}

impl ThreadRandom {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for ThreadRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for ThreadRandom {
    fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed sequence of draws, cycling when exhausted
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    draws: Vec<f64>,
    cursor: usize,
}

impl ScriptedRandom {
    /// An empty script replays a single `0.0` draw
    pub fn new(draws: Vec<f64>) -> Self {
        let draws = if draws.is_empty() { vec![0.0] } else { draws };
        Self { draws, cursor: 0 }
    }

    /// Source that always returns `draw`
    pub fn constant(draw: f64) -> Self {
        Self::new(vec![draw])
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&mut self) -> f64 {
        let value = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        value
    }
}

/// Health transition for one tick given a uniform draw.
///
/// Rare degradation (`> 0.98` unhealthy, `> 0.96` starting), frequent
/// recovery (`< 0.90` back to healthy), otherwise unchanged.
pub fn next_health(current: HealthStatus, draw: f64) -> HealthStatus {
    if draw > 0.98 {
        HealthStatus::Unhealthy
    } else if draw > 0.96 {
        HealthStatus::Starting
    } else if draw < 0.90 && current != HealthStatus::Healthy {
        HealthStatus::Healthy
    } else {
        current
    }
}

/// Result of one simulation step for a running container
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryStep {
    pub cpu: f64,
    pub memory: f64,
    pub health: HealthStatus,
}

impl TelemetryStep {
    pub fn apply_to(&self, container: &mut Container) {
        container.cpu = self.cpu;
        container.memory = self.memory;
        container.health = self.health;
    }
}

/// Random-walk telemetry generator
#[derive(Debug, Clone, Copy, Default)]
pub struct TelemetrySimulator;

impl TelemetrySimulator {
    pub fn new() -> Self {
        Self
    }

    /// Advance one tick. Draw order: health, cpu, memory.
    pub fn step(&self, container: &Container, rng: &mut dyn RandomSource) -> TelemetryStep {
        let health = next_health(container.health, rng.next_f64());
        let (cpu, memory) = self.walk_usage(
            container.cpu,
            container.memory,
            container.cpu_limit,
            container.memory_limit,
            rng,
        );
        TelemetryStep {
            cpu,
            memory,
            health,
        }
    }

    /// Bounded random walk of cpu/memory without touching health
    pub fn walk_usage(
        &self,
        cpu: f64,
        memory: f64,
        cpu_limit: f64,
        memory_limit: f64,
        rng: &mut dyn RandomSource,
    ) -> (f64, f64) {
        let cpu = clamp_cpu(cpu + rng.uniform(-CPU_STEP, CPU_STEP), cpu_limit);
        let memory = clamp_memory(memory + rng.uniform(-MEMORY_STEP, MEMORY_STEP), memory_limit);
        (cpu, memory)
    }

    /// Starting usage for a container that just came up
    pub fn seed_usage(
        &self,
        cpu_limit: f64,
        memory_limit: f64,
        rng: &mut dyn RandomSource,
    ) -> (f64, f64) {
        let cpu = clamp_cpu(rng.uniform(SEED_CPU_MIN, 5.0), cpu_limit);
        let memory = clamp_memory(rng.uniform(MEMORY_FLOOR, 100.0), memory_limit);
        (cpu, memory)
    }

    /// Fresh sample used by a manual refresh
    pub fn reroll(&self, container: &Container, rng: &mut dyn RandomSource) -> TelemetryStep {
        let cpu = clamp_cpu(
            rng.uniform(0.0, container.cpu_limit * 0.5),
            container.cpu_limit,
        );
        let memory = clamp_memory(
            rng.uniform(50.0, 50.0 + container.memory_limit * 0.8),
            container.memory_limit,
        );
        let health = if rng.next_f64() > 0.9 {
            HealthStatus::Starting
        } else {
            HealthStatus::Healthy
        };
        TelemetryStep {
            cpu,
            memory,
            health,
        }
    }
}

pub(crate) fn clamp_cpu(cpu: f64, limit: f64) -> f64 {
    cpu.clamp(0.0, limit.max(0.0))
}

pub(crate) fn clamp_memory(memory: f64, limit: f64) -> f64 {
    let limit = limit.max(0.0);
    memory.clamp(MEMORY_FLOOR.min(limit), limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContainerStatus;
    use crate::seed;

    fn running(cpu: f64, memory: f64, health: HealthStatus) -> Container {
        let mut container = seed::demo_containers().remove(0);
        container.status = ContainerStatus::Running;
        container.cpu = cpu;
        container.memory = memory;
        container.health = health;
        container
    }

    #[test]
    fn test_next_health_thresholds() {
        use HealthStatus::*;

        assert_eq!(next_health(Healthy, 0.99), Unhealthy);
        assert_eq!(next_health(Healthy, 0.97), Starting);
        assert_eq!(next_health(Unhealthy, 0.5), Healthy);
        assert_eq!(next_health(Starting, 0.89), Healthy);
        // Between 0.90 and 0.96 nothing changes
        assert_eq!(next_health(Unhealthy, 0.93), Unhealthy);
        assert_eq!(next_health(Healthy, 0.93), Healthy);
        assert_eq!(next_health(Healthy, 0.1), Healthy);
        // Boundaries are exclusive
        assert_eq!(next_health(Healthy, 0.98), Starting);
        assert_eq!(next_health(Healthy, 0.96), Healthy);
        assert_eq!(next_health(Starting, 0.90), Starting);
    }

    #[test]
    fn test_step_uses_draws_in_order() {
        let container = running(10.0, 100.0, HealthStatus::Starting);
        // health 0.5 -> healthy, cpu draw 1.0 -> +2, memory draw 0.0 -> -10
        let mut rng = ScriptedRandom::new(vec![0.5, 1.0, 0.0]);

        let step = TelemetrySimulator::new().step(&container, &mut rng);

        assert_eq!(step.health, HealthStatus::Healthy);
        assert!((step.cpu - 12.0).abs() < 1e-9);
        assert!((step.memory - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_step_respects_limits_for_extreme_draws() {
        let simulator = TelemetrySimulator::new();

        for &draw in &[0.0, 0.25, 0.5, 0.75, 0.999_999] {
            // At the ceiling
            let top = running(50.0, 512.0, HealthStatus::Healthy);
            let step = simulator.step(&top, &mut ScriptedRandom::constant(draw));
            assert!(step.cpu <= top.cpu_limit);
            assert!(step.memory <= top.memory_limit);
            assert!(step.memory >= MEMORY_FLOOR);

            // At the floor
            let bottom = running(0.0, 10.0, HealthStatus::Healthy);
            let step = simulator.step(&bottom, &mut ScriptedRandom::constant(draw));
            assert!(step.cpu >= 0.0);
            assert!(step.memory >= MEMORY_FLOOR);
        }
    }

    #[test]
    fn test_random_walk_stays_bounded() {
        let simulator = TelemetrySimulator::new();
        let mut rng = ThreadRandom::seeded(7);
        let mut container = running(25.0, 256.0, HealthStatus::Healthy);

        for _ in 0..10_000 {
            let before = (container.cpu, container.memory);
            simulator.step(&container, &mut rng).apply_to(&mut container);

            assert!(container.cpu >= 0.0 && container.cpu <= container.cpu_limit);
            assert!(container.memory >= MEMORY_FLOOR && container.memory <= container.memory_limit);
            assert!((container.cpu - before.0).abs() <= CPU_STEP);
            assert!((container.memory - before.1).abs() <= MEMORY_STEP);
        }
    }

    #[test]
    fn test_reroll_within_limits() {
        let container = running(1.0, 45.0, HealthStatus::Healthy);
        let step = TelemetrySimulator::new().reroll(&container, &mut ThreadRandom::seeded(3));

        assert!(step.cpu <= container.cpu_limit * 0.5);
        assert!(step.memory >= 50.0 && step.memory <= container.memory_limit);
    }

    #[test]
    fn test_seed_usage_is_nonzero_for_lowest_draw() {
        let container = running(0.0, 0.0, HealthStatus::None);
        let (cpu, memory) = TelemetrySimulator::new().seed_usage(
            container.cpu_limit,
            container.memory_limit,
            &mut ScriptedRandom::constant(0.0),
        );

        assert!((cpu - SEED_CPU_MIN).abs() < 1e-9);
        assert!(memory >= MEMORY_FLOOR);
    }

    #[test]
    fn test_empty_script_replays_zero() {
        let mut rng = ScriptedRandom::new(Vec::new());
        assert_eq!(rng.next_f64(), 0.0);
        assert_eq!(rng.next_f64(), 0.0);
    }
}
