use super::*;
use crate::fleet::{FleetState, FleetStore};
use crate::health::{components, ComponentStatus, HealthRegistry};
use crate::models::{ConnectionMode, Container, ContainerStatus, HealthStatus};
use crate::seed;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Source that never answers within any reasonable timeout
struct HangingSource;

#[async_trait]
impl SnapshotSource for HangingSource {
    async fn fetch_snapshot(&self) -> Result<Snapshot, SourceError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(SourceError::Unreachable("unreachable".to_string()))
    }

    fn describe(&self) -> String {
        "hanging".to_string()
    }
}

/// Source that replays queued snapshots, failing once the queue is empty
struct QueuedSource {
    snapshots: Mutex<Vec<Snapshot>>,
}

impl QueuedSource {
    fn new(mut snapshots: Vec<Snapshot>) -> Self {
        snapshots.reverse();
        Self {
            snapshots: Mutex::new(snapshots),
        }
    }
}

#[async_trait]
impl SnapshotSource for QueuedSource {
    async fn fetch_snapshot(&self) -> Result<Snapshot, SourceError> {
        self.snapshots
            .lock()
            .await
            .pop()
            .ok_or_else(|| SourceError::Unreachable("connection refused".to_string()))
    }

    fn describe(&self) -> String {
        "queued".to_string()
    }
}

fn raw(id: &str, name: &str, state: &str) -> RawContainer {
    RawContainer {
        id: id.to_string(),
        names: vec![format!("/{}", name)],
        image: "redis:alpine".to_string(),
        state: state.to_string(),
        status: "Up 3 hours".to_string(),
        created: 1_698_220_800,
        ports: vec![],
        mounts: vec![],
        cpu_percent: None,
        memory_mb: None,
    }
}

fn snapshot(containers: Vec<RawContainer>) -> Snapshot {
    Snapshot {
        containers,
        stats: SystemStats {
            cpu: 42.0,
            memory: 512 * 1024 * 1024,
        },
    }
}

fn demo_store() -> FleetStore {
    FleetStore::new(FleetState::with_containers(seed::demo_containers()))
}

fn usage_by_id(containers: &[Container]) -> HashMap<String, (f64, f64)> {
    containers
        .iter()
        .filter(|c| c.is_running())
        .map(|c| (c.id.clone(), (c.cpu, c.memory)))
        .collect()
}

#[tokio::test]
async fn test_timeouts_keep_simulated_mode_with_bounded_walk() {
    let store = demo_store();
    let mut reconciler = ReconcilerBuilder::new()
        .source(Arc::new(HangingSource))
        .store(store.clone())
        .source_timeout(Duration::from_millis(20))
        .random(Box::new(ThreadRandom::seeded(7)))
        .build()
        .unwrap();

    for _ in 0..3 {
        let before = usage_by_id(store.read().await.containers());
        let outcome = reconciler.tick().await;
        assert_eq!(outcome.mode, ConnectionMode::Simulated);

        let state = store.read().await;
        assert_eq!(state.mode, ConnectionMode::Simulated);
        for container in state.running() {
            let (cpu, memory) = before[&container.id];
            assert!((container.cpu - cpu).abs() <= CPU_STEP + 1e-9);
            assert!((container.memory - memory).abs() <= MEMORY_STEP + 1e-9);
            assert!(container.cpu >= 0.0 && container.cpu <= container.cpu_limit);
            assert!(container.memory <= container.memory_limit);
        }
    }

    assert_eq!(store.read().await.series.len(), 3);
}

#[tokio::test]
async fn test_simulated_tick_keeps_non_running_at_rest() {
    let store = demo_store();
    let mut reconciler = ReconcilerBuilder::new()
        .source(Arc::new(OfflineSource))
        .store(store.clone())
        .random(Box::new(ScriptedRandom::constant(0.99)))
        .build()
        .unwrap();

    reconciler.tick().await;

    let state = store.read().await;
    for container in state.containers() {
        if container.is_running() {
            // A draw above 0.98 degrades every running container
            assert_eq!(container.health, HealthStatus::Unhealthy);
        } else {
            assert_eq!(container.cpu, 0.0);
            assert_eq!(container.memory, 0.0);
            assert_eq!(container.health, HealthStatus::None);
        }
    }
}

#[tokio::test]
async fn test_live_merge_upserts_prunes_and_keeps_logs() {
    let store = FleetStore::new(FleetState::with_containers(vec![]));
    let mut with_usage = raw("bbb", "cache", "running");
    with_usage.cpu_percent = Some(7.5);
    with_usage.memory_mb = Some(64.0);

    let source = QueuedSource::new(vec![
        snapshot(vec![raw("aaa", "db", "running"), raw("ccc", "old", "exited")]),
        snapshot(vec![raw("aaa", "db", "running"), with_usage]),
    ]);

    let mut reconciler = ReconcilerBuilder::new()
        .source(Arc::new(source))
        .store(store.clone())
        .random(Box::new(ThreadRandom::seeded(1)))
        .build()
        .unwrap();

    let first = reconciler.tick().await;
    assert_eq!(first.mode, ConnectionMode::Live);
    assert_eq!(first.containers, 2);
    let (seeded_cpu, seeded_memory) = {
        let state = store.read().await;
        let db = state.get("aaa").unwrap();
        (db.cpu, db.memory)
    };
    assert!(seeded_cpu > 0.0);

    store
        .write()
        .await
        .get_mut("aaa")
        .unwrap()
        .logs
        .push("[audit] STOP initiated by 'admin' at 2024-01-01T00:00:00.000Z".to_string());
    assert!(store.open_detail("ccc").await);

    let second = reconciler.tick().await;
    assert_eq!(second.pruned, 1);

    let state = store.read().await;
    let ids: Vec<_> = state.containers().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["aaa", "bbb"]);
    assert!(state.detail_view.is_none());

    let db = state.get("aaa").unwrap();
    assert!(db.logs.iter().any(|l| l.starts_with("[audit] STOP")));
    assert!((db.cpu - seeded_cpu).abs() <= CPU_STEP);
    assert!((db.memory - seeded_memory).abs() <= MEMORY_STEP);
    assert!(db.cpu >= 0.0 && db.cpu <= db.cpu_limit);
    assert!(db.memory >= MEMORY_FLOOR && db.memory <= db.memory_limit);

    let cache = state.get("bbb").unwrap();
    assert_eq!(cache.cpu, 7.5);
    assert_eq!(cache.memory, 64.0);

    let point = state.series.latest().unwrap();
    assert_eq!(point.value, 42.0);
    assert_eq!(point.value2, 512.0);
}

#[tokio::test]
async fn test_live_merge_walks_usage_the_adapter_left_out() {
    let store = FleetStore::new(FleetState::with_containers(vec![]));
    let mut cpu_only = raw("aaa", "db", "running");
    cpu_only.cpu_percent = Some(12.0);
    let mut memory_only = raw("aaa", "db", "running");
    memory_only.memory_mb = Some(300.0);

    let source = QueuedSource::new(vec![
        snapshot(vec![raw("aaa", "db", "running")]),
        snapshot(vec![cpu_only]),
        snapshot(vec![memory_only]),
    ]);

    let mut reconciler = ReconcilerBuilder::new()
        .source(Arc::new(source))
        .store(store.clone())
        .random(Box::new(ThreadRandom::seeded(9)))
        .build()
        .unwrap();

    reconciler.tick().await;
    let before = store.container("aaa").await.unwrap();

    reconciler.tick().await;
    let after_cpu = store.container("aaa").await.unwrap();
    assert_eq!(after_cpu.cpu, 12.0);
    assert!((after_cpu.memory - before.memory).abs() <= MEMORY_STEP);
    assert!(after_cpu.memory >= MEMORY_FLOOR);

    reconciler.tick().await;
    let after_memory = store.container("aaa").await.unwrap();
    assert_eq!(after_memory.memory, 300.0);
    assert!((after_memory.cpu - 12.0).abs() <= CPU_STEP);
}

#[tokio::test]
async fn test_source_loss_falls_back_and_degrades_health() {
    let store = FleetStore::default();
    let health = HealthRegistry::new();
    let source = QueuedSource::new(vec![snapshot(vec![raw("aaa", "db", "running")])]);

    let mut reconciler = ReconcilerBuilder::new()
        .source(Arc::new(source))
        .store(store.clone())
        .health(health.clone())
        .build()
        .unwrap();

    assert_eq!(reconciler.tick().await.mode, ConnectionMode::Live);
    assert_eq!(
        health.health().await.components[components::SOURCE_ADAPTER].status,
        ComponentStatus::Healthy
    );

    assert_eq!(reconciler.tick().await.mode, ConnectionMode::Simulated);
    let report = health.health().await;
    assert_eq!(
        report.components[components::SOURCE_ADAPTER].status,
        ComponentStatus::Degraded
    );
    assert_eq!(store.read().await.len(), 1);
}

#[tokio::test]
async fn test_manual_refresh_resamples_in_simulated_mode() {
    let store = demo_store();
    let refresh = ManualRefresh::with_random(
        Arc::new(OfflineSource),
        store.clone(),
        Duration::from_millis(20),
        Box::new(ScriptedRandom::constant(0.5)),
    );

    let outcome = refresh.run().await;
    let running = store.read().await.running().count();
    assert_eq!(outcome, RefreshOutcome::Resampled { containers: running });

    let state = store.read().await;
    for container in state.containers() {
        if container.status == ContainerStatus::Running {
            assert_eq!(container.health, HealthStatus::Healthy);
            assert!(container.cpu <= container.cpu_limit * 0.5);
        }
    }
}

#[tokio::test]
async fn test_manual_refresh_failed_fetch_reports_simulated_mode() {
    let store = demo_store();
    store.write().await.mode = ConnectionMode::Live;
    let refresh = ManualRefresh::with_random(
        Arc::new(OfflineSource),
        store.clone(),
        Duration::from_millis(20),
        Box::new(ScriptedRandom::constant(0.5)),
    );

    let outcome = refresh.run().await;

    assert_eq!(outcome.mode(), ConnectionMode::Simulated);
    assert_eq!(store.mode().await, ConnectionMode::Simulated);
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let reconciler = ReconcilerBuilder::new()
        .source(Arc::new(OfflineSource))
        .interval(Duration::from_millis(10))
        .build()
        .unwrap();
    let store = reconciler.store();
    let (tx, rx) = tokio::sync::broadcast::channel(1);

    let handle = tokio::spawn(reconciler.run(rx));
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(!store.read().await.series.is_empty());
}

#[test]
fn test_builder_requires_source() {
    assert!(ReconcilerBuilder::new().build().is_err());
}
