//! Authoritative fleet state
//!
//! The fleet (containers, connection mode, telemetry window and the open
//! detail view) lives behind a single `RwLock`. The reconciler owns the store
//! and hands out clones of the handle; every mutation from a telemetry tick
//! or a lifecycle transition goes through one write guard, so the two can
//! never interleave on the same record.

mod series;

pub use series::{MetricsSeries, DEFAULT_WINDOW};

use crate::models::{ConnectionMode, Container, ContainerStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Everything the reconciler and lifecycle controller mutate
#[derive(Debug, Clone, Default)]
pub struct FleetState {
    containers: Vec<Container>,
    pub mode: ConnectionMode,
    pub series: MetricsSeries,
    /// Container id bound to the open detail view, if any
    pub detail_view: Option<String>,
    /// Bumped on every committed mutation
    pub revision: u64,
}

impl FleetState {
    pub fn with_containers(containers: Vec<Container>) -> Self {
        Self {
            containers,
            ..Default::default()
        }
    }

    /// Containers in fleet iteration order
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn containers_mut(&mut self) -> &mut Vec<Container> {
        &mut self.containers
    }

    pub fn get(&self, id: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Container> {
        self.containers.iter_mut().find(|c| c.id == id)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.containers.iter().any(|c| c.name == name)
    }

    pub fn insert(&mut self, container: Container) {
        self.containers.push(container);
    }

    /// Remove a container, clearing the detail view if it was bound to it
    pub fn remove(&mut self, id: &str) -> Option<Container> {
        let index = self.containers.iter().position(|c| c.id == id)?;
        if self.detail_view.as_deref() == Some(id) {
            self.detail_view = None;
        }
        Some(self.containers.remove(index))
    }

    pub fn running(&self) -> impl Iterator<Item = &Container> {
        self.containers.iter().filter(|c| c.is_running())
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn status_breakdown(&self) -> StatusBreakdown {
        let mut breakdown = StatusBreakdown::default();
        for container in &self.containers {
            match container.status {
                ContainerStatus::Running => breakdown.running += 1,
                ContainerStatus::Stopped => breakdown.stopped += 1,
                ContainerStatus::Exited => breakdown.exited += 1,
                ContainerStatus::Error => breakdown.error += 1,
            }
        }
        breakdown
    }

    pub(crate) fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

/// Container counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub running: usize,
    pub stopped: usize,
    pub exited: usize,
    pub error: usize,
}

/// Shared handle to the fleet state
#[derive(Debug, Clone, Default)]
pub struct FleetStore {
    inner: Arc<RwLock<FleetState>>,
}

impl FleetStore {
    pub fn new(state: FleetState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, FleetState> {
        self.inner.read().await
    }

    /// Exclusive access; the revision is bumped when the guard is taken
    pub async fn write(&self) -> RwLockWriteGuard<'_, FleetState> {
        let mut guard = self.inner.write().await;
        guard.touch();
        guard
    }

    /// Clone of the last committed state
    pub async fn snapshot(&self) -> FleetState {
        self.inner.read().await.clone()
    }

    pub async fn container(&self, id: &str) -> Option<Container> {
        self.inner.read().await.get(id).cloned()
    }

    pub async fn mode(&self) -> ConnectionMode {
        self.inner.read().await.mode
    }

    /// Bind the detail view to a container
    pub async fn open_detail(&self, id: &str) -> bool {
        let mut state = self.write().await;
        if state.get(id).is_some() {
            state.detail_view = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub async fn close_detail(&self) {
        self.write().await.detail_view = None;
    }
}
