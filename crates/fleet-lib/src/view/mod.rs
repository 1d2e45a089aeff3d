//! Outward projection of the fleet
//!
//! Everything the presentation layer renders is derived here from the last
//! committed fleet state; nothing in this module mutates it.

mod notifications;
mod projector;

pub use notifications::{
    Notification, NotificationQueue, NotificationSeverity, DEFAULT_NOTIFICATION_TTL,
};
pub use projector::{
    locale_compare, parse_uptime_minutes, project, SortDirection, SortField, ViewQuery,
};

use crate::fleet::{FleetState, StatusBreakdown};
use crate::lifecycle::PendingAction;
use crate::models::{ConnectionMode, Container, MetricPoint, Role};
use serde::{Deserialize, Serialize};

/// The full dashboard view for one reader
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetView {
    pub containers: Vec<Container>,
    pub mode: ConnectionMode,
    pub metrics: Vec<MetricPoint>,
    pub breakdown: StatusBreakdown,
    pub total: usize,
    pub pending: Option<PendingAction>,
    pub notifications: Vec<Notification>,
    /// Container bound to the open detail view
    pub detail: Option<Container>,
    /// Whether lifecycle controls are offered to this reader
    pub can_manage: bool,
}

impl FleetView {
    pub fn build(
        state: &FleetState,
        query: &ViewQuery,
        role: Role,
        pending: Option<PendingAction>,
        notifications: Vec<Notification>,
    ) -> Self {
        Self {
            containers: project(state.containers(), query),
            mode: state.mode,
            metrics: state.series.points(),
            breakdown: state.status_breakdown(),
            total: state.len(),
            pending: pending.filter(|p| !p.phase.is_terminal()),
            notifications,
            detail: state
                .detail_view
                .as_deref()
                .and_then(|id| state.get(id))
                .cloned(),
            can_manage: role == Role::Admin,
        }
    }
}
