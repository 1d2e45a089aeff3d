//! Fleet dashboard core
//!
//! This crate provides the core functionality for:
//! - Reconciling the in-memory fleet with a live telemetry source, falling
//!   back to simulated telemetry while the source is unreachable
//! - Confirm-then-apply lifecycle actions with audit logging
//! - Users, images and volumes
//! - The filtered/sorted outward projection and operator notifications
//! - Log analysis, health checks and observability

pub mod analysis;
pub mod error;
pub mod fleet;
pub mod health;
pub mod lifecycle;
pub mod models;
pub mod observability;
pub mod reconcile;
pub mod seed;
pub mod view;

pub use error::{FleetError, FleetResult};
pub use fleet::{FleetState, FleetStore, MetricsSeries, StatusBreakdown};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use lifecycle::{ActionKind, LifecycleController, LifecycleControllerBuilder};
pub use models::*;
pub use observability::{FleetMetrics, StructuredLogger};
pub use reconcile::{Reconciler, ReconcilerBuilder};
pub use view::{FleetView, NotificationQueue, ViewQuery};
