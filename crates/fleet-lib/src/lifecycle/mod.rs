//! Lifecycle action engine
//!
//! Operator-initiated mutations: container start/stop/restart/delete through
//! a confirm-then-apply pipeline, deployments and reconfiguration, user
//! accounts, and the image and volume registries. Every mutation is gated on
//! the admin role and every refusal is surfaced as a notification.

mod action;
mod controller;
mod deploy;
mod directory;
mod registry;


pub use action::{ActionKind, ActionPhase, ActionReceipt, ActionRequest, PendingAction, TargetType};
pub use controller::{audit_entry, LifecycleConfig, LifecycleController, LifecycleControllerBuilder};
pub use deploy::{
    validate_name, ContainerUpdate, DeploySpec, DEFAULT_DEPLOY_CPU_LIMIT, DEFAULT_DEPLOY_MEMORY_LIMIT,
};
pub use directory::{NewUser, UserDirectory, UserUpdate, MIN_PASSWORD_LEN};
pub use registry::{estimate_size_mb, parse_reference, ImageRegistry, PullOutcome, VolumeRegistry};
