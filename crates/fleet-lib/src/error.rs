//! Error taxonomy for fleet mutations

use thiserror::Error;

/// Errors surfaced to the operator by lifecycle, user and registry operations.
///
/// None of these are fatal: every variant leaves the fleet state untouched
/// and is reported back as a visible, recoverable condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetError {
    #[error("permission denied: {operation} requires the admin role")]
    Forbidden { operation: String },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("you cannot delete your own account")]
    SelfDeletionForbidden,

    #[error("{0}")]
    Validation(String),

    #[error("no action is awaiting confirmation")]
    NoPendingAction,

    #[error("action on '{target}' is already being applied")]
    ActionInFlight { target: String },
}

impl FleetError {
    pub fn forbidden(operation: impl Into<String>) -> Self {
        FleetError::Forbidden {
            operation: operation.into(),
        }
    }

    pub fn container_not_found(id: impl Into<String>) -> Self {
        FleetError::NotFound {
            kind: "container",
            id: id.into(),
        }
    }

    pub fn user_not_found(id: impl Into<String>) -> Self {
        FleetError::NotFound {
            kind: "user",
            id: id.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            FleetError::Forbidden { .. } => "forbidden",
            FleetError::NotFound { .. } => "not_found",
            FleetError::SelfDeletionForbidden => "self_deletion_forbidden",
            FleetError::Validation(_) => "validation_error",
            FleetError::NoPendingAction => "no_pending_action",
            FleetError::ActionInFlight { .. } => "action_in_flight",
        }
    }
}

pub type FleetResult<T> = std::result::Result<T, FleetError>;
