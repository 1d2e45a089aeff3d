//! Lifecycle action types

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Start,
    Stop,
    Restart,
    Delete,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Start => "start",
            ActionKind::Stop => "stop",
            ActionKind::Restart => "restart",
            ActionKind::Delete => "delete",
        }
    }

    /// Past tense used in operator notifications
    pub fn past_tense(&self) -> &'static str {
        match self {
            ActionKind::Start => "started",
            ActionKind::Stop => "stopped",
            ActionKind::Restart => "restarted",
            ActionKind::Delete => "deleted",
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self, ActionKind::Delete)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "start" => Ok(ActionKind::Start),
            "stop" => Ok(ActionKind::Stop),
            "restart" => Ok(ActionKind::Restart),
            "delete" => Ok(ActionKind::Delete),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Container,
    User,
}

impl TargetType {
    pub fn label(&self) -> &'static str {
        match self {
            TargetType::Container => "Container",
            TargetType::User => "User",
        }
    }
}

/// An action awaiting (or undergoing) confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub target_id: String,
    pub target_type: TargetType,
    pub action: ActionKind,
    pub target_name: String,
    pub requested_by: String,
}

impl ActionRequest {
    /// Prompt shown by the confirmation dialog
    pub fn prompt(&self) -> String {
        let consequence = if self.action.is_destructive() {
            "This action is irreversible."
        } else {
            "This action might interrupt active services."
        };
        format!(
            "Are you sure you want to {} {} \"{}\"? {}",
            self.action,
            self.target_type.label().to_lowercase(),
            self.target_name,
            consequence
        )
    }
}

/// Requested -> Confirmed -> Applying -> Applied, or Requested -> Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionPhase {
    Requested,
    Confirmed,
    Applying,
    Applied,
    Cancelled,
}

impl ActionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionPhase::Applied | ActionPhase::Cancelled)
    }

    /// Past the point where the action can still be cancelled
    pub fn is_in_flight(&self) -> bool {
        matches!(self, ActionPhase::Confirmed | ActionPhase::Applying)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    #[serde(flatten)]
    pub request: ActionRequest,
    pub phase: ActionPhase,
    pub prompt: String,
}

impl PendingAction {
    pub fn new(request: ActionRequest) -> Self {
        let prompt = request.prompt();
        Self {
            request,
            phase: ActionPhase::Requested,
            prompt,
        }
    }
}

/// Result of a confirmed action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionReceipt {
    pub request: ActionRequest,
    pub phase: ActionPhase,
    pub audit_entry: String,
    pub message: String,
}
