//! Operator notification queue
//!
//! Short-lived toasts surfaced to the presentation layer. Each entry expires
//! a fixed duration after it was posted; expired entries are dropped whenever
//! the queue is read or written.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Default display duration (4 seconds)
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSeverity {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub message: String,
    pub severity: NotificationSeverity,
    #[serde(skip, default = "Instant::now")]
    posted_at: Instant,
}

impl Notification {
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.posted_at) >= ttl
    }
}

#[derive(Debug, Clone)]
pub struct NotificationQueue {
    entries: Arc<Mutex<VecDeque<Notification>>>,
    ttl: Duration,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_TTL)
    }
}

impl NotificationQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Post a notification and return its id
    pub fn push(&self, message: impl Into<String>, severity: NotificationSeverity) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        let now = Instant::now();
        let notification = Notification {
            id: id.clone(),
            message: message.into(),
            severity,
            posted_at: now,
        };
        let mut entries = self.lock();
        entries.retain(|n| !n.is_expired(now, self.ttl));
        entries.push_back(notification);
        id
    }

    pub fn success(&self, message: impl Into<String>) -> String {
        self.push(message, NotificationSeverity::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> String {
        self.push(message, NotificationSeverity::Error)
    }

    pub fn info(&self, message: impl Into<String>) -> String {
        self.push(message, NotificationSeverity::Info)
    }

    /// Unexpired notifications, oldest first
    pub fn active(&self) -> Vec<Notification> {
        self.active_at(Instant::now())
    }

    pub fn active_at(&self, now: Instant) -> Vec<Notification> {
        let mut entries = self.lock();
        entries.retain(|n| !n.is_expired(now, self.ttl));
        entries.iter().cloned().collect()
    }

    /// Remove a notification before it expires
    pub fn dismiss(&self, id: &str) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|n| n.id != id);
        entries.len() != before
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Notification>> {
        // A poisoned queue only ever holds plain data; keep serving it.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
