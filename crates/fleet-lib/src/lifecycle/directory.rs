//! User directory
//!
//! In-memory account store standing in for a credential backend. Role gating
//! is enforced by the [`LifecycleController`](super::LifecycleController);
//! this type only validates and stores records.

use crate::error::{FleetError, FleetResult};
use crate::models::{Role, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub avatar: Option<String>,
}

fn default_role() -> Role {
    Role::Viewer
}

/// Partial update; a blank or missing password keeps the current one
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Arc<RwLock<Vec<User>>>,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: Arc::new(RwLock::new(users)),
        }
    }

    pub async fn list(&self) -> Vec<User> {
        self.users.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<User> {
        self.users.read().await.iter().find(|u| u.id == id).cloned()
    }

    pub async fn find_by_username(&self, username: &str) -> Option<User> {
        self.users
            .read()
            .await
            .iter()
            .find(|u| u.username == username)
            .cloned()
    }

    /// Password match against the directory
    pub async fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        self.find_by_username(username)
            .await
            .filter(|u| !u.password.is_empty() && u.password == password)
    }

    pub async fn create(&self, new_user: NewUser) -> FleetResult<User> {
        let username = new_user.username.trim().to_string();
        if username.is_empty() {
            return Err(FleetError::Validation("Username is required".to_string()));
        }
        if new_user.password.is_empty() {
            return Err(FleetError::Validation(
                "Password is required for new users".to_string(),
            ));
        }
        validate_password(&new_user.password)?;

        let mut users = self.users.write().await;
        if users.iter().any(|u| u.username == username) {
            return Err(FleetError::Validation(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        let avatar = new_user
            .avatar
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| default_avatar(&username));
        let user = User {
            id: uuid::Uuid::new_v4().simple().to_string()[..8].to_string(),
            username,
            role: new_user.role,
            avatar,
            password: new_user.password,
            created: now_rfc3339(),
        };
        users.push(user.clone());
        Ok(user)
    }

    pub async fn update(&self, id: &str, update: UserUpdate) -> FleetResult<User> {
        let mut users = self.users.write().await;

        if let Some(username) = update.username.as_deref().map(str::trim) {
            if username.is_empty() {
                return Err(FleetError::Validation("Username is required".to_string()));
            }
            if users.iter().any(|u| u.username == username && u.id != id) {
                return Err(FleetError::Validation(format!(
                    "Username '{}' is already taken",
                    username
                )));
            }
        }
        let password = update.password.filter(|p| !p.is_empty());
        if let Some(password) = &password {
            validate_password(password)?;
        }

        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| FleetError::user_not_found(id))?;

        if let Some(username) = update.username {
            user.username = username.trim().to_string();
        }
        if let Some(password) = password {
            user.password = password;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(avatar) = update.avatar {
            user.avatar = avatar;
        }
        Ok(user.clone())
    }

    pub async fn remove(&self, id: &str) -> Option<User> {
        let mut users = self.users.write().await;
        let index = users.iter().position(|u| u.id == id)?;
        Some(users.remove(index))
    }
}

fn validate_password(password: &str) -> FleetResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FleetError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn default_avatar(username: &str) -> String {
    format!("https://api.dicebear.com/7.x/avataaars/svg?seed={}", username)
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    fn directory() -> UserDirectory {
        UserDirectory::new(seed::demo_users())
    }

    fn new_user(username: &str, password: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password: password.to_string(),
            role: Role::Viewer,
            avatar: None,
        }
    }

    #[tokio::test]
    async fn test_authenticate() {
        let users = directory();
        assert_eq!(users.authenticate("admin", "admin").await.unwrap().id, "1");
        assert!(users.authenticate("admin", "wrong").await.is_none());
        assert!(users.authenticate("ghost", "admin").await.is_none());
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let users = directory();

        let err = users.create(new_user("  ", "secret")).await.unwrap_err();
        assert_eq!(err, FleetError::Validation("Username is required".to_string()));

        let err = users.create(new_user("ops", "")).await.unwrap_err();
        assert!(err.to_string().contains("Password is required"));

        let err = users.create(new_user("ops", "abc")).await.unwrap_err();
        assert!(err.to_string().contains("at least 4"));

        let err = users.create(new_user("viewer", "secret")).await.unwrap_err();
        assert!(err.to_string().contains("already taken"));

        let created = users.create(new_user("ops", "abcd")).await.unwrap();
        assert_eq!(created.role, Role::Viewer);
        assert!(created.avatar.contains("seed=ops"));
        assert_eq!(users.list().await.len(), 3);
    }

    #[tokio::test]
    async fn test_update_keeps_password_when_blank() {
        let users = directory();
        let update = UserUpdate {
            username: Some("watcher".to_string()),
            password: Some(String::new()),
            ..Default::default()
        };

        let updated = users.update("2", update).await.unwrap();
        assert_eq!(updated.username, "watcher");
        assert!(users.authenticate("watcher", "view").await.is_some());

        let short = UserUpdate {
            password: Some("xy".to_string()),
            ..Default::default()
        };
        assert!(users.update("2", short).await.is_err());
        assert!(matches!(
            users.update("99", UserUpdate::default()).await,
            Err(FleetError::NotFound { kind: "user", .. })
        ));
    }
}
