//! Application state shared by every handler.

use crate::auth::{PasswordHash, SessionRegistry};
use crate::repository::Repository;
use club_portal_core::environment::Clock;
use club_portal_core::types::{Role, UserProfile};
use std::sync::Arc;

/// Shared handler state; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Storage
    pub repository: Arc<Repository>,
    /// Issued bearer tokens
    pub sessions: Arc<SessionRegistry>,
    /// Time source for session expiry and order timestamps
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Empty repository; sessions live for `session_ttl`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, session_ttl: chrono::Duration) -> Self {
        Self {
            repository: Arc::new(Repository::new()),
            sessions: Arc::new(SessionRegistry::new(session_ttl)),
            clock,
        }
    }

    /// Create an admin account unless one with that username already exists
    ///
    /// # Errors
    ///
    /// Fails with [`RepositoryError::Conflict`](crate::repository::RepositoryError::Conflict)
    /// if the email belongs to another account, or if the password cannot be hashed.
    pub async fn seed_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> anyhow::Result<Option<UserProfile>> {
        if self.repository.find_by_login(username).await.is_some() {
            return Ok(None);
        }
        let admin = self
            .repository
            .create_user(username.to_string(), email.to_string(), PasswordHash::new(password)?, Role::Admin)
            .await?;
        tracing::info!(user_id = %admin.id, username, "Admin account created");
        Ok(Some(admin))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use club_portal_core::environment::SystemClock;

    #[test]
    fn test_state_is_clone() {
        // Axum requires Clone state
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn seeding_admin_is_idempotent() {
        let state = AppState::new(Arc::new(SystemClock), chrono::Duration::hours(1));

        let first = state.seed_admin("admin", "admin@club.local", "password123").await.unwrap();
        let second = state.seed_admin("admin", "admin@club.local", "password123").await.unwrap();

        assert_eq!(first.map(|u| u.role), Some(Role::Admin));
        assert!(second.is_none());
        assert_eq!(state.repository.users().await.len(), 1);
    }
}
