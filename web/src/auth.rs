//! Password hashing and bearer-token sessions.
//!
//! Passwords are stored as an Argon2id key derived from the password and a
//! random per-account salt. Sessions are random UUID tokens kept in memory
//! with a fixed time-to-live; an expired or unknown token is
//! indistinguishable to callers (both are 401).

use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use club_portal_core::types::{AuthToken, UserId};
use rand::RngCore;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Key derivation failed
#[derive(Debug, Error)]
#[error("Password hashing failed: {0}")]
pub struct PasswordHashError(argon2::Error);

/// Salted Argon2id password key
#[derive(Clone)]
pub struct PasswordHash {
    salt: [u8; SALT_LEN],
    key: [u8; KEY_LEN],
}

impl PasswordHash {
    /// Hash `password` with a fresh random salt
    ///
    /// # Errors
    ///
    /// [`PasswordHashError`] if Argon2 rejects the input.
    pub fn new(password: &str) -> Result<Self, PasswordHashError> {
        let mut salt = [0_u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let key = derive(&salt, password)?;
        Ok(Self { salt, key })
    }

    /// Whether `password` derives this key
    #[must_use]
    pub fn verify(&self, password: &str) -> bool {
        match derive(&self.salt, password) {
            Ok(candidate) => constant_time_eq::constant_time_eq(&candidate, &self.key),
            Err(err) => {
                tracing::warn!(error = %err, "Password check failed to run");
                false
            },
        }
    }
}

fn derive(salt: &[u8; SALT_LEN], password: &str) -> Result<[u8; KEY_LEN], PasswordHashError> {
    let mut key = [0_u8; KEY_LEN];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(PasswordHashError)?;
    Ok(key)
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

#[derive(Clone, Copy, Debug)]
struct SessionEntry {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

/// Issued bearer tokens
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionRegistry {
    /// Registry whose tokens expire `ttl` after issue
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Issue a token for `user_id`. Tokens already expired at `now` are
    /// dropped first.
    pub async fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> (AuthToken, DateTime<Utc>) {
        let token = uuid::Uuid::new_v4().to_string();
        let expires_at = now + self.ttl;

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now < entry.expires_at);
        let purged = before - sessions.len();
        if purged > 0 {
            tracing::debug!(purged, "Expired sessions dropped");
        }
        sessions.insert(token.clone(), SessionEntry { user_id, expires_at });
        drop(sessions);

        metrics::counter!("auth.sessions.issued").increment(1);
        (AuthToken::new(token), expires_at)
    }

    /// Number of tokens held, expired ones included until the next issue
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// The account behind `token`, if the token is known and not expired.
    ///
    /// Expired tokens are dropped on lookup.
    pub async fn resolve(&self, token: &str, now: DateTime<Utc>) -> Option<UserId> {
        let entry = self.sessions.read().await.get(token).copied()?;
        if now < entry.expires_at {
            return Some(entry.user_id);
        }
        self.sessions.write().await.remove(token);
        tracing::debug!(user_id = %entry.user_id, "Session expired");
        None
    }

    /// Drop every token of `user_id`
    pub async fn revoke_user(&self, user_id: UserId) {
        self.sessions
            .write()
            .await
            .retain(|_, entry| entry.user_id != user_id);
    }
}
