//! Server configuration.
//!
//! Loaded from environment variables (optionally via a `.env` file) with
//! defaults suitable for local development.

use std::env;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listener configuration
    pub server: ServerConfig,
    /// Session and bootstrap-account configuration
    pub auth: AuthConfig,
}

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: 0.0.0.0)
    pub host: String,
    /// Bind port (default: 8080)
    pub port: u16,
    /// Grace period for in-flight requests on shutdown
    pub shutdown_timeout: Duration,
}

/// Session and bootstrap-account configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Bearer token lifetime
    pub session_ttl: chrono::Duration,
    /// Username of the admin account created at startup
    pub admin_username: String,
    /// Email of the admin account created at startup
    pub admin_email: String,
    /// Password of the admin account created at startup; no admin is
    /// created when unset
    pub admin_password: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session_ttl", &self.session_ttl)
            .field("admin_username", &self.admin_username)
            .field("admin_email", &self.admin_email)
            .field("admin_password", &self.admin_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `HOST` | `0.0.0.0` |
    /// | `PORT` | `8080` |
    /// | `SHUTDOWN_TIMEOUT` (seconds) | `30` |
    /// | `SESSION_TTL` (seconds) | `86400` |
    /// | `ADMIN_USERNAME` | `admin` |
    /// | `ADMIN_EMAIL` | `admin@club.local` |
    /// | `ADMIN_PASSWORD` | unset |
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parsed("PORT", 8080),
                shutdown_timeout: Duration::from_secs(parsed("SHUTDOWN_TIMEOUT", 30)),
            },
            auth: AuthConfig {
                session_ttl: chrono::Duration::seconds(parsed("SESSION_TTL", 86_400)),
                admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
                admin_email: env::var("ADMIN_EMAIL")
                    .unwrap_or_else(|_| "admin@club.local".to_string()),
                admin_password: env::var("ADMIN_PASSWORD").ok().filter(|p| !p.is_empty()),
            },
        }
    }
}

impl ServerConfig {
    /// `host:port` for the listener
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
