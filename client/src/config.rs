//! Client configuration.

use club_portal_core::pagination::DEFAULT_PAGE_SIZE;
use std::env;
use std::time::Duration;

/// Where the portal API lives and how the client talks to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API origin, without the `/api` prefix
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Catalog page size
    pub page_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(10),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `PORTAL_API_URL` | `http://localhost:8080` |
    /// | `PORTAL_REQUEST_TIMEOUT` (seconds) | `10` |
    /// | `PAGE_SIZE` | catalog default |
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("PORTAL_API_URL").unwrap_or(defaults.base_url),
            request_timeout: env::var("PORTAL_REQUEST_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(defaults.request_timeout, Duration::from_secs),
            page_size: env::var("PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&size: &usize| size > 0)
                .unwrap_or(defaults.page_size),
        }
    }

    /// Same settings against another origin
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}
