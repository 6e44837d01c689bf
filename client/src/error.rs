//! Error types for building the HTTP client.
//!
//! Request failures are reported as [`PortalError`](club_portal_core::PortalError)
//! so reducers handle them the same way regardless of transport.

use thiserror::Error;

/// Errors that can occur while constructing an [`HttpPortalApi`](crate::HttpPortalApi)
#[derive(Debug, Error)]
pub enum ClientError {
    /// Base URL is not an `http://` or `https://` URL
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    /// The underlying HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}
