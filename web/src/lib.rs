//! HTTP backend for the club fan portal.
//!
//! Serves the REST API the portal client talks to. Every response uses the
//! `{ success, data, message }` envelope from `club-portal-core`, and the
//! rules the client checks optimistically are enforced again here:
//!
//! - one ticket listing per (match, seat category), else 409
//! - no negative prices or counts, else 422
//! - checkout checks and decrements stock in one step, else 409
//! - unique usernames and emails, else 409
//!
//! # Layout
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  routes      Router, layers             │
//! │  handlers    one module per resource    │  ← extractors: session, admin, JSON
//! ├─────────────────────────────────────────┤
//! │  repository  in-memory tables, RwLock   │  ← uniqueness, stock
//! │  auth        password digests, sessions │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use club_portal_web::{build_router, AppState};
//! use club_portal_core::environment::SystemClock;
//!
//! let state = AppState::new(Arc::new(SystemClock), chrono::Duration::hours(24));
//! let app = build_router(state);
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod repository;
pub mod routes;
pub mod state;

// Re-export key types for convenience
pub use config::Config;
pub use error::{AppError, ErrorKind};
pub use extractors::{ApiJson, BearerToken, RequireAdmin, SessionUser};
pub use middleware::{request_tracking_layer, RequestId, REQUEST_ID_HEADER};
pub use repository::{Repository, RepositoryError};
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
