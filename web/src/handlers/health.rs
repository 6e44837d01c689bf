//! Health check endpoint.
//!
//! Used by load balancers and monitoring systems to verify the service is up.

use super::respond;
use crate::state::AppState;
use axum::{extract::State, Json};
use club_portal_core::environment::Clock;
use club_portal_core::types::ApiEnvelope;
use serde::Serialize;

/// Liveness report
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    /// Always `"ok"` when the process answers
    pub status: &'static str,
    /// Server time
    pub time: chrono::DateTime<chrono::Utc>,
}

/// Liveness check.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// { "success": true, "data": { "status": "ok", "time": "..." }, "message": "Service is healthy" }
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check(State(state): State<AppState>) -> Json<ApiEnvelope<Health>> {
    respond(
        Health {
            status: "ok",
            time: state.clock.now(),
        },
        "Service is healthy",
    )
}
