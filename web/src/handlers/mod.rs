//! HTTP request handlers.
//!
//! One module per resource. Every handler answers with an [`ApiEnvelope`];
//! failures go through [`AppError`](crate::AppError), which renders the same
//! envelope with `success: false`.

use axum::{http::StatusCode, Json};
use club_portal_core::types::ApiEnvelope;

pub mod accounts;
pub mod health;
pub mod matches;
pub mod orders;
pub mod products;
pub mod tickets;
pub mod users;

/// `200 OK` with `data`
pub(crate) fn respond<T>(data: T, message: &str) -> Json<ApiEnvelope<T>> {
    Json(ApiEnvelope::ok(data, message))
}

/// `201 Created` with `data`
pub(crate) fn created<T>(data: T, message: &str) -> (StatusCode, Json<ApiEnvelope<T>>) {
    (StatusCode::CREATED, Json(ApiEnvelope::ok(data, message)))
}

/// `200 OK` with no `data`
pub(crate) fn done(message: &str) -> Json<ApiEnvelope<()>> {
    Json(ApiEnvelope {
        success: true,
        data: None,
        message: Some(message.to_string()),
    })
}
