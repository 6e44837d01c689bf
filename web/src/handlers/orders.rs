//! Checkout and order history.

use super::{created, respond};
use crate::error::AppError;
use crate::extractors::{ApiJson, RequireAdmin, SessionUser};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use club_portal_core::api::{CheckoutRequest, StatusChange};
use club_portal_core::environment::Clock;
use club_portal_core::types::{ApiEnvelope, Order, OrderId, Role};

/// `GET /api/orders`
///
/// Admins see every order, everyone else only their own.
pub async fn list_orders(State(state): State<AppState>, session: SessionUser) -> Json<ApiEnvelope<Vec<Order>>> {
    let owner = (session.user.role != Role::Admin).then_some(session.user.id);
    respond(state.repository.orders(owner).await, "Orders loaded")
}

/// `POST /api/orders`
///
/// Prices come from storage, not the request. Stock is checked and
/// decremented in one step; a shortage on any line rejects the whole order.
///
/// # Errors
///
/// 422 for an empty order or a zero quantity, 404 for an unknown listing,
/// 409 when there is not enough left.
#[tracing::instrument(skip_all, name = "place_order", fields(user_id = %session.user.id))]
pub async fn place_order(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<(StatusCode, Json<ApiEnvelope<Order>>), AppError> {
    let order = state
        .repository
        .place_order(session.user.id, request, state.clock.now())
        .await
        .inspect_err(|e| tracing::info!(user_id = %session.user.id, error = %e, "Checkout refused"))?;

    tracing::info!(
        order_id = %order.id,
        user_id = %session.user.id,
        total = %order.total,
        lines = order.lines.len(),
        "Order placed"
    );
    Ok(created(order, "Order placed"))
}

/// `PUT /api/orders/:id/status` (admin)
///
/// # Errors
///
/// 404 for an unknown id.
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    ApiJson(change): ApiJson<StatusChange>,
) -> Result<Json<ApiEnvelope<Order>>, AppError> {
    let order = state.repository.update_order_status(id, change.status).await?;
    tracing::info!(order_id = %id, status = ?change.status, by = %admin.user.id, "Order status changed");
    Ok(respond(order, "Order updated"))
}
