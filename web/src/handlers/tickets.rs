//! Ticket listings.
//!
//! A listing is unique per (match, seat category). Reads return the match
//! populated; creation returns the stored record with only its `matchId`.

use super::{created, done, respond};
use crate::error::AppError;
use crate::extractors::{ApiJson, RequireAdmin};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use club_portal_core::api::{NewTicket, TicketChanges};
use club_portal_core::types::{
    ApiEnvelope, MatchId, SeatCategory, Ticket, TicketId, TicketRecord, UnknownSeatCategory,
};

/// `GET /api/tickets`
///
/// # Errors
///
/// 500-class only if storage is inconsistent.
pub async fn list_tickets(State(state): State<AppState>) -> Result<Json<ApiEnvelope<Vec<Ticket>>>, AppError> {
    Ok(respond(state.repository.tickets().await?, "Tickets loaded"))
}

/// `GET /api/tickets/:id`
///
/// # Errors
///
/// 404 for an unknown id.
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
) -> Result<Json<ApiEnvelope<Ticket>>, AppError> {
    Ok(respond(state.repository.ticket(id).await?, "Ticket found"))
}

/// `GET /api/tickets/:match_id/:seat_category`
///
/// # Errors
///
/// 422 for an unknown seat category, 404 when there is no such listing.
pub async fn get_ticket_for(
    State(state): State<AppState>,
    Path((match_id, seat_category)): Path<(MatchId, String)>,
) -> Result<Json<ApiEnvelope<Ticket>>, AppError> {
    let seat_category: SeatCategory = seat_category
        .parse()
        .map_err(|e: UnknownSeatCategory| AppError::validation(e.to_string()))?;
    Ok(respond(
        state.repository.ticket_for(match_id, seat_category).await?,
        "Ticket found",
    ))
}

/// `POST /api/tickets` (admin)
///
/// Negative prices and counts never reach this handler; the body fails to
/// deserialize with 422.
///
/// # Errors
///
/// 404 for an unknown match, 409 when the category is already listed.
#[tracing::instrument(skip_all, name = "create_ticket")]
pub async fn create_ticket(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(ticket): ApiJson<NewTicket>,
) -> Result<(StatusCode, Json<ApiEnvelope<TicketRecord>>), AppError> {
    let record = state.repository.create_ticket(ticket).await?;
    tracing::info!(
        ticket_id = %record.id,
        match_id = %record.match_id,
        seat_category = %record.seat_category,
        by = %admin.user.id,
        "Ticket listing created"
    );
    Ok(created(record, "Ticket created"))
}

/// `PUT /api/tickets/:id` (admin)
///
/// # Errors
///
/// 404 for an unknown id.
pub async fn update_ticket(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<TicketId>,
    ApiJson(changes): ApiJson<TicketChanges>,
) -> Result<Json<ApiEnvelope<Ticket>>, AppError> {
    let ticket = state.repository.update_ticket(id, changes).await?;
    tracing::info!(ticket_id = %id, by = %admin.user.id, "Ticket listing updated");
    Ok(respond(ticket, "Ticket updated"))
}

/// `DELETE /api/tickets/:id` (admin)
///
/// # Errors
///
/// 404 for an unknown id.
pub async fn delete_ticket(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<TicketId>,
) -> Result<Json<ApiEnvelope<()>>, AppError> {
    state.repository.delete_ticket(id).await?;
    tracing::info!(ticket_id = %id, by = %admin.user.id, "Ticket listing deleted");
    Ok(done("Ticket deleted"))
}
