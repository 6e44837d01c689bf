//! Fixtures.

use super::{created, done, respond};
use crate::error::AppError;
use crate::extractors::{ApiJson, RequireAdmin};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use club_portal_core::api::MatchDraft;
use club_portal_core::types::{ApiEnvelope, Match, MatchId};
use club_portal_core::validation::MatchForm;

/// Exactly two distinct, non-empty teams plus a location and competition.
fn checked(draft: MatchDraft) -> Result<MatchDraft, AppError> {
    let [home, away] = draft.teams.as_slice() else {
        return Err(AppError::validation("A match needs exactly two teams"));
    };
    let form = MatchForm {
        home_team: home.clone(),
        away_team: away.clone(),
        event_date: Some(draft.event_date),
        location: draft.location,
        competition: draft.competition,
        image: draft.image,
    };
    Ok(form.validate()?)
}

/// `GET /api/matches`, earliest first
pub async fn list_matches(State(state): State<AppState>) -> Json<ApiEnvelope<Vec<Match>>> {
    respond(state.repository.matches().await, "Matches loaded")
}

/// `GET /api/matches/:id`
///
/// # Errors
///
/// 404 for an unknown id.
pub async fn get_match(
    State(state): State<AppState>,
    Path(id): Path<MatchId>,
) -> Result<Json<ApiEnvelope<Match>>, AppError> {
    Ok(respond(state.repository.fixture(id).await?, "Match found"))
}

/// `POST /api/matches` (admin)
///
/// # Errors
///
/// 422 for an invalid draft.
pub async fn create_match(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(draft): ApiJson<MatchDraft>,
) -> Result<(StatusCode, Json<ApiEnvelope<Match>>), AppError> {
    let fixture = state.repository.create_match(checked(draft)?).await;
    tracing::info!(match_id = %fixture.id, by = %admin.user.id, title = %fixture.title(), "Match created");
    Ok(created(fixture, "Match created"))
}

/// `PUT /api/matches/:id` (admin)
///
/// # Errors
///
/// 422 for an invalid draft, 404 for an unknown id.
pub async fn update_match(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<MatchId>,
    ApiJson(draft): ApiJson<MatchDraft>,
) -> Result<Json<ApiEnvelope<Match>>, AppError> {
    let fixture = state.repository.update_match(id, checked(draft)?).await?;
    tracing::info!(match_id = %id, by = %admin.user.id, "Match updated");
    Ok(respond(fixture, "Match updated"))
}

/// `DELETE /api/matches/:id` (admin)
///
/// # Errors
///
/// 404 for an unknown id, 409 while tickets for the match exist.
pub async fn delete_match(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<MatchId>,
) -> Result<Json<ApiEnvelope<()>>, AppError> {
    state.repository.delete_match(id).await?;
    tracing::info!(match_id = %id, by = %admin.user.id, "Match deleted");
    Ok(done("Match deleted"))
}
