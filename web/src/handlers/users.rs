//! Account administration and self-service profile changes.

use super::{done, respond};
use crate::auth::PasswordHash;
use crate::error::AppError;
use crate::extractors::{ApiJson, RequireAdmin, SessionUser};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use club_portal_core::api::{PasswordChange, ProfileUpdate};
use club_portal_core::types::{ApiEnvelope, Role, UserId, UserProfile};
use club_portal_core::validation::{self, PasswordForm};

/// `GET /api/users` (admin)
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Json<ApiEnvelope<Vec<UserProfile>>> {
    respond(state.repository.users().await, "Users loaded")
}

/// `PUT /api/users/:id`
///
/// Users may edit their own username and email; admins may edit anyone and
/// are the only ones who may change a role. Absent fields keep their value.
///
/// # Errors
///
/// 403 for someone else's account or a role change by a non-admin, 422 for
/// invalid values, 409 when the username or email is taken.
pub async fn update_user(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<UserId>,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<ApiEnvelope<UserProfile>>, AppError> {
    if !session.may_manage(id) {
        return Err(AppError::forbidden("You can only edit your own profile"));
    }
    if update.role.is_some() && session.user.role != Role::Admin {
        return Err(AppError::forbidden("Only administrators can change roles"));
    }

    let current = state.repository.account(id).await?.profile;
    let (username, email) = validation::profile(
        update.username.as_deref().unwrap_or(&current.username),
        update.email.as_deref().unwrap_or(&current.email),
    )?;

    let user = state
        .repository
        .update_user(
            id,
            ProfileUpdate {
                username: Some(username),
                email: Some(email),
                role: update.role,
            },
        )
        .await?;

    tracing::info!(user_id = %id, by = %session.user.id, "Profile updated");
    Ok(respond(user, "Profile updated"))
}

/// `PUT /api/users/:id/update-password`
///
/// Only the account owner may change its password.
///
/// # Errors
///
/// 403 for someone else's account, 400 when the current password is wrong,
/// 422 when the new one is too short.
pub async fn update_password(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<UserId>,
    ApiJson(change): ApiJson<PasswordChange>,
) -> Result<Json<ApiEnvelope<()>>, AppError> {
    if session.user.id != id {
        return Err(AppError::forbidden("You can only change your own password"));
    }

    let change = PasswordForm {
        current_password: change.current_password,
        confirm_password: change.new_password.clone(),
        new_password: change.new_password,
    }
    .validate()?;

    let account = state.repository.account(id).await?;
    if !account.password.verify(&change.current_password) {
        return Err(AppError::bad_request("Current password is incorrect"));
    }

    state
        .repository
        .set_password(id, PasswordHash::new(&change.new_password)?)
        .await?;

    tracing::info!(user_id = %id, "Password changed");
    Ok(done("Password updated"))
}

/// `DELETE /api/users/:id` (admin)
///
/// Also revokes every session the account holds.
///
/// # Errors
///
/// 404 for an unknown id.
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<ApiEnvelope<()>>, AppError> {
    state.repository.delete_user(id).await?;
    state.sessions.revoke_user(id).await;

    tracing::info!(user_id = %id, by = %admin.user.id, "Account deleted");
    Ok(done("User deleted"))
}
