//! Sign-up and sign-in.

use super::{created, respond};
use crate::auth::PasswordHash;
use crate::error::AppError;
use crate::extractors::ApiJson;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use club_portal_core::api::{Credentials, LoginSession, Registration};
use club_portal_core::environment::Clock;
use club_portal_core::types::{ApiEnvelope, Role, UserProfile};
use club_portal_core::validation::RegistrationForm;

/// `POST /api/register`
///
/// New accounts are always fans. Username and email must be unused.
///
/// # Errors
///
/// - 422: invalid username, email or password
/// - 409: username or email taken
#[tracing::instrument(skip_all, name = "register")]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Registration>,
) -> Result<(StatusCode, Json<ApiEnvelope<UserProfile>>), AppError> {
    let registration = RegistrationForm {
        username: body.username,
        email: body.email,
        confirm_password: body.password.clone(),
        password: body.password,
    }
    .validate()?;

    let user = state
        .repository
        .create_user(
            registration.username,
            registration.email,
            PasswordHash::new(&registration.password)?,
            Role::Fan,
        )
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "Account registered");
    Ok(created(user, "Registration successful"))
}

/// `POST /api/login`
///
/// `login` may be the username or the email.
///
/// # Errors
///
/// 401 when no account matches or the password is wrong. The two cases are
/// indistinguishable to the caller.
#[tracing::instrument(skip_all, name = "login")]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> Result<Json<ApiEnvelope<LoginSession>>, AppError> {
    let account = state
        .repository
        .find_by_login(credentials.login.trim())
        .await
        .filter(|account| account.password.verify(&credentials.password))
        .ok_or_else(|| {
            tracing::debug!(login = %credentials.login, "Login refused");
            AppError::unauthorized("Invalid credentials")
        })?;

    let (token, expires_at) = state.sessions.issue(account.profile.id, state.clock.now()).await;

    tracing::info!(user_id = %account.profile.id, "Signed in");
    Ok(respond(
        LoginSession {
            token,
            user: account.profile,
            expires_at,
        },
        "Login successful",
    ))
}
