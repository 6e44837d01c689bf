//! Custom Axum extractors.
//!
//! - `BearerToken`: the raw token from `Authorization: Bearer <token>`
//! - `SessionUser`: the signed-in account behind a valid token
//! - `RequireAdmin`: a signed-in account with the admin role
//! - `ApiJson`: JSON body whose rejections render the standard envelope
//!
//! # Examples
//!
//! ```ignore
//! async fn create_ticket(
//!     State(state): State<AppState>,
//!     RequireAdmin(admin): RequireAdmin,
//!     ApiJson(body): ApiJson<NewTicket>,
//! ) -> Result<Json<ApiEnvelope<TicketRecord>>, AppError> {
//!     tracing::info!(user_id = %admin.user.id, "Creating ticket");
//!     ...
//! }
//! ```

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use club_portal_core::environment::Clock;
use club_portal_core::types::{Role, UserProfile};
use serde::de::DeserializeOwned;

/// Bearer token extracted from `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'"))?
            .trim();

        if token.is_empty() {
            return Err(AppError::unauthorized("Empty bearer token"));
        }

        Ok(Self(token.to_string()))
    }
}

/// Authenticated account.
///
/// Use as a handler parameter to require a valid, unexpired session.
#[derive(Debug, Clone)]
pub struct SessionUser {
    /// The signed-in account as currently stored
    pub user: UserProfile,
}

impl SessionUser {
    /// Whether the account may act on `target`'s data (itself, or any as admin)
    #[must_use]
    pub fn may_manage(&self, target: club_portal_core::types::UserId) -> bool {
        self.user.id == target || self.user.role == Role::Admin
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state).await?;

        let user_id = state
            .sessions
            .resolve(&bearer.0, state.clock.now())
            .await
            .ok_or_else(|| AppError::unauthorized("Your session has expired. Please log in again."))?;

        // The account may have been deleted while the token was live.
        let account = state
            .repository
            .account(user_id)
            .await
            .map_err(|_| AppError::unauthorized("Your session has expired. Please log in again."))?;

        Ok(Self { user: account.profile })
    }
}

/// Signed-in admin; anyone else gets 403 (or 401 without a session).
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub SessionUser);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = SessionUser::from_request_parts(parts, state).await?;
        if session.user.role != Role::Admin {
            tracing::debug!(user_id = %session.user.id, role = session.user.role.as_str(), "Admin route refused");
            return Err(AppError::forbidden("Administrator access required"));
        }
        Ok(Self(session))
    }
}

/// JSON request body.
///
/// Same as [`Json`] but a malformed or mistyped body (negative price, unknown
/// seat category, ...) is reported in the `{ success, data, message }` shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}
