//! Error types for web handlers.
//!
//! `AppError` bridges repository and validation failures to HTTP responses.
//! Every error renders the standard envelope with `success: false` so the
//! client can surface `message` directly.

use crate::auth::PasswordHashError;
use crate::repository::RepositoryError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use club_portal_core::types::ApiEnvelope;
use club_portal_core::ValidationError;
use std::fmt;

/// What went wrong, independent of wording
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request understood but refused (400)
    BadRequest,
    /// No valid session (401)
    Unauthorized,
    /// Session lacks the role or ownership (403)
    Forbidden,
    /// Unknown id (404)
    NotFound,
    /// Uniqueness or stock rule broken (409)
    Conflict,
    /// Body or field failed validation (422)
    Validation,
    /// Unsupported request content type (415)
    UnsupportedMedia,
    /// Bug or unexpected state (500)
    Internal,
}

impl ErrorKind {
    /// Status the kind renders with
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UnsupportedMedia => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code used as a log field and metric label
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Validation => "VALIDATION_ERROR",
            Self::UnsupportedMedia => "UNSUPPORTED_MEDIA_TYPE",
            Self::Internal => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<ApiEnvelope<Ticket>>, AppError> {
///     let ticket = state.repository.ticket(id).await?;
///     Ok(respond(ticket, "Ticket found"))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    kind: ErrorKind,
    /// User-facing, rendered as the envelope `message`
    message: String,
    /// Internal cause, logged and never sent
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Error of `kind` with a user-facing message
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Kind of failure
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Status this error renders with
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.kind.status()
    }

    /// 400
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// 401
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// 403
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// 404 for `entity` (a human name such as "Ticket")
    #[must_use]
    pub fn not_found(entity: &str) -> Self {
        Self::new(ErrorKind::NotFound, format!("{entity} not found"))
    }

    /// 409
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// 422
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// 500 with a generic message; the cause goes to the log only
    #[must_use]
    pub fn internal(source: anyhow::Error) -> Self {
        Self::new(ErrorKind::Internal, "An internal error occurred").with_source(source)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.kind.code();
        match (&self.kind, &self.source) {
            (ErrorKind::Internal, Some(source)) => {
                tracing::error!(code, message = %self.message, error = ?source, "Request failed");
            },
            (ErrorKind::Internal, None) => tracing::error!(code, message = %self.message, "Request failed"),
            _ => tracing::debug!(code, message = %self.message, "Request rejected"),
        }
        metrics::counter!("http.errors", "code" => code).increment(1);

        let body: ApiEnvelope<()> = ApiEnvelope::failure(self.message);
        (self.kind.status(), Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err)
    }
}

impl From<PasswordHashError> for AppError {
    fn from(err: PasswordHashError) -> Self {
        Self::internal(err.into())
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, .. } => Self::not_found(entity),
            RepositoryError::Conflict(message) => Self::conflict(message),
            RepositoryError::Invalid(message) => Self::validation(message),
        }
    }
}

/// Bodies that fail to parse or to match the expected shape are validation
/// failures. A missing `Content-Type` stays a 415.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let kind = match rejection {
            JsonRejection::MissingJsonContentType(_) => ErrorKind::UnsupportedMedia,
            _ => ErrorKind::Validation,
        };
        Self::new(kind, rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_code_and_message() {
        let err = AppError::bad_request("Current password is incorrect");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Current password is incorrect");
    }

    #[test]
    fn repository_not_found_names_the_entity() {
        let err = AppError::from(RepositoryError::NotFound {
            entity: "Ticket",
            id: "123".into(),
        });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Ticket not found");
    }

    #[test]
    fn validation_errors_map_to_422() {
        let err = AppError::from(ValidationError::Negative { field: "Price" });
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.message, "Price cannot be negative");
    }

    #[test]
    fn repository_conflicts_map_to_409() {
        let err = AppError::from(RepositoryError::Conflict("Email already registered".into()));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.kind().code(), "CONFLICT");
    }

    #[test]
    fn internal_errors_hide_the_cause() {
        let err = AppError::internal(anyhow::anyhow!("lock poisoned"));
        assert_eq!(err.message, "An internal error occurred");
        assert!(std::error::Error::source(&err).is_some());
    }
}
