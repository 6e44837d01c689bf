//! Error taxonomy shared by reducers, the HTTP client and the server.

use thiserror::Error;

/// Static message shown when neither the server nor the transport gave one.
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

/// Client-side validation failure. Raised before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty
    #[error("{field} is required")]
    Required {
        /// Field name as shown on the form
        field: &'static str,
    },

    /// A numeric field is below zero
    #[error("{field} cannot be negative")]
    Negative {
        /// Field name as shown on the form
        field: &'static str,
    },

    /// A numeric field is not a finite number or is out of range
    #[error("{field} is not a valid number")]
    InvalidNumber {
        /// Field name as shown on the form
        field: &'static str,
    },

    /// An entity with the same natural key is already loaded
    #[error("{0} already exists")]
    Duplicate(String),

    /// A field fails a format or length rule
    #[error("{field}: {reason}")]
    Invalid {
        /// Field name as shown on the form
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// Requested quantity exceeds what is left after cart reservations
    #[error("Only {remaining} left for {label}")]
    ExceedsRemaining {
        /// Units still obtainable
        remaining: u32,
        /// Ticket category or product name
        label: String,
    },

    /// Quantity of zero requested
    #[error("Quantity must be at least 1")]
    ZeroQuantity,

    /// The server rejected the input (400/422) with this message
    #[error("{0}")]
    Rejected(String),
}

impl ValidationError {
    /// The form field this error belongs to, if it is field-level
    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::Required { field }
            | Self::Negative { field }
            | Self::InvalidNumber { field }
            | Self::Invalid { field, .. } => Some(*field),
            Self::Duplicate(_)
            | Self::ExceedsRemaining { .. }
            | Self::ZeroQuantity
            | Self::Rejected(_) => None,
        }
    }
}

/// Errors surfaced by portal operations.
///
/// Nothing is retried automatically; every variant is terminal for the
/// user action that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortalError {
    /// Client-side validation failed; no request was sent
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// 401: the session is missing or expired
    #[error("{}", .message.as_deref().unwrap_or("Your session has expired. Please log in again."))]
    Unauthorized {
        /// Server-provided message
        message: Option<String>,
    },

    /// 403: signed in but not allowed
    #[error("{}", .message.as_deref().unwrap_or("You are not allowed to do that."))]
    Forbidden {
        /// Server-provided message
        message: Option<String>,
    },

    /// 404
    #[error("{}", .message.as_deref().unwrap_or("Not found."))]
    NotFound {
        /// Server-provided message
        message: Option<String>,
    },

    /// 409: duplicate username/email, duplicate ticket category, insufficient stock
    #[error("{message}")]
    Conflict {
        /// Server-provided message
        message: String,
    },

    /// Any other non-success status
    #[error("{}", .message.as_deref().unwrap_or(FALLBACK_MESSAGE))]
    Server {
        /// HTTP status code
        status: u16,
        /// Server-provided message
        message: Option<String>,
    },

    /// Transport failure (connect, timeout, malformed body)
    #[error("{0}")]
    Network(String),
}

impl PortalError {
    /// True for 401 responses, which force a logout
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Message suitable for a toast.
    ///
    /// Falls back from the server's message, to the error's own message, to
    /// [`FALLBACK_MESSAGE`].
    #[must_use]
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            message
        }
    }

    /// Build an error from an HTTP status and the (optional) envelope message.
    #[must_use]
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let message = message.filter(|m| !m.trim().is_empty());
        match status {
            401 => Self::Unauthorized { message },
            403 => Self::Forbidden { message },
            404 => Self::NotFound { message },
            409 => Self::Conflict {
                message: message.unwrap_or_else(|| "Conflict".to_string()),
            },
            400 | 422 => Self::Validation(ValidationError::Rejected(
                message.unwrap_or_else(|| "Invalid request".to_string()),
            )),
            _ => Self::Server { status, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_falls_back_through_layers() {
        let with_body = PortalError::from_status(500, Some("Database unavailable".into()));
        assert_eq!(with_body.user_message(), "Database unavailable");

        let without_body = PortalError::from_status(500, None);
        assert_eq!(without_body.user_message(), FALLBACK_MESSAGE);

        let blank_body = PortalError::from_status(502, Some("   ".into()));
        assert_eq!(blank_body.user_message(), FALLBACK_MESSAGE);

        let transport = PortalError::Network(String::new());
        assert_eq!(transport.user_message(), FALLBACK_MESSAGE);
    }

    #[test]
    fn status_mapping() {
        assert!(PortalError::from_status(401, None).is_unauthorized());
        assert!(matches!(
            PortalError::from_status(409, Some("Username already taken".into())),
            PortalError::Conflict { ref message } if message == "Username already taken"
        ));
        assert!(matches!(
            PortalError::from_status(422, None),
            PortalError::Validation(_)
        ));
    }

    #[test]
    fn validation_field_names() {
        let err = ValidationError::Negative { field: "Price" };
        assert_eq!(err.to_string(), "Price cannot be negative");
        assert_eq!(err.field(), Some("Price"));
        assert_eq!(ValidationError::ZeroQuantity.field(), None);
    }
}
