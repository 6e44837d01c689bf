//! Toasts: transient success/failure messages.
//!
//! Feature reducers push toasts into their own `notices` outbox; the portal
//! reducer drains every outbox into one queue the UI renders.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long a toast stays on screen before it is dismissed automatically
pub const TOAST_TTL: Duration = Duration::from_secs(4);

/// Toast severity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    /// Confirmation
    Success,
    /// Failure
    Error,
}

/// A user-visible notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    /// Severity
    pub kind: ToastKind,
    /// Text shown to the user
    pub message: String,
}

impl Toast {
    /// Success toast
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    /// Error toast
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }

    /// True for error toasts
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.kind, ToastKind::Error)
    }
}

/// A toast currently on screen
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveToast {
    /// Dismissal handle
    pub id: u64,
    /// Content
    #[serde(flatten)]
    pub toast: Toast,
}
