//! Session store: registration, login, profile changes, logout.
//!
//! A 401 from any call ends in [`SessionAction::Expired`], which clears the
//! session and requests navigation to the login page. The portal reducer
//! dispatches it; feature reducers never touch the session.

use crate::api::{Credentials, LoginSession, ProfileUpdate};
use crate::effect::Effect;
use crate::environment::PortalEnvironment;
use crate::error::{PortalError, ValidationError};
use crate::notifications::Toast;
use crate::reducer::Reducer;
use crate::routes::{HOME_PATH, LOGIN_PATH};
use crate::types::{AuthToken, UserProfile};
use crate::validation::{self, PasswordForm, RegistrationForm};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;

/// Login state
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Bearer token, present while signed in
    pub token: Option<AuthToken>,
    /// Signed-in account
    pub user: Option<UserProfile>,
    /// When the server stops accepting `token`
    pub expires_at: Option<DateTime<Utc>>,
    /// A request is in flight
    pub busy: bool,
    /// Navigation requested by the last transition
    pub pending_navigation: Option<String>,
    /// Field-level failure of the last submitted form
    #[serde(skip)]
    pub form_error: Option<ValidationError>,
    /// Last API failure
    #[serde(skip)]
    pub last_error: Option<PortalError>,
    /// Toast outbox
    #[serde(skip)]
    pub notices: Vec<Toast>,
}

impl SessionState {
    /// Signed in with a token that has not expired at `now`
    #[must_use]
    pub fn is_signed_in(&self, now: DateTime<Utc>) -> bool {
        self.token.is_some() && self.expires_at.is_none_or(|expires_at| now < expires_at)
    }

    /// Token and account together, if signed in
    #[must_use]
    pub fn credentials(&self) -> Option<(&AuthToken, &UserProfile)> {
        self.token.as_ref().zip(self.user.as_ref())
    }

    fn clear(&mut self) {
        self.token = None;
        self.user = None;
        self.expires_at = None;
        self.busy = false;
    }

    fn reject(&mut self, error: ValidationError) {
        self.notices.push(Toast::error(error.to_string()));
        self.form_error = Some(error);
    }
}

/// What the last request was, so failures can be attributed to a form
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionRequest {
    /// `POST /api/register`
    Register,
    /// `POST /api/login`
    Login,
    /// `PUT /api/users/:id`
    Profile,
    /// `PUT /api/users/:id/update-password`
    Password,
}

/// Session commands and results
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionAction {
    /// Validate and create an account
    Register {
        /// Form contents
        form: RegistrationForm,
    },
    /// Sign in
    Login {
        /// Username or email plus password
        credentials: Credentials,
    },
    /// Sign out
    Logout,
    /// The server rejected the token; sign out and go to the login page
    Expired,
    /// Validate and update the signed-in user's username/email
    UpdateProfile {
        /// New username
        username: String,
        /// New email
        email: String,
    },
    /// Validate and change the signed-in user's password
    ChangePassword {
        /// Form contents
        form: PasswordForm,
    },

    /// Account created
    Registered {
        /// The new account
        user: UserProfile,
    },
    /// Signed in
    LoggedIn {
        /// Token and account
        session: LoginSession,
    },
    /// Server copy of the updated profile
    ProfileUpdated {
        /// The account
        user: UserProfile,
    },
    /// Password changed
    PasswordChanged,
    /// A call failed
    Failed {
        /// Which call
        request: SessionRequest,
        /// Why
        error: PortalError,
    },
}

impl SessionAction {
    /// The API failure this action reports, if any.
    ///
    /// A failed login is not a session expiry, so it is not reported.
    #[must_use]
    pub const fn failure(&self) -> Option<&PortalError> {
        match self {
            Self::Failed { request: SessionRequest::Login, .. } => None,
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Reducer for the session
#[derive(Clone, Debug, Default)]
pub struct SessionReducer;

impl SessionReducer {
    /// Creates a new `SessionReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Attach a server conflict (duplicate username/email) to the field it names
    fn conflict_field(message: &str) -> &'static str {
        if message.to_lowercase().contains("email") {
            "Email"
        } else {
            "Username"
        }
    }

    fn validate_login(credentials: &Credentials) -> Result<(), ValidationError> {
        if credentials.login.trim().is_empty() {
            return Err(ValidationError::Required { field: "Username" });
        }
        if credentials.password.is_empty() {
            return Err(ValidationError::Required { field: "Password" });
        }
        Ok(())
    }
}

impl Reducer for SessionReducer {
    type State = SessionState;
    type Action = SessionAction;
    type Environment = PortalEnvironment;

    #[allow(clippy::too_many_lines)]
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let api = Arc::clone(&env.api);
        match action {
            SessionAction::Register { form } => match form.validate() {
                Ok(registration) => {
                    state.form_error = None;
                    state.busy = true;
                    smallvec![Effect::future(async move {
                        Some(match api.register(registration).await {
                            Ok(user) => SessionAction::Registered { user },
                            Err(error) => SessionAction::Failed {
                                request: SessionRequest::Register,
                                error,
                            },
                        })
                    })]
                },
                Err(error) => {
                    state.reject(error);
                    SmallVec::new()
                },
            },

            SessionAction::Login { credentials } => {
                if let Err(error) = Self::validate_login(&credentials) {
                    state.reject(error);
                    return SmallVec::new();
                }
                state.form_error = None;
                state.busy = true;
                smallvec![Effect::future(async move {
                    Some(match api.login(credentials).await {
                        Ok(session) => SessionAction::LoggedIn { session },
                        Err(error) => SessionAction::Failed {
                            request: SessionRequest::Login,
                            error,
                        },
                    })
                })]
            },

            SessionAction::Logout => {
                state.clear();
                state.pending_navigation = Some(HOME_PATH.to_string());
                state.notices.push(Toast::success("Signed out"));
                SmallVec::new()
            },

            SessionAction::Expired => {
                if state.token.is_some() {
                    tracing::info!("Session rejected by server, signing out");
                }
                state.clear();
                state.pending_navigation = Some(LOGIN_PATH.to_string());
                SmallVec::new()
            },

            SessionAction::UpdateProfile { username, email } => {
                let Some((token, user)) = state.credentials() else {
                    state.pending_navigation = Some(LOGIN_PATH.to_string());
                    return SmallVec::new();
                };
                let (token, id) = (token.clone(), user.id);
                match validation::profile(&username, &email) {
                    Ok((username, email)) => {
                        state.form_error = None;
                        state.busy = true;
                        let update = ProfileUpdate {
                            username: Some(username),
                            email: Some(email),
                            role: None,
                        };
                        smallvec![Effect::future(async move {
                            Some(match api.update_user(token, id, update).await {
                                Ok(user) => SessionAction::ProfileUpdated { user },
                                Err(error) => SessionAction::Failed {
                                    request: SessionRequest::Profile,
                                    error,
                                },
                            })
                        })]
                    },
                    Err(error) => {
                        state.reject(error);
                        SmallVec::new()
                    },
                }
            },

            SessionAction::ChangePassword { form } => {
                let Some((token, user)) = state.credentials() else {
                    state.pending_navigation = Some(LOGIN_PATH.to_string());
                    return SmallVec::new();
                };
                let (token, id) = (token.clone(), user.id);
                match form.validate() {
                    Ok(change) => {
                        state.form_error = None;
                        state.busy = true;
                        smallvec![Effect::future(async move {
                            Some(match api.update_password(token, id, change).await {
                                Ok(()) => SessionAction::PasswordChanged,
                                Err(error) => SessionAction::Failed {
                                    request: SessionRequest::Password,
                                    error,
                                },
                            })
                        })]
                    },
                    Err(error) => {
                        state.reject(error);
                        SmallVec::new()
                    },
                }
            },

            SessionAction::Registered { user } => {
                state.busy = false;
                state
                    .notices
                    .push(Toast::success(format!("Welcome, {}! You can now log in.", user.username)));
                state.pending_navigation = Some(LOGIN_PATH.to_string());
                SmallVec::new()
            },

            SessionAction::LoggedIn { session } => {
                tracing::info!(user_id = %session.user.id, role = session.user.role.as_str(), "Signed in");
                state.busy = false;
                state.last_error = None;
                state
                    .notices
                    .push(Toast::success(format!("Welcome back, {}", session.user.username)));
                state.token = Some(session.token);
                state.user = Some(session.user);
                state.expires_at = Some(session.expires_at);
                state.pending_navigation = Some(HOME_PATH.to_string());
                SmallVec::new()
            },

            SessionAction::ProfileUpdated { user } => {
                state.busy = false;
                state.notices.push(Toast::success("Profile updated"));
                state.user = Some(user);
                SmallVec::new()
            },

            SessionAction::PasswordChanged => {
                state.busy = false;
                state.notices.push(Toast::success("Password changed"));
                SmallVec::new()
            },

            SessionAction::Failed { request, error } => {
                tracing::warn!(?request, %error, "Session request failed");
                state.busy = false;
                if let (
                    SessionRequest::Register | SessionRequest::Profile,
                    PortalError::Conflict { message },
                ) = (request, &error)
                {
                    state.form_error = Some(ValidationError::Invalid {
                        field: Self::conflict_field(message),
                        reason: message.clone(),
                    });
                }
                state.notices.push(Toast::error(error.user_message()));
                state.last_error = Some(error);
                SmallVec::new()
            },
        }
    }
}
