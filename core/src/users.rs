//! Admin user management.

use crate::api::ProfileUpdate;
use crate::effect::Effect;
use crate::environment::PortalEnvironment;
use crate::error::PortalError;
use crate::notifications::Toast;
use crate::reducer::Reducer;
use crate::types::{AuthToken, Role, UserId, UserProfile};
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;

/// Accounts visible to an admin
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    /// Accounts as last confirmed by the server
    pub users: Vec<UserProfile>,
    /// A list fetch is in flight
    pub loading: bool,
    /// Last API failure
    #[serde(skip)]
    pub last_error: Option<PortalError>,
    /// Toast outbox
    #[serde(skip)]
    pub notices: Vec<Toast>,
}

/// User-admin commands and results
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserAction {
    /// Fetch every account
    Load {
        /// Admin token
        token: AuthToken,
    },
    /// Change an account's role
    ChangeRole {
        /// Admin token
        token: AuthToken,
        /// Account
        id: UserId,
        /// New role
        role: Role,
    },
    /// Delete an account
    Delete {
        /// Admin token
        token: AuthToken,
        /// Account
        id: UserId,
    },
    /// List fetched
    Loaded {
        /// Every account
        users: Vec<UserProfile>,
    },
    /// Server copy after an update
    Updated {
        /// The account
        user: UserProfile,
    },
    /// Server confirmed a delete
    Deleted {
        /// Deleted account
        id: UserId,
    },
    /// A call failed
    Failed {
        /// Why
        error: PortalError,
    },
}

impl UserAction {
    /// The API failure this action reports, if any
    #[must_use]
    pub const fn failure(&self) -> Option<&PortalError> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Reducer for user administration
#[derive(Clone, Debug, Default)]
pub struct UserReducer;

impl UserReducer {
    /// Creates a new `UserReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for UserReducer {
    type State = UserState;
    type Action = UserAction;
    type Environment = PortalEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let api = Arc::clone(&env.api);
        match action {
            UserAction::Load { token } => {
                state.loading = true;
                smallvec![Effect::future(async move {
                    Some(match api.list_users(token).await {
                        Ok(users) => UserAction::Loaded { users },
                        Err(error) => UserAction::Failed { error },
                    })
                })]
            },

            UserAction::ChangeRole { token, id, role } => {
                let update = ProfileUpdate {
                    role: Some(role),
                    ..ProfileUpdate::default()
                };
                smallvec![Effect::future(async move {
                    Some(match api.update_user(token, id, update).await {
                        Ok(user) => UserAction::Updated { user },
                        Err(error) => UserAction::Failed { error },
                    })
                })]
            },

            UserAction::Delete { token, id } => smallvec![Effect::future(async move {
                Some(match api.delete_user(token, id).await {
                    Ok(()) => UserAction::Deleted { id },
                    Err(error) => UserAction::Failed { error },
                })
            })],

            UserAction::Loaded { users } => {
                state.loading = false;
                state.last_error = None;
                state.users = users;
                SmallVec::new()
            },

            UserAction::Updated { user } => {
                state
                    .notices
                    .push(Toast::success(format!("{} is now {}", user.username, user.role.as_str())));
                if let Some(existing) = state.users.iter_mut().find(|u| u.id == user.id) {
                    *existing = user;
                }
                SmallVec::new()
            },

            UserAction::Deleted { id } => {
                state.users.retain(|user| user.id != id);
                state.notices.push(Toast::success("User deleted"));
                SmallVec::new()
            },

            UserAction::Failed { error } => {
                tracing::warn!(%error, "User request failed");
                state.loading = false;
                state.notices.push(Toast::error(error.user_message()));
                state.last_error = Some(error);
                SmallVec::new()
            },
        }
    }
}
