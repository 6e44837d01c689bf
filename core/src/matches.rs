//! Match (fixture) store and admin CRUD.

use crate::effect::Effect;
use crate::environment::PortalEnvironment;
use crate::error::{PortalError, ValidationError};
use crate::notifications::Toast;
use crate::reducer::Reducer;
use crate::types::{AuthToken, Match, MatchId};
use crate::validation::MatchForm;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;

/// Fixture list
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchState {
    /// Fixtures as last confirmed by the server
    pub matches: Vec<Match>,
    /// A list fetch is in flight
    pub loading: bool,
    /// Validation failure of the last submitted form
    #[serde(skip)]
    pub form_error: Option<ValidationError>,
    /// Last API failure
    #[serde(skip)]
    pub last_error: Option<PortalError>,
    /// Toast outbox
    #[serde(skip)]
    pub notices: Vec<Toast>,
}

impl MatchState {
    /// Fixtures at or after `now`, soonest first
    #[must_use]
    pub fn upcoming(&self, now: DateTime<Utc>) -> Vec<&Match> {
        let mut upcoming: Vec<&Match> = self
            .matches
            .iter()
            .filter(|fixture| fixture.event_date >= now)
            .collect();
        upcoming.sort_by_key(|fixture| fixture.event_date);
        upcoming
    }
}

/// Match commands and results
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchAction {
    /// Fetch the fixture list
    Load,
    /// Validate and create a fixture
    Create {
        /// Admin token
        token: AuthToken,
        /// Form contents
        form: MatchForm,
    },
    /// Validate and replace a fixture
    Update {
        /// Admin token
        token: AuthToken,
        /// Fixture to change
        id: MatchId,
        /// Form contents
        form: MatchForm,
    },
    /// Delete a fixture
    Delete {
        /// Admin token
        token: AuthToken,
        /// Fixture to delete
        id: MatchId,
    },
    /// List fetched
    Loaded {
        /// Every fixture
        matches: Vec<Match>,
    },
    /// Server copy of a created or updated fixture
    Saved {
        /// The fixture
        fixture: Match,
    },
    /// Server confirmed a delete
    Deleted {
        /// Deleted fixture
        id: MatchId,
    },
    /// A call failed
    Failed {
        /// Why
        error: PortalError,
    },
}

impl MatchAction {
    /// The API failure this action reports, if any
    #[must_use]
    pub const fn failure(&self) -> Option<&PortalError> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Reducer for the fixture list
#[derive(Clone, Debug, Default)]
pub struct MatchReducer;

impl MatchReducer {
    /// Creates a new `MatchReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for MatchReducer {
    type State = MatchState;
    type Action = MatchAction;
    type Environment = PortalEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let api = Arc::clone(&env.api);
        match action {
            MatchAction::Load => {
                state.loading = true;
                smallvec![Effect::future(async move {
                    Some(match api.list_matches().await {
                        Ok(matches) => MatchAction::Loaded { matches },
                        Err(error) => MatchAction::Failed { error },
                    })
                })]
            },

            MatchAction::Create { token, form } => match form.validate() {
                Ok(draft) => {
                    state.form_error = None;
                    smallvec![Effect::future(async move {
                        Some(match api.create_match(token, draft).await {
                            Ok(fixture) => MatchAction::Saved { fixture },
                            Err(error) => MatchAction::Failed { error },
                        })
                    })]
                },
                Err(error) => {
                    state.notices.push(Toast::error(error.to_string()));
                    state.form_error = Some(error);
                    SmallVec::new()
                },
            },

            MatchAction::Update { token, id, form } => match form.validate() {
                Ok(draft) => {
                    state.form_error = None;
                    smallvec![Effect::future(async move {
                        Some(match api.update_match(token, id, draft).await {
                            Ok(fixture) => MatchAction::Saved { fixture },
                            Err(error) => MatchAction::Failed { error },
                        })
                    })]
                },
                Err(error) => {
                    state.notices.push(Toast::error(error.to_string()));
                    state.form_error = Some(error);
                    SmallVec::new()
                },
            },

            MatchAction::Delete { token, id } => smallvec![Effect::future(async move {
                Some(match api.delete_match(token, id).await {
                    Ok(()) => MatchAction::Deleted { id },
                    Err(error) => MatchAction::Failed { error },
                })
            })],

            MatchAction::Loaded { matches } => {
                state.loading = false;
                state.last_error = None;
                state.matches = matches;
                SmallVec::new()
            },

            MatchAction::Saved { fixture } => {
                state.notices.push(Toast::success(format!("{} saved", fixture.title())));
                match state.matches.iter_mut().find(|m| m.id == fixture.id) {
                    Some(existing) => *existing = fixture,
                    None => state.matches.push(fixture),
                }
                SmallVec::new()
            },

            MatchAction::Deleted { id } => {
                state.matches.retain(|fixture| fixture.id != id);
                state.notices.push(Toast::success("Match deleted"));
                SmallVec::new()
            },

            MatchAction::Failed { error } => {
                tracing::warn!(%error, "Match request failed");
                state.loading = false;
                state.notices.push(Toast::error(error.user_message()));
                state.last_error = Some(error);
                SmallVec::new()
            },
        }
    }
}
