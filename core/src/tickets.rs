//! Ticket store.
//!
//! Holds the fetched ticket list and runs the admin create/update/delete
//! flows. The list is only touched by result actions (`Loaded`, `Created`,
//! `Updated`, `Deleted`); commands validate and issue an effect.

use crate::api::{NewTicket, TicketChanges};
use crate::effect::Effect;
use crate::environment::PortalEnvironment;
use crate::error::{PortalError, ValidationError};
use crate::notifications::Toast;
use crate::reducer::Reducer;
use crate::types::{AuthToken, Ticket, TicketId};
use crate::validation::{TicketEditForm, TicketForm};
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;

/// Ticket list plus request bookkeeping
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketState {
    /// Tickets as last confirmed by the server
    pub tickets: Vec<Ticket>,
    /// A list fetch is in flight
    pub loading: bool,
    /// Validation failure of the last submitted form
    #[serde(skip)]
    pub form_error: Option<ValidationError>,
    /// Last API failure
    #[serde(skip)]
    pub last_error: Option<PortalError>,
    /// Toast outbox, drained by the portal reducer
    #[serde(skip)]
    pub notices: Vec<Toast>,
}

impl TicketState {
    /// Ticket by id
    #[must_use]
    pub fn get(&self, id: TicketId) -> Option<&Ticket> {
        self.tickets.iter().find(|ticket| ticket.id == id)
    }

    fn upsert(&mut self, ticket: Ticket) {
        match self.tickets.iter_mut().find(|t| t.id == ticket.id) {
            Some(existing) => *existing = ticket,
            None => self.tickets.push(ticket),
        }
    }
}

/// Ticket commands and results
#[derive(Clone, Debug, PartialEq)]
pub enum TicketAction {
    // Commands
    /// Fetch the full list
    Load,
    /// Validate and create a listing
    Create {
        /// Admin token
        token: AuthToken,
        /// Form contents
        form: TicketForm,
    },
    /// Validate and update price/availability
    Update {
        /// Admin token
        token: AuthToken,
        /// Listing to change
        id: TicketId,
        /// Form contents
        form: TicketEditForm,
    },
    /// Delete a listing
    Delete {
        /// Admin token
        token: AuthToken,
        /// Listing to delete
        id: TicketId,
    },

    // Results
    /// List fetched
    Loaded {
        /// Every listing, match populated
        tickets: Vec<Ticket>,
    },
    /// Created listing, re-fetched with its match populated
    Created {
        /// The new listing
        ticket: Ticket,
    },
    /// Server copy after an update
    Updated {
        /// The updated listing
        ticket: Ticket,
    },
    /// Server confirmed a delete
    Deleted {
        /// Deleted listing
        id: TicketId,
    },
    /// A call failed
    Failed {
        /// Why
        error: PortalError,
    },
}

impl TicketAction {
    /// The API failure this action reports, if any
    #[must_use]
    pub const fn failure(&self) -> Option<&PortalError> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Reducer for the ticket store
#[derive(Clone, Debug, Default)]
pub struct TicketReducer;

impl TicketReducer {
    /// Creates a new `TicketReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn load(env: &PortalEnvironment) -> Effect<TicketAction> {
        let api = Arc::clone(&env.api);
        Effect::future(async move {
            Some(match api.list_tickets().await {
                Ok(tickets) => TicketAction::Loaded { tickets },
                Err(error) => TicketAction::Failed { error },
            })
        })
    }

    /// `POST /api/tickets` then `GET /api/tickets/:id` for the populated copy.
    ///
    /// If the re-fetch fails the listing exists on the server but not
    /// locally, so the whole list is reloaded instead.
    fn create(env: &PortalEnvironment, token: AuthToken, body: NewTicket) -> Effect<TicketAction> {
        let api = Arc::clone(&env.api);
        Effect::future(async move {
            let record = match api.create_ticket(token, body).await {
                Ok(record) => record,
                Err(error) => return Some(TicketAction::Failed { error }),
            };
            Some(match api.get_ticket(record.id).await {
                Ok(ticket) => TicketAction::Created { ticket },
                Err(error) => {
                    tracing::warn!(ticket_id = %record.id, %error, "Created ticket could not be re-fetched");
                    TicketAction::Load
                },
            })
        })
    }

    fn update(
        env: &PortalEnvironment,
        token: AuthToken,
        id: TicketId,
        changes: TicketChanges,
    ) -> Effect<TicketAction> {
        let api = Arc::clone(&env.api);
        Effect::future(async move {
            Some(match api.update_ticket(token, id, changes).await {
                Ok(ticket) => TicketAction::Updated { ticket },
                Err(error) => TicketAction::Failed { error },
            })
        })
    }

    fn delete(env: &PortalEnvironment, token: AuthToken, id: TicketId) -> Effect<TicketAction> {
        let api = Arc::clone(&env.api);
        Effect::future(async move {
            Some(match api.delete_ticket(token, id).await {
                Ok(()) => TicketAction::Deleted { id },
                Err(error) => TicketAction::Failed { error },
            })
        })
    }

    fn invalid(state: &mut TicketState, error: ValidationError) -> SmallVec<[Effect<TicketAction>; 4]> {
        tracing::debug!(%error, "Ticket form rejected");
        state.notices.push(Toast::error(error.to_string()));
        state.form_error = Some(error);
        SmallVec::new()
    }
}

impl Reducer for TicketReducer {
    type State = TicketState;
    type Action = TicketAction;
    type Environment = PortalEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TicketAction::Load => {
                state.loading = true;
                smallvec![Self::load(env)]
            },

            TicketAction::Create { token, form } => match form.validate_new(&state.tickets) {
                Ok(body) => {
                    state.form_error = None;
                    smallvec![Self::create(env, token, body)]
                },
                Err(error) => Self::invalid(state, error),
            },

            TicketAction::Update { token, id, form } => match form.validate() {
                Ok(changes) => {
                    state.form_error = None;
                    smallvec![Self::update(env, token, id, changes)]
                },
                Err(error) => Self::invalid(state, error),
            },

            TicketAction::Delete { token, id } => smallvec![Self::delete(env, token, id)],

            TicketAction::Loaded { tickets } => {
                tracing::debug!(count = tickets.len(), "Tickets loaded");
                state.loading = false;
                state.last_error = None;
                state.tickets = tickets;
                SmallVec::new()
            },

            TicketAction::Created { ticket } => {
                state.notices.push(Toast::success(format!(
                    "{} ticket for {} created",
                    ticket.seat_category,
                    ticket.fixture.title()
                )));
                state.upsert(ticket);
                SmallVec::new()
            },

            TicketAction::Updated { ticket } => {
                state.notices.push(Toast::success("Ticket updated"));
                state.upsert(ticket);
                SmallVec::new()
            },

            TicketAction::Deleted { id } => {
                state.tickets.retain(|ticket| ticket.id != id);
                state.notices.push(Toast::success("Ticket deleted"));
                SmallVec::new()
            },

            TicketAction::Failed { error } => {
                tracing::warn!(%error, "Ticket request failed");
                state.loading = false;
                state.notices.push(Toast::error(error.user_message()));
                state.last_error = Some(error);
                SmallVec::new()
            },
        }
    }
}
