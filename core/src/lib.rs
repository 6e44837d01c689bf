//! # Club Portal Core
//!
//! Domain types and business logic for the football-club fan portal.
//!
//! The portal state layer follows the reducer architecture:
//!
//! - **State**: plain owned data per feature (tickets, cart, session, ...)
//! - **Action**: commands issued by the UI plus the result actions fed back by effects
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: a description of remote work, executed by the runtime
//! - **Environment**: injected dependencies (`PortalApi`, `Clock`)
//!
//! Commands never mutate entity lists speculatively. A create/update/delete
//! command validates, issues an effect, and the list only changes when the
//! success action comes back from the API.
//!
//! ## Modules
//!
//! - [`catalog`]: ticket filter/sort pipeline
//! - [`pagination`]: fixed-size paging with reset-on-change
//! - [`cart`]: cart line items and the reservation check
//! - [`tickets`], [`matches`], [`products`], [`orders`], [`users`]: entity stores
//! - [`session`]: login state and forced logout on 401
//! - [`routes`]: role-gated route table
//! - [`portal`]: the composed application state and reducer

pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

pub mod api;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod matches;
pub mod notifications;
pub mod orders;
pub mod pagination;
pub mod portal;
pub mod products;
pub mod routes;
pub mod session;
pub mod tickets;
pub mod types;
pub mod users;
pub mod validation;

pub use error::{PortalError, ValidationError};

/// The reducer contract every portal feature implements
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Applies one action to a feature's state.
    ///
    /// Reducers never call the API themselves. A command that needs the
    /// server returns an [`Effect`] and the state only changes again when the
    /// result action comes back.
    ///
    /// ```ignore
    /// impl Reducer for TicketReducer {
    ///     type State = TicketState;
    ///     type Action = TicketAction;
    ///     type Environment = PortalEnvironment;
    ///
    ///     fn reduce(&self, state: &mut TicketState, action: TicketAction, env: &PortalEnvironment)
    ///         -> SmallVec<[Effect<TicketAction>; 4]>
    ///     {
    ///         match action {
    ///             TicketAction::Load => { state.loading = true; smallvec![Self::load(env)] },
    ///             _ => SmallVec::new(),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// Feature state
        type State;

        /// Commands and the results fed back for them
        type Action;

        /// API handle and clock
        type Environment;

        /// Update `state` for `action` and describe the remote work to start
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Remote work described as data, run by the store
pub mod effect {
    use std::fmt;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Work for the runtime to perform on a reducer's behalf
    pub enum Effect<Action> {
        /// Nothing to do
        None,

        /// Start every child at once
        Parallel(Vec<Effect<Action>>),

        /// Run children one after another
        Sequential(Vec<Effect<Action>>),

        /// Dispatch `action` once `duration` has elapsed (toast expiry)
        Delay {
            /// Wait before dispatching
            duration: Duration,
            /// Dispatched when the timer fires
            action: Box<Action>,
        },

        /// An API call; a `Some` result is reduced like any other action
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    impl<Action: fmt::Debug> fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::None => f.write_str("None"),
                Self::Parallel(children) => f.debug_tuple("Parallel").field(children).finish(),
                Self::Sequential(children) => f.debug_tuple("Sequential").field(children).finish(),
                Self::Delay { duration, action } => {
                    write!(f, "Delay({duration:?} -> {action:?})")
                },
                Self::Future(_) => f.write_str("Future(..)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// [`Effect::Parallel`]
        #[must_use]
        pub const fn merge(effects: Vec<Self>) -> Self {
            Self::Parallel(effects)
        }

        /// [`Effect::Sequential`]
        #[must_use]
        pub const fn chain(effects: Vec<Self>) -> Self {
            Self::Sequential(effects)
        }

        /// Wrap an async block that yields at most one follow-up action
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Lift an effect into a parent action type.
        ///
        /// Used by the portal reducer to embed child effects
        /// (`Effect<TicketAction>` → `Effect<PortalAction>`).
        #[must_use]
        pub fn map<B, F>(self, f: F) -> Effect<B>
        where
            Action: Send + 'static,
            B: Send + 'static,
            F: Fn(Action) -> B + Clone + Send + Sync + 'static,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Parallel(effects) => Effect::Parallel(
                    effects.into_iter().map(|e| e.map(f.clone())).collect(),
                ),
                Effect::Sequential(effects) => Effect::Sequential(
                    effects.into_iter().map(|e| e.map(f.clone())).collect(),
                ),
                Effect::Delay { duration, action } => Effect::Delay {
                    duration,
                    action: Box::new(f(*action)),
                },
                Effect::Future(fut) => Effect::Future(Box::pin(async move { fut.await.map(f) })),
            }
        }

        /// True for [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// What reducers are given instead of reaching for globals
pub mod environment {
    use crate::api::PortalApi;
    use chrono::{DateTime, Utc};
    use std::sync::Arc;

    /// Source of "now".
    ///
    /// The catalog date buckets are evaluated against `now()` at the moment
    /// the view is derived, never at the moment a filter was chosen.
    pub trait Clock: Send + Sync {
        /// Current instant, UTC
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock implementation of [`Clock`]
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Dependencies shared by every portal reducer
    #[derive(Clone)]
    pub struct PortalEnvironment {
        /// Remote API used by effects
        pub api: Arc<dyn PortalApi>,
        /// Time source
        pub clock: Arc<dyn Clock>,
    }

    impl PortalEnvironment {
        /// Creates a new `PortalEnvironment`
        #[must_use]
        pub fn new(api: Arc<dyn PortalApi>, clock: Arc<dyn Clock>) -> Self {
            Self { api, clock }
        }
    }
}
