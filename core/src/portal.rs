//! The composed application state.
//!
//! `PortalState` owns every feature's sub-state and is held by one store
//! instance that callers create and pass around. `PortalReducer` delegates
//! to the feature reducers and adds the cross-cutting rules:
//!
//! - a 401 reported by any feature signs the user out and navigates to `/login`
//! - toasts queued by features are collected into one list and expire
//! - catalog pagination resets to page 1 whenever the filtered list changes
//! - a successful checkout refreshes ticket availability and product stock

use crate::cart::{self, CartAction, CartReducer, CartState};
use crate::catalog::{self, Availability, CatalogFilter, DateBucket, PriceRange, SortKey};
use crate::effect::Effect;
use crate::environment::PortalEnvironment;
use crate::error::PortalError;
use crate::matches::{MatchAction, MatchReducer, MatchState};
use crate::notifications::{ActiveToast, Toast, TOAST_TTL};
use crate::orders::{OrderAction, OrderReducer, OrderState};
use crate::pagination::{self, Pagination};
use crate::products::{ProductAction, ProductReducer, ProductState};
use crate::reducer::Reducer;
use crate::routes::{self, HOME_PATH};
use crate::session::{SessionAction, SessionReducer, SessionState};
use crate::tickets::{TicketAction, TicketReducer, TicketState};
use crate::types::{LineId, LineItemKind, Ticket};
use crate::users::{UserAction, UserReducer, UserState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Filter inputs and the current page of the ticket catalog
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogState {
    /// Filter and sort inputs
    pub filter: CatalogFilter,
    /// Page position
    pub pagination: Pagination,
}

/// Catalog view inputs
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogAction {
    /// Free-text search
    Search(String),
    /// Upcoming/past bucket
    DateBucket(DateBucket),
    /// Competition dropdown
    Competition(Option<String>),
    /// Price slider
    Price(PriceRange),
    /// Stock filter
    Availability(Availability),
    /// Ordering
    Sort(SortKey),
    /// Pager
    GoToPage(usize),
    /// Back to defaults
    Reset,
}

/// Everything the portal UI renders from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalState {
    /// Login state
    pub session: SessionState,
    /// Ticket listings
    pub tickets: TicketState,
    /// Fixtures
    pub matches: MatchState,
    /// Shop catalogue
    pub products: ProductState,
    /// Cart
    pub cart: CartState,
    /// Order history
    pub orders: OrderState,
    /// User administration
    pub users: UserState,
    /// Catalog filter and page
    pub catalog: CatalogState,
    /// Toasts on screen, oldest first
    pub toasts: Vec<ActiveToast>,
    /// Route currently shown
    pub location: String,
    #[serde(skip)]
    next_toast_id: u64,
}

impl Default for PortalState {
    fn default() -> Self {
        Self::with_page_size(crate::pagination::DEFAULT_PAGE_SIZE)
    }
}

impl PortalState {
    /// Empty state with a catalog page size
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            session: SessionState::default(),
            tickets: TicketState::default(),
            matches: MatchState::default(),
            products: ProductState::default(),
            cart: CartState::default(),
            orders: OrderState::default(),
            users: UserState::default(),
            catalog: CatalogState {
                filter: CatalogFilter::default(),
                pagination: Pagination::new(page_size),
            },
            toasts: Vec::new(),
            location: HOME_PATH.to_string(),
            next_toast_id: 0,
        }
    }

    /// Tickets passing the catalog filter, in display order
    #[must_use]
    pub fn visible_tickets(&self, now: DateTime<Utc>) -> Vec<&Ticket> {
        catalog::apply(&self.tickets.tickets, &self.catalog.filter, now)
    }

    /// Page number shown at `now`. Falls back to page 1 when the filtered
    /// list has changed since the last action, e.g. a kick-off passed.
    #[must_use]
    pub fn page_number(&self, now: DateTime<Utc>) -> usize {
        let visible = self.visible_tickets(now);
        self.catalog
            .pagination
            .page_for(visible.iter().map(|ticket| ticket.id))
    }

    /// The current catalog page
    #[must_use]
    pub fn current_page(&self, now: DateTime<Utc>) -> Vec<&Ticket> {
        let visible = self.visible_tickets(now);
        let pager = &self.catalog.pagination;
        let number = pager.page_for(visible.iter().map(|ticket| ticket.id));
        pagination::page(&visible, number, pager.page_size).to_vec()
    }

    /// Pages in the filtered catalog
    #[must_use]
    pub fn total_pages(&self, now: DateTime<Utc>) -> usize {
        self.catalog
            .pagination
            .total_pages(self.visible_tickets(now).len())
    }

    /// Competition dropdown options
    #[must_use]
    pub fn competitions(&self) -> Vec<String> {
        catalog::competitions(&self.tickets.tickets)
    }

    /// Tickets of a listing still addable to the cart
    #[must_use]
    pub fn remaining_for(&self, ticket: &Ticket) -> u32 {
        cart::remaining_tickets(&self.cart.lines, ticket)
    }

    /// Current availability/stock of the listing a cart line refers to
    fn availability_of(&self, line_id: LineId) -> Option<u32> {
        match &self.cart.line(line_id)?.kind {
            LineItemKind::Ticket { match_id, seat_category, .. } => self
                .tickets
                .tickets
                .iter()
                .find(|ticket| ticket.key() == (*match_id, *seat_category))
                .map(|ticket| ticket.available_tickets),
            LineItemKind::Merchandise { product_id } => {
                self.products.get(*product_id).map(|product| product.stock)
            },
        }
    }

    fn sync_pagination(&mut self, now: DateTime<Utc>) {
        let ids: Vec<_> = self.visible_tickets(now).iter().map(|ticket| ticket.id).collect();
        if self.catalog.pagination.sync(ids) {
            tracing::trace!("Catalog changed, back to page 1");
        }
    }

    fn clear_private(&mut self) {
        self.cart = CartState::default();
        self.orders = OrderState::default();
        self.users = UserState::default();
    }

    /// Move every feature's queued toasts into `toasts`, returning their ids
    fn collect_toasts(&mut self) -> Vec<u64> {
        let queued: Vec<Toast> = [
            &mut self.session.notices,
            &mut self.tickets.notices,
            &mut self.matches.notices,
            &mut self.products.notices,
            &mut self.cart.notices,
            &mut self.orders.notices,
            &mut self.users.notices,
        ]
        .into_iter()
        .flat_map(std::mem::take)
        .collect();

        queued
            .into_iter()
            .map(|toast| {
                self.next_toast_id += 1;
                let id = self.next_toast_id;
                self.toasts.push(ActiveToast { id, toast });
                id
            })
            .collect()
    }
}

/// Top-level portal actions
#[derive(Clone, Debug, PartialEq)]
pub enum PortalAction {
    /// Fetch the public lists (tickets, fixtures, products)
    Bootstrap,
    /// Session feature
    Session(SessionAction),
    /// Ticket feature
    Tickets(TicketAction),
    /// Fixture feature
    Matches(MatchAction),
    /// Shop feature
    Products(ProductAction),
    /// Cart feature
    Cart(CartAction),
    /// Order feature
    Orders(OrderAction),
    /// User administration
    Users(UserAction),
    /// Catalog view inputs
    Catalog(CatalogAction),
    /// Change a cart line's quantity, checked against the loaded listing
    ChangeCartQuantity {
        /// Line to change
        line_id: LineId,
        /// New quantity
        quantity: u32,
    },
    /// Open a route, subject to the role guard
    Navigate {
        /// Requested path
        path: String,
    },
    /// Remove a toast
    DismissToast {
        /// Toast id
        id: u64,
    },
}

impl PortalAction {
    /// The API failure carried by this action, if any
    #[must_use]
    pub const fn failure(&self) -> Option<&PortalError> {
        match self {
            Self::Session(action) => action.failure(),
            Self::Tickets(action) => action.failure(),
            Self::Matches(action) => action.failure(),
            Self::Products(action) => action.failure(),
            Self::Cart(action) => action.failure(),
            Self::Orders(action) => action.failure(),
            Self::Users(action) => action.failure(),
            _ => None,
        }
    }
}

type Effects = SmallVec<[Effect<PortalAction>; 4]>;

fn lift<A, F>(effects: SmallVec<[Effect<A>; 4]>, wrap: F) -> Effects
where
    A: Send + 'static,
    F: Fn(A) -> PortalAction + Clone + Send + Sync + 'static,
{
    effects.into_iter().map(|effect| effect.map(wrap.clone())).collect()
}

/// Root reducer of the portal
#[derive(Clone, Debug, Default)]
pub struct PortalReducer {
    session: SessionReducer,
    tickets: TicketReducer,
    matches: MatchReducer,
    products: ProductReducer,
    cart: CartReducer,
    orders: OrderReducer,
    users: UserReducer,
}

impl PortalReducer {
    /// Creates a new `PortalReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session: SessionReducer::new(),
            tickets: TicketReducer::new(),
            matches: MatchReducer::new(),
            products: ProductReducer::new(),
            cart: CartReducer::new(),
            orders: OrderReducer::new(),
            users: UserReducer::new(),
        }
    }

    fn reduce_catalog(state: &mut PortalState, action: CatalogAction, now: DateTime<Utc>) {
        let filter = &mut state.catalog.filter;
        match action {
            CatalogAction::Search(search) => filter.search = search,
            CatalogAction::DateBucket(bucket) => filter.date_bucket = bucket,
            CatalogAction::Competition(competition) => filter.competition = competition,
            CatalogAction::Price(range) => filter.price = range,
            CatalogAction::Availability(availability) => filter.availability = availability,
            CatalogAction::Sort(sort) => filter.sort = sort,
            CatalogAction::Reset => *filter = CatalogFilter::default(),
            CatalogAction::GoToPage(page) => {
                state.sync_pagination(now);
                let len = state.visible_tickets(now).len();
                state.catalog.pagination.go_to(page, len);
            },
        }
    }

    fn reduce_feature(&self, state: &mut PortalState, action: PortalAction, env: &PortalEnvironment) -> Effects {
        match action {
            PortalAction::Bootstrap => {
                let mut effects = Effects::new();
                effects.extend(lift(
                    self.tickets.reduce(&mut state.tickets, TicketAction::Load, env),
                    PortalAction::Tickets,
                ));
                effects.extend(lift(
                    self.matches.reduce(&mut state.matches, MatchAction::Load, env),
                    PortalAction::Matches,
                ));
                effects.extend(lift(
                    self.products.reduce(&mut state.products, ProductAction::Load, env),
                    PortalAction::Products,
                ));
                effects
            },

            PortalAction::Session(action) => {
                let signs_out = matches!(action, SessionAction::Logout | SessionAction::Expired);
                let effects = lift(
                    self.session.reduce(&mut state.session, action, env),
                    PortalAction::Session,
                );
                if signs_out {
                    state.clear_private();
                }
                effects
            },

            PortalAction::Tickets(action) => {
                lift(self.tickets.reduce(&mut state.tickets, action, env), PortalAction::Tickets)
            },
            PortalAction::Matches(action) => {
                lift(self.matches.reduce(&mut state.matches, action, env), PortalAction::Matches)
            },
            PortalAction::Products(action) => {
                lift(self.products.reduce(&mut state.products, action, env), PortalAction::Products)
            },
            PortalAction::Orders(action) => {
                lift(self.orders.reduce(&mut state.orders, action, env), PortalAction::Orders)
            },
            PortalAction::Users(action) => {
                lift(self.users.reduce(&mut state.users, action, env), PortalAction::Users)
            },

            PortalAction::Cart(action) => {
                let placed = match &action {
                    CartAction::CheckoutSucceeded { order } => Some(order.clone()),
                    _ => None,
                };
                let mut effects =
                    lift(self.cart.reduce(&mut state.cart, action, env), PortalAction::Cart);
                if let Some(order) = placed {
                    // Availability changed server-side; refetch rather than patch.
                    self.orders.reduce(&mut state.orders, OrderAction::Saved { order }, env);
                    effects.extend(lift(
                        self.tickets.reduce(&mut state.tickets, TicketAction::Load, env),
                        PortalAction::Tickets,
                    ));
                    effects.extend(lift(
                        self.products.reduce(&mut state.products, ProductAction::Load, env),
                        PortalAction::Products,
                    ));
                }
                effects
            },

            PortalAction::ChangeCartQuantity { line_id, quantity } => {
                let available = state.availability_of(line_id).unwrap_or(0);
                let action = CartAction::ChangeQuantity { line_id, quantity, available };
                lift(self.cart.reduce(&mut state.cart, action, env), PortalAction::Cart)
            },

            PortalAction::Catalog(action) => {
                Self::reduce_catalog(state, action, env.clock.now());
                Effects::new()
            },

            PortalAction::Navigate { path } => {
                let now = env.clock.now();
                let user = state
                    .session
                    .user
                    .as_ref()
                    .filter(|_| state.session.is_signed_in(now));
                let decision = routes::guard(&path, user);
                if decision != routes::RouteDecision::Allow {
                    tracing::debug!(%path, ?decision, "Navigation redirected");
                }
                state.location = decision.target(&path).to_string();
                Effects::new()
            },

            PortalAction::DismissToast { id } => {
                state.toasts.retain(|toast| toast.id != id);
                Effects::new()
            },
        }
    }
}

impl Reducer for PortalReducer {
    type State = PortalState;
    type Action = PortalAction;
    type Environment = PortalEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let unauthorized = action.failure().is_some_and(PortalError::is_unauthorized);

        let mut effects = self.reduce_feature(state, action, env);

        if unauthorized {
            self.session.reduce(&mut state.session, SessionAction::Expired, env);
            state.clear_private();
        }

        if let Some(path) = state.session.pending_navigation.take() {
            state.location = path;
        }

        for id in state.collect_toasts() {
            effects.push(Effect::Delay {
                duration: TOAST_TTL,
                action: Box::new(PortalAction::DismissToast { id }),
            });
        }

        state.sync_pagination(env.clock.now());
        effects
    }
}
