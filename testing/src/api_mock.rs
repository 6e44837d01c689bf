//! In-memory [`PortalApi`] double.
//!
//! Behaves like the real server for the rules reducers depend on
//! (duplicate ticket categories, stock checks at checkout) and records
//! every call so tests can assert that validation failures never reach it.

use chrono::{DateTime, Duration, Utc};
use club_portal_core::api::{
    ApiFuture, CheckoutRequest, Credentials, LoginSession, MatchDraft, NewTicket, PasswordChange,
    PortalApi, ProductDraft, ProfileUpdate, Registration, TicketChanges,
};
use club_portal_core::error::PortalError;
use club_portal_core::types::{
    AuthToken, LineItemKind, Match, MatchId, Money, Order, OrderId, OrderLine, OrderStatus,
    Product, ProductId, Role, SeatCategory, Ticket, TicketId, TicketRecord, UserId, UserProfile,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Backend {
    matches: Vec<Match>,
    tickets: Vec<TicketRecord>,
    products: Vec<Product>,
    users: Vec<(UserProfile, String)>,
    orders: Vec<Order>,
    sessions: HashMap<String, UserId>,
}

impl Backend {
    fn populate(&self, record: &TicketRecord) -> Result<Ticket, PortalError> {
        self.matches
            .iter()
            .find(|m| m.id == record.match_id)
            .map(|fixture| record.populate(fixture.clone()))
            .ok_or_else(|| not_found("Match"))
    }

    fn session_user(&self, token: &AuthToken) -> Result<UserProfile, PortalError> {
        let id = self
            .sessions
            .get(token.as_str())
            .ok_or(PortalError::Unauthorized { message: None })?;
        self.users
            .iter()
            .find(|(user, _)| user.id == *id)
            .map(|(user, _)| user.clone())
            .ok_or(PortalError::Unauthorized { message: None })
    }
}

fn not_found(what: &str) -> PortalError {
    PortalError::NotFound {
        message: Some(format!("{what} not found")),
    }
}

fn conflict(message: impl Into<String>) -> PortalError {
    PortalError::Conflict {
        message: message.into(),
    }
}

/// In-memory portal backend with a call log and programmable failures
pub struct MockPortalApi {
    backend: Mutex<Backend>,
    calls: Mutex<Vec<&'static str>>,
    failures: Mutex<VecDeque<PortalError>>,
    now: DateTime<Utc>,
}

impl Default for MockPortalApi {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockPortalApi {
    /// Empty backend; timestamps come from [`test_clock`](crate::test_clock)
    #[must_use]
    pub fn new() -> Self {
        use club_portal_core::environment::Clock;
        Self {
            backend: Mutex::new(Backend::default()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            now: crate::test_clock().now(),
        }
    }

    /// Seed a fixture
    #[must_use]
    pub fn with_match(self, fixture: Match) -> Self {
        {
            let mut backend = lock(&self.backend);
            if !backend.matches.iter().any(|m| m.id == fixture.id) {
                backend.matches.push(fixture);
            }
        }
        self
    }

    /// Seed a ticket listing (and its fixture)
    #[must_use]
    pub fn with_ticket(self, ticket: Ticket) -> Self {
        let this = self.with_match(ticket.fixture.clone());
        lock(&this.backend).tickets.push(TicketRecord {
            id: ticket.id,
            match_id: ticket.fixture.id,
            seat_category: ticket.seat_category,
            price: ticket.price,
            available_tickets: ticket.available_tickets,
        });
        this
    }

    /// Seed a product
    #[must_use]
    pub fn with_product(self, product: Product) -> Self {
        lock(&self.backend).products.push(product);
        self
    }

    /// Seed an account
    #[must_use]
    pub fn with_user(self, user: UserProfile, password: impl Into<String>) -> Self {
        lock(&self.backend).users.push((user, password.into()));
        self
    }

    /// Seed an account with an already issued token
    #[must_use]
    pub fn with_session(self, user: UserProfile, token: &AuthToken) -> Self {
        let id = user.id;
        let this = self.with_user(user, "password123");
        lock(&this.backend).sessions.insert(token.as_str().to_string(), id);
        this
    }

    /// Make the next call fail with `error`, whatever it is
    pub fn fail_next(&self, error: PortalError) {
        lock(&self.failures).push_back(error);
    }

    /// Names of the trait methods called so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<&'static str> {
        lock(&self.calls).clone()
    }

    /// How many times `method` was called
    #[must_use]
    pub fn call_count(&self, method: &str) -> usize {
        lock(&self.calls).iter().filter(|m| **m == method).count()
    }

    /// Current server-side listings, populated
    #[must_use]
    pub fn tickets(&self) -> Vec<Ticket> {
        let backend = lock(&self.backend);
        backend
            .tickets
            .iter()
            .filter_map(|record| backend.populate(record).ok())
            .collect()
    }

    /// Current server-side products
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        lock(&self.backend).products.clone()
    }

    fn respond<T, F>(&self, method: &'static str, handler: F) -> ApiFuture<'_, T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Backend) -> Result<T, PortalError>,
    {
        lock(&self.calls).push(method);
        let result = match lock(&self.failures).pop_front() {
            Some(error) => Err(error),
            None => handler(&mut *lock(&self.backend)),
        };
        Box::pin(futures::future::ready(result))
    }
}

impl PortalApi for MockPortalApi {
    fn register(&self, registration: Registration) -> ApiFuture<'_, UserProfile> {
        self.respond("register", |backend| {
            if backend.users.iter().any(|(u, _)| u.username == registration.username) {
                return Err(conflict("Username already taken"));
            }
            if backend.users.iter().any(|(u, _)| u.email == registration.email) {
                return Err(conflict("Email already registered"));
            }
            let user = UserProfile {
                id: UserId::new(),
                username: registration.username,
                email: registration.email,
                role: Role::Fan,
            };
            backend.users.push((user.clone(), registration.password));
            Ok(user)
        })
    }

    fn login(&self, credentials: Credentials) -> ApiFuture<'_, LoginSession> {
        let now = self.now;
        self.respond("login", |backend| {
            let user = backend
                .users
                .iter()
                .find(|(u, password)| {
                    (u.username == credentials.login || u.email == credentials.login)
                        && *password == credentials.password
                })
                .map(|(u, _)| u.clone())
                .ok_or(PortalError::Unauthorized {
                    message: Some("Invalid credentials".to_string()),
                })?;
            let token = AuthToken::new(uuid::Uuid::new_v4().to_string());
            backend.sessions.insert(token.as_str().to_string(), user.id);
            Ok(LoginSession {
                token,
                user,
                expires_at: now + Duration::hours(1),
            })
        })
    }

    fn list_users(&self, _token: AuthToken) -> ApiFuture<'_, Vec<UserProfile>> {
        self.respond("list_users", |backend| {
            Ok(backend.users.iter().map(|(u, _)| u.clone()).collect())
        })
    }

    fn update_user(
        &self,
        _token: AuthToken,
        id: UserId,
        update: ProfileUpdate,
    ) -> ApiFuture<'_, UserProfile> {
        self.respond("update_user", |backend| {
            let taken = update.username.as_ref().is_some_and(|username| {
                backend.users.iter().any(|(u, _)| u.id != id && u.username == *username)
            });
            if taken {
                return Err(conflict("Username already taken"));
            }
            let (user, _) = backend
                .users
                .iter_mut()
                .find(|(u, _)| u.id == id)
                .ok_or_else(|| not_found("User"))?;
            if let Some(username) = update.username {
                user.username = username;
            }
            if let Some(email) = update.email {
                user.email = email;
            }
            if let Some(role) = update.role {
                user.role = role;
            }
            Ok(user.clone())
        })
    }

    fn update_password(
        &self,
        _token: AuthToken,
        id: UserId,
        change: PasswordChange,
    ) -> ApiFuture<'_, ()> {
        self.respond("update_password", |backend| {
            let (_, password) = backend
                .users
                .iter_mut()
                .find(|(u, _)| u.id == id)
                .ok_or_else(|| not_found("User"))?;
            if *password != change.current_password {
                return Err(PortalError::from_status(
                    400,
                    Some("Current password is incorrect".to_string()),
                ));
            }
            *password = change.new_password;
            Ok(())
        })
    }

    fn delete_user(&self, _token: AuthToken, id: UserId) -> ApiFuture<'_, ()> {
        self.respond("delete_user", |backend| {
            let before = backend.users.len();
            backend.users.retain(|(u, _)| u.id != id);
            if backend.users.len() == before {
                return Err(not_found("User"));
            }
            Ok(())
        })
    }

    fn list_matches(&self) -> ApiFuture<'_, Vec<Match>> {
        self.respond("list_matches", |backend| Ok(backend.matches.clone()))
    }

    fn create_match(&self, _token: AuthToken, draft: MatchDraft) -> ApiFuture<'_, Match> {
        self.respond("create_match", |backend| {
            let fixture = Match {
                id: MatchId::new(),
                teams: draft.teams,
                event_date: draft.event_date,
                location: draft.location,
                competition: draft.competition,
                image: draft.image,
            };
            backend.matches.push(fixture.clone());
            Ok(fixture)
        })
    }

    fn update_match(&self, _token: AuthToken, id: MatchId, draft: MatchDraft) -> ApiFuture<'_, Match> {
        self.respond("update_match", |backend| {
            let fixture = backend
                .matches
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or_else(|| not_found("Match"))?;
            fixture.teams = draft.teams;
            fixture.event_date = draft.event_date;
            fixture.location = draft.location;
            fixture.competition = draft.competition;
            fixture.image = draft.image;
            Ok(fixture.clone())
        })
    }

    fn delete_match(&self, _token: AuthToken, id: MatchId) -> ApiFuture<'_, ()> {
        self.respond("delete_match", |backend| {
            if backend.tickets.iter().any(|t| t.match_id == id) {
                return Err(conflict("Match still has tickets on sale"));
            }
            backend.matches.retain(|m| m.id != id);
            Ok(())
        })
    }

    fn list_tickets(&self) -> ApiFuture<'_, Vec<Ticket>> {
        self.respond("list_tickets", |backend| {
            backend.tickets.iter().map(|r| backend.populate(r)).collect()
        })
    }

    fn get_ticket(&self, id: TicketId) -> ApiFuture<'_, Ticket> {
        self.respond("get_ticket", |backend| {
            let record = backend
                .tickets
                .iter()
                .find(|t| t.id == id)
                .ok_or_else(|| not_found("Ticket"))?;
            backend.populate(record)
        })
    }

    fn get_ticket_for(&self, match_id: MatchId, seat_category: SeatCategory) -> ApiFuture<'_, Ticket> {
        self.respond("get_ticket_for", |backend| {
            let record = backend
                .tickets
                .iter()
                .find(|t| t.match_id == match_id && t.seat_category == seat_category)
                .ok_or_else(|| not_found("Ticket"))?;
            backend.populate(record)
        })
    }

    fn create_ticket(&self, _token: AuthToken, ticket: NewTicket) -> ApiFuture<'_, TicketRecord> {
        self.respond("create_ticket", |backend| {
            if !backend.matches.iter().any(|m| m.id == ticket.match_id) {
                return Err(not_found("Match"));
            }
            if backend
                .tickets
                .iter()
                .any(|t| t.match_id == ticket.match_id && t.seat_category == ticket.seat_category)
            {
                return Err(conflict(format!(
                    "A {} ticket for this match already exists",
                    ticket.seat_category
                )));
            }
            let record = TicketRecord {
                id: TicketId::new(),
                match_id: ticket.match_id,
                seat_category: ticket.seat_category,
                price: ticket.price,
                available_tickets: ticket.available_tickets,
            };
            backend.tickets.push(record.clone());
            Ok(record)
        })
    }

    fn update_ticket(
        &self,
        _token: AuthToken,
        id: TicketId,
        changes: TicketChanges,
    ) -> ApiFuture<'_, Ticket> {
        self.respond("update_ticket", |backend| {
            let record = backend
                .tickets
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| not_found("Ticket"))?;
            record.price = changes.price;
            record.available_tickets = changes.available_tickets;
            let record = record.clone();
            backend.populate(&record)
        })
    }

    fn delete_ticket(&self, _token: AuthToken, id: TicketId) -> ApiFuture<'_, ()> {
        self.respond("delete_ticket", |backend| {
            let before = backend.tickets.len();
            backend.tickets.retain(|t| t.id != id);
            if backend.tickets.len() == before {
                return Err(not_found("Ticket"));
            }
            Ok(())
        })
    }

    fn list_products(&self) -> ApiFuture<'_, Vec<Product>> {
        self.respond("list_products", |backend| Ok(backend.products.clone()))
    }

    fn create_product(&self, _token: AuthToken, draft: ProductDraft) -> ApiFuture<'_, Product> {
        self.respond("create_product", |backend| {
            let product = Product {
                id: ProductId::new(),
                name: draft.name,
                description: draft.description,
                category: draft.category,
                price: draft.price,
                stock: draft.stock,
                image: draft.image,
            };
            backend.products.push(product.clone());
            Ok(product)
        })
    }

    fn update_product(
        &self,
        _token: AuthToken,
        id: ProductId,
        draft: ProductDraft,
    ) -> ApiFuture<'_, Product> {
        self.respond("update_product", |backend| {
            let product = backend
                .products
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| not_found("Product"))?;
            product.name = draft.name;
            product.description = draft.description;
            product.category = draft.category;
            product.price = draft.price;
            product.stock = draft.stock;
            product.image = draft.image;
            Ok(product.clone())
        })
    }

    fn delete_product(&self, _token: AuthToken, id: ProductId) -> ApiFuture<'_, ()> {
        self.respond("delete_product", |backend| {
            backend.products.retain(|p| p.id != id);
            Ok(())
        })
    }

    fn list_orders(&self, token: AuthToken) -> ApiFuture<'_, Vec<Order>> {
        self.respond("list_orders", |backend| {
            let user = backend.session_user(&token)?;
            Ok(backend
                .orders
                .iter()
                .filter(|o| user.role == Role::Admin || o.user_id == user.id)
                .cloned()
                .collect())
        })
    }

    fn place_order(&self, token: AuthToken, request: CheckoutRequest) -> ApiFuture<'_, Order> {
        let now = self.now;
        self.respond("place_order", |backend| {
            let user = backend.session_user(&token)?;

            // Sum per listing first so split lines cannot oversell.
            let mut wanted_tickets: HashMap<(MatchId, SeatCategory), u32> = HashMap::new();
            let mut wanted_products: HashMap<ProductId, u32> = HashMap::new();
            for line in &request.lines {
                match &line.kind {
                    LineItemKind::Ticket { match_id, seat_category, .. } => {
                        *wanted_tickets.entry((*match_id, *seat_category)).or_default() += line.quantity;
                    },
                    LineItemKind::Merchandise { product_id } => {
                        *wanted_products.entry(*product_id).or_default() += line.quantity;
                    },
                }
            }
            for ((match_id, seat_category), wanted) in &wanted_tickets {
                let record = backend
                    .tickets
                    .iter()
                    .find(|t| t.match_id == *match_id && t.seat_category == *seat_category)
                    .ok_or_else(|| not_found("Ticket"))?;
                if *wanted > record.available_tickets {
                    return Err(conflict(format!(
                        "Only {} {seat_category} tickets left",
                        record.available_tickets
                    )));
                }
            }
            for (product_id, wanted) in &wanted_products {
                let product = backend
                    .products
                    .iter()
                    .find(|p| p.id == *product_id)
                    .ok_or_else(|| not_found("Product"))?;
                if *wanted > product.stock {
                    return Err(conflict(format!("Only {} left for {}", product.stock, product.name)));
                }
            }

            let mut lines = Vec::with_capacity(request.lines.len());
            let mut total = Money::ZERO;
            for line in request.lines {
                let (label, unit_price) = match &line.kind {
                    LineItemKind::Ticket { match_id, seat_category, .. } => {
                        let record = backend
                            .tickets
                            .iter_mut()
                            .find(|t| t.match_id == *match_id && t.seat_category == *seat_category)
                            .ok_or_else(|| not_found("Ticket"))?;
                        record.available_tickets -= line.quantity;
                        (format!("{seat_category} ticket"), record.price)
                    },
                    LineItemKind::Merchandise { product_id } => {
                        let product = backend
                            .products
                            .iter_mut()
                            .find(|p| p.id == *product_id)
                            .ok_or_else(|| not_found("Product"))?;
                        product.stock -= line.quantity;
                        (product.name.clone(), product.price)
                    },
                };
                total = unit_price
                    .checked_multiply(line.quantity)
                    .and_then(|line_total| total.checked_add(line_total))
                    .unwrap_or(total);
                lines.push(OrderLine {
                    kind: line.kind,
                    label,
                    quantity: line.quantity,
                    unit_price,
                });
            }

            let order = Order {
                id: OrderId::new(),
                user_id: user.id,
                lines,
                total,
                status: OrderStatus::Pending,
                created_at: now,
            };
            backend.orders.push(order.clone());
            Ok(order)
        })
    }

    fn update_order_status(
        &self,
        _token: AuthToken,
        id: OrderId,
        status: OrderStatus,
    ) -> ApiFuture<'_, Order> {
        self.respond("update_order_status", |backend| {
            let order = backend
                .orders
                .iter_mut()
                .find(|o| o.id == id)
                .ok_or_else(|| not_found("Order"))?;
            order.status = status;
            Ok(order.clone())
        })
    }
}
