//! In-memory storage for the portal backend.
//!
//! All tables sit behind one `tokio::sync::RwLock`, so uniqueness checks and
//! the checkout stock check-and-decrement are atomic with respect to every
//! other write.

use crate::auth::PasswordHash;
use chrono::{DateTime, Utc};
use club_portal_core::api::{CheckoutRequest, MatchDraft, NewTicket, ProductDraft, ProfileUpdate, TicketChanges};
use club_portal_core::types::{
    LineItemKind, Match, MatchId, Money, Order, OrderId, OrderLine, OrderStatus, Product,
    ProductId, Role, SeatCategory, Ticket, TicketId, TicketRecord, UserId, UserProfile,
};
use thiserror::Error;
use tokio::sync::RwLock;

/// Storage failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// No row with that id
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Table name
        entity: &'static str,
        /// Requested id
        id: String,
    },

    /// Uniqueness or stock rule violated
    #[error("{0}")]
    Conflict(String),

    /// Well-formed but unacceptable input
    #[error("{0}")]
    Invalid(String),
}

impl RepositoryError {
    fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// A stored account
#[derive(Clone, Debug)]
pub struct Account {
    /// Public profile
    pub profile: UserProfile,
    /// Salted password digest
    pub password: PasswordHash,
}

#[derive(Default)]
struct Tables {
    accounts: Vec<Account>,
    matches: Vec<Match>,
    tickets: Vec<TicketRecord>,
    products: Vec<Product>,
    orders: Vec<Order>,
}

impl Tables {
    fn populate(&self, record: &TicketRecord) -> RepositoryResult<Ticket> {
        self.matches
            .iter()
            .find(|m| m.id == record.match_id)
            .map(|fixture| record.populate(fixture.clone()))
            .ok_or_else(|| RepositoryError::not_found("Match", record.match_id))
    }

    fn account_mut(&mut self, id: UserId) -> RepositoryResult<&mut Account> {
        self.accounts
            .iter_mut()
            .find(|a| a.profile.id == id)
            .ok_or_else(|| RepositoryError::not_found("User", id))
    }

    fn ensure_unique_user(&self, id: Option<UserId>, username: Option<&str>, email: Option<&str>) -> RepositoryResult<()> {
        for account in self.accounts.iter().filter(|a| Some(a.profile.id) != id) {
            if username.is_some_and(|u| account.profile.username.eq_ignore_ascii_case(u)) {
                return Err(RepositoryError::Conflict("Username already taken".to_string()));
            }
            if email.is_some_and(|e| account.profile.email.eq_ignore_ascii_case(e)) {
                return Err(RepositoryError::Conflict("Email already registered".to_string()));
            }
        }
        Ok(())
    }

    fn ticket_index(&self, match_id: MatchId, seat_category: SeatCategory) -> RepositoryResult<usize> {
        self.tickets
            .iter()
            .position(|t| t.match_id == match_id && t.seat_category == seat_category)
            .ok_or_else(|| {
                RepositoryError::not_found("Ticket", format!("{match_id}/{seat_category}"))
            })
    }

    fn product_index(&self, id: ProductId) -> RepositoryResult<usize> {
        self.products
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| RepositoryError::not_found("Product", id))
    }
}

/// Portal storage
#[derive(Default)]
pub struct Repository {
    tables: RwLock<Tables>,
}

impl Repository {
    /// Empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Store a new account; username and email are unique (case-insensitive)
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Conflict`] on a duplicate username or email.
    pub async fn create_user(
        &self,
        username: String,
        email: String,
        password: PasswordHash,
        role: Role,
    ) -> RepositoryResult<UserProfile> {
        let mut tables = self.tables.write().await;
        tables.ensure_unique_user(None, Some(&username), Some(&email))?;
        let profile = UserProfile {
            id: UserId::new(),
            username,
            email,
            role,
        };
        tables.accounts.push(Account {
            profile: profile.clone(),
            password,
        });
        Ok(profile)
    }

    /// Account by username or email
    pub async fn find_by_login(&self, login: &str) -> Option<Account> {
        self.tables
            .read()
            .await
            .accounts
            .iter()
            .find(|a| {
                a.profile.username.eq_ignore_ascii_case(login)
                    || a.profile.email.eq_ignore_ascii_case(login)
            })
            .cloned()
    }

    /// Account by id
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] for an unknown id.
    pub async fn account(&self, id: UserId) -> RepositoryResult<Account> {
        self.tables
            .read()
            .await
            .accounts
            .iter()
            .find(|a| a.profile.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("User", id))
    }

    /// Every account's profile
    pub async fn users(&self) -> Vec<UserProfile> {
        self.tables
            .read()
            .await
            .accounts
            .iter()
            .map(|a| a.profile.clone())
            .collect()
    }

    /// Apply the present fields of `update`
    ///
    /// # Errors
    ///
    /// Not found, or a conflict with another account's username/email.
    pub async fn update_user(&self, id: UserId, update: ProfileUpdate) -> RepositoryResult<UserProfile> {
        let mut tables = self.tables.write().await;
        tables.ensure_unique_user(Some(id), update.username.as_deref(), update.email.as_deref())?;
        let account = tables.account_mut(id)?;
        if let Some(username) = update.username {
            account.profile.username = username;
        }
        if let Some(email) = update.email {
            account.profile.email = email;
        }
        if let Some(role) = update.role {
            account.profile.role = role;
        }
        Ok(account.profile.clone())
    }

    /// Replace an account's password digest
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] for an unknown id.
    pub async fn set_password(&self, id: UserId, password: PasswordHash) -> RepositoryResult<()> {
        self.tables.write().await.account_mut(id)?.password = password;
        Ok(())
    }

    /// Remove an account
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] for an unknown id.
    pub async fn delete_user(&self, id: UserId) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.accounts.len();
        tables.accounts.retain(|a| a.profile.id != id);
        if tables.accounts.len() == before {
            return Err(RepositoryError::not_found("User", id));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Matches
    // ------------------------------------------------------------------

    /// Every fixture, earliest first
    pub async fn matches(&self) -> Vec<Match> {
        let mut matches = self.tables.read().await.matches.clone();
        matches.sort_by_key(|m| m.event_date);
        matches
    }

    /// Fixture by id
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] for an unknown id.
    pub async fn fixture(&self, id: MatchId) -> RepositoryResult<Match> {
        self.tables
            .read()
            .await
            .matches
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("Match", id))
    }

    /// Store a new fixture
    pub async fn create_match(&self, draft: MatchDraft) -> Match {
        let fixture = Match {
            id: MatchId::new(),
            teams: draft.teams,
            event_date: draft.event_date,
            location: draft.location,
            competition: draft.competition,
            image: draft.image,
        };
        self.tables.write().await.matches.push(fixture.clone());
        fixture
    }

    /// Replace a fixture's fields
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] for an unknown id.
    pub async fn update_match(&self, id: MatchId, draft: MatchDraft) -> RepositoryResult<Match> {
        let mut tables = self.tables.write().await;
        let fixture = tables
            .matches
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| RepositoryError::not_found("Match", id))?;
        fixture.teams = draft.teams;
        fixture.event_date = draft.event_date;
        fixture.location = draft.location;
        fixture.competition = draft.competition;
        fixture.image = draft.image;
        Ok(fixture.clone())
    }

    /// Remove a fixture that has no tickets on sale
    ///
    /// # Errors
    ///
    /// Not found, or [`RepositoryError::Conflict`] while tickets reference it.
    pub async fn delete_match(&self, id: MatchId) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.matches.iter().any(|m| m.id == id) {
            return Err(RepositoryError::not_found("Match", id));
        }
        if tables.tickets.iter().any(|t| t.match_id == id) {
            return Err(RepositoryError::Conflict(
                "Delete this match's tickets first".to_string(),
            ));
        }
        tables.matches.retain(|m| m.id != id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tickets
    // ------------------------------------------------------------------

    /// Every listing with its match populated
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] if a listing references a missing match.
    pub async fn tickets(&self) -> RepositoryResult<Vec<Ticket>> {
        let tables = self.tables.read().await;
        tables.tickets.iter().map(|t| tables.populate(t)).collect()
    }

    /// Listing by id
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] for an unknown id.
    pub async fn ticket(&self, id: TicketId) -> RepositoryResult<Ticket> {
        let tables = self.tables.read().await;
        let record = tables
            .tickets
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| RepositoryError::not_found("Ticket", id))?;
        tables.populate(record)
    }

    /// Listing by its natural key
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] if there is no such listing.
    pub async fn ticket_for(&self, match_id: MatchId, seat_category: SeatCategory) -> RepositoryResult<Ticket> {
        let tables = self.tables.read().await;
        let index = tables.ticket_index(match_id, seat_category)?;
        tables.populate(&tables.tickets[index])
    }

    /// Store a new listing; one per (match, seat category)
    ///
    /// # Errors
    ///
    /// Not found for an unknown match, [`RepositoryError::Conflict`] for a
    /// duplicate category.
    pub async fn create_ticket(&self, ticket: NewTicket) -> RepositoryResult<TicketRecord> {
        let mut tables = self.tables.write().await;
        let fixture = tables
            .matches
            .iter()
            .find(|m| m.id == ticket.match_id)
            .ok_or_else(|| RepositoryError::not_found("Match", ticket.match_id))?;
        if tables.ticket_index(ticket.match_id, ticket.seat_category).is_ok() {
            return Err(RepositoryError::Conflict(format!(
                "A {} ticket for {} already exists",
                ticket.seat_category,
                fixture.title()
            )));
        }
        let record = TicketRecord {
            id: TicketId::new(),
            match_id: ticket.match_id,
            seat_category: ticket.seat_category,
            price: ticket.price,
            available_tickets: ticket.available_tickets,
        };
        tables.tickets.push(record.clone());
        Ok(record)
    }

    /// Change a listing's price and availability
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] for an unknown id.
    pub async fn update_ticket(&self, id: TicketId, changes: TicketChanges) -> RepositoryResult<Ticket> {
        let mut tables = self.tables.write().await;
        let record = tables
            .tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| RepositoryError::not_found("Ticket", id))?;
        record.price = changes.price;
        record.available_tickets = changes.available_tickets;
        let record = record.clone();
        tables.populate(&record)
    }

    /// Remove a listing
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] for an unknown id.
    pub async fn delete_ticket(&self, id: TicketId) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.tickets.len();
        tables.tickets.retain(|t| t.id != id);
        if tables.tickets.len() == before {
            return Err(RepositoryError::not_found("Ticket", id));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    /// Every product
    pub async fn products(&self) -> Vec<Product> {
        self.tables.read().await.products.clone()
    }

    /// Product by id
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] for an unknown id.
    pub async fn product(&self, id: ProductId) -> RepositoryResult<Product> {
        let tables = self.tables.read().await;
        let index = tables.product_index(id)?;
        Ok(tables.products[index].clone())
    }

    /// Store a new product
    pub async fn create_product(&self, draft: ProductDraft) -> Product {
        let product = Product {
            id: ProductId::new(),
            name: draft.name,
            description: draft.description,
            category: draft.category,
            price: draft.price,
            stock: draft.stock,
            image: draft.image,
        };
        self.tables.write().await.products.push(product.clone());
        product
    }

    /// Replace a product's fields
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] for an unknown id.
    pub async fn update_product(&self, id: ProductId, draft: ProductDraft) -> RepositoryResult<Product> {
        let mut tables = self.tables.write().await;
        let index = tables.product_index(id)?;
        let product = &mut tables.products[index];
        product.name = draft.name;
        product.description = draft.description;
        product.category = draft.category;
        product.price = draft.price;
        product.stock = draft.stock;
        product.image = draft.image;
        Ok(product.clone())
    }

    /// Remove a product
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] for an unknown id.
    pub async fn delete_product(&self, id: ProductId) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        let index = tables.product_index(id)?;
        tables.products.remove(index);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Orders, newest first; only `owner`'s when given
    pub async fn orders(&self, owner: Option<UserId>) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .tables
            .read()
            .await
            .orders
            .iter()
            .filter(|o| owner.is_none_or(|owner| o.user_id == owner))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Check stock for every line, decrement, and record the order.
    ///
    /// Quantities for the same listing are summed before the check. Any
    /// shortage or an unrepresentable total rejects the whole order and
    /// nothing is decremented. With several shortages the first listing in
    /// request order is reported.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::Invalid`]: no lines, a zero quantity, or a total too large
    /// - [`RepositoryError::NotFound`]: unknown ticket listing or product
    /// - [`RepositoryError::Conflict`]: not enough left
    pub async fn place_order(
        &self,
        user_id: UserId,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Order> {
        if request.lines.is_empty() {
            return Err(RepositoryError::Invalid("Order has no items".to_string()));
        }
        if request.lines.iter().any(|line| line.quantity == 0) {
            return Err(RepositoryError::Invalid("Quantity must be at least 1".to_string()));
        }

        let mut tables = self.tables.write().await;

        // Quantities per listing, in the order the listings first appear
        let mut resolved = Vec::with_capacity(request.lines.len());
        let mut wanted: Vec<(Slot, u32)> = Vec::new();
        for line in &request.lines {
            let slot = match &line.kind {
                LineItemKind::Ticket { match_id, seat_category, .. } => {
                    Slot::Ticket(tables.ticket_index(*match_id, *seat_category)?)
                },
                LineItemKind::Merchandise { product_id } => Slot::Product(tables.product_index(*product_id)?),
            };
            match wanted.iter_mut().find(|(seen, _)| *seen == slot) {
                Some((_, total)) => *total = total.saturating_add(line.quantity),
                None => wanted.push((slot, line.quantity)),
            }
            resolved.push(slot);
        }

        for &(slot, quantity) in &wanted {
            match slot {
                Slot::Ticket(index) => {
                    let record = &tables.tickets[index];
                    if quantity > record.available_tickets {
                        return Err(RepositoryError::Conflict(format!(
                            "Only {} {} tickets left",
                            record.available_tickets, record.seat_category
                        )));
                    }
                },
                Slot::Product(index) => {
                    let product = &tables.products[index];
                    if quantity > product.stock {
                        return Err(RepositoryError::Conflict(format!(
                            "Only {} left for {}",
                            product.stock, product.name
                        )));
                    }
                },
            }
        }

        // Price every line before anything is taken
        let mut lines = Vec::with_capacity(request.lines.len());
        let mut total = Money::ZERO;
        for (line, &slot) in request.lines.into_iter().zip(&resolved) {
            let (label, unit_price) = match slot {
                Slot::Ticket(index) => {
                    let record = &tables.tickets[index];
                    let label = tables
                        .populate(record)
                        .map(|t| format!("{} ticket, {}", record.seat_category, t.fixture.title()))
                        .unwrap_or_else(|_| format!("{} ticket", record.seat_category));
                    (label, record.price)
                },
                Slot::Product(index) => {
                    let product = &tables.products[index];
                    (product.name.clone(), product.price)
                },
            };
            total = unit_price
                .checked_multiply(line.quantity)
                .and_then(|line_total| total.checked_add(line_total))
                .ok_or_else(|| RepositoryError::Invalid("Order total is too large".to_string()))?;
            lines.push(OrderLine {
                kind: line.kind,
                label,
                quantity: line.quantity,
                unit_price,
            });
        }

        for (slot, quantity) in wanted {
            match slot {
                Slot::Ticket(index) => tables.tickets[index].available_tickets -= quantity,
                Slot::Product(index) => tables.products[index].stock -= quantity,
            }
        }

        let order = Order {
            id: OrderId::new(),
            user_id,
            lines,
            total,
            status: OrderStatus::Pending,
            created_at: now,
        };
        tables.orders.push(order.clone());
        metrics::counter!("orders.placed").increment(1);
        Ok(order)
    }

    /// Change an order's status
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] for an unknown id.
    pub async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> RepositoryResult<Order> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| RepositoryError::not_found("Order", id))?;
        order.status = status;
        Ok(order.clone())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Slot {
    Ticket(usize),
    Product(usize),
}
