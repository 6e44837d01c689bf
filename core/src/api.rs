//! The remote API the portal stores depend on.
//!
//! Reducers never call HTTP directly; they capture an `Arc<dyn PortalApi>`
//! from the environment inside an [`Effect::Future`](crate::effect::Effect).
//! The production implementation lives in the `club-portal-client` crate;
//! tests inject an in-memory double.
//!
//! Methods return boxed futures instead of `async fn` so the trait stays
//! object-safe.

use crate::error::PortalError;
use crate::types::{
    AuthToken, LineItemKind, Match, MatchId, Money, Order, OrderId, OrderStatus, Product,
    ProductId, Role, SeatCategory, Ticket, TicketId, TicketRecord, UserId, UserProfile,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by every [`PortalApi`] method
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PortalError>> + Send + 'a>>;

// ============================================================================
// Request bodies
// ============================================================================

/// `POST /api/register`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Login name
    pub username: String,
    /// Contact email
    pub email: String,
    /// Plain-text password (sent over TLS, hashed server-side)
    pub password: String,
}

/// `POST /api/login`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Username or email
    pub login: String,
    /// Plain-text password
    pub password: String,
}

/// Successful login response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSession {
    /// Bearer token for subsequent calls
    pub token: AuthToken,
    /// The signed-in account
    pub user: UserProfile,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// `PUT /api/users/:id`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// New login name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// New email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New role (admin only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// `PUT /api/users/:id/update-password`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    /// Password currently on the account
    pub current_password: String,
    /// Replacement password
    pub new_password: String,
}

/// `POST /api/matches` and `PUT /api/matches/:id`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDraft {
    /// Team names, home side first
    pub teams: Vec<String>,
    /// Kick-off time
    pub event_date: DateTime<Utc>,
    /// Venue
    pub location: String,
    /// Competition name
    pub competition: String,
    /// Image reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// `POST /api/tickets`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    /// Match the tickets are for
    pub match_id: MatchId,
    /// Seat tier
    pub seat_category: SeatCategory,
    /// Unit price
    pub price: Money,
    /// Tickets on sale
    pub available_tickets: u32,
}

/// `PUT /api/tickets/:id`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketChanges {
    /// New unit price
    pub price: Money,
    /// New number of tickets on sale
    pub available_tickets: u32,
}

/// `POST /api/products` and `PUT /api/products/:id`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    /// Display name
    pub name: String,
    /// Long description
    #[serde(default)]
    pub description: String,
    /// Shop category
    #[serde(default)]
    pub category: String,
    /// Unit price
    pub price: Money,
    /// Units in stock
    pub stock: u32,
    /// Image reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// One line of a checkout request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    /// What is being bought
    #[serde(flatten)]
    pub kind: LineItemKind,
    /// Units requested
    pub quantity: u32,
}

/// `POST /api/orders`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Lines to buy; the server prices them
    pub lines: Vec<CheckoutLine>,
}

/// `PUT /api/orders/:id/status`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    /// New status
    pub status: OrderStatus,
}

// ============================================================================
// API trait
// ============================================================================

/// Remote operations available to the portal.
///
/// Every mutating call except `register` and `login` takes the caller's
/// [`AuthToken`], which implementations send as a bearer header.
pub trait PortalApi: Send + Sync {
    // Accounts

    /// `POST /api/register`
    fn register(&self, registration: Registration) -> ApiFuture<'_, UserProfile>;

    /// `POST /api/login`
    fn login(&self, credentials: Credentials) -> ApiFuture<'_, LoginSession>;

    /// `GET /api/users`
    fn list_users(&self, token: AuthToken) -> ApiFuture<'_, Vec<UserProfile>>;

    /// `PUT /api/users/:id`
    fn update_user(
        &self,
        token: AuthToken,
        id: UserId,
        update: ProfileUpdate,
    ) -> ApiFuture<'_, UserProfile>;

    /// `PUT /api/users/:id/update-password`
    fn update_password(
        &self,
        token: AuthToken,
        id: UserId,
        change: PasswordChange,
    ) -> ApiFuture<'_, ()>;

    /// `DELETE /api/users/:id`
    fn delete_user(&self, token: AuthToken, id: UserId) -> ApiFuture<'_, ()>;

    // Matches

    /// `GET /api/matches`
    fn list_matches(&self) -> ApiFuture<'_, Vec<Match>>;

    /// `POST /api/matches`
    fn create_match(&self, token: AuthToken, draft: MatchDraft) -> ApiFuture<'_, Match>;

    /// `PUT /api/matches/:id`
    fn update_match(&self, token: AuthToken, id: MatchId, draft: MatchDraft)
        -> ApiFuture<'_, Match>;

    /// `DELETE /api/matches/:id`
    fn delete_match(&self, token: AuthToken, id: MatchId) -> ApiFuture<'_, ()>;

    // Tickets

    /// `GET /api/tickets`
    fn list_tickets(&self) -> ApiFuture<'_, Vec<Ticket>>;

    /// `GET /api/tickets/:id`
    fn get_ticket(&self, id: TicketId) -> ApiFuture<'_, Ticket>;

    /// `GET /api/tickets/:matchId/:seatCategory`
    fn get_ticket_for(&self, match_id: MatchId, seat_category: SeatCategory)
        -> ApiFuture<'_, Ticket>;

    /// `POST /api/tickets`; returns the stored record (match not populated)
    fn create_ticket(&self, token: AuthToken, ticket: NewTicket) -> ApiFuture<'_, TicketRecord>;

    /// `PUT /api/tickets/:id`; returns the updated, populated ticket
    fn update_ticket(
        &self,
        token: AuthToken,
        id: TicketId,
        changes: TicketChanges,
    ) -> ApiFuture<'_, Ticket>;

    /// `DELETE /api/tickets/:id`
    fn delete_ticket(&self, token: AuthToken, id: TicketId) -> ApiFuture<'_, ()>;

    // Shop

    /// `GET /api/products`
    fn list_products(&self) -> ApiFuture<'_, Vec<Product>>;

    /// `POST /api/products`
    fn create_product(&self, token: AuthToken, draft: ProductDraft) -> ApiFuture<'_, Product>;

    /// `PUT /api/products/:id`
    fn update_product(
        &self,
        token: AuthToken,
        id: ProductId,
        draft: ProductDraft,
    ) -> ApiFuture<'_, Product>;

    /// `DELETE /api/products/:id`
    fn delete_product(&self, token: AuthToken, id: ProductId) -> ApiFuture<'_, ()>;

    // Orders

    /// `GET /api/orders`
    fn list_orders(&self, token: AuthToken) -> ApiFuture<'_, Vec<Order>>;

    /// `POST /api/orders`
    fn place_order(&self, token: AuthToken, request: CheckoutRequest) -> ApiFuture<'_, Order>;

    /// `PUT /api/orders/:id/status`
    fn update_order_status(
        &self,
        token: AuthToken,
        id: OrderId,
        status: OrderStatus,
    ) -> ApiFuture<'_, Order>;
}
