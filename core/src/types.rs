//! Domain types for the club portal.
//!
//! Identifiers, money, the match/ticket/product catalog, users, cart line
//! items, orders, and the `{ success, data, message }` response envelope
//! shared by the server and the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from a `Uuid`
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a match (fixture)
    MatchId
);
define_id!(
    /// Unique identifier for a ticket listing
    TicketId
);
define_id!(
    /// Unique identifier for a shop product
    ProductId
);
define_id!(
    /// Unique identifier for a user account
    UserId
);
define_id!(
    /// Unique identifier for an order
    OrderId
);
define_id!(
    /// Unique identifier for a cart line item
    LineId
);

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents.
///
/// On the wire a price is a plain decimal number (`49.99`). Negative and
/// non-finite numbers are rejected during deserialization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Money(u64);

impl Money {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole currency units
    #[must_use]
    pub const fn checked_from_units(units: u64) -> Option<Self> {
        match units.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount as a decimal number of currency units
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // prices are far below 2^52 cents
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Multiplies money by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

/// Reasons a decimal amount cannot become [`Money`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// Amount below zero
    #[error("amount cannot be negative")]
    Negative,
    /// NaN or infinite
    #[error("amount must be a finite number")]
    NotFinite,
    /// Too large to represent in cents
    #[error("amount is too large")]
    Overflow,
}

impl TryFrom<f64> for Money {
    type Error = MoneyError;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // range checked above the cast
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(MoneyError::NotFinite);
        }
        if value < 0.0 {
            return Err(MoneyError::Negative);
        }
        let cents = (value * 100.0).round();
        if cents > 9.0e15 {
            return Err(MoneyError::Overflow);
        }
        Ok(Self(cents as u64))
    }
}

impl From<Money> for f64 {
    fn from(money: Money) -> Self {
        money.as_f64()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Matches
// ============================================================================

/// A fixture that tickets are sold for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Match identifier
    pub id: MatchId,
    /// Team names, home side first
    pub teams: Vec<String>,
    /// Kick-off time
    pub event_date: DateTime<Utc>,
    /// Venue
    pub location: String,
    /// Competition name (league, cup, friendly)
    pub competition: String,
    /// Image reference (URL or asset path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Match {
    /// Team names joined by a single space, the form used by catalog search
    #[must_use]
    pub fn teams_label(&self) -> String {
        self.teams.join(" ")
    }

    /// Human readable fixture title (`"Home vs Away"`)
    #[must_use]
    pub fn title(&self) -> String {
        self.teams.join(" vs ")
    }
}

// ============================================================================
// Tickets
// ============================================================================

/// Enumerated ticket tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeatCategory {
    /// Hospitality seating
    #[serde(rename = "VIP")]
    Vip,
    /// Reserved seating
    Standard,
    /// General admission
    General,
}

impl SeatCategory {
    /// All categories, in display order
    pub const ALL: [Self; 3] = [Self::Vip, Self::Standard, Self::General];

    /// Wire/display name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vip => "VIP",
            Self::Standard => "Standard",
            Self::General => "General",
        }
    }
}

impl fmt::Display for SeatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a seat category name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown seat category: {0}")]
pub struct UnknownSeatCategory(pub String);

impl FromStr for SeatCategory {
    type Err = UnknownSeatCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VIP" | "vip" | "Vip" => Ok(Self::Vip),
            "Standard" | "standard" => Ok(Self::Standard),
            "General" | "general" => Ok(Self::General),
            other => Err(UnknownSeatCategory(other.to_string())),
        }
    }
}

/// A ticket listing as returned by the catalog endpoints, with its match populated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Ticket identifier
    pub id: TicketId,
    /// The match this ticket admits to
    #[serde(rename = "match")]
    pub fixture: Match,
    /// Seat tier
    pub seat_category: SeatCategory,
    /// Unit price
    pub price: Money,
    /// Tickets still on sale
    pub available_tickets: u32,
}

impl Ticket {
    /// True when no tickets remain
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        self.available_tickets == 0
    }

    /// The (match, seat category) pair this listing is unique on
    #[must_use]
    pub const fn key(&self) -> (MatchId, SeatCategory) {
        (self.fixture.id, self.seat_category)
    }
}

/// A ticket row as stored server-side: the match is referenced by id only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRecord {
    /// Ticket identifier
    pub id: TicketId,
    /// Referenced match
    pub match_id: MatchId,
    /// Seat tier
    pub seat_category: SeatCategory,
    /// Unit price
    pub price: Money,
    /// Tickets still on sale
    pub available_tickets: u32,
}

impl TicketRecord {
    /// Join with the referenced match
    #[must_use]
    pub fn populate(&self, fixture: Match) -> Ticket {
        Ticket {
            id: self.id,
            fixture,
            seat_category: self.seat_category,
            price: self.price,
            available_tickets: self.available_tickets,
        }
    }
}

// ============================================================================
// Shop
// ============================================================================

/// A merchandise item sold in the club shop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product identifier
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Long description
    #[serde(default)]
    pub description: String,
    /// Shop category (kits, scarves, ...)
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

// ============================================================================
// Users
// ============================================================================

/// Portal role, used for route gating and API authorization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Supporter account
    Fan,
    /// Squad member
    Player,
    /// Coaching staff
    Manager,
    /// Portal administrator
    Admin,
}

impl Role {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fan => "fan",
            Self::Player => "player",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public view of a user account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User identifier
    pub id: UserId,
    /// Login name
    pub username: String,
    /// Contact email
    pub email: String,
    /// Portal role
    pub role: Role,
}

/// Bearer token issued by `POST /api/login`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a raw token string
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens are credentials; keep them out of logs.
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

// ============================================================================
// Cart
// ============================================================================

/// What a cart line refers to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "productType", rename_all = "camelCase")]
pub enum LineItemKind {
    /// Match ticket for a seat category
    #[serde(rename_all = "camelCase")]
    Ticket {
        /// Listing the line was added from
        ticket_id: TicketId,
        /// Match the ticket admits to
        match_id: MatchId,
        /// Seat tier
        seat_category: SeatCategory,
    },
    /// Shop product
    #[serde(rename_all = "camelCase")]
    Merchandise {
        /// Product the line was added from
        product_id: ProductId,
    },
}

/// A single cart line.
///
/// Lines are not merged: two lines for the same (match, seat category) may
/// coexist, and every consumer sums them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// Line identifier
    pub id: LineId,
    /// What is being bought
    #[serde(flatten)]
    pub kind: LineItemKind,
    /// Display label (fixture title or product name)
    pub label: String,
    /// Units requested
    pub quantity: u32,
    /// Price per unit at the time it was added
    pub unit_price: Money,
}

impl CartLineItem {
    /// `unit_price * quantity`, `None` on overflow
    #[must_use]
    pub const fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }

    /// True if this line holds tickets for the given (match, seat category)
    #[must_use]
    pub fn is_ticket_for(&self, match_id: MatchId, seat_category: SeatCategory) -> bool {
        matches!(
            self.kind,
            LineItemKind::Ticket { match_id: m, seat_category: c, .. }
                if m == match_id && c == seat_category
        )
    }

    /// True if this line holds the given product
    #[must_use]
    pub fn is_product(&self, product_id: ProductId) -> bool {
        matches!(self.kind, LineItemKind::Merchandise { product_id: p } if p == product_id)
    }
}

// ============================================================================
// Orders
// ============================================================================

/// Fulfilment state of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, awaiting payment confirmation
    Pending,
    /// Paid
    Paid,
    /// Dispatched (merchandise) or issued (tickets)
    Shipped,
    /// Cancelled by an admin
    Cancelled,
}

/// A line of a placed order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// What was bought
    #[serde(flatten)]
    pub kind: LineItemKind,
    /// Display label
    pub label: String,
    /// Units bought
    pub quantity: u32,
    /// Price charged per unit
    pub unit_price: Money,
}

/// A placed order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order identifier
    pub id: OrderId,
    /// Buyer
    pub user_id: UserId,
    /// Purchased lines
    pub lines: Vec<OrderLine>,
    /// Sum of line totals
    pub total: Money,
    /// Fulfilment state
    pub status: OrderStatus,
    /// When the order was placed
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Response envelope
// ============================================================================

/// The `{ success, data, message }` envelope every API response uses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Whether the request succeeded
    pub success: bool,
    /// Payload (absent on failure and on bodiless successes)
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    /// Human readable status message
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Successful envelope with a payload
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }

    /// Failed envelope carrying only a message
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}
