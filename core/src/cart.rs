//! Cart store and reservation check.
//!
//! The reservation check runs synchronously against the current cart lines
//! before anything is appended:
//!
//! ```text
//! reserved  = Σ quantity of ticket lines with the same (match, seat category)
//! remaining = available_tickets - reserved   (saturating at 0)
//! requested > remaining  →  rejected, nothing added
//! ```
//!
//! The check is advisory. The server repeats it at checkout, under its own
//! lock, and is the authority.

use crate::api::{CheckoutLine, CheckoutRequest};
use crate::effect::Effect;
use crate::environment::PortalEnvironment;
use crate::error::{PortalError, ValidationError};
use crate::notifications::Toast;
use crate::reducer::Reducer;
use crate::types::{
    AuthToken, CartLineItem, LineId, LineItemKind, MatchId, Money, Order, Product, ProductId,
    SeatCategory, Ticket,
};
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;

// ============================================================================
// Reservation check
// ============================================================================

/// Units of (match, seat category) already held in the cart, across every line
#[must_use]
pub fn reserved_tickets(lines: &[CartLineItem], match_id: MatchId, seat_category: SeatCategory) -> u32 {
    lines
        .iter()
        .filter(|line| line.is_ticket_for(match_id, seat_category))
        .fold(0u32, |sum, line| sum.saturating_add(line.quantity))
}

/// Units of a product already held in the cart
#[must_use]
pub fn reserved_product(lines: &[CartLineItem], product_id: ProductId) -> u32 {
    lines
        .iter()
        .filter(|line| line.is_product(product_id))
        .fold(0u32, |sum, line| sum.saturating_add(line.quantity))
}

/// Tickets of this listing the user can still add
#[must_use]
pub fn remaining_tickets(lines: &[CartLineItem], ticket: &Ticket) -> u32 {
    let (match_id, seat_category) = ticket.key();
    ticket
        .available_tickets
        .saturating_sub(reserved_tickets(lines, match_id, seat_category))
}

/// Verify `quantity` more tickets of `ticket` fit in the cart.
///
/// # Errors
///
/// [`ValidationError::ZeroQuantity`] for a zero request and
/// [`ValidationError::ExceedsRemaining`] citing the remaining count otherwise.
pub fn check_ticket_reservation(
    lines: &[CartLineItem],
    ticket: &Ticket,
    quantity: u32,
) -> Result<(), ValidationError> {
    if quantity == 0 {
        return Err(ValidationError::ZeroQuantity);
    }
    let remaining = remaining_tickets(lines, ticket);
    if quantity > remaining {
        return Err(ValidationError::ExceedsRemaining {
            remaining,
            label: format!("{} tickets", ticket.seat_category),
        });
    }
    Ok(())
}

/// Verify `quantity` more units of `product` fit in the cart.
///
/// # Errors
///
/// Same as [`check_ticket_reservation`], against product stock.
pub fn check_product_reservation(
    lines: &[CartLineItem],
    product: &Product,
    quantity: u32,
) -> Result<(), ValidationError> {
    if quantity == 0 {
        return Err(ValidationError::ZeroQuantity);
    }
    let remaining = product
        .stock
        .saturating_sub(reserved_product(lines, product.id));
    if quantity > remaining {
        return Err(ValidationError::ExceedsRemaining {
            remaining,
            label: product.name.clone(),
        });
    }
    Ok(())
}

// ============================================================================
// State
// ============================================================================

/// Cart contents
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    /// Lines in insertion order
    pub lines: Vec<CartLineItem>,
    /// A checkout request is in flight
    pub checking_out: bool,
    /// Most recently placed order
    pub last_order: Option<Order>,
    /// Most recent rejection (reservation or checkout failure)
    #[serde(skip)]
    pub last_error: Option<PortalError>,
    /// Toast outbox, drained by the portal reducer
    #[serde(skip)]
    pub notices: Vec<Toast>,
}

impl CartState {
    /// Sum of line totals (saturating)
    #[must_use]
    pub fn total(&self) -> Money {
        self.lines.iter().fold(Money::ZERO, |sum, line| {
            line.line_total()
                .and_then(|total| sum.checked_add(total))
                .unwrap_or(Money::from_cents(u64::MAX))
        })
    }

    /// Sum of quantities
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |sum, line| sum.saturating_add(line.quantity))
    }

    /// Line by id
    #[must_use]
    pub fn line(&self, id: LineId) -> Option<&CartLineItem> {
        self.lines.iter().find(|line| line.id == id)
    }

    /// Checkout body for the current lines
    #[must_use]
    pub fn checkout_request(&self) -> CheckoutRequest {
        CheckoutRequest {
            lines: self
                .lines
                .iter()
                .map(|line| CheckoutLine {
                    kind: line.kind.clone(),
                    quantity: line.quantity,
                })
                .collect(),
        }
    }

    fn reject(&mut self, error: impl Into<PortalError>) {
        let error = error.into();
        self.notices.push(Toast::error(error.user_message()));
        self.last_error = Some(error);
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Cart commands and results
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartAction {
    /// Add tickets for a listing after the reservation check
    AddTicket {
        /// Listing, as currently loaded
        ticket: Ticket,
        /// Units requested
        quantity: u32,
    },
    /// Add a product after the stock check
    AddProduct {
        /// Product, as currently loaded
        product: Product,
        /// Units requested
        quantity: u32,
    },
    /// Change a line's quantity; `available` is the listing's current availability
    ChangeQuantity {
        /// Line to change
        line_id: LineId,
        /// New quantity
        quantity: u32,
        /// Availability/stock of the listing the line refers to
        available: u32,
    },
    /// Drop a line
    RemoveLine {
        /// Line to drop
        line_id: LineId,
    },
    /// Empty the cart
    Clear,
    /// Submit the cart as an order
    Checkout {
        /// Buyer's token
        token: AuthToken,
    },
    /// The server accepted the order
    CheckoutSucceeded {
        /// Placed order
        order: Order,
    },
    /// The server rejected the order or the call failed
    CheckoutFailed {
        /// Why
        error: PortalError,
    },
}

impl CartAction {
    /// The API failure this action reports, if any
    #[must_use]
    pub const fn failure(&self) -> Option<&PortalError> {
        match self {
            Self::CheckoutFailed { error } => Some(error),
            _ => None,
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the cart
#[derive(Clone, Debug, Default)]
pub struct CartReducer;

impl CartReducer {
    /// Creates a new `CartReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn change_quantity(state: &mut CartState, line_id: LineId, quantity: u32, available: u32) {
        let Some(line) = state.line(line_id) else {
            return;
        };
        if quantity == 0 {
            state.lines.retain(|l| l.id != line_id);
            return;
        }
        if quantity <= line.quantity {
            if let Some(line) = state.lines.iter_mut().find(|l| l.id == line_id) {
                line.quantity = quantity;
            }
            return;
        }
        // Everything else in the cart for the same listing still counts.
        let others = match &line.kind {
            LineItemKind::Ticket { match_id, seat_category, .. } => {
                reserved_tickets(&state.lines, *match_id, *seat_category)
            },
            LineItemKind::Merchandise { product_id } => reserved_product(&state.lines, *product_id),
        }
        .saturating_sub(line.quantity);
        let remaining = available.saturating_sub(others);
        if quantity > remaining {
            let label = line.label.clone();
            state.reject(ValidationError::ExceedsRemaining { remaining, label });
            return;
        }
        if let Some(line) = state.lines.iter_mut().find(|l| l.id == line_id) {
            line.quantity = quantity;
        }
    }
}

impl Reducer for CartReducer {
    type State = CartState;
    type Action = CartAction;
    type Environment = PortalEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CartAction::AddTicket { ticket, quantity } => {
                if let Err(error) = check_ticket_reservation(&state.lines, &ticket, quantity) {
                    tracing::debug!(ticket_id = %ticket.id, quantity, %error, "Ticket add rejected");
                    state.reject(error);
                    return SmallVec::new();
                }
                let (match_id, seat_category) = ticket.key();
                state.lines.push(CartLineItem {
                    id: LineId::new(),
                    kind: LineItemKind::Ticket {
                        ticket_id: ticket.id,
                        match_id,
                        seat_category,
                    },
                    label: format!("{} ({seat_category})", ticket.fixture.title()),
                    quantity,
                    unit_price: ticket.price,
                });
                state.last_error = None;
                state
                    .notices
                    .push(Toast::success(format!("{quantity} ticket(s) added to cart")));
                SmallVec::new()
            },

            CartAction::AddProduct { product, quantity } => {
                if let Err(error) = check_product_reservation(&state.lines, &product, quantity) {
                    state.reject(error);
                    return SmallVec::new();
                }
                state.lines.push(CartLineItem {
                    id: LineId::new(),
                    kind: LineItemKind::Merchandise { product_id: product.id },
                    label: product.name.clone(),
                    quantity,
                    unit_price: product.price,
                });
                state.last_error = None;
                state
                    .notices
                    .push(Toast::success(format!("{} added to cart", product.name)));
                SmallVec::new()
            },

            CartAction::ChangeQuantity { line_id, quantity, available } => {
                Self::change_quantity(state, line_id, quantity, available);
                SmallVec::new()
            },

            CartAction::RemoveLine { line_id } => {
                state.lines.retain(|line| line.id != line_id);
                SmallVec::new()
            },

            CartAction::Clear => {
                state.lines.clear();
                state.last_error = None;
                SmallVec::new()
            },

            CartAction::Checkout { token } => {
                if state.lines.is_empty() {
                    state.notices.push(Toast::error("Your cart is empty"));
                    return SmallVec::new();
                }
                if state.checking_out {
                    return SmallVec::new();
                }
                state.checking_out = true;
                let request = state.checkout_request();
                let api = Arc::clone(&env.api);
                smallvec![Effect::future(async move {
                    Some(match api.place_order(token, request).await {
                        Ok(order) => CartAction::CheckoutSucceeded { order },
                        Err(error) => CartAction::CheckoutFailed { error },
                    })
                })]
            },

            CartAction::CheckoutSucceeded { order } => {
                tracing::info!(order_id = %order.id, total = %order.total, "Order placed");
                state.checking_out = false;
                state.lines.clear();
                state.last_error = None;
                state
                    .notices
                    .push(Toast::success(format!("Order placed. Total: {}", order.total)));
                state.last_order = Some(order);
                SmallVec::new()
            },

            CartAction::CheckoutFailed { error } => {
                tracing::warn!(%error, "Checkout failed");
                state.checking_out = false;
                state.reject(error);
                SmallVec::new()
            },
        }
    }
}
