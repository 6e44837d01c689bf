//! Order history and admin status changes.

use crate::effect::Effect;
use crate::environment::PortalEnvironment;
use crate::error::PortalError;
use crate::notifications::Toast;
use crate::reducer::Reducer;
use crate::types::{AuthToken, Order, OrderId, OrderStatus};
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;

/// Orders visible to the signed-in user (all orders for admins)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderState {
    /// Orders as last confirmed by the server, newest first
    pub orders: Vec<Order>,
    /// A list fetch is in flight
    pub loading: bool,
    /// Last API failure
    #[serde(skip)]
    pub last_error: Option<PortalError>,
    /// Toast outbox
    #[serde(skip)]
    pub notices: Vec<Toast>,
}

impl OrderState {
    fn upsert(&mut self, order: Order) {
        match self.orders.iter_mut().find(|o| o.id == order.id) {
            Some(existing) => *existing = order,
            None => self.orders.insert(0, order),
        }
    }
}

/// Order commands and results
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderAction {
    /// Fetch orders
    Load {
        /// Caller's token
        token: AuthToken,
    },
    /// Move an order to another status (admin)
    ChangeStatus {
        /// Admin token
        token: AuthToken,
        /// Order to change
        id: OrderId,
        /// Target status
        status: OrderStatus,
    },
    /// List fetched
    Loaded {
        /// Orders
        orders: Vec<Order>,
    },
    /// Server copy of a new or changed order
    Saved {
        /// The order
        order: Order,
    },
    /// A call failed
    Failed {
        /// Why
        error: PortalError,
    },
}

impl OrderAction {
    /// The API failure this action reports, if any
    #[must_use]
    pub const fn failure(&self) -> Option<&PortalError> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Reducer for order history
#[derive(Clone, Debug, Default)]
pub struct OrderReducer;

impl OrderReducer {
    /// Creates a new `OrderReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for OrderReducer {
    type State = OrderState;
    type Action = OrderAction;
    type Environment = PortalEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            OrderAction::Load { token } => {
                state.loading = true;
                let api = Arc::clone(&env.api);
                smallvec![Effect::future(async move {
                    Some(match api.list_orders(token).await {
                        Ok(orders) => OrderAction::Loaded { orders },
                        Err(error) => OrderAction::Failed { error },
                    })
                })]
            },

            OrderAction::ChangeStatus { token, id, status } => {
                let api = Arc::clone(&env.api);
                smallvec![Effect::future(async move {
                    Some(match api.update_order_status(token, id, status).await {
                        Ok(order) => OrderAction::Saved { order },
                        Err(error) => OrderAction::Failed { error },
                    })
                })]
            },

            OrderAction::Loaded { mut orders } => {
                orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                state.loading = false;
                state.last_error = None;
                state.orders = orders;
                SmallVec::new()
            },

            OrderAction::Saved { order } => {
                state.upsert(order);
                SmallVec::new()
            },

            OrderAction::Failed { error } => {
                tracing::warn!(%error, "Order request failed");
                state.loading = false;
                state.notices.push(Toast::error(error.user_message()));
                state.last_error = Some(error);
                SmallVec::new()
            },
        }
    }
}
