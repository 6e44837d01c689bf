//! # Club Portal Testing
//!
//! Testing utilities for the club fan portal.
//!
//! This crate provides:
//! - [`MockPortalApi`], an in-memory backend with a call log
//! - [`FixedClock`] for deterministic catalog date buckets
//! - Fixture builders for matches, tickets, products and accounts
//! - [`settle`], which drives a reducer until its effects run dry
//! - Given-When-Then reducer tests via [`ReducerTest`]
//!
//! ## Example
//!
//! ```ignore
//! use club_portal_testing::{fixtures, settle, MockPortalApi};
//!
//! #[tokio::test]
//! async fn bootstrap_loads_catalog() {
//!     let api = Arc::new(MockPortalApi::new().with_ticket(fixtures::ticket(...)));
//!     let env = fixtures::test_environment(Arc::clone(&api));
//!     let mut state = PortalState::default();
//!
//!     settle(&PortalReducer::new(), &mut state, PortalAction::Bootstrap, &env).await;
//!
//!     assert_eq!(state.tickets.tickets.len(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use club_portal_core::environment::Clock;

mod api_mock;

pub use api_mock::MockPortalApi;
pub use reducer_test::{assertions, ReducerTest};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    pub use crate::api_mock::MockPortalApi;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use club_portal_testing::mocks::FixedClock;
    /// use club_portal_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Builders for domain values, anchored at [`test_clock`]
pub mod fixtures {
    use super::{mocks::test_clock, Clock, MockPortalApi};
    use chrono::Duration;
    use club_portal_core::environment::PortalEnvironment;
    use club_portal_core::types::{
        AuthToken, Match, MatchId, Money, Product, ProductId, Role, SeatCategory, Ticket,
        TicketId, UserId, UserProfile,
    };
    use std::sync::Arc;

    /// A match `days` after the test clock's now (negative for past matches)
    #[must_use]
    pub fn fixture(home: &str, away: &str, days: i64, competition: &str) -> Match {
        Match {
            id: MatchId::new(),
            teams: vec![home.to_string(), away.to_string()],
            event_date: test_clock().now() + Duration::days(days),
            location: format!("{home} Stadium"),
            competition: competition.to_string(),
            image: None,
        }
    }

    /// A listing for `fixture`
    #[must_use]
    pub fn ticket(fixture: &Match, seat_category: SeatCategory, cents: u64, available: u32) -> Ticket {
        Ticket {
            id: TicketId::new(),
            fixture: fixture.clone(),
            seat_category,
            price: Money::from_cents(cents),
            available_tickets: available,
        }
    }

    /// A shop product
    #[must_use]
    pub fn product(name: &str, cents: u64, stock: u32) -> Product {
        Product {
            id: ProductId::new(),
            name: name.to_string(),
            description: format!("Official {name}"),
            category: "Kits".to_string(),
            price: Money::from_cents(cents),
            stock,
            image: None,
        }
    }

    /// An account with `role`
    #[must_use]
    pub fn user(username: &str, role: Role) -> UserProfile {
        UserProfile {
            id: UserId::new(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            role,
        }
    }

    /// A fresh bearer token
    #[must_use]
    pub fn token() -> AuthToken {
        AuthToken::new(uuid::Uuid::new_v4().to_string())
    }

    /// Environment wired to `api` and the fixed test clock
    #[must_use]
    pub fn test_environment(api: Arc<MockPortalApi>) -> PortalEnvironment {
        PortalEnvironment::new(api, Arc::new(test_clock()))
    }
}

/// Test helpers and utilities
pub mod helpers {
    use club_portal_core::effect::Effect;
    use club_portal_core::reducer::Reducer;
    use std::collections::VecDeque;

    /// Reduce `action`, then run every `Future` effect and feed its result
    /// back until nothing is left.
    ///
    /// `Delay` effects are collected but never fired. Returns the actions
    /// that were fed back, in the order they were reduced.
    pub async fn settle<R>(
        reducer: &R,
        state: &mut R::State,
        action: R::Action,
        env: &R::Environment,
    ) -> Settled<R::Action>
    where
        R: Reducer,
        R::Action: Clone,
    {
        let mut settled = Settled {
            fed_back: Vec::new(),
            delayed: Vec::new(),
        };
        let mut queue = VecDeque::from([action]);
        let mut first = true;

        while let Some(action) = queue.pop_front() {
            if !first {
                settled.fed_back.push(action.clone());
            }
            first = false;

            let mut pending: Vec<Effect<R::Action>> = reducer.reduce(state, action, env).into_vec();
            while let Some(effect) = pending.pop() {
                match effect {
                    Effect::None => {},
                    Effect::Parallel(effects) | Effect::Sequential(effects) => {
                        pending.extend(effects.into_iter().rev());
                    },
                    Effect::Delay { action, .. } => settled.delayed.push(*action),
                    Effect::Future(fut) => {
                        if let Some(next) = fut.await {
                            queue.push_back(next);
                        }
                    },
                }
            }
        }

        settled
    }

    /// Outcome of [`settle`]
    #[derive(Debug)]
    pub struct Settled<A> {
        /// Actions produced by `Future` effects
        pub fed_back: Vec<A>,
        /// Actions scheduled by `Delay` effects (not dispatched)
        pub delayed: Vec<A>,
    }
}

/// Property-based testing utilities
pub mod properties {
    use super::fixtures;
    use club_portal_core::types::{SeatCategory, Ticket};
    use proptest::prelude::*;

    /// Any seat category
    pub fn seat_category() -> impl Strategy<Value = SeatCategory> {
        prop_oneof![
            Just(SeatCategory::Vip),
            Just(SeatCategory::Standard),
            Just(SeatCategory::General),
        ]
    }

    /// A listing between 60 days ago and 60 days ahead, priced up to 500.00
    pub fn ticket() -> impl Strategy<Value = Ticket> {
        (
            -60_i64..60,
            prop_oneof![Just("League"), Just("Cup"), Just("Friendly")],
            seat_category(),
            100_u64..50_000,
            0_u32..200,
        )
            .prop_map(|(days, competition, seat_category, cents, available)| {
                let fixture = fixtures::fixture("Home FC", "Away United", days, competition);
                fixtures::ticket(&fixture, seat_category, cents, available)
            })
    }

    /// Up to `max` listings
    pub fn tickets(max: usize) -> impl Strategy<Value = Vec<Ticket>> {
        prop::collection::vec(ticket(), 0..=max)
    }
}

// Re-export commonly used items
pub use helpers::{settle, Settled};
pub use mocks::{test_clock, FixedClock};

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use club_portal_core::api::{CheckoutLine, CheckoutRequest, PortalApi};
    use club_portal_core::error::PortalError;
    use club_portal_core::types::{LineItemKind, Role, SeatCategory};

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[tokio::test]
    async fn mock_records_calls_and_queued_failures() {
        let api = MockPortalApi::new();
        api.fail_next(PortalError::Network("offline".to_string()));

        assert!(api.list_tickets().await.is_err());
        assert!(api.list_tickets().await.is_ok());
        assert_eq!(api.calls(), vec!["list_tickets", "list_tickets"]);
    }

    #[tokio::test]
    async fn mock_checkout_rejects_oversell_without_decrementing() {
        let fixture = fixtures::fixture("Home FC", "Rivals", 7, "League");
        let ticket = fixtures::ticket(&fixture, SeatCategory::Vip, 5_000, 3);
        let token = fixtures::token();
        let api = MockPortalApi::new()
            .with_ticket(ticket.clone())
            .with_session(fixtures::user("fan", Role::Fan), &token);

        let line = CheckoutLine {
            kind: LineItemKind::Ticket {
                ticket_id: ticket.id,
                match_id: fixture.id,
                seat_category: SeatCategory::Vip,
            },
            quantity: 2,
        };
        let request = CheckoutRequest {
            lines: vec![line.clone(), line],
        };

        let result = api.place_order(token, request).await;

        assert!(matches!(result, Err(PortalError::Conflict { .. })));
        assert_eq!(api.tickets()[0].available_tickets, 3);
    }
}
