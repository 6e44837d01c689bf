//! Integration tests for the Store driving the full portal reducer
//!
//! Covers effect feedback through the runtime: lists loaded by effects,
//! request-response via `send_and_wait_for`, and toast expiry through
//! `Delay` effects under paused time.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use club_portal_core::cart::CartAction;
use club_portal_core::notifications::TOAST_TTL;
use club_portal_core::portal::{PortalAction, PortalReducer, PortalState};
use club_portal_core::types::{Role, SeatCategory, Ticket};
use club_portal_runtime::{Store, StoreError};
use club_portal_testing::{fixtures, MockPortalApi};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

type PortalStore = Store<PortalReducer>;

fn store_with(api: &Arc<MockPortalApi>) -> PortalStore {
    Store::new(
        PortalState::default(),
        PortalReducer::new(),
        fixtures::test_environment(Arc::clone(api)),
    )
}

fn cup_final() -> Ticket {
    let fixture = fixtures::fixture("Home FC", "Harbour Town", 30, "Cup");
    fixtures::ticket(&fixture, SeatCategory::Standard, 4_000, 10)
}

fn is_checkout_result(action: &PortalAction) -> bool {
    matches!(
        action,
        PortalAction::Cart(CartAction::CheckoutSucceeded { .. } | CartAction::CheckoutFailed { .. })
    )
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn bootstrap_effects_feed_lists_back_into_state() {
    let ticket = cup_final();
    let api = Arc::new(MockPortalApi::new().with_ticket(ticket.clone()));
    let store = store_with(&api);

    let handle = store.send(PortalAction::Bootstrap).await.unwrap();
    handle
        .wait_with_timeout(Duration::from_secs(1))
        .await
        .unwrap();

    let (tickets, matches) = store
        .state(|s| (s.tickets.tickets.clone(), s.matches.matches.len()))
        .await;
    assert_eq!(tickets, vec![ticket]);
    assert_eq!(matches, 1);
}

#[tokio::test]
async fn checkout_round_trip() {
    let ticket = cup_final();
    let fan = fixtures::user("fan", Role::Fan);
    let token = fixtures::token();
    let api = Arc::new(
        MockPortalApi::new()
            .with_ticket(ticket.clone())
            .with_session(fan.clone(), &token),
    );
    let store = store_with(&api);
    store
        .send(PortalAction::Cart(CartAction::AddTicket { ticket: ticket.clone(), quantity: 4 }))
        .await
        .unwrap();

    let result = store
        .send_and_wait_for(
            PortalAction::Cart(CartAction::Checkout { token: token.clone() }),
            is_checkout_result,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    let PortalAction::Cart(CartAction::CheckoutSucceeded { order }) = result else {
        panic!("checkout failed: {result:?}");
    };
    assert_eq!(order.user_id, fan.id);
    assert_eq!(order.total.cents(), 16_000);
    assert_eq!(api.tickets()[0].available_tickets, 6);
}

#[tokio::test]
async fn effect_handle_waits_for_refetch_after_checkout() {
    let ticket = cup_final();
    let fan = fixtures::user("fan", Role::Fan);
    let token = fixtures::token();
    let api = Arc::new(
        MockPortalApi::new()
            .with_ticket(ticket.clone())
            .with_session(fan.clone(), &token),
    );
    let store = store_with(&api);
    let handle = store.send(PortalAction::Bootstrap).await.unwrap();
    handle.wait().await;
    store
        .send(PortalAction::Cart(CartAction::AddTicket { ticket: ticket.clone(), quantity: 3 }))
        .await
        .unwrap();

    let handle = store
        .send(PortalAction::Cart(CartAction::Checkout { token }))
        .await
        .unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    let (in_cart, available, orders) = store
        .state(|s| {
            (
                s.cart.item_count(),
                s.tickets.get(ticket.id).map(|t| t.available_tickets),
                s.orders.orders.len(),
            )
        })
        .await;
    assert_eq!(in_cart, 0);
    assert_eq!(available, Some(7));
    assert_eq!(orders, 1);
}

#[tokio::test(start_paused = true)]
async fn toasts_expire_after_their_ttl() {
    let ticket = cup_final();
    let api = Arc::new(MockPortalApi::new());
    let store = store_with(&api);

    store
        .send(PortalAction::Cart(CartAction::AddTicket { ticket, quantity: 1 }))
        .await
        .unwrap();
    assert_eq!(store.state(|s| s.toasts.len()).await, 1);

    tokio::time::sleep(TOAST_TTL / 2).await;
    assert_eq!(store.state(|s| s.toasts.len()).await, 1);

    tokio::time::sleep(TOAST_TTL).await;
    assert!(store.state(|s| s.toasts.is_empty()).await);
}

#[tokio::test]
async fn shutdown_rejects_new_actions() {
    let api = Arc::new(MockPortalApi::new());
    let store = store_with(&api);

    store.shutdown(Duration::from_secs(1)).await.unwrap();

    let result = store.send(PortalAction::Bootstrap).await;
    assert_eq!(result.err(), Some(StoreError::ShutdownInProgress));
    assert!(api.calls().is_empty());
}
