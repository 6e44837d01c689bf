//! End-to-end reducer flows against the in-memory API.
//!
//! Each test drives `PortalReducer` with `settle`, which runs every remote
//! effect to completion, and then inspects both the state and the calls the
//! mock backend received.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use club_portal_core::cart::CartAction;
use club_portal_core::catalog::DateBucket;
use club_portal_core::error::{PortalError, ValidationError};
use club_portal_core::orders::OrderAction;
use club_portal_core::portal::{CatalogAction, PortalAction, PortalReducer, PortalState};
use club_portal_core::routes::{HOME_PATH, LOGIN_PATH};
use club_portal_core::tickets::TicketAction;
use club_portal_core::types::{AuthToken, Role, SeatCategory, Ticket, UserProfile};
use club_portal_core::validation::{TicketEditForm, TicketForm};
use club_portal_testing::{fixtures, settle, test_clock, FixedClock, MockPortalApi};
use club_portal_core::environment::Clock;
use std::sync::Arc;

// ============================================================================
// Test Fixtures
// ============================================================================

struct Harness {
    api: Arc<MockPortalApi>,
    reducer: PortalReducer,
    env: club_portal_core::environment::PortalEnvironment,
    state: PortalState,
}

impl Harness {
    fn new(api: MockPortalApi) -> Self {
        let api = Arc::new(api);
        Self {
            env: fixtures::test_environment(Arc::clone(&api)),
            api,
            reducer: PortalReducer::new(),
            state: PortalState::default(),
        }
    }

    async fn send(&mut self, action: PortalAction) -> club_portal_testing::Settled<PortalAction> {
        settle(&self.reducer, &mut self.state, action, &self.env).await
    }

    fn sign_in(&mut self, user: UserProfile, token: &AuthToken) {
        self.state.session.token = Some(token.clone());
        self.state.session.user = Some(user);
    }
}

fn derby() -> Ticket {
    let fixture = fixtures::fixture("Home FC", "City Rovers", 10, "League");
    fixtures::ticket(&fixture, SeatCategory::Vip, 12_000, 5)
}

fn admin() -> (UserProfile, AuthToken) {
    (fixtures::user("admin", Role::Admin), fixtures::token())
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn bootstrap_loads_public_lists() {
    let ticket = derby();
    let mut harness = Harness::new(
        MockPortalApi::new()
            .with_ticket(ticket.clone())
            .with_product(fixtures::product("Home Shirt", 6_500, 10)),
    );

    harness.send(PortalAction::Bootstrap).await;

    assert_eq!(harness.state.tickets.tickets, vec![ticket]);
    assert_eq!(harness.state.matches.matches.len(), 1);
    assert_eq!(harness.state.products.products.len(), 1);
    assert!(!harness.state.tickets.loading);
}

#[tokio::test]
async fn duplicate_ticket_category_is_rejected_before_any_request() {
    let ticket = derby();
    let (_, token) = admin();
    let mut harness = Harness::new(MockPortalApi::new().with_ticket(ticket.clone()));
    harness.send(PortalAction::Bootstrap).await;

    let form = TicketForm {
        match_id: Some(ticket.fixture.id),
        seat_category: SeatCategory::Vip,
        price: 150.0,
        available_tickets: 20,
    };
    harness
        .send(PortalAction::Tickets(TicketAction::Create { token, form }))
        .await;

    assert!(matches!(
        harness.state.tickets.form_error,
        Some(ValidationError::Duplicate(_))
    ));
    assert_eq!(harness.api.call_count("create_ticket"), 0);
    assert_eq!(harness.state.tickets.tickets.len(), 1);
    assert!(harness.state.toasts.iter().any(|t| t.toast.is_error()));
}

#[tokio::test]
async fn negative_values_are_rejected_before_any_request() {
    let ticket = derby();
    let (_, token) = admin();
    let mut harness = Harness::new(MockPortalApi::new().with_ticket(ticket.clone()));

    let form = TicketForm {
        match_id: Some(ticket.fixture.id),
        seat_category: SeatCategory::General,
        price: -5.0,
        available_tickets: 10,
    };
    harness
        .send(PortalAction::Tickets(TicketAction::Create { token: token.clone(), form }))
        .await;
    assert_eq!(
        harness.state.tickets.form_error,
        Some(ValidationError::Negative { field: "Price" })
    );

    let form = TicketEditForm {
        price: 10.0,
        available_tickets: -1,
    };
    harness
        .send(PortalAction::Tickets(TicketAction::Update { token, id: ticket.id, form }))
        .await;
    assert!(matches!(
        harness.state.tickets.form_error,
        Some(ValidationError::Negative { .. })
    ));

    assert!(harness.api.calls().is_empty());
}

#[tokio::test]
async fn created_ticket_is_refetched_with_its_match() {
    let ticket = derby();
    let (_, token) = admin();
    let mut harness = Harness::new(MockPortalApi::new().with_ticket(ticket.clone()));
    harness.send(PortalAction::Bootstrap).await;

    let form = TicketForm {
        match_id: Some(ticket.fixture.id),
        seat_category: SeatCategory::Standard,
        price: 45.5,
        available_tickets: 200,
    };
    harness
        .send(PortalAction::Tickets(TicketAction::Create { token, form }))
        .await;

    let calls = harness.api.calls();
    let create = calls.iter().position(|c| *c == "create_ticket").unwrap();
    assert_eq!(calls[create + 1], "get_ticket");

    let created = harness
        .state
        .tickets
        .tickets
        .iter()
        .find(|t| t.seat_category == SeatCategory::Standard)
        .expect("created ticket is in the list");
    assert_eq!(created.fixture, ticket.fixture);
    assert_eq!(created.price.cents(), 4_550);
    assert!(harness.state.tickets.form_error.is_none());
}

#[tokio::test]
async fn server_conflict_on_create_leaves_list_unchanged() {
    let ticket = derby();
    let (_, token) = admin();
    // Listing exists server-side but was never loaded locally.
    let mut harness = Harness::new(MockPortalApi::new().with_ticket(ticket.clone()));

    let form = TicketForm {
        match_id: Some(ticket.fixture.id),
        seat_category: SeatCategory::Vip,
        price: 99.0,
        available_tickets: 1,
    };
    harness
        .send(PortalAction::Tickets(TicketAction::Create { token, form }))
        .await;

    assert!(harness.state.tickets.tickets.is_empty());
    assert!(matches!(
        harness.state.tickets.last_error,
        Some(PortalError::Conflict { .. })
    ));
}

#[tokio::test]
async fn failed_update_keeps_previous_values() {
    let ticket = derby();
    let (_, token) = admin();
    let mut harness = Harness::new(MockPortalApi::new().with_ticket(ticket.clone()));
    harness.send(PortalAction::Bootstrap).await;
    harness.api.fail_next(PortalError::Server {
        status: 500,
        message: None,
    });

    let form = TicketEditForm {
        price: 1.0,
        available_tickets: 1,
    };
    harness
        .send(PortalAction::Tickets(TicketAction::Update { token, id: ticket.id, form }))
        .await;

    assert_eq!(harness.state.tickets.get(ticket.id), Some(&ticket));
    assert!(harness.state.tickets.last_error.is_some());
}

#[tokio::test]
async fn delete_removes_only_after_success() {
    let ticket = derby();
    let (_, token) = admin();
    let mut harness = Harness::new(MockPortalApi::new().with_ticket(ticket.clone()));
    harness.send(PortalAction::Bootstrap).await;

    harness.api.fail_next(PortalError::Network("connection reset".to_string()));
    harness
        .send(PortalAction::Tickets(TicketAction::Delete { token: token.clone(), id: ticket.id }))
        .await;
    assert_eq!(harness.state.tickets.tickets.len(), 1);

    harness
        .send(PortalAction::Tickets(TicketAction::Delete { token, id: ticket.id }))
        .await;
    assert!(harness.state.tickets.tickets.is_empty());
}

#[tokio::test]
async fn cart_respects_remaining_availability() {
    let ticket = derby();
    let mut harness = Harness::new(MockPortalApi::new().with_ticket(ticket.clone()));
    harness.send(PortalAction::Bootstrap).await;

    harness
        .send(PortalAction::Cart(CartAction::AddTicket { ticket: ticket.clone(), quantity: 3 }))
        .await;
    assert_eq!(harness.state.remaining_for(&ticket), 2);

    harness
        .send(PortalAction::Cart(CartAction::AddTicket { ticket: ticket.clone(), quantity: 3 }))
        .await;
    assert_eq!(harness.state.cart.item_count(), 3);
    assert_eq!(
        harness.state.cart.last_error,
        Some(PortalError::Validation(ValidationError::ExceedsRemaining {
            remaining: 2,
            label: "VIP tickets".to_string(),
        }))
    );

    harness
        .send(PortalAction::Cart(CartAction::AddTicket { ticket: ticket.clone(), quantity: 2 }))
        .await;
    assert_eq!(harness.state.cart.item_count(), 5);
    assert_eq!(harness.state.remaining_for(&ticket), 0);
}

#[tokio::test]
async fn cart_quantity_increase_is_checked_against_loaded_listing() {
    let ticket = derby();
    let mut harness = Harness::new(MockPortalApi::new().with_ticket(ticket.clone()));
    harness.send(PortalAction::Bootstrap).await;
    harness
        .send(PortalAction::Cart(CartAction::AddTicket { ticket, quantity: 2 }))
        .await;
    let line_id = harness.state.cart.lines[0].id;

    harness
        .send(PortalAction::ChangeCartQuantity { line_id, quantity: 6 })
        .await;
    assert_eq!(harness.state.cart.lines[0].quantity, 2);

    harness
        .send(PortalAction::ChangeCartQuantity { line_id, quantity: 5 })
        .await;
    assert_eq!(harness.state.cart.lines[0].quantity, 5);
}

#[tokio::test]
async fn unauthorized_response_signs_out_and_redirects_to_login() {
    let ticket = derby();
    let fan = fixtures::user("fan", Role::Fan);
    // Token unknown to the backend, so every authenticated call gets a 401.
    let stale = fixtures::token();
    let mut harness = Harness::new(MockPortalApi::new().with_ticket(ticket.clone()));
    harness.send(PortalAction::Bootstrap).await;
    harness.sign_in(fan, &stale);
    harness
        .send(PortalAction::Cart(CartAction::AddTicket { ticket, quantity: 1 }))
        .await;

    harness
        .send(PortalAction::Orders(OrderAction::Load { token: stale }))
        .await;

    assert!(harness.state.session.token.is_none());
    assert!(harness.state.session.user.is_none());
    assert_eq!(harness.state.location, LOGIN_PATH);
    assert!(harness.state.cart.lines.is_empty());
}

#[tokio::test]
async fn checkout_places_order_and_refreshes_availability() {
    let ticket = derby();
    let shirt = fixtures::product("Home Shirt", 6_500, 10);
    let fan = fixtures::user("fan", Role::Fan);
    let token = fixtures::token();
    let mut harness = Harness::new(
        MockPortalApi::new()
            .with_ticket(ticket.clone())
            .with_product(shirt.clone())
            .with_session(fan.clone(), &token),
    );
    harness.send(PortalAction::Bootstrap).await;
    harness.sign_in(fan.clone(), &token);
    harness
        .send(PortalAction::Cart(CartAction::AddTicket { ticket: ticket.clone(), quantity: 2 }))
        .await;
    harness
        .send(PortalAction::Cart(CartAction::AddProduct { product: shirt.clone(), quantity: 1 }))
        .await;

    harness
        .send(PortalAction::Cart(CartAction::Checkout { token }))
        .await;

    assert!(harness.state.cart.lines.is_empty());
    assert!(!harness.state.cart.checking_out);
    let order = harness.state.cart.last_order.clone().expect("order recorded");
    assert_eq!(order.user_id, fan.id);
    assert_eq!(order.total.cents(), 2 * 12_000 + 6_500);
    assert_eq!(harness.state.orders.orders, vec![order]);

    assert_eq!(harness.state.tickets.get(ticket.id).unwrap().available_tickets, 3);
    assert_eq!(harness.state.products.get(shirt.id).unwrap().stock, 9);

    let calls = harness.api.calls();
    let placed = calls.iter().position(|c| *c == "place_order").unwrap();
    assert!(calls[placed..].contains(&"list_tickets"));
    assert!(calls[placed..].contains(&"list_products"));
}

#[tokio::test]
async fn rejected_checkout_keeps_the_cart() {
    let ticket = derby();
    let fan = fixtures::user("fan", Role::Fan);
    let token = fixtures::token();
    let mut harness = Harness::new(
        MockPortalApi::new()
            .with_ticket(ticket.clone())
            .with_session(fan.clone(), &token),
    );
    harness.send(PortalAction::Bootstrap).await;
    harness.sign_in(fan, &token);
    harness
        .send(PortalAction::Cart(CartAction::AddTicket { ticket: ticket.clone(), quantity: 4 }))
        .await;
    harness.api.fail_next(PortalError::Conflict {
        message: "Only 1 VIP tickets left".to_string(),
    });

    harness
        .send(PortalAction::Cart(CartAction::Checkout { token }))
        .await;

    assert_eq!(harness.state.cart.item_count(), 4);
    assert!(harness.state.cart.last_order.is_none());
    assert!(harness.state.orders.orders.is_empty());
    assert_eq!(harness.api.tickets()[0].available_tickets, 5);
}

#[tokio::test]
async fn catalog_filter_change_resets_to_first_page() {
    let mut api = MockPortalApi::new();
    for day in 1..=8 {
        let fixture = fixtures::fixture("Home FC", "Visitors", day, "League");
        api = api.with_ticket(fixtures::ticket(&fixture, SeatCategory::General, 2_000, 50));
    }
    let mut harness = Harness::new(api);
    harness.send(PortalAction::Bootstrap).await;
    let now = test_clock().now();
    assert_eq!(harness.state.total_pages(now), 2);

    harness
        .send(PortalAction::Catalog(CatalogAction::GoToPage(2)))
        .await;
    assert_eq!(harness.state.catalog.pagination.current, 2);
    assert_eq!(harness.state.current_page(now).len(), 2);

    harness
        .send(PortalAction::Catalog(CatalogAction::DateBucket(DateBucket::Upcoming)))
        .await;
    // Same listings after the filter: the page is kept.
    assert_eq!(harness.state.catalog.pagination.current, 2);

    harness
        .send(PortalAction::Catalog(CatalogAction::Search("rovers".to_string())))
        .await;
    assert_eq!(harness.state.catalog.pagination.current, 1);
    assert!(harness.state.current_page(now).is_empty());
}

#[tokio::test]
async fn kick_off_between_actions_puts_the_view_back_on_page_one() {
    let mut api = MockPortalApi::new();
    for day in 1..=8 {
        let fixture = fixtures::fixture("Home FC", "Visitors", day, "League");
        api = api.with_ticket(fixtures::ticket(&fixture, SeatCategory::General, 2_000, 50));
    }
    let mut harness = Harness::new(api);
    harness.send(PortalAction::Bootstrap).await;
    harness
        .send(PortalAction::Catalog(CatalogAction::DateBucket(DateBucket::Upcoming)))
        .await;
    harness
        .send(PortalAction::Catalog(CatalogAction::GoToPage(2)))
        .await;
    let now = test_clock().now();
    assert_eq!(harness.state.page_number(now), 2);

    // Three fixtures kick off; no action is dispatched in between.
    let later = FixedClock::new(now + chrono::Duration::days(3)).now();
    let page = harness.state.current_page(later);

    assert_eq!(harness.state.page_number(later), 1);
    assert_eq!(harness.state.total_pages(later), 1);
    assert_eq!(page.len(), 5);
    assert!(page.iter().all(|ticket| ticket.fixture.event_date >= later));
}

#[tokio::test]
async fn toasts_schedule_their_own_dismissal() {
    let ticket = derby();
    let mut harness = Harness::new(MockPortalApi::new().with_ticket(ticket.clone()));

    let settled = harness
        .send(PortalAction::Cart(CartAction::AddTicket { ticket, quantity: 1 }))
        .await;

    let [toast] = harness.state.toasts.as_slice() else {
        panic!("expected one toast, got {:?}", harness.state.toasts);
    };
    assert!(!toast.toast.is_error());
    assert_eq!(
        settled.delayed,
        vec![PortalAction::DismissToast { id: toast.id }]
    );

    let id = toast.id;
    harness.send(PortalAction::DismissToast { id }).await;
    assert!(harness.state.toasts.is_empty());
}

#[tokio::test]
async fn navigation_is_guarded_by_role() {
    let mut harness = Harness::new(MockPortalApi::new());

    harness
        .send(PortalAction::Navigate { path: "/cart".to_string() })
        .await;
    assert_eq!(harness.state.location, LOGIN_PATH);

    harness.sign_in(fixtures::user("fan", Role::Fan), &fixtures::token());
    harness
        .send(PortalAction::Navigate { path: "/admin/tickets".to_string() })
        .await;
    assert_eq!(harness.state.location, HOME_PATH);

    harness.sign_in(fixtures::user("boss", Role::Admin), &fixtures::token());
    harness
        .send(PortalAction::Navigate { path: "/admin/tickets".to_string() })
        .await;
    assert_eq!(harness.state.location, "/admin/tickets");
}
