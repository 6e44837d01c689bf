//! End-to-end tests for the REST API through the full router.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::Duration;
use club_portal_core::api::{LoginSession, MatchDraft, NewTicket, ProductDraft};
use club_portal_core::environment::Clock;
use club_portal_core::types::{
    ApiEnvelope, Match, Money, Order, Product, SeatCategory, Ticket, TicketRecord, UserProfile,
};
use club_portal_testing::test_clock;
use club_portal_web::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;

struct Api {
    server: TestServer,
    state: AppState,
}

async fn setup() -> Api {
    let state = AppState::new(Arc::new(test_clock()), Duration::hours(1));
    state
        .seed_admin("admin", "admin@club.local", "password123")
        .await
        .unwrap();
    let server = TestServer::new(build_router(state.clone())).unwrap();
    Api { server, state }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

impl Api {
    async fn login(&self, login: &str, password: &str) -> String {
        let response = self
            .server
            .post("/api/login")
            .json(&json!({ "login": login, "password": password }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let envelope: ApiEnvelope<LoginSession> = response.json();
        envelope.data.unwrap().token.as_str().to_string()
    }

    async fn admin(&self) -> String {
        self.login("admin", "password123").await
    }

    async fn fan(&self, username: &str) -> String {
        let response = self
            .server
            .post("/api/register")
            .json(&json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "password123",
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        self.login(username, "password123").await
    }

    async fn fixture(&self) -> Match {
        self.state
            .repository
            .create_match(MatchDraft {
                teams: vec!["Home FC".into(), "Visitors".into()],
                event_date: test_clock().now() + Duration::days(7),
                location: "Home Stadium".into(),
                competition: "League".into(),
                image: None,
            })
            .await
    }
}

#[tokio::test]
async fn register_then_login_returns_fan_session() {
    let api = setup().await;

    let response = api
        .server
        .post("/api/register")
        .json(&json!({ "username": "sam", "email": "sam@example.com", "password": "password123" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let created: ApiEnvelope<UserProfile> = response.json();
    assert!(created.success);
    assert_eq!(created.data.unwrap().role.as_str(), "fan");

    let response = api
        .server
        .post("/api/login")
        .json(&json!({ "login": "sam@example.com", "password": "password123" }))
        .await;
    let session: ApiEnvelope<LoginSession> = response.json();
    let session = session.data.unwrap();
    assert_eq!(session.user.username, "sam");
    assert_eq!(session.expires_at, test_clock().now() + Duration::hours(1));
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let api = setup().await;
    api.fan("sam").await;

    let response = api
        .server
        .post("/api/register")
        .json(&json!({ "username": "SAM", "email": "other@example.com", "password": "password123" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Username already taken"));
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let api = setup().await;

    let response = api
        .server
        .post("/api/login")
        .json(&json!({ "login": "admin", "password": "nope-nope" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: ApiEnvelope<()> = response.json();
    assert_eq!(body.message.as_deref(), Some("Invalid credentials"));
}

#[tokio::test]
async fn admin_routes_require_a_session_and_the_admin_role() {
    let api = setup().await;
    let fixture = api.fixture().await;
    let body = json!({
        "matchId": fixture.id,
        "seatCategory": "VIP",
        "price": 120.0,
        "availableTickets": 10,
    });

    let anonymous = api.server.post("/api/tickets").json(&body).await;
    assert_eq!(anonymous.status_code(), StatusCode::UNAUTHORIZED);

    let fan = api.fan("sam").await;
    let forbidden = api
        .server
        .post("/api/tickets")
        .add_header(AUTHORIZATION, bearer(&fan))
        .json(&body)
        .await;
    assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
    let envelope: ApiEnvelope<()> = forbidden.json();
    assert!(!envelope.success);

    assert!(api.state.repository.tickets().await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_ticket_category_is_a_conflict() {
    let api = setup().await;
    let admin = api.admin().await;
    let fixture = api.fixture().await;
    let body = json!({
        "matchId": fixture.id,
        "seatCategory": "VIP",
        "price": 120.0,
        "availableTickets": 10,
    });

    let first = api
        .server
        .post("/api/tickets")
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&body)
        .await;
    assert_eq!(first.status_code(), StatusCode::CREATED);
    let record: ApiEnvelope<TicketRecord> = first.json();
    assert_eq!(record.data.unwrap().match_id, fixture.id);

    let second = api
        .server
        .post("/api/tickets")
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&body)
        .await;
    assert_eq!(second.status_code(), StatusCode::CONFLICT);
    let envelope: ApiEnvelope<()> = second.json();
    assert_eq!(
        envelope.message.as_deref(),
        Some("A VIP ticket for Home FC vs Visitors already exists")
    );
    assert_eq!(api.state.repository.tickets().await.unwrap().len(), 1);
}

#[tokio::test]
async fn negative_price_is_rejected_with_envelope() {
    let api = setup().await;
    let admin = api.admin().await;
    let fixture = api.fixture().await;

    let response = api
        .server
        .post("/api/tickets")
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({
            "matchId": fixture.id,
            "seatCategory": "Standard",
            "price": -5.0,
            "availableTickets": 10,
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    assert!(body["message"].is_string());
    assert!(api.state.repository.tickets().await.unwrap().is_empty());
}

#[tokio::test]
async fn ticket_lookup_by_match_and_category() {
    let api = setup().await;
    let admin = api.admin().await;
    let fixture = api.fixture().await;
    api.server
        .post("/api/tickets")
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({
            "matchId": fixture.id,
            "seatCategory": "General",
            "price": 35.5,
            "availableTickets": 200,
        }))
        .await;

    let found = api
        .server
        .get(&format!("/api/tickets/{}/General", fixture.id))
        .await;
    assert_eq!(found.status_code(), StatusCode::OK);
    let ticket: ApiEnvelope<Ticket> = found.json();
    let ticket = ticket.data.unwrap();
    assert_eq!(ticket.fixture, fixture);
    assert_eq!(ticket.price, Money::from_cents(3550));

    let missing = api.server.get(&format!("/api/tickets/{}/VIP", fixture.id)).await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

    let unknown = api.server.get(&format!("/api/tickets/{}/Box", fixture.id)).await;
    assert_eq!(unknown.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn match_with_tickets_cannot_be_deleted() {
    let api = setup().await;
    let admin = api.admin().await;
    let fixture = api.fixture().await;
    api.server
        .post("/api/tickets")
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({
            "matchId": fixture.id,
            "seatCategory": "VIP",
            "price": 100.0,
            "availableTickets": 5,
        }))
        .await;

    let response = api
        .server
        .delete(&format!("/api/matches/{}", fixture.id))
        .add_header(AUTHORIZATION, bearer(&admin))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert!(api.state.repository.fixture(fixture.id).await.is_ok());
}

#[tokio::test]
async fn checkout_over_stock_leaves_everything_unchanged() {
    let api = setup().await;
    let fan = api.fan("sam").await;
    let fixture = api.fixture().await;
    let record = api
        .state
        .repository
        .create_ticket(NewTicket {
            match_id: fixture.id,
            seat_category: SeatCategory::Vip,
            price: Money::from_cents(8000),
            available_tickets: 2,
        })
        .await
        .unwrap();
    let scarf: Product = api
        .state
        .repository
        .create_product(ProductDraft {
            name: "Scarf".into(),
            description: String::new(),
            category: "Accessories".into(),
            price: Money::from_cents(1500),
            stock: 10,
            image: None,
        })
        .await;

    let response = api
        .server
        .post("/api/orders")
        .add_header(AUTHORIZATION, bearer(&fan))
        .json(&json!({
            "lines": [
                { "productType": "merchandise", "productId": scarf.id, "quantity": 1 },
                { "productType": "ticket", "ticketId": record.id, "matchId": fixture.id, "seatCategory": "VIP", "quantity": 3 },
            ]
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let ticket = api.state.repository.ticket(record.id).await.unwrap();
    assert_eq!(ticket.available_tickets, 2);
    assert_eq!(api.state.repository.product(scarf.id).await.unwrap().stock, 10);
    assert!(api.state.repository.orders(None).await.is_empty());
}

#[tokio::test]
async fn checkout_decrements_stock_and_prices_server_side() {
    let api = setup().await;
    let fan = api.fan("sam").await;
    let fixture = api.fixture().await;
    let record = api
        .state
        .repository
        .create_ticket(NewTicket {
            match_id: fixture.id,
            seat_category: SeatCategory::Standard,
            price: Money::from_cents(4000),
            available_tickets: 10,
        })
        .await
        .unwrap();

    let response = api
        .server
        .post("/api/orders")
        .add_header(AUTHORIZATION, bearer(&fan))
        .json(&json!({
            "lines": [
                { "productType": "ticket", "ticketId": record.id, "matchId": fixture.id, "seatCategory": "Standard", "quantity": 3 },
            ]
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let order: ApiEnvelope<Order> = response.json();
    let order = order.data.unwrap();
    assert_eq!(order.total, Money::from_cents(12_000));
    assert_eq!(order.created_at, test_clock().now());
    assert_eq!(
        api.state.repository.ticket(record.id).await.unwrap().available_tickets,
        7
    );

    let mine = api
        .server
        .get("/api/orders")
        .add_header(AUTHORIZATION, bearer(&fan))
        .await;
    let mine: ApiEnvelope<Vec<Order>> = mine.json();
    assert_eq!(mine.data.unwrap().len(), 1);

    let other = api.fan("alex").await;
    let theirs = api
        .server
        .get("/api/orders")
        .add_header(AUTHORIZATION, bearer(&other))
        .await;
    let theirs: ApiEnvelope<Vec<Order>> = theirs.json();
    assert!(theirs.data.unwrap().is_empty());
}

#[tokio::test]
async fn users_cannot_edit_each_other_or_their_role() {
    let api = setup().await;
    let sam = api.fan("sam").await;
    api.fan("alex").await;
    let alex = api.state.repository.find_by_login("alex").await.unwrap().profile;
    let sam_id = api.state.repository.find_by_login("sam").await.unwrap().profile.id;

    let other = api
        .server
        .put(&format!("/api/users/{}", alex.id))
        .add_header(AUTHORIZATION, bearer(&sam))
        .json(&json!({ "username": "hijacked" }))
        .await;
    assert_eq!(other.status_code(), StatusCode::FORBIDDEN);

    let promote = api
        .server
        .put(&format!("/api/users/{sam_id}"))
        .add_header(AUTHORIZATION, bearer(&sam))
        .json(&json!({ "role": "admin" }))
        .await;
    assert_eq!(promote.status_code(), StatusCode::FORBIDDEN);

    let rename = api
        .server
        .put(&format!("/api/users/{sam_id}"))
        .add_header(AUTHORIZATION, bearer(&sam))
        .json(&json!({ "username": "samuel" }))
        .await;
    assert_eq!(rename.status_code(), StatusCode::OK);
    let profile: ApiEnvelope<UserProfile> = rename.json();
    let profile = profile.data.unwrap();
    assert_eq!(profile.username, "samuel");
    assert_eq!(profile.email, "sam@example.com");
}

#[tokio::test]
async fn password_change_checks_the_current_password() {
    let api = setup().await;
    let sam = api.fan("sam").await;
    let sam_id = api.state.repository.find_by_login("sam").await.unwrap().profile.id;
    let path = format!("/api/users/{sam_id}/update-password");

    let wrong = api
        .server
        .put(&path)
        .add_header(AUTHORIZATION, bearer(&sam))
        .json(&json!({ "currentPassword": "not-it-at-all", "newPassword": "brand-new-pass" }))
        .await;
    assert_eq!(wrong.status_code(), StatusCode::BAD_REQUEST);

    let right = api
        .server
        .put(&path)
        .add_header(AUTHORIZATION, bearer(&sam))
        .json(&json!({ "currentPassword": "password123", "newPassword": "brand-new-pass" }))
        .await;
    assert_eq!(right.status_code(), StatusCode::OK);

    api.login("sam", "brand-new-pass").await;
}

#[tokio::test]
async fn deleted_user_loses_their_session() {
    let api = setup().await;
    let admin = api.admin().await;
    let sam = api.fan("sam").await;
    let sam_id = api.state.repository.find_by_login("sam").await.unwrap().profile.id;

    let deleted = api
        .server
        .delete(&format!("/api/users/{sam_id}"))
        .add_header(AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(deleted.status_code(), StatusCode::OK);

    let after = api
        .server
        .get("/api/orders")
        .add_header(AUTHORIZATION, bearer(&sam))
        .await;
    assert_eq!(after.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_check_answers_with_envelope() {
    let api = setup().await;

    let response = api.server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["status"], json!("ok"));
}
