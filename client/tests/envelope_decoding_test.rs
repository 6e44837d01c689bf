//! Response decoding and error mapping against a scripted server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use club_portal_client::{ClientConfig, HttpPortalApi};
use club_portal_core::api::{CheckoutRequest, PortalApi};
use club_portal_core::error::FALLBACK_MESSAGE;
use club_portal_core::types::{AuthToken, SeatCategory, TicketId};
use club_portal_core::{PortalError, ValidationError};
use club_portal_testing::fixtures;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpPortalApi {
    HttpPortalApi::new(&ClientConfig::default().with_base_url(server.uri())).unwrap()
}

#[tokio::test]
async fn decodes_data_from_the_envelope() {
    let server = MockServer::start().await;
    let fixture = fixtures::fixture("Home FC", "Visitors", 7, "League");
    let ticket = fixtures::ticket(&fixture, SeatCategory::Vip, 12_050, 40);
    Mock::given(method("GET"))
        .and(path("/api/tickets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [ticket],
            "message": "Tickets loaded",
        })))
        .mount(&server)
        .await;

    let tickets = client_for(&server).list_tickets().await.unwrap();

    assert_eq!(tickets, vec![ticket]);
}

#[tokio::test]
async fn sends_bearer_token_and_accepts_bodiless_success() {
    let server = MockServer::start().await;
    let id = TicketId::new();
    Mock::given(method("DELETE"))
        .and(path(format!("/api/tickets/{id}")))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": null,
            "message": "Ticket deleted",
        })))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .delete_ticket(AuthToken::new("secret-token"), id)
        .await
        .unwrap();
}

#[tokio::test]
async fn conflict_carries_the_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .and(body_json(json!({ "lines": [] })))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "success": false,
            "data": null,
            "message": "Only 2 left for VIP tickets",
        })))
        .mount(&server)
        .await;

    let error = client_for(&server)
        .place_order(fixtures::token(), CheckoutRequest { lines: vec![] })
        .await
        .unwrap_err();

    assert_eq!(
        error,
        PortalError::Conflict {
            message: "Only 2 left for VIP tickets".to_string()
        }
    );
}

#[tokio::test]
async fn status_codes_map_onto_the_error_taxonomy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Your session has expired. Please log in again.",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "success": false,
            "message": "Quantity must be at least 1",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad gateway</html>"))
        .mount(&server)
        .await;
    let api = client_for(&server);

    let unauthorized = api.list_users(fixtures::token()).await.unwrap_err();
    assert!(unauthorized.is_unauthorized());

    let rejected = api.list_orders(fixtures::token()).await.unwrap_err();
    assert_eq!(
        rejected,
        PortalError::Validation(ValidationError::Rejected("Quantity must be at least 1".to_string()))
    );

    let gateway = api.list_products().await.unwrap_err();
    assert_eq!(gateway, PortalError::Server { status: 502, message: None });
    assert_eq!(gateway.user_message(), FALLBACK_MESSAGE);
}

#[tokio::test]
async fn malformed_success_body_is_a_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/matches"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let error = client_for(&server).list_matches().await.unwrap_err();

    assert!(matches!(error, PortalError::Server { status: 200, .. }));
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let config = ClientConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        request_timeout: Duration::from_secs(2),
        ..ClientConfig::default()
    };
    let api = HttpPortalApi::new(&config).unwrap();

    let error = api.list_tickets().await.unwrap_err();

    assert!(matches!(error, PortalError::Network(_)), "unexpected: {error:?}");
}
