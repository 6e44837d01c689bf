//! Router assembly.

use crate::handlers::{accounts, health, matches, orders, products, tickets, users};
use crate::middleware::request_tracking_layer;
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Every portal endpoint, with tracing, permissive CORS and request ids.
///
/// | Method | Path | Access |
/// |---|---|---|
/// | GET | `/health` | public |
/// | POST | `/api/register`, `/api/login` | public |
/// | GET | `/api/users` | admin |
/// | PUT | `/api/users/:id` | self or admin |
/// | PUT | `/api/users/:id/update-password` | self |
/// | DELETE | `/api/users/:id` | admin |
/// | GET | `/api/matches`, `/api/matches/:id` | public |
/// | POST, PUT, DELETE | `/api/matches[/:id]` | admin |
/// | GET | `/api/tickets`, `/api/tickets/:id`, `/api/tickets/:match_id/:seat_category` | public |
/// | POST, PUT, DELETE | `/api/tickets[/:id]` | admin |
/// | GET | `/api/products`, `/api/products/:id` | public |
/// | POST, PUT, DELETE | `/api/products[/:id]` | admin |
/// | GET, POST | `/api/orders` | signed in |
/// | PUT | `/api/orders/:id/status` | admin |
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/register", post(accounts::register))
        .route("/login", post(accounts::login))
        .route("/users", get(users::list_users))
        .route("/users/:id", put(users::update_user).delete(users::delete_user))
        .route("/users/:id/update-password", put(users::update_password))
        .route("/matches", get(matches::list_matches).post(matches::create_match))
        .route(
            "/matches/:id",
            get(matches::get_match)
                .put(matches::update_match)
                .delete(matches::delete_match),
        )
        .route("/tickets", get(tickets::list_tickets).post(tickets::create_ticket))
        .route(
            "/tickets/:id",
            get(tickets::get_ticket)
                .put(tickets::update_ticket)
                .delete(tickets::delete_ticket),
        )
        .route("/tickets/:id/:seat_category", get(tickets::get_ticket_for))
        .route("/products", get(products::list_products).post(products::create_product))
        .route(
            "/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/orders", get(orders::list_orders).post(orders::place_order))
        .route("/orders/:id/status", put(orders::update_order_status));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api)
        .layer(request_tracking_layer())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
