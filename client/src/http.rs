//! `PortalApi` over HTTP.

use crate::config::ClientConfig;
use crate::error::ClientError;
use club_portal_core::api::{
    ApiFuture, CheckoutRequest, Credentials, LoginSession, MatchDraft, NewTicket, PasswordChange,
    PortalApi, ProductDraft, ProfileUpdate, Registration, StatusChange, TicketChanges,
};
use club_portal_core::types::{
    ApiEnvelope, AuthToken, Match, MatchId, Order, OrderId, OrderStatus, Product, ProductId,
    SeatCategory, Ticket, TicketId, TicketRecord, UserId, UserProfile,
};
use club_portal_core::PortalError;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, warn};

/// Portal API client.
///
/// Every call decodes the `{ success, data, message }` envelope. Non-success
/// statuses become the matching [`PortalError`] carrying the server's
/// `message`; transport failures become [`PortalError::Network`].
#[derive(Clone, Debug)]
pub struct HttpPortalApi {
    client: Client,
    base_url: String,
}

impl HttpPortalApi {
    /// Build a client for `config.base_url`
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidBaseUrl`] unless the URL is `http(s)://`,
    /// [`ClientError::Build`] if the TLS backend fails to initialise.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl(config.base_url.clone()));
        }
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// Client configured from the environment
    ///
    /// # Errors
    ///
    /// See [`HttpPortalApi::new`].
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(&ClientConfig::from_env())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    fn authed(&self, method: Method, path: &str, token: &AuthToken) -> RequestBuilder {
        self.request(method, path).bearer_auth(token.as_str())
    }

    /// Send and decode the envelope; `Ok(None)` for a bodiless success
    async fn exchange<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>, PortalError> {
        let request = request.build().map_err(|e| PortalError::Network(e.to_string()))?;
        let method = request.method().clone();
        let path = request.url().path().to_string();
        debug!(%method, %path, "Sending request");

        let response = self.client.execute(request).await.map_err(|e| {
            warn!(%method, %path, error = %e, "Request failed");
            PortalError::Network(e.to_string())
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| PortalError::Network(e.to_string()))?;

        if !(200..300).contains(&status) {
            let message = serde_json::from_slice::<ApiEnvelope<IgnoredAny>>(&body)
                .ok()
                .and_then(|envelope| envelope.message);
            debug!(%method, %path, status, ?message, "Request rejected");
            return Err(PortalError::from_status(status, message));
        }

        let envelope: ApiEnvelope<T> = serde_json::from_slice(&body).map_err(|e| {
            warn!(%method, %path, status, error = %e, "Malformed response body");
            PortalError::Server { status, message: None }
        })?;
        if !envelope.success {
            return Err(PortalError::Server {
                status,
                message: envelope.message,
            });
        }
        Ok(envelope.data)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, PortalError> {
        self.exchange(request).await?.ok_or_else(|| {
            warn!("Response envelope has no data");
            PortalError::Server { status: 200, message: None }
        })
    }

    async fn execute(&self, request: RequestBuilder) -> Result<(), PortalError> {
        self.exchange::<IgnoredAny>(request).await.map(|_| ())
    }
}

impl PortalApi for HttpPortalApi {
    fn register(&self, registration: Registration) -> ApiFuture<'_, UserProfile> {
        Box::pin(async move {
            self.fetch(self.request(Method::POST, "/register").json(&registration))
                .await
        })
    }

    fn login(&self, credentials: Credentials) -> ApiFuture<'_, LoginSession> {
        Box::pin(async move {
            self.fetch(self.request(Method::POST, "/login").json(&credentials))
                .await
        })
    }

    fn list_users(&self, token: AuthToken) -> ApiFuture<'_, Vec<UserProfile>> {
        Box::pin(async move { self.fetch(self.authed(Method::GET, "/users", &token)).await })
    }

    fn update_user(&self, token: AuthToken, id: UserId, update: ProfileUpdate) -> ApiFuture<'_, UserProfile> {
        Box::pin(async move {
            let builder = self.authed(Method::PUT, &format!("/users/{id}"), &token);
            self.fetch(builder.json(&update)).await
        })
    }

    fn update_password(&self, token: AuthToken, id: UserId, change: PasswordChange) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            let builder = self.authed(Method::PUT, &format!("/users/{id}/update-password"), &token);
            self.execute(builder.json(&change)).await
        })
    }

    fn delete_user(&self, token: AuthToken, id: UserId) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            self.execute(self.authed(Method::DELETE, &format!("/users/{id}"), &token))
                .await
        })
    }

    fn list_matches(&self) -> ApiFuture<'_, Vec<Match>> {
        Box::pin(async move { self.fetch(self.request(Method::GET, "/matches")).await })
    }

    fn create_match(&self, token: AuthToken, draft: MatchDraft) -> ApiFuture<'_, Match> {
        Box::pin(async move {
            self.fetch(self.authed(Method::POST, "/matches", &token).json(&draft))
                .await
        })
    }

    fn update_match(&self, token: AuthToken, id: MatchId, draft: MatchDraft) -> ApiFuture<'_, Match> {
        Box::pin(async move {
            let builder = self.authed(Method::PUT, &format!("/matches/{id}"), &token);
            self.fetch(builder.json(&draft)).await
        })
    }

    fn delete_match(&self, token: AuthToken, id: MatchId) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            self.execute(self.authed(Method::DELETE, &format!("/matches/{id}"), &token))
                .await
        })
    }

    fn list_tickets(&self) -> ApiFuture<'_, Vec<Ticket>> {
        Box::pin(async move { self.fetch(self.request(Method::GET, "/tickets")).await })
    }

    fn get_ticket(&self, id: TicketId) -> ApiFuture<'_, Ticket> {
        Box::pin(async move {
            self.fetch(self.request(Method::GET, &format!("/tickets/{id}")))
                .await
        })
    }

    fn get_ticket_for(&self, match_id: MatchId, seat_category: SeatCategory) -> ApiFuture<'_, Ticket> {
        Box::pin(async move {
            self.fetch(self.request(Method::GET, &format!("/tickets/{match_id}/{seat_category}")))
                .await
        })
    }

    fn create_ticket(&self, token: AuthToken, ticket: NewTicket) -> ApiFuture<'_, TicketRecord> {
        Box::pin(async move {
            self.fetch(self.authed(Method::POST, "/tickets", &token).json(&ticket))
                .await
        })
    }

    fn update_ticket(&self, token: AuthToken, id: TicketId, changes: TicketChanges) -> ApiFuture<'_, Ticket> {
        Box::pin(async move {
            let builder = self.authed(Method::PUT, &format!("/tickets/{id}"), &token);
            self.fetch(builder.json(&changes)).await
        })
    }

    fn delete_ticket(&self, token: AuthToken, id: TicketId) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            self.execute(self.authed(Method::DELETE, &format!("/tickets/{id}"), &token))
                .await
        })
    }

    fn list_products(&self) -> ApiFuture<'_, Vec<Product>> {
        Box::pin(async move { self.fetch(self.request(Method::GET, "/products")).await })
    }

    fn create_product(&self, token: AuthToken, draft: ProductDraft) -> ApiFuture<'_, Product> {
        Box::pin(async move {
            self.fetch(self.authed(Method::POST, "/products", &token).json(&draft))
                .await
        })
    }

    fn update_product(&self, token: AuthToken, id: ProductId, draft: ProductDraft) -> ApiFuture<'_, Product> {
        Box::pin(async move {
            let builder = self.authed(Method::PUT, &format!("/products/{id}"), &token);
            self.fetch(builder.json(&draft)).await
        })
    }

    fn delete_product(&self, token: AuthToken, id: ProductId) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            self.execute(self.authed(Method::DELETE, &format!("/products/{id}"), &token))
                .await
        })
    }

    fn list_orders(&self, token: AuthToken) -> ApiFuture<'_, Vec<Order>> {
        Box::pin(async move { self.fetch(self.authed(Method::GET, "/orders", &token)).await })
    }

    fn place_order(&self, token: AuthToken, request: CheckoutRequest) -> ApiFuture<'_, Order> {
        Box::pin(async move {
            self.fetch(self.authed(Method::POST, "/orders", &token).json(&request))
                .await
        })
    }

    fn update_order_status(&self, token: AuthToken, id: OrderId, status: OrderStatus) -> ApiFuture<'_, Order> {
        Box::pin(async move {
            let builder = self.authed(Method::PUT, &format!("/orders/{id}/status"), &token);
            self.fetch(builder.json(&StatusChange { status })).await
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_trailing_slash_is_dropped() {
        let api = HttpPortalApi::new(&ClientConfig::default().with_base_url("http://club.test/")).unwrap();
        assert_eq!(api.url("/tickets"), "http://club.test/api/tickets");
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let result = HttpPortalApi::new(&ClientConfig::default().with_base_url("club.test"));
        assert!(matches!(result, Err(ClientError::InvalidBaseUrl(url)) if url == "club.test"));
    }
}
