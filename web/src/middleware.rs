//! Request tracking.
//!
//! Every request carries a [`RequestId`]: the caller's `x-request-id` when it
//! is a UUID, a fresh one otherwise. The id is put in the request extensions,
//! recorded on the request span and echoed on the response. Completion is
//! logged with status and latency and counted per status class.
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/api/tickets", get(list_tickets))
//!     .layer(request_tracking_layer());
//! ```

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    response::Response,
};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the request id in both directions
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Identifier tying a request's log lines together
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// The caller's id if it is a valid UUID, otherwise a new one
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(&REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map_or_else(|| Self(Uuid::new_v4()), Self)
    }

    /// Id stored on `request` by the tracking layer
    #[must_use]
    pub fn of(request: &Request) -> Option<Self> {
        request.extensions().get::<Self>().copied()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Tracking layer for the router
#[must_use]
pub const fn request_tracking_layer() -> RequestTrackingLayer {
    RequestTrackingLayer
}

/// [`Layer`] producing [`RequestTracking`]
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestTrackingLayer;

impl<S> Layer<S> for RequestTrackingLayer {
    type Service = RequestTracking<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestTracking { inner }
    }
}

/// Service wrapper that tags, times and counts requests
#[derive(Clone, Debug)]
pub struct RequestTracking<S> {
    inner: S,
}

const fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

type Tracked<R, E> = Pin<Box<dyn Future<Output = Result<R, E>> + Send>>;

impl<S> Service<Request> for RequestTracking<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Tracked<Response, S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let id = RequestId::from_headers(request.headers());
        request.extensions_mut().insert(id);

        let span = tracing::info_span!(
            "request",
            request_id = %id,
            method = %request.method(),
            path = %request.uri().path(),
        );
        let started = Instant::now();
        let pending = self.inner.call(request);

        Box::pin(
            async move {
                let mut response = pending.await?;
                let status = response.status().as_u16();
                tracing::debug!(status, elapsed_ms = started.elapsed().as_millis(), "Request completed");
                metrics::counter!("http.requests", "status" => status_class(status)).increment(1);

                if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
                    response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}
