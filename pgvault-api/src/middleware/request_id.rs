//! Request correlation ids.
//!
//! An inbound `X-Request-Id` is reused when it is short visible ASCII; anything
//! else is replaced by a fresh UUID. The id is bound to the request's task,
//! recorded on its span, and echoed on the response.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Request, header::HeaderName},
    response::Response,
};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{Instrument, info_span};
use uuid::Uuid;

/// Request ID header name.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_INBOUND_LEN: usize = 128;

tokio::task_local! {
    static CURRENT: RequestId;
}

/// Correlation id of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    /// Fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Reuses the inbound header when acceptable, otherwise generates one.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(&REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= MAX_INBOUND_LEN)
            .filter(|v| v.bytes().all(|b| b.is_ascii_graphic()))
            .map_or_else(Self::generate, |v| Self(v.to_string()))
    }

    /// Id of the request the calling task is serving.
    #[must_use]
    pub fn current() -> Option<Self> {
        CURRENT.try_with(Clone::clone).ok()
    }

    /// The id text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tower layer assigning [`RequestId`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdLayer;

impl RequestIdLayer {
    /// Creates the layer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

/// Service produced by [`RequestIdLayer`].
#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestIdService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let id = RequestId::from_headers(request.headers());
        request.extensions_mut().insert(id.clone());

        let span = info_span!(
            "request",
            request_id = %id,
            method = %request.method(),
            path = %request.uri().path(),
        );
        let header = HeaderValue::from_str(id.as_str()).ok();
        let call = self.inner.call(request);

        Box::pin(CURRENT.scope(
            id,
            async move {
                let mut response = call.await?;
                if let Some(value) = header {
                    response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
                }
                Ok(response)
            }
            .instrument(span),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(&REQUEST_ID_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_inbound_id_is_reused() {
        assert_eq!(RequestId::from_headers(&headers(" req-42 ")).as_str(), "req-42");
    }

    #[test]
    fn test_unusable_inbound_id_is_replaced() {
        let spaced = RequestId::from_headers(&headers("two words"));
        assert!(Uuid::parse_str(spaced.as_str()).is_ok());

        let long = RequestId::from_headers(&headers(&"x".repeat(MAX_INBOUND_LEN + 1)));
        assert!(Uuid::parse_str(long.as_str()).is_ok());

        let missing = RequestId::from_headers(&HeaderMap::new());
        assert!(Uuid::parse_str(missing.as_str()).is_ok());
    }

    #[tokio::test]
    async fn test_current_is_task_scoped() {
        assert!(RequestId::current().is_none());
        let seen = CURRENT
            .scope(RequestId("r-1".to_string()), async { RequestId::current() })
            .await;
        assert_eq!(seen.map(|id| id.0), Some("r-1".to_string()));
        assert!(RequestId::current().is_none());
    }
}
