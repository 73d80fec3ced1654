//! HTTP middleware for localroute services.
//!
//! - [`RequestId`]: correlation id taken from `X-Request-ID` or generated as UUID v7
//! - [`track_requests`]: per-request span, `X-Request-ID` echo and HTTP metrics
//!
//! Metrics recorded per request:
//! - `http_requests_total`: counter by method, path, status bucket
//! - `http_request_duration_seconds`: histogram by method, path

use std::convert::Infallible;
use std::time::Instant;

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info_span, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Newtype wrapper for request correlation IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new UUID v7 request ID.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// `X-Request-ID` if present and valid UTF-8, otherwise a fresh UUID v7.
pub fn extract_or_generate_request_id(headers: &HeaderMap) -> RequestId {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(RequestId::from)
        .unwrap_or_else(RequestId::generate)
}

impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<RequestId>() {
            return Ok(id.clone());
        }
        Ok(extract_or_generate_request_id(&parts.headers))
    }
}

/// Strip the query string so metric labels stay low-cardinality.
pub fn normalize_path(path: &str) -> &str {
    path.split('?').next().unwrap_or(path)
}

fn status_bucket(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

/// Middleware for `axum::middleware::from_fn`.
///
/// Handlers extracting [`RequestId`] see the same id that is logged and
/// echoed back in the response header.
pub async fn track_requests(mut req: Request, next: Next) -> Response {
    let request_id = extract_or_generate_request_id(req.headers());
    req.extensions_mut().insert(request_id.clone());

    let method = req.method().to_string();
    let path = normalize_path(req.uri().path()).to_string();
    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let start = Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;
    let elapsed = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();

    metrics::counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status_bucket(status)
    )
    .increment(1);
    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(elapsed);

    span.in_scope(|| tracing::debug!(status, elapsed_seconds = elapsed, "request completed"));

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    #[test]
    fn extracts_existing_header() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Request-ID", HeaderValue::from_static("abc-123"));
        assert_eq!(extract_or_generate_request_id(&headers).as_str(), "abc-123");
    }

    #[test]
    fn generates_uuid_when_missing_or_blank() {
        let generated = extract_or_generate_request_id(&HeaderMap::new());
        assert!(Uuid::parse_str(generated.as_str()).is_ok());

        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("  "));
        let generated = extract_or_generate_request_id(&headers);
        assert!(Uuid::parse_str(generated.as_str()).is_ok());
    }

    #[test]
    fn path_normalization_drops_query() {
        assert_eq!(normalize_path("/api/v1/geocode?q=main"), "/api/v1/geocode");
        assert_eq!(normalize_path("/health/live"), "/health/live");
    }

    #[test]
    fn status_buckets() {
        assert_eq!(status_bucket(200), "2xx");
        assert_eq!(status_bucket(404), "4xx");
        assert_eq!(status_bucket(503), "5xx");
        assert_eq!(status_bucket(101), "other");
    }

    #[tokio::test]
    async fn echoes_request_id_and_shares_it_with_handlers() {
        use axum::http::HeaderName;
        use axum_test::TestServer;

        let app = Router::new()
            .route("/", get(|id: RequestId| async move { id.0 }))
            .layer(axum::middleware::from_fn(track_requests));
        let server = TestServer::new(app).expect("test server");

        let response = server
            .get("/")
            .add_header(
                HeaderName::from_static(REQUEST_ID_HEADER),
                HeaderValue::from_static("req-42"),
            )
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.header(REQUEST_ID_HEADER), "req-42");
        assert_eq!(response.text(), "req-42");
    }

    #[tokio::test]
    async fn generates_request_id_header_when_absent() {
        use axum_test::TestServer;

        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(track_requests));
        let server = TestServer::new(app).expect("test server");

        let response = server.get("/").await;
        let id = response.header(REQUEST_ID_HEADER);
        assert!(Uuid::parse_str(id.to_str().expect("ascii")).is_ok());
    }
}
