//! Request identification.
//!
//! # Responsibilities
//! - Accept the caller's `x-request-id` or generate a UUID v4
//! - Expose the id to handlers through request extensions
//! - Echo the id on the response
//! - Run the rest of the request inside a span carrying the id
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Ids that are not valid header values are replaced, not rejected

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Upper bound for caller-supplied ids.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Correlation id of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
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

fn incoming_id(request: &Request<Body>) -> Option<RequestId> {
    let value = request.headers().get(&X_REQUEST_ID)?.to_str().ok()?.trim();
    if value.is_empty() || value.len() > MAX_REQUEST_ID_LEN {
        return None;
    }
    Some(RequestId(value.to_string()))
}

pub async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let id = incoming_id(&request).unwrap_or_else(RequestId::generate);
    let header = HeaderValue::from_str(id.as_str()).ok();

    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    request.extensions_mut().insert(id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(header) = header {
        response.headers_mut().insert(X_REQUEST_ID, header);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(id: Option<&str>) -> Request<Body> {
        let mut builder = axum::http::Request::builder().uri("/live");
        if let Some(id) = id {
            builder = builder.header("x-request-id", id);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_incoming_id_is_kept() {
        let id = incoming_id(&request_with(Some("abc-123"))).unwrap();
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn test_missing_or_oversized_id_is_ignored() {
        assert!(incoming_id(&request_with(None)).is_none());
        assert!(incoming_id(&request_with(Some("  "))).is_none());
        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        assert!(incoming_id(&request_with(Some(&long))).is_none());
    }

    #[test]
    fn test_generated_ids_are_uuids() {
        let id = RequestId::generate();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
        assert_ne!(id, RequestId::generate());
    }
}
