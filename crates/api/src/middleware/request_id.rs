//! Request ID middleware for request tracing and correlation.
//!
//! Reuses the `x-request-id` set by a proxy, or generates a UUID v4. The ID
//! is recorded on the request span, tagged on the Sentry scope and echoed
//! back in the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Ensure every request carries a request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = incoming_request_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// A usable ID from upstream: non-empty, at most 128 visible ASCII characters.
fn incoming_request_id(request: &Request) -> Option<String> {
    let value = request.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    let valid = !value.is_empty()
        && value.len() <= 128
        && value.chars().all(|c| c.is_ascii_graphic());
    valid.then(|| value.to_owned())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn with_header(value: &str) -> Request {
        Request::builder()
            .header(REQUEST_ID_HEADER, value)
            .body(Body::empty())
            .unwrap_or_default()
    }

    #[test]
    fn test_incoming_id_is_reused() {
        assert_eq!(
            incoming_request_id(&with_header("abc-123")).as_deref(),
            Some("abc-123")
        );
    }

    #[test]
    fn test_invalid_incoming_ids_are_ignored() {
        assert_eq!(incoming_request_id(&with_header("   ")), None);
        assert_eq!(incoming_request_id(&with_header(&"x".repeat(200))), None);
        assert_eq!(incoming_request_id(&Request::default()), None);
    }
}
