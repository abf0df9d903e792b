//! Router-level tests: rejections and middleware.
//!
//! These run against [`test_app`], which has no session layer and a pool
//! that never connects, so every request is signed out and must be turned
//! away before touching the database.

#![allow(clippy::unwrap_used)]

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use cyber_shop_integration_tests::{FRONTEND_URL, request, test_app};

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = test_app()
        .oneshot(request(Method::GET, "/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_signed_out_checkout_is_rejected() {
    let response = test_app()
        .oneshot(request(
            Method::POST,
            "/api/mutations/checkout",
            Some(json!({ "token": "pm_card_visa" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(
        body["error"],
        "Sorry! You must be signed in to create an order!"
    );
}

#[tokio::test]
async fn test_signed_out_add_to_cart_is_rejected() {
    let response = test_app()
        .oneshot(request(
            Method::POST,
            "/api/mutations/add-to-cart",
            Some(json!({ "productId": 1 })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "You must be logged in to do this!");
}

#[tokio::test]
async fn test_signed_out_product_create_is_rejected() {
    let response = test_app()
        .oneshot(request(
            Method::POST,
            "/api/products",
            Some(json!({ "name": "Yeti Hondo", "price": 3423 })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "You must be logged in to do this!");
}

#[tokio::test]
async fn test_signed_out_reads_of_private_lists_are_rejected() {
    for uri in [
        "/api/users",
        "/api/roles",
        "/api/roles/permissions",
        "/api/products",
        "/api/cart-items",
        "/api/orders",
        "/api/order-items",
        "/api/orders/1",
    ] {
        let response = test_app()
            .oneshot(request(Method::GET, uri, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "GET {uri}");
    }
}

#[tokio::test]
async fn test_orders_are_read_only() {
    for method in [Method::PATCH, Method::DELETE] {
        let response = test_app()
            .oneshot(request(method.clone(), "/api/orders/1", None))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED,
            "{method} /api/orders/1"
        );
    }
}

#[tokio::test]
async fn test_me_is_null_when_signed_out() {
    let response = test_app()
        .oneshot(request(Method::GET, "/api/auth/me", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, Value::Null);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let mut req = request(Method::GET, "/health", None);
    req.headers_mut()
        .insert("x-request-id", "test-request-42".parse().unwrap());

    let response = test_app().oneshot(req).await.unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "test-request-42"
    );
}

#[tokio::test]
async fn test_request_id_is_generated() {
    let response = test_app()
        .oneshot(request(Method::GET, "/health", None))
        .await
        .unwrap();

    let id = response.headers().get("x-request-id").unwrap();
    assert!(!id.is_empty());
}

#[tokio::test]
async fn test_cors_allows_frontend_with_credentials() {
    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/mutations/checkout")
        .header("x-forwarded-for", "203.0.113.9")
        .header(header::ORIGIN, FRONTEND_URL)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = test_app().oneshot(preflight).await.unwrap();

    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        FRONTEND_URL
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_cors_ignores_other_origins() {
    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/products")
        .header("x-forwarded-for", "203.0.113.9")
        .header(header::ORIGIN, "https://evil.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = test_app().oneshot(preflight).await.unwrap();

    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn test_rate_limited_requests_get_json_errors() {
    let app = test_app();
    let body = json!({ "email": "not-an-email" });

    // The auth limiter allows a burst of five.
    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/auth/password-reset/request",
                Some(body.clone()),
            ))
            .await
            .unwrap();
        assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    let response = app
        .oneshot(request(
            Method::POST,
            "/api/auth/password-reset/request",
            Some(body),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Too many requests, slow down and try again");
}

#[tokio::test]
async fn test_signed_out_sign_up_with_role_is_rejected() {
    let response = test_app()
        .oneshot(request(
            Method::POST,
            "/api/users",
            Some(json!({
                "name": "Sneaky",
                "email": "sneaky@example.com",
                "password": "a long enough password",
                "roleId": 1
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "You must be logged in to do this!");
}
