//! Integration tests for Cyber Shop.
//!
//! # Running Tests
//!
//! ```bash
//! # Router-level tests, no database needed
//! cargo test -p cyber-shop-integration-tests
//!
//! # End-to-end tests against a running server with a migrated database
//! SHOP_BASE_URL=http://localhost:3000 cargo test -p cyber-shop-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `access_rules` - The access table as seen from outside the crate
//! - `http` - Rejections and middleware, via `tower::ServiceExt::oneshot`
//! - `shop_flow` - Sign up, add to cart and check out against a live server

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, header};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;

use cyber_shop_api::config::{ApiConfig, CloudinaryConfig, EmailConfig, StripeConfig};
use cyber_shop_api::state::AppState;

/// Frontend origin used by [`test_config`].
pub const FRONTEND_URL: &str = "http://localhost:7777";

/// A configuration pointing at nothing reachable.
///
/// # Panics
///
/// Never panics: the host literal is a valid IP address.
#[must_use]
pub fn test_config() -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from("postgres://localhost:1/cyber_shop_test"),
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 3000,
        frontend_url: FRONTEND_URL.to_string(),
        session_max_age_days: 30,
        password_reset_token_minutes: 10,
        stripe: StripeConfig {
            secret_key: SecretString::from("sk_test_aB3xY9mK2nL5pQ7rT0uW4zC6"),
        },
        cloudinary: CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "123456789012345".to_string(),
            api_secret: SecretString::from("super_secret_cloudinary_value"),
            folder: "cyber-1".to_string(),
        },
        email: EmailConfig {
            smtp_host: "smtp.ethereal.email".to_string(),
            smtp_port: 587,
            smtp_username: "shop@ethereal.email".to_string(),
            smtp_password: SecretString::from("super_secret_smtp_password"),
            from_address: "shop@ethereal.email".to_string(),
        },
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// The full application on a lazily connected pool, without sessions.
///
/// Every request is signed out. Handlers that reach the database fail, so
/// only use it for paths that are rejected before any query runs.
///
/// # Panics
///
/// Panics if the state can't be built, which means the test config is broken.
#[must_use]
pub fn test_app() -> Router {
    let config = test_config();
    let pool = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_millis(200))
        .connect_lazy("postgres://localhost:1/cyber_shop_test")
        .expect("lazy pool from a valid URL");
    let state = AppState::new(config, pool).expect("state from test config");
    cyber_shop_api::app(state, None)
}

/// A request carrying a client IP for the rate limiter.
///
/// # Panics
///
/// Panics if `uri` is not a valid URI.
#[must_use]
pub fn request(method: Method, uri: &str, json: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.9");

    match json {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("valid test request")
}

/// Base URL of a running server for the ignored end-to-end tests.
#[must_use]
pub fn live_base_url() -> String {
    std::env::var("SHOP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}
