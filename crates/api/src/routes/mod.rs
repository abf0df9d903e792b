//! HTTP route handlers for the shop API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                           - Liveness
//! GET  /health/ready                     - Readiness (database ping)
//!
//! # Auth (strict rate limit)
//! POST /api/auth/signup                  - Create an account
//! POST /api/auth/signin                  - Sign in with email + password
//! POST /api/auth/signout                 - Sign out
//! GET  /api/auth/me                      - Signed-in user, or null
//! POST /api/auth/init                    - Create the first (admin) user
//! POST /api/auth/password-reset/request  - Email a reset token
//! POST /api/auth/password-reset/redeem   - Set a new password with a token
//!
//! # Lists
//! GET/POST         /api/users            GET/PATCH/DELETE /api/users/{id}
//! GET/POST         /api/roles            GET/PATCH/DELETE /api/roles/{id}
//! GET              /api/roles/permissions - Permission keys and labels
//! GET/POST         /api/products         GET/PATCH/DELETE /api/products/{id}
//! GET/POST         /api/product-images   GET/PATCH/DELETE /api/product-images/{id}
//! GET/POST         /api/cart-items       GET/PATCH/DELETE /api/cart-items/{id}
//! GET              /api/orders           GET              /api/orders/{id}
//! GET              /api/order-items      GET              /api/order-items/{id}
//!
//! # Mutations
//! POST /api/mutations/add-to-cart        - addToCart(productId)
//! POST /api/mutations/checkout           - checkout(token)
//! ```

pub mod auth;
pub mod cart_items;
pub mod health;
pub mod mutations;
pub mod order_items;
pub mod orders;
pub mod product_images;
pub mod products;
pub mod roles;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use serde::{Deserialize, Deserializer};

use crate::access::{self, AccessDenied, AccessSession, ItemFilter, List, Operation};
use crate::error::AppError;
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::services::cart::SIGNED_OUT_MESSAGE;
use crate::state::AppState;

/// Resolve an access decision for a handler.
///
/// Signed-out callers get 401, signed-in callers without access get 403.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` or `AppError::Forbidden` when refused.
pub fn authorize(
    list: List,
    operation: Operation,
    session: Option<&AccessSession>,
) -> Result<Option<ItemFilter>, AppError> {
    access::check(list, operation, session)
        .into_scope()
        .map_err(|denied| refusal(session, denied))
}

/// 401 for signed-out callers, 403 for everyone else.
pub(crate) fn refusal(session: Option<&AccessSession>, denied: AccessDenied) -> AppError {
    match session {
        None => AppError::Unauthorized(SIGNED_OUT_MESSAGE.to_string()),
        Some(_) => AppError::Forbidden(denied),
    }
}

/// Deserialize a field that distinguishes "absent" from "null".
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: absent stays `None`, `null` becomes `Some(None)`.
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::sign_up))
        .route("/signin", post(auth::sign_in))
        .route("/signout", post(auth::sign_out))
        .route("/me", get(auth::me))
        .route("/init", post(auth::init))
        .route("/password-reset/request", post(auth::request_password_reset))
        .route("/password-reset/redeem", post(auth::redeem_password_reset))
}

/// Create the list routes router.
pub fn list_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::index).post(users::create))
        .route(
            "/users/{id}",
            get(users::show).patch(users::update).delete(users::destroy),
        )
        .route("/roles", get(roles::index).post(roles::create))
        .route("/roles/permissions", get(roles::permissions))
        .route(
            "/roles/{id}",
            get(roles::show).patch(roles::update).delete(roles::destroy),
        )
        .route("/products", get(products::index).post(products::create))
        .route(
            "/products/{id}",
            get(products::show)
                .patch(products::update)
                .delete(products::destroy),
        )
        .route(
            "/product-images",
            get(product_images::index).merge(
                post(product_images::upload)
                    .layer(DefaultBodyLimit::max(product_images::MAX_UPLOAD_BYTES)),
            ),
        )
        .route(
            "/product-images/{id}",
            get(product_images::show)
                .patch(product_images::update)
                .delete(product_images::destroy),
        )
        .route(
            "/cart-items",
            get(cart_items::index).post(cart_items::create),
        )
        .route(
            "/cart-items/{id}",
            get(cart_items::show)
                .patch(cart_items::update)
                .delete(cart_items::destroy),
        )
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/order-items", get(order_items::index))
        .route("/order-items/{id}", get(order_items::show))
}

/// Create the custom mutation routes router.
pub fn mutation_routes() -> Router<AppState> {
    Router::new()
        .route("/add-to-cart", post(mutations::add_to_cart))
        .route("/checkout", post(mutations::checkout))
}

/// Create all routes. API groups are rate limited, health checks are not.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/auth", auth_routes().layer(auth_rate_limiter()))
        .nest(
            "/api",
            list_routes()
                .nest("/mutations", mutation_routes())
                .layer(api_rate_limiter()),
        )
}
