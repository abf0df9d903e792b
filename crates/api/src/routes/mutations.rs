//! Custom mutations: `addToCart` and `checkout`.
//!
//! Both take the session as optional and let the service reject signed-out
//! callers, so the error messages are the mutation's own.

use axum::{Json, extract::State};
use serde::Deserialize;

use cyber_shop_core::ProductId;

use crate::error::Result;
use crate::middleware::OptionalSession;
use crate::models::{CartItem, OrderWithItems};
use crate::services::cart;
use crate::services::checkout::CheckoutService;
use crate::state::AppState;

/// `addToCart` arguments.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
}

/// `checkout` arguments.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Payment method id created by the frontend's card form.
    pub token: String,
}

/// Add one unit of a product to the caller's cart.
pub async fn add_to_cart(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Json(body): Json<AddToCartRequest>,
) -> Result<Json<CartItem>> {
    let item = cart::add_to_cart(state.pool(), session.as_ref(), body.product_id).await?;
    Ok(Json(item))
}

/// Charge the caller's cart and turn it into an order.
pub async fn checkout(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<OrderWithItems>> {
    let order = CheckoutService::new(state.pool(), state.payments())
        .checkout(session.as_ref(), &body.token)
        .await?;
    Ok(Json(order))
}
