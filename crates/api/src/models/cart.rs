//! Cart types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cyber_shop_core::{CartItemId, Price, ProductId, ProductImageId, UserId};

/// A line in a user's cart.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub quantity: i32,
    /// `None` once the product has been deleted.
    pub product_id: Option<ProductId>,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// A cart item with its product loaded, as used by checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub id: CartItemId,
    pub quantity: i32,
    pub product: Option<CartProduct>,
}

/// The product fields checkout copies into an order item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub photo_id: Option<ProductImageId>,
}
