//! The add-to-cart mutation.

use sqlx::PgPool;
use thiserror::Error;

use cyber_shop_core::ProductId;

use crate::access::{self, AccessSession, List, Operation};
use crate::db::{CartItemRepository, ProductRepository, RepositoryError};
use crate::models::CartItem;

/// Message returned when adding to the cart while signed out.
pub const SIGNED_OUT_MESSAGE: &str = "You must be logged in to do this!";

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("You must be logged in to do this!")]
    NotSignedIn,

    /// The product doesn't exist or isn't visible to the shopper.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Add one unit of a product to the shopper's cart.
///
/// Increments the existing cart item for that product, or creates one with
/// quantity 1.
///
/// # Errors
///
/// Returns `CartError::NotSignedIn` without a session and
/// `CartError::ProductNotFound` for unknown or hidden products.
pub async fn add_to_cart(
    pool: &PgPool,
    session: Option<&AccessSession>,
    product_id: ProductId,
) -> Result<CartItem, CartError> {
    let Some(session) = session else {
        return Err(CartError::NotSignedIn);
    };

    // Shoppers can only add products they are allowed to see
    let visible = access::check(List::Product, Operation::Read, Some(session))
        .into_scope()
        .map_err(|_| CartError::ProductNotFound(product_id))?;
    if ProductRepository::new(pool)
        .get(product_id, visible)
        .await?
        .is_none()
    {
        return Err(CartError::ProductNotFound(product_id));
    }

    let carts = CartItemRepository::new(pool);
    if let Some(existing) = carts.find_for_product(session.item_id, product_id).await? {
        tracing::info!(
            cart_item_id = %existing.id,
            previous_quantity = existing.quantity,
            "Incrementing cart item"
        );
        return Ok(carts.increment(existing.id).await?);
    }

    let item = carts.create(session.item_id, Some(product_id), 1).await?;
    tracing::info!(cart_item_id = %item.id, product_id = %product_id, "Added product to cart");
    Ok(item)
}
