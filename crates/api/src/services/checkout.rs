//! The checkout mutation.
//!
//! A straight line: load the cart, total it, charge the card, write the
//! order and empty the cart. A failure after the charge is not compensated.

use sqlx::PgPool;
use thiserror::Error;

use cyber_shop_core::{CartItemId, Price};

use crate::access::AccessSession;
use crate::db::{CartItemRepository, OrderRepository, RepositoryError};
use crate::models::{CartLine, NewOrderItem, OrderWithItems};
use crate::services::payments::{PaymentError, StripeClient};

/// Errors from checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Sorry! You must be signed in to create an order!")]
    NotSignedIn,

    /// Nothing purchasable in the cart.
    #[error("Your cart is empty")]
    EmptyCart,

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Sum of quantity × price over lines whose product still exists.
#[must_use]
pub fn cart_total(lines: &[CartLine]) -> Price {
    lines
        .iter()
        .filter_map(|line| {
            line.product
                .as_ref()
                .map(|p| p.price.times(i64::from(line.quantity)))
        })
        .sum()
}

/// Every loaded cart line, dangling ones included, to remove once ordered.
#[must_use]
pub fn checked_out_line_ids(lines: &[CartLine]) -> Vec<CartItemId> {
    lines.iter().map(|line| line.id).collect()
}

/// Snapshot purchasable cart lines as order items.
#[must_use]
pub fn order_items_from_cart(lines: &[CartLine]) -> Vec<NewOrderItem> {
    lines
        .iter()
        .filter_map(|line| {
            line.product.as_ref().map(|p| NewOrderItem {
                name: p.name.clone(),
                description: p.description.clone(),
                photo_id: p.photo_id,
                price: p.price,
                quantity: line.quantity,
            })
        })
        .collect()
}

/// Checkout service.
pub struct CheckoutService<'a> {
    carts: CartItemRepository<'a>,
    orders: OrderRepository<'a>,
    payments: &'a StripeClient,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, payments: &'a StripeClient) -> Self {
        Self {
            carts: CartItemRepository::new(pool),
            orders: OrderRepository::new(pool),
            payments,
        }
    }

    /// Charge the shopper for their cart and turn it into an order.
    ///
    /// `token` is the payment method id from the frontend.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotSignedIn` without a session,
    /// `CheckoutError::EmptyCart` when nothing can be bought, and
    /// `CheckoutError::Payment` with the provider's message when the charge fails.
    pub async fn checkout(
        &self,
        session: Option<&AccessSession>,
        token: &str,
    ) -> Result<OrderWithItems, CheckoutError> {
        let Some(session) = session else {
            return Err(CheckoutError::NotSignedIn);
        };
        let user_id = session.item_id;

        let lines = self.carts.lines_for_user(user_id).await?;
        let items = order_items_from_cart(&lines);
        let dangling = lines.len() - items.len();
        if dangling > 0 {
            tracing::info!(%user_id, dangling, "Skipping cart items with deleted products");
        }
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let amount = cart_total(&lines);
        tracing::info!(%user_id, amount = amount.cents(), "Charging cart");

        let charge = self.payments.charge(amount, token).await.map_err(|e| {
            tracing::warn!(%user_id, error = %e, "Charge failed");
            e
        })?;

        let order = self
            .orders
            .create_from_cart(
                user_id,
                charge.total(),
                &charge.id,
                &items,
                &checked_out_line_ids(&lines),
            )
            .await?;

        tracing::info!(
            %user_id,
            order_id = %order.order.id,
            charge = %charge.id,
            items = order.items.len(),
            "Order created"
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use cyber_shop_core::{ProductId, ProductImageId};

    use super::*;
    use crate::models::CartProduct;

    fn line(id: i32, quantity: i32, price: Option<i64>) -> CartLine {
        CartLine {
            id: CartItemId::new(id),
            quantity,
            product: price.map(|cents| CartProduct {
                id: ProductId::new(id * 10),
                name: format!("Product {id}"),
                description: "Neon".to_string(),
                price: Price::from_cents(cents),
                photo_id: Some(ProductImageId::new(id)),
            }),
        }
    }

    #[test]
    fn test_cart_total() {
        let lines = [line(1, 2, Some(2499)), line(2, 1, Some(1000))];
        assert_eq!(cart_total(&lines), Price::from_cents(5998));
    }

    #[test]
    fn test_cart_total_skips_deleted_products() {
        let lines = [line(1, 3, Some(500)), line(2, 4, None)];
        assert_eq!(cart_total(&lines), Price::from_cents(1500));
    }

    #[test]
    fn test_cart_total_empty() {
        assert_eq!(cart_total(&[]), Price::ZERO);
    }

    #[test]
    fn test_order_items_snapshot_products() {
        let lines = [line(1, 2, Some(2499)), line(2, 1, None)];
        let items = order_items_from_cart(&lines);

        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0],
            NewOrderItem {
                name: "Product 1".to_string(),
                description: "Neon".to_string(),
                photo_id: Some(ProductImageId::new(1)),
                price: Price::from_cents(2499),
                quantity: 2,
            }
        );
    }

    #[test]
    fn test_order_items_total_matches_cart_total() {
        let lines = [line(1, 2, Some(2499)), line(2, 5, Some(199)), line(3, 1, None)];
        let from_items: Price = order_items_from_cart(&lines)
            .iter()
            .map(|i| i.price.times(i64::from(i.quantity)))
            .sum();
        assert_eq!(from_items, cart_total(&lines));
    }

    #[test]
    fn test_checked_out_ids_include_dangling_lines() {
        let lines = [line(4, 1, Some(100)), line(9, 2, None)];
        assert_eq!(
            checked_out_line_ids(&lines),
            vec![CartItemId::new(4), CartItemId::new(9)]
        );
    }

    #[test]
    fn test_signed_out_message() {
        assert_eq!(
            CheckoutError::NotSignedIn.to_string(),
            "Sorry! You must be signed in to create an order!"
        );
    }
}
