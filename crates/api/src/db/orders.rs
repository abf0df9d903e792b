//! Order and order item repository.
//!
//! Orders are only ever created by checkout and are immutable afterwards,
//! so there are no update or delete methods.

use std::collections::HashMap;

use sqlx::{PgPool, Postgres, QueryBuilder};

use cyber_shop_core::{CartItemId, OrderId, OrderItemId, Price, UserId};

use super::{RepositoryError, push_filter};
use crate::access::ItemFilter;
use crate::models::{NewOrderItem, Order, OrderItem, OrderWithItems};

/// Removes the cart lines an order was built from, leaving lines added since.
const CLEAR_CHECKED_OUT_LINES: &str =
    "DELETE FROM shop.cart_items WHERE user_id = $1 AND id = ANY($2)";

const ORDER_COLUMNS: &str = "o.id, o.total, o.charge, o.user_id, o.created_at";
const ORDER_ITEM_COLUMNS: &str =
    "oi.id, oi.name, oi.description, oi.photo_id, oi.price, oi.quantity, oi.order_id";

/// Repository for orders and their items.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List orders visible under `filter`, newest first, with their items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: Option<ItemFilter>,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders o WHERE TRUE"
        ));
        push_filter(&mut qb, "o", filter);
        qb.push(" ORDER BY o.id DESC");
        let orders = qb.build_query_as::<Order>().fetch_all(self.pool).await?;

        let ids: Vec<i32> = orders.iter().map(|o| o.id.as_i32()).collect();
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM shop.order_items oi \
             WHERE oi.order_id = ANY($1) ORDER BY oi.id"
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in items {
            if let Some(order_id) = item.order_id {
                by_order.entry(order_id).or_default().push(item);
            }
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = by_order.remove(&order.id).unwrap_or_default();
                OrderWithItems::new(order, items)
            })
            .collect())
    }

    /// Get an order visible under `filter`, with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(
        &self,
        id: OrderId,
        filter: Option<ItemFilter>,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders o WHERE o.id = "
        ));
        qb.push_bind(id);
        push_filter(&mut qb, "o", filter);
        let Some(order) = qb.build_query_as::<Order>().fetch_optional(self.pool).await? else {
            return Ok(None);
        };

        let items = self.items_for_order(order.id).await?;
        Ok(Some(OrderWithItems::new(order, items)))
    }

    async fn items_for_order(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM shop.order_items oi WHERE oi.order_id = $1 ORDER BY oi.id"
        ))
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// List order items visible under `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_items(
        &self,
        filter: Option<ItemFilter>,
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM shop.order_items oi WHERE TRUE"
        ));
        push_filter(&mut qb, "oi", filter);
        qb.push(" ORDER BY oi.id");

        Ok(qb.build_query_as::<OrderItem>().fetch_all(self.pool).await?)
    }

    /// Get an order item visible under `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_item(
        &self,
        id: OrderItemId,
        filter: Option<ItemFilter>,
    ) -> Result<Option<OrderItem>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM shop.order_items oi WHERE oi.id = "
        ));
        qb.push_bind(id);
        push_filter(&mut qb, "oi", filter);

        Ok(qb.build_query_as::<OrderItem>().fetch_optional(self.pool).await?)
    }

    /// Record a paid order and empty the user's cart.
    ///
    /// The order, its items and the cart deletion commit together.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; nothing is
    /// written in that case.
    pub async fn create_from_cart(
        &self,
        user_id: UserId,
        total: Price,
        charge: &str,
        items: &[NewOrderItem],
        cart_line_ids: &[CartItemId],
    ) -> Result<OrderWithItems, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            r"
            INSERT INTO shop.orders (total, charge, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, total, charge, user_id, created_at
            ",
        )
        .bind(total)
        .bind(charge)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut created = Vec::with_capacity(items.len());
        for item in items {
            let row = sqlx::query_as::<_, OrderItem>(
                r"
                INSERT INTO shop.order_items (name, description, photo_id, price, quantity, order_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, name, description, photo_id, price, quantity, order_id
                ",
            )
            .bind(&item.name)
            .bind(&item.description)
            .bind(item.photo_id)
            .bind(item.price)
            .bind(item.quantity)
            .bind(order.id)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }

        let ids: Vec<i32> = cart_line_ids.iter().map(CartItemId::as_i32).collect();
        sqlx::query(CLEAR_CHECKED_OUT_LINES)
            .bind(user_id)
            .bind(ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(OrderWithItems::new(order, created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_clears_only_loaded_lines() {
        assert!(CLEAR_CHECKED_OUT_LINES.contains("id = ANY($2)"));
        assert!(CLEAR_CHECKED_OUT_LINES.contains("user_id = $1"));
    }
}
