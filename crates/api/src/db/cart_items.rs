//! Cart item repository.

use sqlx::{PgPool, Postgres, QueryBuilder};

use cyber_shop_core::{CartItemId, Price, ProductId, ProductImageId, UserId};

use super::{RepositoryError, push_filter};
use crate::access::ItemFilter;
use crate::models::{CartItem, CartLine, CartProduct};

const CART_ITEM_COLUMNS: &str = "c.id, c.quantity, c.product_id, c.user_id, c.created_at";

/// A cart item joined with its (possibly deleted) product.
#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: CartItemId,
    quantity: i32,
    product_id: Option<ProductId>,
    product_name: Option<String>,
    product_description: Option<String>,
    product_price: Option<Price>,
    photo_id: Option<ProductImageId>,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        let product = match (row.product_id, row.product_name, row.product_price) {
            (Some(id), Some(name), Some(price)) => Some(CartProduct {
                id,
                name,
                description: row.product_description.unwrap_or_default(),
                price,
                photo_id: row.photo_id,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            quantity: row.quantity,
            product,
        }
    }
}

/// Repository for cart items.
pub struct CartItemRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartItemRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List cart items visible under `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: Option<ItemFilter>) -> Result<Vec<CartItem>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {CART_ITEM_COLUMNS} FROM shop.cart_items c WHERE TRUE"
        ));
        push_filter(&mut qb, "c", filter);
        qb.push(" ORDER BY c.id");

        Ok(qb.build_query_as::<CartItem>().fetch_all(self.pool).await?)
    }

    /// Get a cart item visible under `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: CartItemId,
        filter: Option<ItemFilter>,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {CART_ITEM_COLUMNS} FROM shop.cart_items c WHERE c.id = "
        ));
        qb.push_bind(id);
        push_filter(&mut qb, "c", filter);

        Ok(qb.build_query_as::<CartItem>().fetch_optional(self.pool).await?)
    }

    /// The user's cart item for a product, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_for_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let item = sqlx::query_as::<_, CartItem>(&format!(
            r"
            SELECT {CART_ITEM_COLUMNS}
            FROM shop.cart_items c
            WHERE c.user_id = $1 AND c.product_id = $2
            ORDER BY c.id
            LIMIT 1
            "
        ))
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(item)
    }

    /// Every cart item of a user with its product, oldest first.
    ///
    /// Items whose product was deleted come back with `product: None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines_for_user(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT c.id, c.quantity,
                   p.id AS product_id,
                   p.name AS product_name,
                   p.description AS product_description,
                   p.price AS product_price,
                   pi.id AS photo_id
            FROM shop.cart_items c
            LEFT JOIN shop.products p ON p.id = c.product_id
            LEFT JOIN shop.product_images pi ON pi.product_id = p.id
            WHERE c.user_id = $1
            ORDER BY c.id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    /// Create a cart item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product or user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        user_id: UserId,
        product_id: Option<ProductId>,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        let item = sqlx::query_as::<_, CartItem>(
            r"
            INSERT INTO shop.cart_items (quantity, product_id, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, quantity, product_id, user_id, created_at
            ",
        )
        .bind(quantity)
        .bind(product_id)
        .bind(user_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "product or user does not exist"))?;
        Ok(item)
    }

    /// Set the quantity of a cart item visible under `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item doesn't exist or is filtered out.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_quantity(
        &self,
        id: CartItemId,
        quantity: i32,
        filter: Option<ItemFilter>,
    ) -> Result<CartItem, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE shop.cart_items c SET quantity = ");
        qb.push_bind(quantity);
        qb.push(" WHERE c.id = ").push_bind(id);
        push_filter(&mut qb, "c", filter);
        qb.push(format!(" RETURNING {CART_ITEM_COLUMNS}"));

        qb.build_query_as::<CartItem>()
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Add one to a cart item's quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn increment(&self, id: CartItemId) -> Result<CartItem, RepositoryError> {
        sqlx::query_as::<_, CartItem>(
            r"
            UPDATE shop.cart_items
            SET quantity = quantity + 1
            WHERE id = $1
            RETURNING id, quantity, product_id, user_id, created_at
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a cart item visible under `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(
        &self,
        id: CartItemId,
        filter: Option<ItemFilter>,
    ) -> Result<bool, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM shop.cart_items c WHERE c.id = ");
        qb.push_bind(id);
        push_filter(&mut qb, "c", filter);

        let result = qb.build().execute(self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
