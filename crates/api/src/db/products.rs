//! Product repository.

use sqlx::{PgPool, Postgres, QueryBuilder};

use cyber_shop_core::{ProductId, UserId};

use super::{RepositoryError, push_filter};
use crate::access::ItemFilter;
use crate::models::Product;
use crate::models::product::{NewProduct, ProductChanges};

const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.name, p.description, p.status, p.price, p.user_id,
           pi.id AS photo_id, p.created_at, p.updated_at
    FROM shop.products p
    LEFT JOIN shop.product_images pi ON pi.product_id = p.id
";

/// Repository for products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products visible under `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: Option<ItemFilter>) -> Result<Vec<Product>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        qb.push(" WHERE TRUE");
        push_filter(&mut qb, "p", filter);
        qb.push(" ORDER BY p.id DESC");

        Ok(qb.build_query_as::<Product>().fetch_all(self.pool).await?)
    }

    /// Get a product if it is visible under `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: ProductId,
        filter: Option<ItemFilter>,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        qb.push(" WHERE p.id = ").push_bind(id);
        push_filter(&mut qb, "p", filter);

        Ok(qb.build_query_as::<Product>().fetch_optional(self.pool).await?)
    }

    /// Create a product owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        product: &NewProduct,
        owner: Option<UserId>,
    ) -> Result<Product, RepositoryError> {
        let (id,): (ProductId,) = sqlx::query_as(
            r"
            INSERT INTO shop.products (name, description, status, price, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.status)
        .bind(product.price)
        .bind(owner)
        .fetch_one(self.pool)
        .await?;

        self.get(id, None)
            .await?
            .ok_or_else(|| RepositoryError::DataCorruption(format!("product {id} vanished after insert")))
    }

    /// Update a product visible under `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist or is filtered out.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ProductId,
        changes: ProductChanges,
        filter: Option<ItemFilter>,
    ) -> Result<Product, RepositoryError> {
        if changes.is_empty() {
            return self.get(id, filter).await?.ok_or(RepositoryError::NotFound);
        }

        let mut qb =
            QueryBuilder::<Postgres>::new("UPDATE shop.products p SET updated_at = NOW()");
        if let Some(name) = changes.name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(description) = changes.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(status) = changes.status {
            qb.push(", status = ").push_bind(status);
        }
        if let Some(price) = changes.price {
            qb.push(", price = ").push_bind(price);
        }
        qb.push(" WHERE p.id = ").push_bind(id);
        push_filter(&mut qb, "p", filter);
        qb.push(" RETURNING p.id");

        let updated = qb
            .build_query_as::<(ProductId,)>()
            .fetch_optional(self.pool)
            .await?;
        if updated.is_none() {
            return Err(RepositoryError::NotFound);
        }

        self.get(id, None).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a product visible under `filter`.
    ///
    /// Cart items pointing at it keep an empty product reference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(
        &self,
        id: ProductId,
        filter: Option<ItemFilter>,
    ) -> Result<bool, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM shop.products p WHERE p.id = ");
        qb.push_bind(id);
        push_filter(&mut qb, "p", filter);

        let result = qb.build().execute(self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every product. Used when reseeding.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.products")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
