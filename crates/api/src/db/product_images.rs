//! Product image repository.

use sqlx::{PgPool, Postgres, QueryBuilder};

use cyber_shop_core::{ProductId, ProductImageId};

use super::RepositoryError;
use crate::models::{HostedImage, ProductImage};

const IMAGE_COLUMNS: &str =
    "id, public_id, url, format, width, height, alt_text, product_id, created_at";

/// Repository for product images.
pub struct ProductImageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductImageRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<ProductImage>, RepositoryError> {
        let images = sqlx::query_as::<_, ProductImage>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM shop.product_images ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(images)
    }

    /// Get an image by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductImageId) -> Result<Option<ProductImage>, RepositoryError> {
        let image = sqlx::query_as::<_, ProductImage>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM shop.product_images WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(image)
    }

    /// Record an uploaded image, optionally attached to a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product already has a photo
    /// or doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        image: &HostedImage,
        alt_text: &str,
        product_id: Option<ProductId>,
    ) -> Result<ProductImage, RepositoryError> {
        let image = sqlx::query_as::<_, ProductImage>(&format!(
            r"
            INSERT INTO shop.product_images (public_id, url, format, width, height, alt_text, product_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {IMAGE_COLUMNS}
            "
        ))
        .bind(&image.public_id)
        .bind(&image.url)
        .bind(&image.format)
        .bind(image.width)
        .bind(image.height)
        .bind(alt_text)
        .bind(product_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "product already has a photo or does not exist"))?;

        Ok(image)
    }

    /// Change the alt text and/or the product an image belongs to.
    ///
    /// `Some(None)` for `product_id` detaches the image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image doesn't exist.
    /// Returns `RepositoryError::Conflict` if the target product already has a photo.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ProductImageId,
        alt_text: Option<String>,
        product_id: Option<Option<ProductId>>,
    ) -> Result<ProductImage, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE shop.product_images SET id = id");
        if let Some(alt_text) = alt_text {
            qb.push(", alt_text = ").push_bind(alt_text);
        }
        if let Some(product_id) = product_id {
            qb.push(", product_id = ").push_bind(product_id);
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {IMAGE_COLUMNS}"));

        qb.build_query_as::<ProductImage>()
            .fetch_optional(self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "product already has a photo or does not exist"))?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete an image record, returning it so the hosted file can be removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductImageId) -> Result<Option<ProductImage>, RepositoryError> {
        let image = sqlx::query_as::<_, ProductImage>(&format!(
            "DELETE FROM shop.product_images WHERE id = $1 RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(image)
    }
}
