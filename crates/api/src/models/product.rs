//! Product and product image types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cyber_shop_core::{Price, ProductId, ProductImageId, ProductStatus, UserId};

/// A catalog product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub status: ProductStatus,
    pub price: Price,
    /// The user who created the product.
    pub user_id: Option<UserId>,
    /// Photo, joined from `product_images`.
    pub photo_id: Option<ProductImageId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub price: Price,
}

/// Fields accepted when updating a product.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProductStatus>,
    pub price: Option<Price>,
}

impl ProductChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.price.is_none()
    }
}

/// An image stored with the image host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HostedImage {
    /// Public id on the image host, used for transformations and deletion.
    pub public_id: String,
    /// HTTPS URL of the original upload.
    pub url: String,
    pub format: String,
    pub width: i32,
    pub height: i32,
}

/// A product photo.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub id: ProductImageId,
    #[sqlx(flatten)]
    pub image: HostedImage,
    pub alt_text: String,
    pub product_id: Option<ProductId>,
    pub created_at: DateTime<Utc>,
}
