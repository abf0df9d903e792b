//! Seed the catalog from a YAML file.
//!
//! Photos in the file must already be hosted; only their metadata is
//! inserted.
//!
//! ```yaml
//! products:
//!   - name: Airmax 270
//!     description: Great shoes!
//!     status: AVAILABLE
//!     price: 5234
//!     photo:
//!       altText: Airmax 270
//!       publicId: cyber-1/airmax-270
//!       url: https://res.cloudinary.com/demo/image/upload/cyber-1/airmax-270.jpg
//!       format: jpg
//!       width: 1000
//!       height: 1000
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use cyber_shop_api::db::{ProductImageRepository, ProductRepository, RepositoryError};
use cyber_shop_api::models::{HostedImage, NewProduct};

use super::{ConnectError, connect};

/// Contents of a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub products: Vec<SeedProduct>,
}

/// A product and its optional photo.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    #[serde(flatten)]
    pub product: NewProduct,
    pub photo: Option<SeedPhoto>,
}

/// An already hosted photo.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedPhoto {
    #[serde(default)]
    pub alt_text: String,
    #[serde(flatten)]
    pub image: HostedImage,
}

/// Errors that can occur while seeding.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Check a seed file before touching the database.
///
/// Returns one message per problem.
#[must_use]
pub fn validate(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();
    for (index, entry) in seed.products.iter().enumerate() {
        let product = &entry.product;
        if product.name.trim().is_empty() {
            errors.push(format!("product #{}: name is required", index + 1));
        }
        if product.price.cents() < 0 {
            errors.push(format!("{}: price must not be negative", product.name));
        }
        if let Some(photo) = &entry.photo
            && photo.image.public_id.is_empty()
        {
            errors.push(format!("{}: photo needs a publicId", product.name));
        }
    }
    errors
}

/// Insert the products from `file_path`.
///
/// # Errors
///
/// Returns an error if the file can't be read or is invalid, or if a
/// database operation fails.
pub async fn products(file_path: &str, clear_existing: bool) -> Result<(), SeedError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::FileNotFound(file_path.to_owned()));
    }

    info!(path = %file_path, "Loading products from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(SeedError::Invalid(errors.len()));
    }

    let pool = connect().await?;
    let products = ProductRepository::new(&pool);
    let images = ProductImageRepository::new(&pool);

    if clear_existing {
        let removed = products.delete_all().await?;
        info!(removed, "Cleared existing products");
    }

    let mut photos = 0;
    for entry in &seed.products {
        let product = products.create(&entry.product, None).await?;
        if let Some(photo) = &entry.photo {
            images
                .create(&photo.image, &photo.alt_text, Some(product.id))
                .await?;
            photos += 1;
        }
        info!(product_id = %product.id, name = %product.name, "Inserted product");
    }

    info!("Seeding complete!");
    info!("  Products inserted: {}", seed.products.len());
    info!("  Photos inserted: {photos}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cyber_shop_core::ProductStatus;

    use super::*;

    const SAMPLE: &str = r"
products:
  - name: Airmax 270
    description: Great shoes!
    status: AVAILABLE
    price: 5234
    photo:
      altText: Airmax 270
      publicId: cyber-1/airmax-270
      url: https://res.cloudinary.com/demo/image/upload/cyber-1/airmax-270.jpg
      format: jpg
      width: 1000
      height: 1000
  - name: KITH Hoodie
    price: 23562
";

    #[test]
    fn test_parse_sample() {
        let seed: SeedFile = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(seed.products.len(), 2);

        let first = &seed.products[0];
        assert_eq!(first.product.status, ProductStatus::Available);
        assert_eq!(first.product.price.cents(), 5234);
        let photo = first.photo.as_ref().unwrap();
        assert_eq!(photo.image.public_id, "cyber-1/airmax-270");
        assert_eq!(photo.alt_text, "Airmax 270");

        let second = &seed.products[1];
        assert_eq!(second.product.status, ProductStatus::Draft);
        assert_eq!(second.product.description, "");
        assert!(second.photo.is_none());

        assert!(validate(&seed).is_empty());
    }

    #[test]
    fn test_validate_reports_each_problem() {
        let seed: SeedFile = serde_yaml::from_str(
            r"
products:
  - name: ' '
    price: 100
  - name: Refund
    price: -5
",
        )
        .unwrap();
        assert_eq!(validate(&seed).len(), 2);
    }

    #[test]
    fn test_bundled_seed_file_is_valid() {
        let content = include_str!("../../seed/products.yaml");
        let seed: SeedFile = serde_yaml::from_str(content).unwrap();
        assert!(!seed.products.is_empty());
        assert!(validate(&seed).is_empty());
    }
}
