//! Status enums for shop entities.

use serde::{Deserialize, Serialize};

/// Publication status of a product.
///
/// Shoppers without the `canManageProducts` permission only ever see
/// `Available` products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.product_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    /// Not yet published.
    #[default]
    Draft,
    /// Listed in the shop.
    Available,
    /// Listed but not purchasable (sold out, discontinued).
    Unavailable,
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "DRAFT"),
            Self::Available => write!(f, "AVAILABLE"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_draft() {
        assert_eq!(ProductStatus::default(), ProductStatus::Draft);
    }

    #[test]
    fn test_display_matches_serde() {
        for status in [
            ProductStatus::Draft,
            ProductStatus::Available,
            ProductStatus::Unavailable,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }

    #[test]
    fn test_serde_uses_screaming_case() {
        let json = serde_json::to_string(&ProductStatus::Available).unwrap();
        assert_eq!(json, "\"AVAILABLE\"");
    }
}
