//! Database operations for the shop `PostgreSQL` database.
//!
//! # Schema: `shop`
//!
//! ## Tables
//!
//! - `roles` - Named permission sets
//! - `users` - Shoppers and staff, with argon2 password hashes
//! - `password_reset_tokens` - Hashed single-use reset tokens
//! - `products` - Catalog entries owned by the user who created them
//! - `product_images` - Cloudinary-hosted product photos
//! - `cart_items` - Per-user cart lines
//! - `orders` / `order_items` - Paid orders with product snapshots
//! - `tower_sessions.session` - Session storage (managed by the store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p cyber-shop-cli -- migrate
//! ```
//!
//! # Access filters
//!
//! Reads, updates and deletes take an optional [`ItemFilter`] computed by
//! [`crate::access`]. Repositories append it to their `WHERE` clause with
//! [`push_filter`], so a filtered-out item is indistinguishable from a
//! missing one.

pub mod cart_items;
pub mod orders;
pub mod password_resets;
pub mod product_images;
pub mod products;
pub mod roles;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;

use crate::access::ItemFilter;

pub use cart_items::CartItemRepository;
pub use orders::OrderRepository;
pub use password_resets::PasswordResetRepository;
pub use product_images::ProductImageRepository;
pub use products::ProductRepository;
pub use roles::RoleRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique and foreign key violations to [`RepositoryError::Conflict`].
    pub(crate) fn from_constraint(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Append ` AND <condition>` for an access filter.
///
/// `alias` is the table alias the filtered columns belong to. The query must
/// already have a `WHERE` clause.
pub(crate) fn push_filter(
    qb: &mut QueryBuilder<'_, Postgres>,
    alias: &str,
    filter: Option<ItemFilter>,
) {
    let Some(filter) = filter else {
        return;
    };

    match filter {
        ItemFilter::OwnedBy(user_id) => {
            qb.push(format!(" AND {alias}.user_id = "));
            qb.push_bind(user_id);
        }
        ItemFilter::OrderOwnedBy(user_id) => {
            qb.push(format!(
                " AND {alias}.order_id IN (SELECT o.id FROM shop.orders o WHERE o.user_id = "
            ));
            qb.push_bind(user_id);
            qb.push(")");
        }
        ItemFilter::Status(status) => {
            qb.push(format!(" AND {alias}.status = "));
            qb.push_bind(status);
        }
        ItemFilter::IsUser(user_id) => {
            qb.push(format!(" AND {alias}.id = "));
            qb.push_bind(user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use cyber_shop_core::{ProductStatus, UserId};

    use super::*;

    fn render(alias: &str, filter: Option<ItemFilter>) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM t WHERE TRUE");
        push_filter(&mut qb, alias, filter);
        qb.sql().to_owned()
    }

    #[test]
    fn test_no_filter_leaves_query_untouched() {
        assert_eq!(render("p", None), "SELECT * FROM t WHERE TRUE");
    }

    #[test]
    fn test_owned_by() {
        let sql = render("c", Some(ItemFilter::OwnedBy(UserId::new(4))));
        assert_eq!(sql, "SELECT * FROM t WHERE TRUE AND c.user_id = $1");
    }

    #[test]
    fn test_order_owned_by_uses_subquery() {
        let sql = render("oi", Some(ItemFilter::OrderOwnedBy(UserId::new(4))));
        assert!(sql.contains("oi.order_id IN (SELECT o.id FROM shop.orders o WHERE o.user_id = $1)"));
    }

    #[test]
    fn test_status_and_is_user() {
        let sql = render("p", Some(ItemFilter::Status(ProductStatus::Available)));
        assert!(sql.ends_with("AND p.status = $1"));
        let sql = render("u", Some(ItemFilter::IsUser(UserId::new(1))));
        assert!(sql.ends_with("AND u.id = $1"));
    }
}
