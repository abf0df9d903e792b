//! Password reset token repository.
//!
//! Only a SHA-256 hash of each token is stored.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use cyber_shop_core::UserId;

use super::RepositoryError;

/// Repository for password reset tokens.
pub struct PasswordResetRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PasswordResetRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new token hash, invalidating the user's older tokens.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn create(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM shop.password_reset_tokens WHERE user_id = $1 AND redeemed_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO shop.password_reset_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Mark a token as redeemed, returning its user.
    ///
    /// Returns `None` if the token is unknown, expired, already redeemed, or
    /// belongs to a different user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn redeem(
        &self,
        user_id: UserId,
        token_hash: &str,
    ) -> Result<Option<UserId>, RepositoryError> {
        let row: Option<(UserId,)> = sqlx::query_as(
            r"
            UPDATE shop.password_reset_tokens
            SET redeemed_at = NOW()
            WHERE user_id = $1
              AND token_hash = $2
              AND redeemed_at IS NULL
              AND expires_at > NOW()
            RETURNING user_id
            ",
        )
        .bind(user_id)
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id,)| id))
    }

    /// Remove expired and redeemed tokens.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_stale(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM shop.password_reset_tokens WHERE expires_at < NOW() OR redeemed_at IS NOT NULL",
        )
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
