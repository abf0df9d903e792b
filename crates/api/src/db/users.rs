//! User repository for database operations.

use sqlx::{PgPool, Postgres, QueryBuilder};

use cyber_shop_core::{Email, PermissionSet, RoleId, UserId};

use super::{RepositoryError, push_filter};
use crate::access::ItemFilter;
use crate::models::user::{User, UserChanges};

const USER_COLUMNS: &str = "u.id, u.name, u.email, u.role_id, u.created_at, u.updated_at";

/// Role columns for a user, `NULL` when the user has no role.
#[derive(sqlx::FromRow)]
struct PermissionRow {
    role_id: Option<RoleId>,
    can_manage_products: Option<bool>,
    can_see_other_users: Option<bool>,
    can_manage_users: Option<bool>,
    can_manage_roles: Option<bool>,
    can_manage_cart: Option<bool>,
    can_manage_orders: Option<bool>,
}

impl PermissionRow {
    fn into_permissions(self) -> Option<PermissionSet> {
        self.role_id?;
        Some(PermissionSet {
            can_manage_products: self.can_manage_products.unwrap_or(false),
            can_see_other_users: self.can_see_other_users.unwrap_or(false),
            can_manage_users: self.can_manage_users.unwrap_or(false),
            can_manage_roles: self.can_manage_roles.unwrap_or(false),
            can_manage_cart: self.can_manage_cart.unwrap_or(false),
            can_manage_orders: self.can_manage_orders.unwrap_or(false),
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserWithPasswordRow {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Number of users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shop.users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// List users visible under `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: Option<ItemFilter>) -> Result<Vec<User>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {USER_COLUMNS} FROM shop.users u WHERE TRUE"
        ));
        push_filter(&mut qb, "u", filter);
        qb.push(" ORDER BY u.id");

        Ok(qb.build_query_as::<User>().fetch_all(self.pool).await?)
    }

    /// Get a user by ID if it is visible under `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: UserId,
        filter: Option<ItemFilter>,
    ) -> Result<Option<User>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {USER_COLUMNS} FROM shop.users u WHERE u.id = "
        ));
        qb.push_bind(id);
        push_filter(&mut qb, "u", filter);

        Ok(qb.build_query_as::<User>().fetch_optional(self.pool).await?)
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM shop.users u WHERE u.email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user and their password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithPasswordRow>(&format!(
            "SELECT {USER_COLUMNS}, u.password_hash FROM shop.users u WHERE u.email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| (r.user, r.password_hash)))
    }

    /// Load a user together with their role's permissions.
    ///
    /// The inner `Option` is `None` when the user has no role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_permissions(
        &self,
        id: UserId,
    ) -> Result<Option<(User, Option<PermissionSet>)>, RepositoryError> {
        let Some(user) = self.get(id, None).await? else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, PermissionRow>(
            r"
            SELECT r.id AS role_id,
                   r.can_manage_products, r.can_see_other_users, r.can_manage_users,
                   r.can_manage_roles, r.can_manage_cart, r.can_manage_orders
            FROM shop.users u
            LEFT JOIN shop.roles r ON r.id = u.role_id
            WHERE u.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let permissions = row.and_then(PermissionRow::into_permissions);
        Ok(Some((user, permissions)))
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or email is taken, or
    /// the role does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
        role_id: Option<RoleId>,
    ) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r"
            INSERT INTO shop.users (name, email, password_hash, role_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, role_id, created_at, updated_at
            ",
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "a user with that name or email already exists"))?;

        Ok(user)
    }

    /// Update a user visible under `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist or is filtered out.
    /// Returns `RepositoryError::Conflict` on a duplicate name or email.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: UserId,
        changes: UserChanges,
        filter: Option<ItemFilter>,
    ) -> Result<User, RepositoryError> {
        if changes.is_empty() {
            return self.get(id, filter).await?.ok_or(RepositoryError::NotFound);
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE shop.users u SET updated_at = NOW()");
        if let Some(name) = changes.name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(email) = changes.email {
            qb.push(", email = ").push_bind(email);
        }
        if let Some(hash) = changes.password_hash {
            qb.push(", password_hash = ").push_bind(hash);
        }
        if let Some(role_id) = changes.role_id {
            qb.push(", role_id = ").push_bind(role_id);
        }
        qb.push(" WHERE u.id = ").push_bind(id);
        push_filter(&mut qb, "u", filter);
        qb.push(format!(" RETURNING {USER_COLUMNS}"));

        qb.build_query_as::<User>()
            .fetch_optional(self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "a user with that name or email already exists"))?
            .ok_or(RepositoryError::NotFound)
    }

    /// Set a new password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.users SET password_hash = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(password_hash)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Delete a user.
    ///
    /// Their cart goes with them; orders and products are kept with an empty
    /// owner.
    ///
    /// # Returns
    ///
    /// Returns `true` if the user was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role_id: Option<i32>) -> PermissionRow {
        PermissionRow {
            role_id: role_id.map(RoleId::new),
            can_manage_products: role_id.map(|_| true),
            can_see_other_users: role_id.map(|_| false),
            can_manage_users: role_id.map(|_| false),
            can_manage_roles: role_id.map(|_| false),
            can_manage_cart: role_id.map(|_| true),
            can_manage_orders: role_id.map(|_| false),
        }
    }

    #[test]
    fn test_no_role_means_no_permission_set() {
        assert_eq!(row(None).into_permissions(), None);
    }

    #[test]
    fn test_role_columns_become_permission_set() {
        let permissions = row(Some(2)).into_permissions();
        assert_eq!(
            permissions,
            Some(PermissionSet {
                can_manage_products: true,
                can_manage_cart: true,
                ..PermissionSet::default()
            })
        );
    }
}
