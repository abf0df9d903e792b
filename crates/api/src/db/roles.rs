//! Role repository.

use sqlx::{PgPool, Postgres, QueryBuilder};

use cyber_shop_core::{Permission, PermissionSet, RoleId};

use super::RepositoryError;
use crate::models::{Role, User};

const ROLE_COLUMNS: &str = "id, name, can_manage_products, can_see_other_users, \
    can_manage_users, can_manage_roles, can_manage_cart, can_manage_orders";

/// Repository for roles.
///
/// Role access is all-or-nothing (`canManageRoles`), so none of these
/// methods take an access filter.
pub struct RoleRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RoleRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all roles.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Role>, RepositoryError> {
        let roles = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM shop.roles ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(roles)
    }

    /// Get a role by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: RoleId) -> Result<Option<Role>, RepositoryError> {
        let role = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM shop.roles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(role)
    }

    /// Find a role by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Role>, RepositoryError> {
        let role = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM shop.roles WHERE name = $1 ORDER BY id LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(self.pool)
        .await?;
        Ok(role)
    }

    /// Users assigned to a role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn assigned_to(&self, id: RoleId) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as::<_, User>(
            r"
            SELECT id, name, email, role_id, created_at, updated_at
            FROM shop.users
            WHERE role_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(users)
    }

    /// Create a role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        name: &str,
        permissions: PermissionSet,
    ) -> Result<Role, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO shop.roles (name");
        for permission in Permission::ALL {
            qb.push(", ").push(permission.column());
        }
        qb.push(") VALUES (").push_bind(name.to_owned());
        for permission in Permission::ALL {
            qb.push(", ").push_bind(permissions.has(permission));
        }
        qb.push(format!(") RETURNING {ROLE_COLUMNS}"));

        Ok(qb.build_query_as::<Role>().fetch_one(self.pool).await?)
    }

    /// Rename a role and/or change its permissions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the role doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: RoleId,
        name: Option<String>,
        permissions: Option<PermissionSet>,
    ) -> Result<Role, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE shop.roles SET id = id");
        if let Some(name) = name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(permissions) = permissions {
            for permission in Permission::ALL {
                qb.push(format!(", {} = ", permission.column()))
                    .push_bind(permissions.has(permission));
            }
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {ROLE_COLUMNS}"));

        qb.build_query_as::<Role>()
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a role. Users holding it are left without a role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: RoleId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.roles WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
