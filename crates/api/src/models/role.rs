//! Role domain types.

use serde::Serialize;

use cyber_shop_core::{PermissionSet, RoleId};

/// A named set of permissions assigned to users.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub permissions: PermissionSet,
}

/// Name of the role granted to the first user.
pub const ADMIN_ROLE_NAME: &str = "Admin";
