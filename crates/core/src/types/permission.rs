//! Role permissions.
//!
//! A role is a named set of permission flags. Each flag maps to one boolean
//! column on the role table and one checkbox when editing a role.

use serde::{Deserialize, Serialize};

/// A single permission a role can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    CanManageProducts,
    CanSeeOtherUsers,
    CanManageUsers,
    CanManageRoles,
    CanManageCart,
    CanManageOrders,
}

impl Permission {
    /// Every permission, in display order.
    pub const ALL: [Self; 6] = [
        Self::CanManageProducts,
        Self::CanSeeOtherUsers,
        Self::CanManageUsers,
        Self::CanManageRoles,
        Self::CanManageCart,
        Self::CanManageOrders,
    ];

    /// Field name used in the API and the role editor.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::CanManageProducts => "canManageProducts",
            Self::CanSeeOtherUsers => "canSeeOtherUsers",
            Self::CanManageUsers => "canManageUsers",
            Self::CanManageRoles => "canManageRoles",
            Self::CanManageCart => "canManageCart",
            Self::CanManageOrders => "canManageOrders",
        }
    }

    /// Checkbox label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::CanManageProducts => "User can Update and delete any product",
            Self::CanSeeOtherUsers => "User can query other users",
            Self::CanManageUsers => "User can Edit other users",
            Self::CanManageRoles => "User can CRUD roles",
            Self::CanManageCart => "User can see and manage cart and cart items",
            Self::CanManageOrders => "User can see and manage orders",
        }
    }

    /// Column name on the role table.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::CanManageProducts => "can_manage_products",
            Self::CanSeeOtherUsers => "can_see_other_users",
            Self::CanManageUsers => "can_manage_users",
            Self::CanManageRoles => "can_manage_roles",
            Self::CanManageCart => "can_manage_cart",
            Self::CanManageOrders => "can_manage_orders",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// The permission flags of a role. All flags default to `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionSet {
    pub can_manage_products: bool,
    pub can_see_other_users: bool,
    pub can_manage_users: bool,
    pub can_manage_roles: bool,
    pub can_manage_cart: bool,
    pub can_manage_orders: bool,
}

impl PermissionSet {
    /// A set with every permission granted.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            can_manage_products: true,
            can_see_other_users: true,
            can_manage_users: true,
            can_manage_roles: true,
            can_manage_cart: true,
            can_manage_orders: true,
        }
    }

    /// Whether the set grants `permission`.
    #[must_use]
    pub const fn has(&self, permission: Permission) -> bool {
        match permission {
            Permission::CanManageProducts => self.can_manage_products,
            Permission::CanSeeOtherUsers => self.can_see_other_users,
            Permission::CanManageUsers => self.can_manage_users,
            Permission::CanManageRoles => self.can_manage_roles,
            Permission::CanManageCart => self.can_manage_cart,
            Permission::CanManageOrders => self.can_manage_orders,
        }
    }

    /// Grant or revoke a single permission.
    pub const fn set(&mut self, permission: Permission, granted: bool) {
        match permission {
            Permission::CanManageProducts => self.can_manage_products = granted,
            Permission::CanSeeOtherUsers => self.can_see_other_users = granted,
            Permission::CanManageUsers => self.can_manage_users = granted,
            Permission::CanManageRoles => self.can_manage_roles = granted,
            Permission::CanManageCart => self.can_manage_cart = granted,
            Permission::CanManageOrders => self.can_manage_orders = granted,
        }
    }

    /// Iterate over the granted permissions.
    pub fn granted(&self) -> impl Iterator<Item = Permission> + '_ {
        Permission::ALL.into_iter().filter(|p| self.has(*p))
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut set = Self::default();
        for permission in iter {
            set.set(permission, true);
        }
        set
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grants_nothing() {
        let set = PermissionSet::default();
        assert!(Permission::ALL.iter().all(|p| !set.has(*p)));
        assert_eq!(set.granted().count(), 0);
    }

    #[test]
    fn test_all_grants_everything() {
        let set = PermissionSet::all();
        assert_eq!(set.granted().collect::<Vec<_>>(), Permission::ALL.to_vec());
    }

    #[test]
    fn test_from_iter() {
        let set: PermissionSet = [Permission::CanManageCart, Permission::CanManageRoles]
            .into_iter()
            .collect();
        assert!(set.has(Permission::CanManageCart));
        assert!(set.has(Permission::CanManageRoles));
        assert!(!set.has(Permission::CanManageUsers));
    }

    #[test]
    fn test_serde_field_names_match_keys() {
        let json = serde_json::to_value(PermissionSet::all()).unwrap();
        for permission in Permission::ALL {
            assert_eq!(json[permission.key()], serde_json::Value::Bool(true));
        }
    }

    #[test]
    fn test_missing_fields_default_to_false() {
        let set: PermissionSet = serde_json::from_str(r#"{"canManageUsers": true}"#).unwrap();
        assert!(set.has(Permission::CanManageUsers));
        assert!(!set.has(Permission::CanManageProducts));
    }
}
