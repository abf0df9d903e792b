//! Access control.
//!
//! Every list (users, roles, products, ...) declares who may create, read,
//! update and delete its items. A decision is one of:
//!
//! - [`Access::Denied`] - the operation is refused outright
//! - [`Access::Granted`] - the operation applies to every item
//! - [`Access::Filtered`] - the operation only applies to items matching an
//!   [`ItemFilter`], which the repositories turn into a `WHERE` clause
//!
//! Decisions are pure functions of the request's [`AccessSession`]
//! (`None` when signed out).
//!
//! # Rules vs. permissions
//!
//! A *permission* is a checkbox on the user's role. A *rule* checks the
//! permission first and otherwise falls back to an ownership filter, so a
//! shopper without `canManageProducts` can still edit the products they
//! created.

use cyber_shop_core::{Email, Permission, PermissionSet, ProductStatus, UserId};
use serde::Serialize;

/// The identity and role data an access decision is made from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessSession {
    /// ID of the signed-in user.
    pub item_id: UserId,
    /// Display name of the signed-in user.
    pub name: String,
    /// Email of the signed-in user.
    pub email: Email,
    /// Permissions of the user's role, `None` when they have no role.
    pub role: Option<PermissionSet>,
}

impl AccessSession {
    /// Permissions granted to this session (empty without a role).
    #[must_use]
    pub fn permissions(&self) -> PermissionSet {
        self.role.unwrap_or_default()
    }
}

/// Restricts an operation to a subset of a list's items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFilter {
    /// Items whose `user` is the given user.
    OwnedBy(UserId),
    /// Order items whose order belongs to the given user.
    OrderOwnedBy(UserId),
    /// Products with the given status.
    Status(ProductStatus),
    /// The user item itself.
    IsUser(UserId),
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Denied,
    Granted,
    Filtered(ItemFilter),
}

/// Returned when an operation is denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("You do not have access to this resource")]
pub struct AccessDenied;

impl Access {
    /// Convert into the filter repositories should apply.
    ///
    /// `Ok(None)` means unrestricted.
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` when the decision is [`Access::Denied`].
    pub const fn into_scope(self) -> Result<Option<ItemFilter>, AccessDenied> {
        match self {
            Self::Denied => Err(AccessDenied),
            Self::Granted => Ok(None),
            Self::Filtered(filter) => Ok(Some(filter)),
        }
    }

    const fn from_bool(allowed: bool) -> Self {
        if allowed { Self::Granted } else { Self::Denied }
    }
}

/// The lists access is declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum List {
    User,
    Role,
    Product,
    ProductImage,
    CartItem,
    Order,
    OrderItem,
}

/// CRUD operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

// =============================================================================
// Predicates
// =============================================================================

/// Whether the request carries a session.
#[must_use]
pub const fn is_signed_in(session: Option<&AccessSession>) -> bool {
    session.is_some()
}

/// Whether the session's role grants `permission`.
///
/// Always false when signed out or without a role.
#[must_use]
pub fn has_permission(session: Option<&AccessSession>, permission: Permission) -> bool {
    session
        .and_then(|s| s.role)
        .is_some_and(|role| role.has(permission))
}

// =============================================================================
// Rules
// =============================================================================

/// Rules combine a permission check with an ownership fallback.
pub mod rules {
    use super::{Access, AccessSession, ItemFilter, Permission, ProductStatus, has_permission};

    /// Update and delete products: everything with `canManageProducts`,
    /// otherwise only products the user created.
    #[must_use]
    pub fn can_manage_products(session: Option<&AccessSession>) -> Access {
        let Some(s) = session else {
            return Access::Denied;
        };
        if has_permission(session, Permission::CanManageProducts) {
            return Access::Granted;
        }
        Access::Filtered(ItemFilter::OwnedBy(s.item_id))
    }

    /// Cart items and orders: everything with `canManageCart`, otherwise
    /// only the user's own.
    #[must_use]
    pub fn can_order(session: Option<&AccessSession>) -> Access {
        let Some(s) = session else {
            return Access::Denied;
        };
        if has_permission(session, Permission::CanManageCart) {
            return Access::Granted;
        }
        Access::Filtered(ItemFilter::OwnedBy(s.item_id))
    }

    /// Order items have no user of their own, so ownership goes through the order.
    #[must_use]
    pub fn can_manage_order_items(session: Option<&AccessSession>) -> Access {
        let Some(s) = session else {
            return Access::Denied;
        };
        if has_permission(session, Permission::CanManageCart) {
            return Access::Granted;
        }
        Access::Filtered(ItemFilter::OrderOwnedBy(s.item_id))
    }

    /// Product managers see every product, shoppers only available ones.
    #[must_use]
    pub fn can_read_products(session: Option<&AccessSession>) -> Access {
        if session.is_none() {
            return Access::Denied;
        }
        if has_permission(session, Permission::CanManageProducts) {
            return Access::Granted;
        }
        Access::Filtered(ItemFilter::Status(ProductStatus::Available))
    }

    /// Users may read and update themselves; `canManageUsers` opens up everyone.
    #[must_use]
    pub fn can_manage_users(session: Option<&AccessSession>) -> Access {
        let Some(s) = session else {
            return Access::Denied;
        };
        if has_permission(session, Permission::CanManageUsers) {
            return Access::Granted;
        }
        Access::Filtered(ItemFilter::IsUser(s.item_id))
    }
}

// =============================================================================
// Access table
// =============================================================================

/// How a single (list, operation) pair is guarded.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// No session required.
    Anyone,
    /// Any signed-in user.
    SignedIn,
    /// The role must grant this permission.
    Permission(Permission),
    /// A rule function that may return a filter.
    Custom(fn(Option<&AccessSession>) -> Access),
    /// Not allowed for anyone.
    Never,
}

impl Rule {
    /// Evaluate the rule for a session.
    #[must_use]
    pub fn evaluate(self, session: Option<&AccessSession>) -> Access {
        match self {
            Self::Anyone => Access::Granted,
            Self::SignedIn => Access::from_bool(is_signed_in(session)),
            Self::Permission(p) => Access::from_bool(has_permission(session, p)),
            Self::Custom(rule) => rule(session),
            Self::Never => Access::Denied,
        }
    }
}

/// The access table: which rule guards `operation` on `list`.
#[must_use]
pub const fn list_access(list: List, operation: Operation) -> Rule {
    use Operation::{Create, Delete, Read, Update};

    match (list, operation) {
        (List::User, Create) => Rule::Anyone,
        (List::User, Read | Update) => Rule::Custom(rules::can_manage_users),
        (List::User, Delete) => Rule::Permission(Permission::CanManageUsers),

        (List::Role, _) => Rule::Permission(Permission::CanManageRoles),

        (List::Product, Read) => Rule::Custom(rules::can_read_products),
        (List::Product, Update | Delete) => Rule::Custom(rules::can_manage_products),

        (List::ProductImage, Read) => Rule::Anyone,
        (List::ProductImage, Update | Delete) => Rule::Permission(Permission::CanManageProducts),

        (List::CartItem, Read | Update | Delete) | (List::Order, Read) => {
            Rule::Custom(rules::can_order)
        }
        (List::OrderItem, Read) => Rule::Custom(rules::can_manage_order_items),
        (List::Order | List::OrderItem, Update | Delete) => Rule::Never,

        (
            List::Product | List::ProductImage | List::CartItem | List::Order | List::OrderItem,
            Create,
        ) => Rule::SignedIn,
    }
}

/// Decide whether `session` may perform `operation` on `list`.
#[must_use]
pub fn check(list: List, operation: Operation, session: Option<&AccessSession>) -> Access {
    list_access(list, operation).evaluate(session)
}

/// Whether `session` may set the `role` field of a user.
#[must_use]
pub fn can_assign_role(session: Option<&AccessSession>) -> bool {
    has_permission(session, Permission::CanManageUsers)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn shopper(id: i32) -> AccessSession {
        AccessSession {
            item_id: UserId::new(id),
            name: "Wes".to_string(),
            email: Email::parse("wes@example.com").unwrap(),
            role: None,
        }
    }

    fn with_permissions(id: i32, permissions: &[Permission]) -> AccessSession {
        AccessSession {
            role: Some(permissions.iter().copied().collect()),
            ..shopper(id)
        }
    }

    #[test]
    fn test_signed_out_has_no_permissions() {
        assert!(!is_signed_in(None));
        for permission in Permission::ALL {
            assert!(!has_permission(None, permission));
        }
    }

    #[test]
    fn test_roleless_user_has_no_permissions() {
        let session = shopper(1);
        assert!(is_signed_in(Some(&session)));
        assert!(!has_permission(Some(&session), Permission::CanManageCart));
    }

    #[test]
    fn test_rules_deny_signed_out() {
        assert_eq!(rules::can_manage_products(None), Access::Denied);
        assert_eq!(rules::can_order(None), Access::Denied);
        assert_eq!(rules::can_manage_order_items(None), Access::Denied);
        assert_eq!(rules::can_read_products(None), Access::Denied);
        assert_eq!(rules::can_manage_users(None), Access::Denied);
    }

    #[test]
    fn test_rules_fall_back_to_ownership() {
        let session = shopper(7);
        let me = UserId::new(7);
        assert_eq!(
            rules::can_manage_products(Some(&session)),
            Access::Filtered(ItemFilter::OwnedBy(me))
        );
        assert_eq!(
            rules::can_order(Some(&session)),
            Access::Filtered(ItemFilter::OwnedBy(me))
        );
        assert_eq!(
            rules::can_manage_order_items(Some(&session)),
            Access::Filtered(ItemFilter::OrderOwnedBy(me))
        );
        assert_eq!(
            rules::can_read_products(Some(&session)),
            Access::Filtered(ItemFilter::Status(ProductStatus::Available))
        );
        assert_eq!(
            rules::can_manage_users(Some(&session)),
            Access::Filtered(ItemFilter::IsUser(me))
        );
    }

    #[test]
    fn test_rules_grant_with_permission() {
        let products = with_permissions(1, &[Permission::CanManageProducts]);
        assert_eq!(rules::can_manage_products(Some(&products)), Access::Granted);
        assert_eq!(rules::can_read_products(Some(&products)), Access::Granted);

        let cart = with_permissions(1, &[Permission::CanManageCart]);
        assert_eq!(rules::can_order(Some(&cart)), Access::Granted);
        assert_eq!(rules::can_manage_order_items(Some(&cart)), Access::Granted);

        let users = with_permissions(1, &[Permission::CanManageUsers]);
        assert_eq!(rules::can_manage_users(Some(&users)), Access::Granted);
    }

    #[test]
    fn test_manage_orders_does_not_open_carts() {
        // Orders and carts are both governed by canManageCart
        let session = with_permissions(3, &[Permission::CanManageOrders]);
        assert_eq!(
            rules::can_order(Some(&session)),
            Access::Filtered(ItemFilter::OwnedBy(UserId::new(3)))
        );
    }

    #[test]
    fn test_anyone_can_sign_up() {
        assert_eq!(check(List::User, Operation::Create, None), Access::Granted);
    }

    #[test]
    fn test_signed_out_cannot_create_products() {
        assert_eq!(check(List::Product, Operation::Create, None), Access::Denied);
        assert_eq!(
            check(List::Product, Operation::Create, Some(&shopper(1))),
            Access::Granted
        );
    }

    #[test]
    fn test_user_delete_needs_permission() {
        assert_eq!(
            check(List::User, Operation::Delete, Some(&shopper(1))),
            Access::Denied
        );
        let admin = with_permissions(1, &[Permission::CanManageUsers]);
        assert_eq!(
            check(List::User, Operation::Delete, Some(&admin)),
            Access::Granted
        );
    }

    #[test]
    fn test_roles_need_manage_roles() {
        let admin = with_permissions(1, &[Permission::CanManageRoles]);
        for op in [
            Operation::Create,
            Operation::Read,
            Operation::Update,
            Operation::Delete,
        ] {
            assert_eq!(check(List::Role, op, Some(&shopper(1))), Access::Denied);
            assert_eq!(check(List::Role, op, Some(&admin)), Access::Granted);
        }
    }

    #[test]
    fn test_product_images_are_public_to_read() {
        assert_eq!(check(List::ProductImage, Operation::Read, None), Access::Granted);
        assert_eq!(
            check(List::ProductImage, Operation::Update, Some(&shopper(1))),
            Access::Denied
        );
    }

    #[test]
    fn test_orders_are_immutable() {
        let admin = AccessSession {
            role: Some(PermissionSet::all()),
            ..shopper(1)
        };
        for list in [List::Order, List::OrderItem] {
            assert_eq!(check(list, Operation::Update, Some(&admin)), Access::Denied);
            assert_eq!(check(list, Operation::Delete, Some(&admin)), Access::Denied);
        }
    }

    #[test]
    fn test_every_pair_has_a_rule() {
        let lists = [
            List::User,
            List::Role,
            List::Product,
            List::ProductImage,
            List::CartItem,
            List::Order,
            List::OrderItem,
        ];
        let ops = [
            Operation::Create,
            Operation::Read,
            Operation::Update,
            Operation::Delete,
        ];
        // Only sign-up and image reads are open to signed-out visitors
        for list in lists {
            for op in ops {
                let open = matches!(
                    (list, op),
                    (List::User, Operation::Create) | (List::ProductImage, Operation::Read)
                );
                assert_eq!(check(list, op, None) != Access::Denied, open, "{list:?} {op:?}");
            }
        }
    }

    #[test]
    fn test_into_scope() {
        assert_eq!(Access::Denied.into_scope(), Err(AccessDenied));
        assert_eq!(Access::Granted.into_scope(), Ok(None));
        let filter = ItemFilter::OwnedBy(UserId::new(1));
        assert_eq!(Access::Filtered(filter).into_scope(), Ok(Some(filter)));
    }

    #[test]
    fn test_can_assign_role() {
        assert!(!can_assign_role(None));
        assert!(!can_assign_role(Some(&shopper(1))));
        let admin = with_permissions(1, &[Permission::CanManageUsers]);
        assert!(can_assign_role(Some(&admin)));
    }
}
