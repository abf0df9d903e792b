//! The access table and checkout math through the public API of the crates.

#![allow(clippy::unwrap_used)]

use cyber_shop_api::access::{
    Access, AccessSession, ItemFilter, List, Operation, can_assign_role, check,
};
use cyber_shop_api::models::{CartLine, CartProduct};
use cyber_shop_api::services::checkout::{cart_total, order_items_from_cart};
use cyber_shop_core::{
    CartItemId, Email, Permission, PermissionSet, Price, ProductId, ProductStatus, UserId,
};

fn session(id: i32, permissions: &[Permission]) -> AccessSession {
    AccessSession {
        item_id: UserId::new(id),
        name: format!("user{id}"),
        email: Email::parse(&format!("user{id}@example.org")).unwrap(),
        role: Some(permissions.iter().copied().collect()),
    }
}

fn line(id: i32, quantity: i32, price: Option<i64>) -> CartLine {
    CartLine {
        id: CartItemId::new(id),
        quantity,
        product: price.map(|cents| CartProduct {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price: Price::from_cents(cents),
            photo_id: None,
        }),
    }
}

#[test]
fn test_shopper_sees_only_available_products() {
    let shopper = session(7, &[]);
    assert_eq!(
        check(List::Product, Operation::Read, Some(&shopper)),
        Access::Filtered(ItemFilter::Status(ProductStatus::Available))
    );
}

#[test]
fn test_shopper_manages_only_own_products_and_cart() {
    let shopper = session(7, &[]);
    let own = Access::Filtered(ItemFilter::OwnedBy(UserId::new(7)));

    assert_eq!(check(List::Product, Operation::Update, Some(&shopper)), own);
    assert_eq!(check(List::Product, Operation::Delete, Some(&shopper)), own);
    assert_eq!(check(List::CartItem, Operation::Read, Some(&shopper)), own);
    assert_eq!(check(List::Order, Operation::Read, Some(&shopper)), own);
    assert_eq!(
        check(List::OrderItem, Operation::Read, Some(&shopper)),
        Access::Filtered(ItemFilter::OrderOwnedBy(UserId::new(7)))
    );
    assert_eq!(
        check(List::User, Operation::Update, Some(&shopper)),
        Access::Filtered(ItemFilter::IsUser(UserId::new(7)))
    );
}

#[test]
fn test_staff_permissions_lift_filters() {
    let staff = session(
        1,
        &[
            Permission::CanManageProducts,
            Permission::CanManageCart,
            Permission::CanManageUsers,
        ],
    );

    assert_eq!(check(List::Product, Operation::Read, Some(&staff)), Access::Granted);
    assert_eq!(check(List::CartItem, Operation::Delete, Some(&staff)), Access::Granted);
    assert_eq!(check(List::OrderItem, Operation::Read, Some(&staff)), Access::Granted);
    assert_eq!(check(List::User, Operation::Read, Some(&staff)), Access::Granted);
    assert!(can_assign_role(Some(&staff)));
}

#[test]
fn test_orders_are_never_changed() {
    let admin = AccessSession {
        role: Some(PermissionSet::all()),
        ..session(1, &[])
    };
    for list in [List::Order, List::OrderItem] {
        for op in [Operation::Update, Operation::Delete] {
            assert_eq!(check(list, op, Some(&admin)), Access::Denied);
        }
    }
}

#[test]
fn test_roles_need_the_roles_permission() {
    let shopper = session(7, &[]);
    let role_manager = session(2, &[Permission::CanManageRoles]);

    for op in [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
    ] {
        assert_eq!(check(List::Role, op, Some(&shopper)), Access::Denied);
        assert_eq!(check(List::Role, op, Some(&role_manager)), Access::Granted);
    }
}

#[test]
fn test_checkout_skips_deleted_products() {
    let lines = [line(1, 2, Some(2499)), line(2, 1, None), line(3, 3, Some(100))];

    assert_eq!(cart_total(&lines), Price::from_cents(2 * 2499 + 3 * 100));

    let items = order_items_from_cart(&lines);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].name, "Product 1");
    assert_eq!(items[0].quantity, 2);
    assert_eq!(items[1].price, Price::from_cents(100));
}

#[test]
fn test_order_label_is_formatted_total() {
    assert_eq!(Price::from_cents(2499).to_string(), "$24.99");
    assert_eq!(Price::from_cents(500).to_string(), "$5");
}
