//! Order types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cyber_shop_core::{OrderId, OrderItemId, Price, ProductImageId, UserId};

/// A paid order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub total: Price,
    /// Payment provider charge id.
    pub charge: String,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Display label, the formatted total.
    #[must_use]
    pub fn label(&self) -> String {
        self.total.to_string()
    }
}

/// A product snapshot taken at checkout.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub name: String,
    pub description: String,
    pub photo_id: Option<ProductImageId>,
    pub price: Price,
    pub quantity: i32,
    pub order_id: Option<OrderId>,
}

/// Fields for an order item created during checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub name: String,
    pub description: String,
    pub photo_id: Option<ProductImageId>,
    pub price: Price,
    pub quantity: i32,
}

/// An order with its items, as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub label: String,
    pub items: Vec<OrderItem>,
}

impl OrderWithItems {
    #[must_use]
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self {
            label: order.label(),
            order,
            items,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order(total: i64) -> Order {
        Order {
            id: OrderId::new(1),
            total: Price::from_cents(total),
            charge: "pi_123".to_string(),
            user_id: Some(UserId::new(1)),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_label_is_formatted_total() {
        assert_eq!(order(2499).label(), "$24.99");
        assert_eq!(order(5000).label(), "$50");
    }

    #[test]
    fn test_serialized_order_has_label() {
        let json = serde_json::to_value(OrderWithItems::new(order(123_456), vec![])).unwrap();
        assert_eq!(json["label"], "$1,234.56");
        assert_eq!(json["total"], 123_456);
        assert_eq!(json["charge"], "pi_123");
        assert!(json["items"].as_array().unwrap().is_empty());
    }
}
