use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::product::ProductId;

/// Carrier used when an order does not name one explicitly.
pub const DEFAULT_CARRIER: &str = "usps";

/// Unique order identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

/// Canonical order lifecycle status, carrier-agnostic.
///
/// The webhook-driven progression is `pending → in_transit → shipped →
/// out_for_delivery → delivered`; `failed` sits outside that machine and is
/// never produced from a carrier event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InTransit,
    Shipped,
    OutForDelivery,
    Delivered,
    Failed,
}

impl OrderStatus {
    /// Progression rank within the delivery machine. `Failed` ranks with
    /// `Pending` since it never advances.
    pub fn ordinal(self) -> u8 {
        match self {
            OrderStatus::Pending | OrderStatus::Failed => 0,
            OrderStatus::InTransit => 1,
            OrderStatus::Shipped => 2,
            OrderStatus::OutForDelivery => 3,
            OrderStatus::Delivered => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Shipped => "shipped",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order placed by a customer. Created when payment is confirmed; mutated
/// only by label purchase (tracking fields) and webhook processing (status).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_email: String,
    pub status: OrderStatus,
    #[serde(deserialize_with = "crate::address::deserialize_normalized")]
    pub shipping_address: Address,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub label_url: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    /// Total charged at checkout, in cents.
    pub total_cents: u64,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Carrier name for customer-facing messages, falling back to the
    /// process-wide default.
    pub fn carrier_name(&self) -> &str {
        self.carrier.as_deref().unwrap_or(DEFAULT_CARRIER)
    }
}

/// One line of an order. `unit_price_cents` is a snapshot taken at order
/// time and is never re-derived from the product afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price_cents: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordinals_monotonic() {
        assert!(OrderStatus::Pending.ordinal() < OrderStatus::InTransit.ordinal());
        assert!(OrderStatus::InTransit.ordinal() < OrderStatus::Shipped.ordinal());
        assert!(OrderStatus::Shipped.ordinal() < OrderStatus::OutForDelivery.ordinal());
        assert!(OrderStatus::OutForDelivery.ordinal() < OrderStatus::Delivered.ordinal());
        assert_eq!(OrderStatus::Failed.ordinal(), OrderStatus::Pending.ordinal());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::OutForDelivery).unwrap(),
            "\"out_for_delivery\""
        );
        let parsed: OrderStatus = serde_json::from_str("\"in_transit\"").unwrap();
        assert_eq!(parsed, OrderStatus::InTransit);
    }

    #[test]
    fn test_order_deserializes_legacy_address_spelling() {
        let order: Order = serde_json::from_str(
            r#"{
                "id": "o-7",
                "customer_email": "jo@example.com",
                "status": "pending",
                "shipping_address": {
                    "name": "Jo Field",
                    "address1": "1 Main St",
                    "city": "Springfield",
                    "state": "IL",
                    "postal_code": "62701"
                },
                "tracking_number": null,
                "carrier": null,
                "label_url": null,
                "shipped_at": null,
                "delivered_at": null,
                "total_cents": 2500,
                "created_at": "2024-05-01T12:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(order.shipping_address.street1, "1 Main St");
        assert_eq!(order.shipping_address.zip, "62701");
    }

    #[test]
    fn test_carrier_name_default() {
        let order = Order {
            id: OrderId("o-1".into()),
            customer_email: "jo@example.com".into(),
            status: OrderStatus::Pending,
            shipping_address: Address::default(),
            tracking_number: None,
            carrier: None,
            label_url: None,
            shipped_at: None,
            delivered_at: None,
            total_cents: 2500,
            created_at: Utc::now(),
        };
        assert_eq!(order.carrier_name(), DEFAULT_CARRIER);
    }
}
