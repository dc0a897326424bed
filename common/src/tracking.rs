use serde::{Deserialize, Serialize};

use crate::order::OrderStatus;

/// The only webhook event kind that drives state change.
pub const TRACK_UPDATED: &str = "track_updated";

/// Customer notification category for a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Shipped,
    OutForDelivery,
    Delivered,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::Shipped => "shipped",
            NotificationType::OutForDelivery => "out_for_delivery",
            NotificationType::Delivered => "delivered",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a carrier's status vocabulary to our canonical status and the
/// notification it should trigger. Case-insensitive; anything unrecognized
/// is treated as plain movement through the network.
pub fn map_carrier_status(raw: &str) -> (OrderStatus, NotificationType) {
    match raw.to_ascii_uppercase().as_str() {
        "DELIVERED" => (OrderStatus::Delivered, NotificationType::Delivered),
        "IN_TRANSIT" => (OrderStatus::InTransit, NotificationType::Shipped),
        "SHIPPED" => (OrderStatus::Shipped, NotificationType::Shipped),
        "OUT_FOR_DELIVERY" | "PICKUP_AVAILABLE" => {
            (OrderStatus::OutForDelivery, NotificationType::OutForDelivery)
        }
        _ => (OrderStatus::Shipped, NotificationType::Shipped),
    }
}

// ─── Webhook payload ─────────────────────────────────────────────────────────

/// Inbound carrier webhook body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub event: String,
    #[serde(default)]
    pub data: Option<TrackingData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingData {
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub carrier: Option<String>,
    #[serde(default)]
    pub tracking_status: Option<TrackingStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_details: Option<String>,
    #[serde(default)]
    pub tracking_history: Vec<TrackingHistoryEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingHistoryEntry {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_details: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status_date: Option<String>,
}
