//! Tracking webhook processing.
//!
//! The carrier posts asynchronous status events; each `track_updated` event
//! maps the carrier's vocabulary onto the canonical order status, persists
//! it, and notifies the customer once. The carrier redelivers on non-2xx
//! and may reorder or duplicate events; the latest event wins, with no
//! monotonicity check (an accepted open question for stakeholders).

use thiserror::Error;
use tracing::{info, warn};

use parcelwise_common::order::{OrderId, OrderStatus};
use parcelwise_common::tracking::{
    map_carrier_status, NotificationType, WebhookPayload, TRACK_UPDATED,
};

use crate::notify::{Notification, Notifier};
use crate::store::{OrderStore, StoreError};

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("tracking event carries no tracking number")]
    MissingTrackingNumber,

    #[error("no order matches tracking number {0}")]
    OrderNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a processed webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum Ack {
    /// Event kind we do not act on; acknowledged with no side effect.
    Ignored,
    Processed {
        order_id: OrderId,
        status: OrderStatus,
        notification: NotificationType,
    },
}

/// Apply one carrier tracking event to the matching order.
pub async fn handle_tracking_event(
    store: &dyn OrderStore,
    notifier: &dyn Notifier,
    payload: &WebhookPayload,
) -> Result<Ack, WebhookError> {
    if payload.event != TRACK_UPDATED {
        info!("Ignoring webhook event kind {:?}", payload.event);
        return Ok(Ack::Ignored);
    }

    let data = payload.data.as_ref();
    let tracking_number = data
        .and_then(|d| d.tracking_number.as_deref())
        .filter(|t| !t.is_empty())
        .ok_or(WebhookError::MissingTrackingNumber)?;

    let raw_status = data
        .and_then(|d| d.tracking_status.as_ref())
        .and_then(|s| s.status.as_deref())
        .unwrap_or("");
    let (status, notification_kind) = map_carrier_status(raw_status);

    // The carrier can report numbers we never issued, or race ahead of the
    // label purchase persisting its tracking number. Both are normal.
    let order = store
        .order_by_tracking(tracking_number)
        .await?
        .ok_or_else(|| WebhookError::OrderNotFound(tracking_number.to_string()))?;

    store.record_status(&order.id, status).await?;
    info!(
        "Order {}: carrier status {:?} → {} (tracking {})",
        order.id.0, raw_status, status, tracking_number
    );

    let notification = Notification {
        order_id: order.id.clone(),
        customer_email: order.customer_email.clone(),
        tracking_number: tracking_number.to_string(),
        carrier: order.carrier_name().to_string(),
        kind: notification_kind,
    };
    // Status is already persisted; a failed email must not make the carrier
    // retry this delivery forever.
    if let Err(e) = notifier.notify(&notification).await {
        warn!(
            "Order {}: {} notification failed: {}",
            order.id.0, notification_kind, e
        );
    }

    Ok(Ack::Processed {
        order_id: order.id,
        status,
        notification: notification_kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifyError;
    use crate::store::MemoryStore;
    use crate::testutil::RecordingNotifier;
    use chrono::Utc;
    use parcelwise_common::address::Address;
    use parcelwise_common::order::Order;
    use parcelwise_common::tracking::{TrackingData, TrackingStatus};

    fn shipped_order(id: &str, tracking: &str) -> Order {
        Order {
            id: OrderId(id.into()),
            customer_email: "jo@example.com".into(),
            status: OrderStatus::InTransit,
            shipping_address: Address::default(),
            tracking_number: Some(tracking.into()),
            carrier: Some("usps".into()),
            label_url: Some("https://example.com/l.pdf".into()),
            shipped_at: Some(Utc::now()),
            delivered_at: None,
            total_cents: 2500,
            created_at: Utc::now(),
        }
    }

    fn event(kind: &str, tracking: Option<&str>, status: Option<&str>) -> WebhookPayload {
        WebhookPayload {
            event: kind.into(),
            data: Some(TrackingData {
                tracking_number: tracking.map(String::from),
                carrier: Some("usps".into()),
                tracking_status: Some(TrackingStatus {
                    status: status.map(String::from),
                    status_details: None,
                    tracking_history: vec![],
                }),
            }),
        }
    }

    #[tokio::test]
    async fn test_non_track_updated_is_acknowledged_noop() {
        let store = MemoryStore::new();
        store.upsert_order(shipped_order("o-1", "1Z999")).await;
        let notifier = RecordingNotifier::new();

        let ack = handle_tracking_event(
            &store,
            &notifier,
            &event("track_created", Some("1Z999"), Some("DELIVERED")),
        )
        .await
        .unwrap();

        assert_eq!(ack, Ack::Ignored);
        let order = store.order(&OrderId("o-1".into())).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::InTransit);
        assert!(notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_tracking_number_is_client_error() {
        let store = MemoryStore::new();
        let notifier = RecordingNotifier::new();

        let err = handle_tracking_event(
            &store,
            &notifier,
            &event(TRACK_UPDATED, None, Some("DELIVERED")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WebhookError::MissingTrackingNumber));

        let err = handle_tracking_event(
            &store,
            &notifier,
            &event(TRACK_UPDATED, Some(""), Some("DELIVERED")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WebhookError::MissingTrackingNumber));
    }

    #[tokio::test]
    async fn test_delivered_event_maps_and_notifies() {
        let store = MemoryStore::new();
        store.upsert_order(shipped_order("o-1", "1Z999")).await;
        let notifier = RecordingNotifier::new();

        let ack = handle_tracking_event(
            &store,
            &notifier,
            &event(TRACK_UPDATED, Some("1Z999"), Some("DELIVERED")),
        )
        .await
        .unwrap();

        assert_eq!(
            ack,
            Ack::Processed {
                order_id: OrderId("o-1".into()),
                status: OrderStatus::Delivered,
                notification: NotificationType::Delivered,
            }
        );
        let order = store.order(&OrderId("o-1".into())).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert!(order.delivered_at.is_some());

        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationType::Delivered);
    }

    #[tokio::test]
    async fn test_unrecognized_status_maps_to_shipped() {
        let store = MemoryStore::new();
        store.upsert_order(shipped_order("o-1", "1Z999")).await;
        let notifier = RecordingNotifier::new();

        let ack = handle_tracking_event(
            &store,
            &notifier,
            &event(TRACK_UPDATED, Some("1Z999"), Some("CUSTOMS_HOLD")),
        )
        .await
        .unwrap();

        assert!(matches!(
            ack,
            Ack::Processed {
                status: OrderStatus::Shipped,
                notification: NotificationType::Shipped,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_tracking_number_mutates_nothing() {
        let store = MemoryStore::new();
        store.upsert_order(shipped_order("o-1", "1Z999")).await;
        let notifier = RecordingNotifier::new();

        let err = handle_tracking_event(
            &store,
            &notifier,
            &event(TRACK_UPDATED, Some("other-number"), Some("DELIVERED")),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, WebhookError::OrderNotFound(_)));
        let order = store.order(&OrderId("o-1".into())).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::InTransit);
        assert!(notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_out_for_delivery_body_end_to_end() {
        let store = MemoryStore::new();
        store.upsert_order(shipped_order("o-1", "1Z999")).await;
        let notifier = RecordingNotifier::new();

        let payload: WebhookPayload = serde_json::from_str(
            r#"{"event":"track_updated","data":{"tracking_number":"1Z999","tracking_status":{"status":"OUT_FOR_DELIVERY"}}}"#,
        )
        .unwrap();
        let ack = handle_tracking_event(&store, &notifier, &payload)
            .await
            .unwrap();

        assert!(matches!(
            ack,
            Ack::Processed {
                status: OrderStatus::OutForDelivery,
                notification: NotificationType::OutForDelivery,
                ..
            }
        ));
        let order = store.order(&OrderId("o-1".into())).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::OutForDelivery);
        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationType::OutForDelivery);
    }

    #[tokio::test]
    async fn test_notification_failure_still_acknowledges() {
        let store = MemoryStore::new();
        store.upsert_order(shipped_order("o-1", "1Z999")).await;
        let notifier = RecordingNotifier::failing(NotifyError("smtp down".into()));

        let ack = handle_tracking_event(
            &store,
            &notifier,
            &event(TRACK_UPDATED, Some("1Z999"), Some("DELIVERED")),
        )
        .await
        .unwrap();

        assert!(matches!(ack, Ack::Processed { .. }));
        let order = store.order(&OrderId("o-1".into())).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_missing_status_string_maps_through_default_arm() {
        let store = MemoryStore::new();
        store.upsert_order(shipped_order("o-1", "1Z999")).await;
        let notifier = RecordingNotifier::new();

        let ack = handle_tracking_event(
            &store,
            &notifier,
            &event(TRACK_UPDATED, Some("1Z999"), None),
        )
        .await
        .unwrap();

        assert!(matches!(
            ack,
            Ack::Processed {
                status: OrderStatus::Shipped,
                ..
            }
        ));
    }
}
