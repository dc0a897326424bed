//! Fulfillment orchestration: turn a paid order into a purchased label.
//!
//! Each step is a hard precondition for the next. The carrier purchase is
//! the unrecoverable side effect: once a label is bought there is no
//! rollback, so a persistence failure after it is logged loudly and
//! surfaced rather than retried here.

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use parcelwise_common::address::Address;
use parcelwise_common::order::{OrderId, OrderStatus};
use parcelwise_common::parcel::estimate_parcel;
use parcelwise_common::product::ProductId;
use parcelwise_common::tracking::NotificationType;

use crate::carrier::{CarrierApi, CarrierError, RateQuote, TransactionResponse};
use crate::notify::{Notification, Notifier};
use crate::store::{OrderStore, StoreError};

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("order {0} not found")]
    OrderNotFound(String),

    #[error("order {0} has no items to ship")]
    NoItemsFound(String),

    #[error(transparent)]
    Carrier(#[from] CarrierError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything the label purchase produced, returned to the admin-facing
/// caller.
#[derive(Debug, Clone, Serialize)]
pub struct LabelResult {
    pub order_id: OrderId,
    pub tracking_number: String,
    pub label_url: String,
    pub shipment_id: String,
    pub rate: RateQuote,
    pub transaction: TransactionResponse,
}

/// Purchase a shipping label for a paid order and persist its tracking
/// state. Ship-from comes from process-wide origin configuration, never
/// from the order.
pub async fn create_label_for_order(
    store: &dyn OrderStore,
    carrier: &dyn CarrierApi,
    notifier: &dyn Notifier,
    ship_from: &Address,
    order_id: &OrderId,
) -> Result<LabelResult, OrchestrationError> {
    let order = store
        .order(order_id)
        .await?
        .ok_or_else(|| OrchestrationError::OrderNotFound(order_id.0.clone()))?;

    let items = store.items_for_order(order_id).await?;
    if items.is_empty() {
        return Err(OrchestrationError::NoItemsFound(order_id.0.clone()));
    }

    let product_ids: Vec<ProductId> = items.iter().map(|i| i.product_id.clone()).collect();
    let products = store.products(&product_ids).await?;

    let parcel = estimate_parcel(&items, &products);
    info!(
        "Order {}: estimated parcel {}x{}x{} in, {} oz",
        order_id.0, parcel.length, parcel.width, parcel.height, parcel.weight
    );

    let label = carrier
        .purchase_label(ship_from, &order.shipping_address, &parcel)
        .await?;

    let carrier_name = order.carrier_name().to_string();
    if let Err(e) = store
        .record_label(
            order_id,
            &label.tracking_number,
            &label.label_url,
            &carrier_name,
            OrderStatus::InTransit,
        )
        .await
    {
        // The label is bought and cannot be returned; the order row now
        // disagrees with the carrier. Needs operator attention.
        error!(
            "Order {}: label {} purchased but could not be persisted: {}",
            order_id.0, label.tracking_number, e
        );
        return Err(e.into());
    }

    // Label created means the package is entering the carrier network.
    let notification = Notification {
        order_id: order_id.clone(),
        customer_email: order.customer_email.clone(),
        tracking_number: label.tracking_number.clone(),
        carrier: carrier_name,
        kind: NotificationType::Shipped,
    };
    if let Err(e) = notifier.notify(&notification).await {
        warn!(
            "Order {}: shipped notification failed (label {} is live): {}",
            order_id.0, label.tracking_number, e
        );
    }

    info!(
        "Order {}: label {} purchased (shipment {})",
        order_id.0, label.tracking_number, label.shipment_id
    );

    Ok(LabelResult {
        order_id: order_id.clone(),
        tracking_number: label.tracking_number,
        label_url: label.label_url,
        shipment_id: label.shipment_id,
        rate: label.rate,
        transaction: label.transaction,
    })
}
