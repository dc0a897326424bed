//! Customer notification seam.
//!
//! Delivery (email) lives in an external collaborator behind [`Notifier`].
//! Every caller treats notification failure as best-effort: the label is
//! already purchased or the status already persisted, so a failed send is
//! logged and swallowed, never escalated.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use parcelwise_common::order::OrderId;
use parcelwise_common::tracking::NotificationType;

#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

#[derive(Debug, Clone)]
pub struct Notification {
    pub order_id: OrderId,
    pub customer_email: String,
    pub tracking_number: String,
    pub carrier: String,
    pub kind: NotificationType,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Structured-log sink, standing in where no email backend is wired up.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            "Notify {}: order {} is {} (tracking {} via {})",
            notification.customer_email,
            notification.order_id.0,
            notification.kind,
            notification.tracking_number,
            notification.carrier
        );
        Ok(())
    }
}
