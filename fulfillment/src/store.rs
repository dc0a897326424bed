//! Persistence seam for orders, line items, and product dimensions.
//!
//! The storefront's database sits behind [`OrderStore`]; this crate only
//! needs the handful of reads and two single-row writes below. Updates are
//! single keyed statements, relying on per-row atomicity rather than
//! application-level locking. [`MemoryStore`] is the dev/test backend and
//! what the binary seeds from a fixture file.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;

use parcelwise_common::order::{Order, OrderId, OrderItem, OrderStatus};
use parcelwise_common::product::{Product, ProductId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("order {0} not present in store")]
    MissingRow(String),

    /// Backend-opaque failure from a database-backed implementation.
    #[error("store backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn order(&self, id: &OrderId) -> Result<Option<Order>, StoreError>;

    async fn items_for_order(&self, id: &OrderId) -> Result<Vec<OrderItem>, StoreError>;

    async fn products(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError>;

    async fn order_by_tracking(&self, tracking_number: &str)
        -> Result<Option<Order>, StoreError>;

    /// Record a purchased label on an order: tracking number, label URL,
    /// carrier, and the new status, as one update.
    async fn record_label(
        &self,
        id: &OrderId,
        tracking_number: &str,
        label_url: &str,
        carrier: &str,
        status: OrderStatus,
    ) -> Result<(), StoreError>;

    /// Record a status transition, stamping shipped/delivered timestamps on
    /// first entry into those states.
    async fn record_status(&self, id: &OrderId, status: OrderStatus) -> Result<(), StoreError>;
}

// ─── In-memory backend ───────────────────────────────────────────────────────

#[derive(Default)]
struct Inner {
    orders: BTreeMap<OrderId, Order>,
    items: BTreeMap<OrderId, Vec<OrderItem>>,
    products: BTreeMap<ProductId, Product>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

/// Fixture shape accepted by `--seed`.
#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load_seed(&self, seed: SeedData) {
        let mut inner = self.inner.write().await;
        for product in seed.products {
            inner.products.insert(product.id.clone(), product);
        }
        for item in seed.items {
            inner.items.entry(item.order_id.clone()).or_default().push(item);
        }
        for order in seed.orders {
            inner.orders.insert(order.id.clone(), order);
        }
    }

    pub async fn upsert_order(&self, order: Order) {
        self.inner.write().await.orders.insert(order.id.clone(), order);
    }

    pub async fn upsert_item(&self, item: OrderItem) {
        self.inner
            .write()
            .await
            .items
            .entry(item.order_id.clone())
            .or_default()
            .push(item);
    }

    pub async fn upsert_product(&self, product: Product) {
        self.inner
            .write()
            .await
            .products
            .insert(product.id.clone(), product);
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.inner.read().await.orders.get(id).cloned())
    }

    async fn items_for_order(&self, id: &OrderId) -> Result<Vec<OrderItem>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .items
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn products(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.products.get(id).cloned())
            .collect())
    }

    async fn order_by_tracking(
        &self,
        tracking_number: &str,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .orders
            .values()
            .find(|o| o.tracking_number.as_deref() == Some(tracking_number))
            .cloned())
    }

    async fn record_label(
        &self,
        id: &OrderId,
        tracking_number: &str,
        label_url: &str,
        carrier: &str,
        status: OrderStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get_mut(id)
            .ok_or_else(|| StoreError::MissingRow(id.0.clone()))?;
        order.tracking_number = Some(tracking_number.to_string());
        order.label_url = Some(label_url.to_string());
        order.carrier = Some(carrier.to_string());
        order.status = status;
        if order.shipped_at.is_none() {
            order.shipped_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn record_status(&self, id: &OrderId, status: OrderStatus) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get_mut(id)
            .ok_or_else(|| StoreError::MissingRow(id.0.clone()))?;
        order.status = status;
        match status {
            OrderStatus::Shipped if order.shipped_at.is_none() => {
                order.shipped_at = Some(Utc::now());
            }
            OrderStatus::Delivered if order.delivered_at.is_none() => {
                order.delivered_at = Some(Utc::now());
            }
            _ => {}
        }
        Ok(())
    }
}
