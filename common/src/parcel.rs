use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::order::OrderItem;
use crate::product::{Product, ProductId};

/// Fallback parcel applied field-by-field when estimation comes up empty.
/// Carriers reject zero-dimension parcels, so a reasonable single-item
/// parcel stands in for missing catalog data.
pub const DEFAULT_WEIGHT_OZ: f64 = 16.0;
pub const DEFAULT_LENGTH_IN: f64 = 12.0;
pub const DEFAULT_WIDTH_IN: f64 = 8.0;
pub const DEFAULT_HEIGHT_IN: f64 = 6.0;

/// The single shippable package derived from an order's contents.
/// Dimensions in inches, weight in ounces. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
}

/// Estimate the parcel for a set of order lines.
///
/// Weight accumulates additively (product weight × quantity). Each spatial
/// dimension takes the running maximum across items, never a sum: items are
/// assumed boxed together, so the bounding box is the largest single-item
/// footprint. Items whose product is missing contribute nothing. Any field
/// still at zero afterwards gets its fixed default, so the result is always
/// shippable. This function is total over any input, including no items.
pub fn estimate_parcel(items: &[OrderItem], products: &[Product]) -> Parcel {
    let by_id: BTreeMap<&ProductId, &Product> = products.iter().map(|p| (&p.id, p)).collect();

    let mut parcel = Parcel {
        length: 0.0,
        width: 0.0,
        height: 0.0,
        weight: 0.0,
    };

    for item in items {
        let Some(product) = by_id.get(&item.product_id) else {
            continue;
        };
        parcel.weight += product.weight() * f64::from(item.quantity);
        parcel.length = parcel.length.max(product.length());
        parcel.width = parcel.width.max(product.width());
        parcel.height = parcel.height.max(product.height());
    }

    if parcel.weight <= 0.0 {
        parcel.weight = DEFAULT_WEIGHT_OZ;
    }
    if parcel.length <= 0.0 {
        parcel.length = DEFAULT_LENGTH_IN;
    }
    if parcel.width <= 0.0 {
        parcel.width = DEFAULT_WIDTH_IN;
    }
    if parcel.height <= 0.0 {
        parcel.height = DEFAULT_HEIGHT_IN;
    }

    parcel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderId;

    fn item(product: &str, quantity: u32) -> OrderItem {
        OrderItem {
            order_id: OrderId("o-1".into()),
            product_id: ProductId(product.into()),
            quantity,
            unit_price_cents: 1000,
        }
    }

    fn product(id: &str, weight: f64, l: f64, w: f64, h: f64) -> Product {
        Product {
            id: ProductId(id.into()),
            name: id.into(),
            length_in: Some(l),
            width_in: Some(w),
            height_in: Some(h),
            weight_oz: Some(weight),
        }
    }

    #[test]
    fn test_weight_sums_dimensions_take_max() {
        // Product A: 8oz, 10x6x4, qty 2. Product B: 4oz, 12x5x3, qty 1.
        let items = vec![item("a", 2), item("b", 1)];
        let products = vec![product("a", 8.0, 10.0, 6.0, 4.0), product("b", 4.0, 12.0, 5.0, 3.0)];

        let parcel = estimate_parcel(&items, &products);
        assert_eq!(parcel.weight, 20.0);
        assert_eq!(parcel.length, 12.0);
        assert_eq!(parcel.width, 6.0);
        assert_eq!(parcel.height, 4.0);
    }

    #[test]
    fn test_empty_order_gets_all_defaults() {
        let parcel = estimate_parcel(&[], &[]);
        assert_eq!(parcel.weight, DEFAULT_WEIGHT_OZ);
        assert_eq!(parcel.length, DEFAULT_LENGTH_IN);
        assert_eq!(parcel.width, DEFAULT_WIDTH_IN);
        assert_eq!(parcel.height, DEFAULT_HEIGHT_IN);
    }

    #[test]
    fn test_unmatched_products_contribute_nothing() {
        let items = vec![item("missing", 3)];
        let products = vec![product("other", 8.0, 10.0, 6.0, 4.0)];

        let parcel = estimate_parcel(&items, &products);
        assert_eq!(parcel.weight, DEFAULT_WEIGHT_OZ);
        assert_eq!(parcel.length, DEFAULT_LENGTH_IN);
        assert_eq!(parcel.width, DEFAULT_WIDTH_IN);
        assert_eq!(parcel.height, DEFAULT_HEIGHT_IN);
    }

    #[test]
    fn test_missing_dimension_data_falls_back_per_field() {
        let bare = Product {
            id: ProductId("bare".into()),
            name: "bare".into(),
            length_in: Some(20.0),
            width_in: None,
            height_in: None,
            weight_oz: Some(4.0),
        };
        let parcel = estimate_parcel(&[item("bare", 1)], &[bare]);
        assert_eq!(parcel.weight, 4.0);
        assert_eq!(parcel.length, 20.0);
        // Unstated dimensions still get shippable defaults.
        assert_eq!(parcel.width, DEFAULT_WIDTH_IN);
        assert_eq!(parcel.height, DEFAULT_HEIGHT_IN);
    }

    #[test]
    fn test_quantity_multiplies_weight_not_dimensions() {
        let items = vec![item("a", 5)];
        let products = vec![product("a", 2.0, 10.0, 6.0, 4.0)];

        let parcel = estimate_parcel(&items, &products);
        assert_eq!(parcel.weight, 10.0);
        assert_eq!(parcel.length, 10.0);
    }
}
