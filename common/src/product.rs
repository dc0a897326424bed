use serde::{Deserialize, Serialize};

/// Unique product identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

/// The physical subset of a product listing used for parcel estimation.
///
/// Dimensions are inches, weight is ounces. Catalog rows routinely omit
/// these; absent or zero values are tolerated and contribute nothing to an
/// estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub length_in: Option<f64>,
    #[serde(default)]
    pub width_in: Option<f64>,
    #[serde(default)]
    pub height_in: Option<f64>,
    #[serde(default)]
    pub weight_oz: Option<f64>,
}

impl Product {
    pub fn length(&self) -> f64 {
        self.length_in.unwrap_or(0.0)
    }

    pub fn width(&self) -> f64 {
        self.width_in.unwrap_or(0.0)
    }

    pub fn height(&self) -> f64 {
        self.height_in.unwrap_or(0.0)
    }

    pub fn weight(&self) -> f64 {
        self.weight_oz.unwrap_or(0.0)
    }
}
