use serde::{Deserialize, Serialize};

/// Canonical shipping address. Everything downstream of the system boundary
/// works with this one shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub street1: String,
    #[serde(default)]
    pub street2: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

/// Address as stored by older checkout revisions, which spelled the street
/// line and postal code several ways. Normalization happens here, at the
/// boundary, so the rest of the system never sees the aliases.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAddress {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "address1", alias = "line1")]
    pub street1: Option<String>,
    #[serde(default, alias = "address2", alias = "line2")]
    pub street2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, alias = "postal_code")]
    pub zip: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl RawAddress {
    /// Collapse to the canonical form. Missing fields become empty strings;
    /// the carrier rejects unusable addresses, not us.
    pub fn normalize(self) -> Address {
        Address {
            name: self.name.unwrap_or_default(),
            street1: self.street1.unwrap_or_default(),
            street2: self.street2.unwrap_or_default(),
            city: self.city.unwrap_or_default(),
            state: self.state.unwrap_or_default(),
            zip: self.zip.unwrap_or_default(),
            country: self.country.unwrap_or_else(|| "US".to_string()),
        }
    }
}

/// Deserialize an address through [`RawAddress`], so stored rows written by
/// older checkout revisions load into the canonical shape.
pub fn deserialize_normalized<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: serde::Deserializer<'de>,
{
    RawAddress::deserialize(deserializer).map(RawAddress::normalize)
}
