//! Process-wide configuration: carrier credential, shipping origin, HTTP
//! settings. The carrier token is the one value with no fallback; without
//! it every label purchase would fail, so startup aborts instead.

use std::env;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use parcelwise_common::address::Address;

pub const DEFAULT_CARRIER_BASE_URL: &str = "https://api.goshippo.com";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SHIPPO_API_TOKEN is not set; carrier calls cannot be authenticated")]
    MissingCarrierToken,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub carrier_token: String,
    pub carrier_base_url: String,
    pub http_timeout: Duration,
    pub ship_from: Address,
}

impl Config {
    /// Read configuration from the environment. `carrier_base_url` may be
    /// overridden by the caller (CLI flag) afterwards.
    pub fn from_env() -> Result<Self, ConfigError> {
        let carrier_token =
            env::var("SHIPPO_API_TOKEN").map_err(|_| ConfigError::MissingCarrierToken)?;

        let ship_from = ship_from_env();
        info!(
            "Shipping origin: {}, {}, {} {}",
            ship_from.street1, ship_from.city, ship_from.state, ship_from.zip
        );

        Ok(Self {
            carrier_token,
            carrier_base_url: env::var("CARRIER_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_CARRIER_BASE_URL.to_string()),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            ship_from,
        })
    }
}

/// The fixed warehouse address labels ship from. Never varies per order.
fn ship_from_env() -> Address {
    Address {
        name: var_or("SHIP_FROM_NAME", "Parcelwise Warehouse"),
        street1: var_or("SHIP_FROM_STREET1", "215 Clayton St"),
        street2: String::new(),
        city: var_or("SHIP_FROM_CITY", "San Francisco"),
        state: var_or("SHIP_FROM_STATE", "CA"),
        zip: var_or("SHIP_FROM_ZIP", "94117"),
        country: var_or("SHIP_FROM_COUNTRY", "US"),
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
