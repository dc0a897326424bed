//! Carrier rate-and-label client.
//!
//! Wraps the carrier's two-step protocol: create a shipment (which prices
//! candidate rates), then purchase one rate as a transaction/label. Both
//! calls run in the carrier's synchronous mode, so the response to each is
//! complete when it arrives. No retries here; callers own retry policy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use parcelwise_common::address::Address;
use parcelwise_common::parcel::Parcel;

use crate::auth::{AuthError, CredentialCache};
use crate::config::Config;

#[derive(Debug, Error)]
pub enum CarrierError {
    #[error("carrier rejected shipment (HTTP {status}): {body}")]
    ShipmentRejected { status: u16, body: String },

    #[error("no rates available for this address/parcel combination")]
    NoRatesAvailable,

    #[error("carrier rejected label purchase (HTTP {status}): {body}")]
    TransactionRejected { status: u16, body: String },

    #[error("label purchase failed: {messages}")]
    TransactionFailed { messages: String },

    #[error("carrier call timed out")]
    Timeout,

    #[error("carrier transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CarrierAddress {
    pub name: String,
    pub street1: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub street2: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

impl From<&Address> for CarrierAddress {
    fn from(addr: &Address) -> Self {
        Self {
            name: addr.name.clone(),
            street1: addr.street1.clone(),
            street2: addr.street2.clone(),
            city: addr.city.clone(),
            state: addr.state.clone(),
            zip: addr.zip.clone(),
            country: addr.country.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CarrierParcel {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub distance_unit: &'static str,
    pub weight: f64,
    pub mass_unit: &'static str,
}

impl From<&Parcel> for CarrierParcel {
    fn from(parcel: &Parcel) -> Self {
        Self {
            length: parcel.length,
            width: parcel.width,
            height: parcel.height,
            distance_unit: "in",
            weight: parcel.weight,
            mass_unit: "oz",
        }
    }
}

#[derive(Debug, Serialize)]
struct ShipmentRequest {
    address_from: CarrierAddress,
    address_to: CarrierAddress,
    parcels: Vec<CarrierParcel>,
    #[serde(rename = "async")]
    async_mode: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentResponse {
    pub object_id: String,
    #[serde(default)]
    pub rates: Vec<RateQuote>,
}

/// A carrier-quoted price/service-level offer. Ephemeral; only the selected
/// one outlives the purchase call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateQuote {
    pub object_id: String,
    pub amount: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub servicelevel: ServiceLevel,
    #[serde(default)]
    pub estimated_days: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceLevel {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
struct TransactionRequest {
    rate: String,
    label_file_type: &'static str,
    #[serde(rename = "async")]
    async_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    #[serde(default)]
    pub object_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub label_url: Option<String>,
    #[serde(default)]
    pub messages: Vec<CarrierMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierMessage {
    #[serde(default)]
    pub text: String,
}

/// Everything the purchase yields that callers care about.
#[derive(Debug, Clone, Serialize)]
pub struct PurchasedLabel {
    pub shipment_id: String,
    pub tracking_number: String,
    pub label_url: String,
    pub rate: RateQuote,
    pub transaction: TransactionResponse,
}

// ─── Client ──────────────────────────────────────────────────────────────────

#[async_trait]
pub trait CarrierApi: Send + Sync {
    async fn purchase_label(
        &self,
        from: &Address,
        to: &Address,
        parcel: &Parcel,
    ) -> Result<PurchasedLabel, CarrierError>;
}

pub struct ShippoClient {
    http: reqwest::Client,
    base_url: String,
    credentials: CredentialCache,
}

impl ShippoClient {
    pub fn new(config: &Config, credentials: CredentialCache) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.carrier_base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    async fn create_shipment(
        &self,
        from: &Address,
        to: &Address,
        parcel: &Parcel,
    ) -> Result<ShipmentResponse, CarrierError> {
        let token = self.credentials.token().await?;
        let request = ShipmentRequest {
            address_from: from.into(),
            address_to: to.into(),
            parcels: vec![parcel.into()],
            async_mode: false,
        };

        let resp = self
            .http
            .post(format!("{}/shipments/", self.base_url))
            .header("Authorization", format!("ShippoToken {token}"))
            .json(&request)
            .send()
            .await
            .map_err(request_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CarrierError::ShipmentRejected {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<ShipmentResponse>().await.map_err(request_error)
    }

    async fn purchase_rate(&self, rate_id: &str) -> Result<TransactionResponse, CarrierError> {
        let token = self.credentials.token().await?;
        let request = TransactionRequest {
            rate: rate_id.to_string(),
            label_file_type: "PDF",
            async_mode: false,
        };

        let resp = self
            .http
            .post(format!("{}/transactions/", self.base_url))
            .header("Authorization", format!("ShippoToken {token}"))
            .json(&request)
            .send()
            .await
            .map_err(request_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CarrierError::TransactionRejected {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<TransactionResponse>()
            .await
            .map_err(request_error)
    }
}

#[async_trait]
impl CarrierApi for ShippoClient {
    async fn purchase_label(
        &self,
        from: &Address,
        to: &Address,
        parcel: &Parcel,
    ) -> Result<PurchasedLabel, CarrierError> {
        let shipment = self.create_shipment(from, to, parcel).await?;
        let shipment_id = shipment.object_id.clone();
        let rate = select_rate(shipment.rates)?;
        info!(
            "Shipment {} priced: taking rate {} ({} {} via {})",
            shipment_id, rate.object_id, rate.amount, rate.currency, rate.provider
        );

        let transaction = self.purchase_rate(&rate.object_id).await?;
        finalize_purchase(shipment_id, rate, transaction)
    }
}

/// Take the first rate the carrier returned. Ordering is carrier-determined;
/// no cost or speed policy is applied at this layer.
fn select_rate(rates: Vec<RateQuote>) -> Result<RateQuote, CarrierError> {
    rates
        .into_iter()
        .next()
        .ok_or(CarrierError::NoRatesAvailable)
}

/// Validate a purchase response. The carrier can accept the HTTP request yet
/// fail the purchase; any status other than SUCCESS is a failure carrying
/// the carrier's message texts.
fn finalize_purchase(
    shipment_id: String,
    rate: RateQuote,
    transaction: TransactionResponse,
) -> Result<PurchasedLabel, CarrierError> {
    if !transaction.status.eq_ignore_ascii_case("SUCCESS") {
        let mut messages: Vec<String> = transaction
            .messages
            .iter()
            .map(|m| m.text.clone())
            .filter(|t| !t.is_empty())
            .collect();
        if messages.is_empty() {
            messages.push(format!("carrier status {:?}", transaction.status));
        }
        return Err(CarrierError::TransactionFailed {
            messages: messages.join("; "),
        });
    }

    let tracking_number = match transaction.tracking_number.as_deref() {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => {
            return Err(CarrierError::TransactionFailed {
                messages: "purchase succeeded but no tracking number was returned".to_string(),
            })
        }
    };
    let label_url = transaction.label_url.clone().unwrap_or_default();

    Ok(PurchasedLabel {
        shipment_id,
        tracking_number,
        label_url,
        rate,
        transaction,
    })
}

fn request_error(err: reqwest::Error) -> CarrierError {
    if err.is_timeout() {
        CarrierError::Timeout
    } else {
        CarrierError::Transport(err)
    }
}
