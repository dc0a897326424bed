//! Parcelwise fulfillment daemon.
//!
//! Thin HTTP surface over the shipping-fulfillment core:
//!
//! - `POST /orders/{id}/label` — admin-triggered label purchase for a paid
//!   order (estimate parcel → price rates → buy label → persist tracking)
//! - `POST /webhooks/tracking` — inbound carrier tracking events
//! - `GET /health` — liveness
//!
//! The order store and email sink are collaborators behind traits; this
//! binary wires the in-memory store (optionally seeded from a fixture file)
//! and a log-backed notifier.

mod auth;
mod carrier;
mod config;
mod notify;
mod orchestrator;
mod store;
#[cfg(test)]
mod testutil;
mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use parcelwise_common::address::Address;
use parcelwise_common::order::{OrderId, OrderStatus};
use parcelwise_common::tracking::{NotificationType, WebhookPayload};

use crate::auth::{CredentialCache, StaticToken};
use crate::carrier::{CarrierApi, CarrierError, ShippoClient};
use crate::config::Config;
use crate::notify::{LogNotifier, Notifier};
use crate::orchestrator::{LabelResult, OrchestrationError};
use crate::store::{MemoryStore, OrderStore, SeedData};
use crate::webhook::{Ack, WebhookError};

#[derive(Parser)]
#[command(name = "parcelwise-fulfillment", about = "Parcelwise shipping-fulfillment daemon")]
struct Cli {
    /// HTTP port to listen on.
    #[arg(long, default_value_t = 8044)]
    port: u16,

    /// Carrier API base URL override (sandboxes, local stubs).
    #[arg(long)]
    carrier_url: Option<String>,

    /// JSON fixture of orders/items/products to preload into the store.
    #[arg(long)]
    seed: Option<PathBuf>,
}

struct AppState {
    store: Arc<dyn OrderStore>,
    carrier: Arc<dyn CarrierApi>,
    notifier: Arc<dyn Notifier>,
    ship_from: Address,
}

// ─── API types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct WebhookResponse {
    received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification: Option<NotificationType>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

// ─── Handlers ────────────────────────────────────────────────────────────────

async fn create_label_handler(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<LabelResult>, (StatusCode, Json<ErrorResponse>)> {
    let result = orchestrator::create_label_for_order(
        &*state.store,
        &*state.carrier,
        &*state.notifier,
        &state.ship_from,
        &OrderId(order_id),
    )
    .await
    .map_err(orchestration_error_response)?;
    Ok(Json(result))
}

async fn tracking_webhook_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WebhookPayload>,
) -> Result<Json<WebhookResponse>, (StatusCode, Json<ErrorResponse>)> {
    let ack = webhook::handle_tracking_event(&*state.store, &*state.notifier, &payload)
        .await
        .map_err(webhook_error_response)?;

    let response = match ack {
        Ack::Ignored => WebhookResponse {
            received: true,
            order_id: None,
            status: None,
            notification: None,
        },
        Ack::Processed {
            order_id,
            status,
            notification,
        } => WebhookResponse {
            received: true,
            order_id: Some(order_id.0),
            status: Some(status),
            notification: Some(notification),
        },
    };
    Ok(Json(response))
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ─── Error mapping ───────────────────────────────────────────────────────────

fn orchestration_error_response(
    err: OrchestrationError,
) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        OrchestrationError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        OrchestrationError::NoItemsFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
        // Not shippable to this address/parcel with the current carrier
        // account; user-facing, not a carrier outage.
        OrchestrationError::Carrier(CarrierError::NoRatesAvailable) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        OrchestrationError::Carrier(_) => StatusCode::BAD_GATEWAY,
        OrchestrationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn webhook_error_response(err: WebhookError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        WebhookError::MissingTrackingNumber => StatusCode::BAD_REQUEST,
        // Redelivery may succeed once the label purchase has persisted its
        // tracking number; 404 lets the carrier retry.
        WebhookError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        WebhookError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };
    if let Some(url) = cli.carrier_url {
        config.carrier_base_url = url;
    }

    let store = Arc::new(MemoryStore::new());
    if let Some(path) = &cli.seed {
        let seed = match load_seed_file(path) {
            Ok(seed) => seed,
            Err(e) => {
                error!("Failed to load seed file {}: {e}", path.display());
                std::process::exit(1);
            }
        };
        info!(
            "Seeding store: {} orders, {} items, {} products",
            seed.orders.len(),
            seed.items.len(),
            seed.products.len()
        );
        store.load_seed(seed).await;
    }

    let credentials = CredentialCache::new(Box::new(StaticToken(config.carrier_token.clone())));
    let carrier = match ShippoClient::new(&config, credentials) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build carrier HTTP client: {e}");
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState {
        store,
        carrier: Arc::new(carrier),
        notifier: Arc::new(LogNotifier),
        ship_from: config.ship_from.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let app = Router::new()
        .route("/orders/{id}/label", post(create_label_handler))
        .route("/webhooks/tracking", post(tracking_webhook_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state);

    let addr = format!("0.0.0.0:{}", cli.port);
    info!("Fulfillment daemon listening on {addr} (carrier: {})", config.carrier_base_url);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, app).await.expect("Server failed");
}

fn load_seed_file(path: &std::path::Path) -> Result<SeedData, String> {
    let data = std::fs::read_to_string(path).map_err(|e| format!("read: {e}"))?;
    serde_json::from_str(&data).map_err(|e| format!("parse: {e}"))
}
