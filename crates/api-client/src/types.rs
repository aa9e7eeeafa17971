// In crates/api-client/src/types.rs

use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The client for the trading venue's REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// The persistent HTTP client, carrying the bearer token as a default header.
    pub http_client: Client,
    /// The base URL of the venue API, without a trailing slash.
    pub base_url: String,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrderRequest {
    pub token_address: String,
    pub side: String, // "buy" or "sell"
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    pub r#type: String, // "market" or "limit"
    pub slippage: f64,
    #[serde(skip_serializing_if = "Option::is_none", with = "rust_decimal::serde::float_option")]
    pub limit_price: Option<Decimal>,
}

/// Response of `POST /orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderResponse {
    pub order_id: String,
    /// Some venues fill market orders synchronously and say so here.
    #[serde(default)]
    pub status: Option<String>,
}

/// Response of `GET /orders/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderStatusResponse {
    pub status: String,
    #[serde(default)]
    pub filled_quantity: Option<Decimal>,
    #[serde(default)]
    pub avg_price: Option<Decimal>,
}

/// Response of `DELETE /orders/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderResponse {
    pub success: bool,
}

/// Response of `GET /tokens/{address}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfoResponse {
    pub price: Decimal,
    #[serde(default)]
    pub symbol: Option<String>,
}

/// Error body returned by the venue on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(alias = "message", alias = "msg")]
    pub error: String,
}
