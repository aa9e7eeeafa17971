// In crates/api-client/src/lib.rs

use app_config::BrokerSettings;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub mod error;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use types::*;

impl ApiClient {
    /// Constructs a new ApiClient from BrokerSettings.
    pub fn new(settings: &BrokerSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if !settings.api_key.is_empty() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", settings.api_key))
                .map_err(|e| Error::ClientBuildError(format!("invalid API key: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| Error::ClientBuildError(e.to_string()))?;

        Ok(ApiClient {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Submits an order.
    ///
    /// This corresponds to the `POST /orders` endpoint.
    pub async fn place_order(&self, request: &NewOrderRequest) -> Result<NewOrderResponse> {
        let url = format!("{}/orders", self.base_url);
        tracing::debug!(%url, ?request, "Placing order.");
        let response = self.http_client.post(&url).json(request).send().await?;
        Self::parse(response).await
    }

    /// Fetches the current status of an order.
    ///
    /// This corresponds to the `GET /orders/{id}` endpoint.
    pub async fn get_order(&self, order_id: &str) -> Result<OrderStatusResponse> {
        let url = format!("{}/orders/{}", self.base_url, order_id);
        let response = self.http_client.get(&url).send().await?;
        Self::parse(response).await
    }

    /// Requests cancellation of an open order.
    ///
    /// This corresponds to the `DELETE /orders/{id}` endpoint.
    pub async fn cancel_order(&self, order_id: &str) -> Result<CancelOrderResponse> {
        let url = format!("{}/orders/{}", self.base_url, order_id);
        let response = self.http_client.delete(&url).send().await?;
        Self::parse(response).await
    }

    /// Fetches the latest quote for a token.
    ///
    /// This corresponds to the `GET /tokens/{address}` endpoint.
    pub async fn get_token(&self, token_address: &str) -> Result<TokenInfoResponse> {
        let url = format!("{}/tokens/{}", self.base_url, token_address);
        let response = self.http_client.get(&url).send().await?;
        Self::parse(response).await
    }

    /// Pings the venue.
    ///
    /// This corresponds to the `GET /health` endpoint.
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self.http_client.get(&url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(Error::DeserializationFailed)
    }

    async fn api_error(response: Response) -> Error {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        // The venue usually returns a JSON error object; fall back to the raw body.
        let msg = serde_json::from_str::<ApiErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or_else(|_| {
                if text.is_empty() {
                    status.canonical_reason().unwrap_or("Unknown error").to_string()
                } else {
                    text
                }
            });
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(%status, "Venue rate limit hit.");
        }
        Error::ApiError { status: status.as_u16(), msg }
    }
}
