// In crates/execution/src/live.rs

use crate::types::{OrderAck, OrderRequest, TokenQuote};
use crate::{Broker, Error, Result};
use api_client::{ApiClient, NewOrderRequest};
use async_trait::async_trait;
use core_types::{OrderStatus, OrderType, TokenId, TradingMode};

/// A broker that places real orders through the venue's REST API.
#[derive(Debug, Clone)]
pub struct LiveBroker {
    api_client: ApiClient,
}

impl LiveBroker {
    pub fn new(api_client: ApiClient) -> Self {
        Self { api_client }
    }
}

#[async_trait]
impl Broker for LiveBroker {
    fn name(&self) -> &'static str {
        "LiveBroker"
    }

    fn mode(&self) -> TradingMode {
        TradingMode::Live
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck> {
        if order.order_type == OrderType::Limit && order.limit_price.is_none() {
            return Err(Error::Rejected {
                reason: "limit order without a limit price".to_string(),
            });
        }
        tracing::info!(?order, "Submitting live order.");

        let request = NewOrderRequest {
            token_address: order.token_id.as_str().to_string(),
            side: order.side.as_str().to_string(),
            quantity: order.quantity,
            r#type: order.order_type.as_str().to_string(),
            slippage: order.slippage,
            limit_price: order.limit_price,
        };
        let response = self.api_client.place_order(&request).await.map_err(|e| {
            tracing::error!(error = %e, token = %order.token_id, "Failed to place order.");
            Error::from(e)
        })?;

        let status = response
            .status
            .as_deref()
            .map(OrderStatus::from_venue)
            .unwrap_or(OrderStatus::Pending);
        tracing::info!(order_id = %response.order_id, %status, "Order accepted by venue.");

        Ok(OrderAck {
            order_id: response.order_id,
            status,
            fill_price: None,
        })
    }

    async fn check_order_status(&self, order_id: &str) -> Result<OrderStatus> {
        let response = self.api_client.get_order(order_id).await?;
        Ok(OrderStatus::from_venue(&response.status))
    }

    async fn cancel_order(&self, order_id: &str) -> Result<bool> {
        let response = self.api_client.cancel_order(order_id).await?;
        Ok(response.success)
    }

    async fn get_token_info(&self, token_id: &TokenId) -> Result<TokenQuote> {
        let response = self.api_client.get_token(token_id.as_str()).await?;
        Ok(TokenQuote {
            token_id: token_id.clone(),
            price: response.price,
        })
    }

    async fn health_check(&self) -> bool {
        match self.api_client.health().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Venue health check failed.");
                false
            }
        }
    }
}
