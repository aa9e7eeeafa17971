// In crates/execution/src/types.rs

use core_types::{OrderStatus, OrderType, Side, TokenId};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SimulationSettings {
    /// The simulated slippage for market orders (e.g., 0.0005 for 0.05%).
    #[serde(default)]
    pub slippage_percent: f64,
}

/// An order the trader wants the broker to place.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub token_id: TokenId,
    pub side: Side,
    pub quantity: Decimal,
    pub order_type: OrderType,
    /// Maximum tolerated price movement, as a fraction.
    pub slippage: f64,
    /// Required for limit orders.
    pub limit_price: Option<Decimal>,
    /// The price the trader observed when deciding. Not sent to the venue.
    pub reference_price: Decimal,
}

impl OrderRequest {
    pub fn market(token_id: TokenId, side: Side, quantity: Decimal, slippage: f64, reference_price: Decimal) -> Self {
        Self {
            token_id,
            side,
            quantity,
            order_type: OrderType::Market,
            slippage,
            limit_price: None,
            reference_price,
        }
    }
}

/// The broker's acknowledgement of a placed order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub order_id: String,
    pub status: OrderStatus,
    /// Known only when the broker filled synchronously.
    pub fill_price: Option<Decimal>,
}

/// A price quote for a token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenQuote {
    pub token_id: TokenId,
    pub price: Decimal,
}
