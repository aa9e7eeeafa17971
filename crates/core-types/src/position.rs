// In crates/core-types/src/position.rs

use crate::{Side, TokenId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// One open holding in a single token.
///
/// The average entry price is a volume-weighted cost basis: it moves when the
/// holding is increased and stays put when the holding is reduced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub token_id: TokenId,
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_entry_price: Decimal,
    pub current_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub stop_loss_price: Option<Decimal>,
    pub take_profit_price: Option<Decimal>,
}

impl Position {
    /// Opens a fresh position at `price`, marking it to the same price.
    pub fn open(
        token_id: TokenId,
        symbol: impl Into<String>,
        quantity: Decimal,
        price: Decimal,
        entry_time: DateTime<Utc>,
    ) -> Self {
        Self {
            token_id,
            symbol: symbol.into(),
            quantity,
            avg_entry_price: price,
            current_price: price,
            entry_time,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            stop_loss_price: None,
            take_profit_price: None,
        }
    }

    pub fn current_value(&self) -> Decimal {
        self.quantity * self.current_price
    }

    pub fn entry_value(&self) -> Decimal {
        self.quantity * self.avg_entry_price
    }

    /// Price change since entry, in percent.
    pub fn pnl_percentage(&self) -> Decimal {
        if self.avg_entry_price.is_zero() {
            return Decimal::ZERO;
        }
        (self.current_price - self.avg_entry_price) / self.avg_entry_price * dec!(100)
    }

    /// Marks the position to `price` and refreshes the unrealised PnL.
    pub fn mark(&mut self, price: Decimal) {
        self.current_price = price;
        self.unrealized_pnl = self.quantity * (price - self.avg_entry_price);
    }
}

/// An immutable entry in the trade history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub token_id: TokenId,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Only closing trades realise PnL.
    pub realized_pnl: Option<Decimal>,
}
