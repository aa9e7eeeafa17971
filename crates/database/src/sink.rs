// In crates/database/src/sink.rs

use crate::Result;
use async_trait::async_trait;
use core_types::{OrderStatus, Position, TokenCandidate, TokenId, TradeRecord};

/// The durable, append-mostly log the trading core writes to.
///
/// The core never reads back through this interface while trading; it only
/// records token snapshots, position snapshots, trades and every observed
/// order status.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Appends one observed status for an order.
    async fn save_order_status(&self, order_id: &str, status: OrderStatus) -> Result<()>;

    /// Upserts the snapshot of an open position, keyed by token.
    async fn save_position(&self, position: &Position) -> Result<()>;

    /// Drops the snapshot of a position that has been closed.
    async fn delete_position(&self, token_id: &TokenId) -> Result<()>;

    /// Appends a trade to the trade log.
    async fn save_trade(&self, trade: &TradeRecord) -> Result<()>;

    /// Upserts the latest snapshot of a discovered token.
    async fn save_token_snapshot(&self, candidate: &TokenCandidate) -> Result<()>;
}
