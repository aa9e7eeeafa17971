// In crates/database/src/memory.rs

use crate::{PersistenceSink, Result};
use async_trait::async_trait;
use core_types::{OrderStatus, Position, TokenCandidate, TokenId, TradeRecord};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Records {
    order_statuses: Vec<(String, OrderStatus)>,
    positions: HashMap<TokenId, Position>,
    trades: Vec<TradeRecord>,
    tokens: HashMap<TokenId, TokenCandidate>,
}

/// A sink that keeps everything in memory. Used by paper runs that should not
/// touch disk, and by tests that want to inspect what the core persisted.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Records>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn order_statuses(&self) -> Vec<(String, OrderStatus)> {
        self.records.lock().await.order_statuses.clone()
    }

    pub async fn positions(&self) -> HashMap<TokenId, Position> {
        self.records.lock().await.positions.clone()
    }

    pub async fn trades(&self) -> Vec<TradeRecord> {
        self.records.lock().await.trades.clone()
    }

    pub async fn token_count(&self) -> usize {
        self.records.lock().await.tokens.len()
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    async fn save_order_status(&self, order_id: &str, status: OrderStatus) -> Result<()> {
        self.records
            .lock()
            .await
            .order_statuses
            .push((order_id.to_string(), status));
        Ok(())
    }

    async fn save_position(&self, position: &Position) -> Result<()> {
        self.records
            .lock()
            .await
            .positions
            .insert(position.token_id.clone(), position.clone());
        Ok(())
    }

    async fn delete_position(&self, token_id: &TokenId) -> Result<()> {
        self.records.lock().await.positions.remove(token_id);
        Ok(())
    }

    async fn save_trade(&self, trade: &TradeRecord) -> Result<()> {
        self.records.lock().await.trades.push(trade.clone());
        Ok(())
    }

    async fn save_token_snapshot(&self, candidate: &TokenCandidate) -> Result<()> {
        self.records
            .lock()
            .await
            .tokens
            .insert(candidate.address.clone(), candidate.clone());
        Ok(())
    }
}
