// In crates/risk/src/manager.rs

use crate::ledger::PositionLedger;
use crate::types::{ClosePosition, RiskLimits, RiskMetrics, RiskSettings, StopTrigger};
use crate::Result;
use chrono::Utc;
use core_types::{Position, Side, TokenId, TradeRecord};
use database::PersistenceSink;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Gatekeeper for every change to capital exposure.
///
/// The manager owns the position ledger and the trade history. Every read and
/// write goes through a single lock, so price updates from a background task
/// and trade execution from the decision loop are serialised.
pub struct RiskManager {
    ledger: Mutex<PositionLedger>,
    sink: Arc<dyn PersistenceSink>,
}

impl RiskManager {
    /// Creates a new `RiskManager` from its configured settings.
    pub fn new(settings: &RiskSettings, sink: Arc<dyn PersistenceSink>) -> Result<Self> {
        Ok(Self::with_limits(settings.to_limits()?, sink))
    }

    pub fn with_limits(limits: RiskLimits, sink: Arc<dyn PersistenceSink>) -> Self {
        Self {
            ledger: Mutex::new(PositionLedger::new(limits)),
            sink,
        }
    }

    /// Loads positions persisted by an earlier run into the ledger.
    pub async fn restore_positions(&self, positions: Vec<Position>) {
        let mut ledger = self.ledger.lock().await;
        ledger.restore(positions);
        tracing::info!(positions = ledger.len(), cash = %ledger.cash(), "Restored positions from storage.");
    }

    /// Checks whether a trade is allowed. Never mutates state.
    ///
    /// Returns `Err(Error::Vetoed)` with a human-readable reason when a limit
    /// would be breached.
    pub async fn validate_trade(&self, token_id: &TokenId, side: Side, quantity: Decimal, price: Decimal) -> Result<()> {
        self.ledger.lock().await.validate_trade(token_id, side, quantity, price)
    }

    /// Token quantity to buy for a signal of the given confidence; zero means
    /// the trade should not be placed. `price` must be positive.
    pub async fn calculate_position_size(&self, token_id: &TokenId, price: Decimal, confidence_score: f64) -> Decimal {
        let quantity = self.ledger.lock().await.position_size(price, confidence_score);
        tracing::debug!(token = %token_id, %price, confidence_score, %quantity, "Calculated position size.");
        quantity
    }

    /// Records a filled buy. A new position gets stop-loss and take-profit
    /// thresholds from its entry price; averaging into an existing position
    /// keeps the original thresholds.
    pub async fn add_position(&self, token_id: &TokenId, symbol: &str, quantity: Decimal, price: Decimal) -> Result<()> {
        let mut ledger = self.ledger.lock().await;
        let existed = ledger.get(token_id).is_some();
        let (position, record) = ledger.add(token_id, symbol, quantity, price, Utc::now())?;

        if existed {
            tracing::info!(
                token = %token_id,
                symbol,
                quantity = %position.quantity,
                avg_entry_price = %position.avg_entry_price,
                "Updated position."
            );
        } else {
            tracing::info!(
                token = %token_id,
                symbol,
                %quantity,
                %price,
                stop_loss = ?position.stop_loss_price,
                take_profit = ?position.take_profit_price,
                "Opened new position."
            );
        }

        self.persist_position(&position).await;
        self.persist_trade(&record).await;
        Ok(())
    }

    /// Records a filled sell and returns the realised PnL.
    ///
    /// Fails with `PositionNotFound` or `InsufficientPosition` without
    /// touching the ledger. A position reduced to zero is closed and removed.
    pub async fn reduce_position(&self, token_id: &TokenId, quantity: Decimal, exit_price: Decimal) -> Result<Decimal> {
        let mut ledger = self.ledger.lock().await;
        let (realized_pnl, remaining, record) = match ledger.reduce(token_id, quantity, exit_price, Utc::now()) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(token = %token_id, %quantity, error = %e, "Rejected position reduction.");
                return Err(e);
            }
        };

        match &remaining {
            Some(position) => {
                tracing::info!(token = %token_id, %quantity, remaining = %position.quantity, pnl = %realized_pnl, "Reduced position.");
                self.persist_position(position).await;
            }
            None => {
                tracing::info!(token = %token_id, %quantity, pnl = %realized_pnl, "Closed position.");
                if let Err(e) = self.sink.delete_position(token_id).await {
                    tracing::warn!(token = %token_id, error = %e, "Failed to delete closed position snapshot.");
                }
            }
        }
        self.persist_trade(&record).await;

        Ok(realized_pnl)
    }

    /// Marks held positions to the given prices. Tokens not held are ignored.
    ///
    /// Threshold checks are a separate step (`check_stop_losses`) so a batch of
    /// prices is evaluated once.
    pub async fn update_prices(&self, prices: &HashMap<TokenId, Decimal>) -> usize {
        let updated = self.ledger.lock().await.mark_prices(prices, Utc::now().date_naive());
        tracing::debug!(received = prices.len(), updated, "Updated position prices.");
        updated
    }

    /// Positions that crossed a threshold. Does not close anything.
    pub async fn check_stop_losses(&self) -> Vec<StopTrigger> {
        let triggers = self.ledger.lock().await.triggers();
        for trigger in &triggers {
            tracing::warn!(
                token = %trigger.token_id,
                symbol = %trigger.symbol,
                kind = %trigger.kind,
                current_price = %trigger.current_price,
                trigger_price = %trigger.trigger_price,
                "Risk threshold crossed."
            );
        }
        triggers
    }

    pub async fn get_risk_metrics(&self) -> RiskMetrics {
        self.ledger.lock().await.metrics(Utc::now().date_naive())
    }

    /// Lists every position that needs forced liquidation. Does not close anything.
    pub async fn emergency_close_all(&self) -> Vec<ClosePosition> {
        let positions = self.ledger.lock().await.close_all();
        tracing::error!(count = positions.len(), "EMERGENCY CLOSE ALL POSITIONS TRIGGERED");
        positions
    }

    pub async fn position(&self, token_id: &TokenId) -> Option<Position> {
        self.ledger.lock().await.get(token_id).cloned()
    }

    pub async fn positions(&self) -> Vec<Position> {
        self.ledger.lock().await.positions().cloned().collect()
    }

    pub async fn trade_history(&self) -> Vec<TradeRecord> {
        self.ledger.lock().await.trades().cloned().collect()
    }

    async fn persist_position(&self, position: &Position) {
        if let Err(e) = self.sink.save_position(position).await {
            tracing::warn!(token = %position.token_id, error = %e, "Failed to save position snapshot.");
        }
    }

    async fn persist_trade(&self, record: &TradeRecord) {
        if let Err(e) = self.sink.save_trade(record).await {
            tracing::warn!(token = %record.token_id, error = %e, "Failed to save trade record.");
        }
    }
}
