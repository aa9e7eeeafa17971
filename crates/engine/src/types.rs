// In crates/engine/src/types.rs

use app_config::Settings;
use core_types::{Side, TokenId, TradingMode};
use risk::RiskMetrics;
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// What a single `execute_trade` call did.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeOutcome {
    /// An order was filled and the ledger updated.
    Executed {
        side: Side,
        quantity: Decimal,
        price: Decimal,
        /// Only set for sells.
        realized_pnl: Option<Decimal>,
    },
    /// A trade was wanted but deliberately not placed.
    Skipped { reason: String },
    /// Nothing needed doing.
    NoAction,
}

#[derive(Debug, Clone)]
pub struct TraderSettings {
    pub default_slippage: f64,
    pub max_slippage: f64,
    /// How long a live order is monitored before it is cancelled.
    pub order_timeout: Duration,
    /// Age beyond which a tracked order counts as stuck.
    pub stuck_order_threshold: Duration,
}

impl TraderSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            default_slippage: settings.trading.default_slippage,
            max_slippage: settings.trading.max_slippage,
            order_timeout: settings.monitor.order_timeout(),
            stuck_order_threshold: settings.monitor.stuck_order_threshold(),
        }
    }
}

impl Default for TraderSettings {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// An order submitted to the broker that has not reached a terminal status.
#[derive(Debug, Clone)]
pub(crate) struct OpenOrder {
    pub token_id: TokenId,
    pub side: Side,
    pub placed_at: Instant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TradeStats {
    pub total_trades: u64,
    pub successful_trades: u64,
    pub failed_trades: u64,
}

impl TradeStats {
    /// Fraction of submitted orders that filled. 1.0 before the first order.
    pub fn success_rate(&self) -> f64 {
        if self.total_trades == 0 {
            return 1.0;
        }
        self.successful_trades as f64 / self.total_trades as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    #[serde(flatten)]
    pub risk: RiskMetrics,
    #[serde(flatten)]
    pub stats: TradeStats,
    pub success_rate: f64,
    pub open_orders: usize,
    pub trading_mode: TradingMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub broker_connected: bool,
    pub stuck_orders: usize,
    pub success_rate: f64,
    pub trading_mode: TradingMode,
    /// Human-readable reasons the trader is unhealthy.
    pub issues: Vec<String>,
}
