// In crates/analytics/src/types.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// End-of-day total portfolio value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

/// Performance figures derived from the trade history and the equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct PerformanceStats {
    /// Realised PnL of trades closed on the evaluation day.
    pub daily_pnl: Decimal,
    /// Realised PnL over the whole history.
    pub realized_pnl: Decimal,
    /// Largest peak-to-trough decline, as a fraction of the peak.
    pub max_drawdown: f64,
    /// Winning closes over all closes, as a fraction.
    pub win_rate: f64,
    /// Annualised mean/stddev of day-over-day returns.
    pub sharpe_ratio: f64,
    pub profit_factor: f64,
    pub closed_trades: u32,
}
