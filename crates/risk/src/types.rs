// In crates/risk/src/types.rs

use crate::{Error, Result};
use core_types::{TokenId, TriggerKind};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Portfolio limits and exit thresholds, as read from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskSettings {
    /// Capital the book starts with; cash is debited by buys and credited by sells.
    #[serde(default = "default_initial_capital")]
    pub initial_capital_usd: f64,
    /// Largest value a single position may reach.
    #[serde(default = "default_max_position_size")]
    pub max_position_size_usd: f64,
    /// Largest combined value of all open positions.
    #[serde(default = "default_max_total_exposure")]
    pub max_total_exposure_usd: f64,
    /// Fractional distance below entry for the stop-loss (e.g., 0.15 for 15%).
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: f64,
    /// Fractional distance above entry for the take-profit (e.g., 0.5 for 50%).
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: f64,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            initial_capital_usd: default_initial_capital(),
            max_position_size_usd: default_max_position_size(),
            max_total_exposure_usd: default_max_total_exposure(),
            stop_loss_pct: default_stop_loss_pct(),
            take_profit_pct: default_take_profit_pct(),
        }
    }
}

impl RiskSettings {
    pub fn validate(&self) -> Result<()> {
        self.to_limits().map(|_| ())
    }

    /// Converts the configured floats into the exact limits the ledger works with.
    pub fn to_limits(&self) -> Result<RiskLimits> {
        let limits = RiskLimits {
            initial_capital: to_decimal("initial_capital_usd", self.initial_capital_usd)?,
            max_position_size: to_decimal("max_position_size_usd", self.max_position_size_usd)?,
            max_total_exposure: to_decimal("max_total_exposure_usd", self.max_total_exposure_usd)?,
            stop_loss_pct: to_decimal("stop_loss_pct", self.stop_loss_pct)?,
            take_profit_pct: to_decimal("take_profit_pct", self.take_profit_pct)?,
        };
        limits.validate()?;
        Ok(limits)
    }
}

fn to_decimal(name: &str, value: f64) -> Result<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| Error::InvalidParameters(format!("{name} is not a finite number: {value}")))
}

/// Helper functions for serde defaults
fn default_initial_capital() -> f64 { 10_000.0 }
fn default_max_position_size() -> f64 { 1_000.0 }
fn default_max_total_exposure() -> f64 { 5_000.0 }
fn default_stop_loss_pct() -> f64 { 0.15 }
fn default_take_profit_pct() -> f64 { 0.50 }

/// Validated risk limits in exact decimal form.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskLimits {
    pub initial_capital: Decimal,
    pub max_position_size: Decimal,
    pub max_total_exposure: Decimal,
    pub stop_loss_pct: Decimal,
    pub take_profit_pct: Decimal,
}

impl RiskLimits {
    pub fn validate(&self) -> Result<()> {
        if self.initial_capital < Decimal::ZERO {
            return Err(Error::InvalidParameters("initial capital cannot be negative".to_string()));
        }
        if self.max_position_size <= Decimal::ZERO || self.max_total_exposure <= Decimal::ZERO {
            return Err(Error::InvalidParameters(
                "position and exposure limits must be positive".to_string(),
            ));
        }
        if self.stop_loss_pct <= Decimal::ZERO || self.stop_loss_pct >= Decimal::ONE {
            return Err(Error::InvalidParameters(format!(
                "stop_loss_pct must be in (0, 1), got {}",
                self.stop_loss_pct
            )));
        }
        if self.take_profit_pct <= Decimal::ZERO {
            return Err(Error::InvalidParameters(format!(
                "take_profit_pct must be positive, got {}",
                self.take_profit_pct
            )));
        }
        Ok(())
    }
}

/// A position that crossed its stop-loss or take-profit threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopTrigger {
    pub token_id: TokenId,
    pub symbol: String,
    pub kind: TriggerKind,
    pub current_price: Decimal,
    pub trigger_price: Decimal,
    pub quantity: Decimal,
    pub pnl_pct: Decimal,
}

/// A position that must be liquidated during an emergency stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosePosition {
    pub token_id: TokenId,
    pub symbol: String,
    pub quantity: Decimal,
    pub current_price: Decimal,
    pub reason: String,
}

/// An on-demand snapshot of portfolio risk. Never stored, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskMetrics {
    /// Cash plus the marked value of every open position.
    pub total_portfolio_value: Decimal,
    pub cash: Decimal,
    /// Marked value of every open position.
    pub total_exposure: Decimal,
    /// Largest single position as a fraction of the portfolio value.
    pub largest_position_pct: f64,
    pub total_unrealized_pnl: Decimal,
    pub number_of_positions: usize,
    pub daily_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub win_rate: f64,
}
