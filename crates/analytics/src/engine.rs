use crate::types::{EquityPoint, PerformanceStats};
use chrono::NaiveDate;
use core_types::TradeRecord;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

/// Trading days used to annualise the Sharpe ratio.
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// The engine responsible for calculating performance metrics from trade data.
#[derive(Default)]
pub struct AnalyticsEngine;

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculates performance figures from the trade history and equity curve.
    /// `today` selects which trades count towards the daily PnL.
    pub fn calculate(
        &self,
        trades: &[TradeRecord],
        equity_curve: &[EquityPoint],
        today: NaiveDate,
    ) -> PerformanceStats {
        let mut stats = PerformanceStats::default();

        // Buys carry no realised PnL and are ignored by every trade metric.
        let closes: Vec<(NaiveDate, Decimal)> = trades
            .iter()
            .filter_map(|t| t.realized_pnl.map(|pnl| (t.timestamp.date_naive(), pnl)))
            .collect();

        stats.closed_trades = closes.len() as u32;
        stats.realized_pnl = closes.iter().map(|(_, pnl)| *pnl).sum();
        stats.daily_pnl = closes
            .iter()
            .filter(|(date, _)| *date == today)
            .map(|(_, pnl)| *pnl)
            .sum();

        if !closes.is_empty() {
            let wins = closes.iter().filter(|(_, pnl)| *pnl > dec!(0)).count();
            stats.win_rate = wins as f64 / closes.len() as f64;

            let gross_profit: Decimal = closes.iter().map(|(_, p)| *p).filter(|p| *p > dec!(0)).sum();
            let gross_loss: Decimal = closes
                .iter()
                .map(|(_, p)| *p)
                .filter(|p| *p < dec!(0))
                .sum::<Decimal>()
                .abs();
            stats.profit_factor = if gross_loss > dec!(0) {
                (gross_profit / gross_loss).to_f64().unwrap_or(0.0)
            } else if gross_profit > dec!(0) {
                f64::INFINITY // Pure profit
            } else {
                0.0
            };
        }

        stats.max_drawdown = Self::max_drawdown(equity_curve);
        stats.sharpe_ratio = Self::sharpe_ratio(equity_curve);

        stats
    }

    fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
        let Some(first) = equity_curve.first() else {
            return 0.0;
        };

        let mut peak = first.value;
        let mut max_drawdown = 0.0;
        for point in equity_curve {
            peak = peak.max(point.value);
            if peak > dec!(0) {
                let drawdown = ((peak - point.value) / peak).to_f64().unwrap_or(0.0);
                if drawdown > max_drawdown {
                    max_drawdown = drawdown;
                }
            }
        }
        max_drawdown
    }

    fn sharpe_ratio(equity_curve: &[EquityPoint]) -> f64 {
        if equity_curve.len() < 2 {
            return 0.0;
        }

        let returns: Vec<f64> = equity_curve
            .windows(2)
            .filter(|w| w[0].value > dec!(0))
            .map(|w| (w[1].value / w[0].value - dec!(1)).to_f64().unwrap_or(0.0))
            .collect();
        if returns.is_empty() {
            return 0.0;
        }

        let mean_return = returns.iter().sum::<f64>() / returns.len() as f64;
        let variance = returns.iter().map(|r| (*r - mean_return).powi(2)).sum::<f64>() / returns.len() as f64;
        let std_dev = variance.sqrt();

        if std_dev > 0.0 {
            mean_return / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
        } else {
            0.0
        }
    }
}
