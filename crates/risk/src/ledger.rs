// In crates/risk/src/ledger.rs

use crate::types::{ClosePosition, RiskLimits, RiskMetrics, StopTrigger};
use crate::{Error, Result};
use analytics::{AnalyticsEngine, EquityPoint};
use chrono::{DateTime, NaiveDate, Utc};
use core_types::{Position, Side, TokenId, TradeRecord, TriggerKind};
use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// No single position may exceed this fraction of the portfolio value.
pub const MAX_CONCENTRATION: Decimal = dec!(0.25);
/// Base trade notional as a fraction of the portfolio value.
const BASE_PORTFOLIO_FRACTION: Decimal = dec!(0.01);
/// Base trade notional as a fraction of the max position size.
const BASE_MAX_POSITION_FRACTION: Decimal = dec!(0.1);
pub const MAX_TRADE_HISTORY: usize = 1_000;
const MAX_EQUITY_POINTS: usize = 365;

/// The in-memory book: open positions, cash, trade history and the daily
/// equity curve.
///
/// The ledger does no locking and no I/O. `RiskManager` owns exactly one
/// ledger behind its lock and is the only thing that mutates it.
#[derive(Debug)]
pub struct PositionLedger {
    limits: RiskLimits,
    positions: BTreeMap<TokenId, Position>,
    cash: Decimal,
    trades: VecDeque<TradeRecord>,
    equity_curve: Vec<EquityPoint>,
}

impl PositionLedger {
    pub fn new(limits: RiskLimits) -> Self {
        let cash = limits.initial_capital;
        Self {
            limits,
            positions: BTreeMap::new(),
            cash,
            trades: VecDeque::with_capacity(MAX_TRADE_HISTORY),
            equity_curve: Vec::new(),
        }
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn get(&self, token_id: &TokenId) -> Option<&Position> {
        self.positions.get(token_id)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn trades(&self) -> impl Iterator<Item = &TradeRecord> {
        self.trades.iter()
    }

    /// Sum of the marked values of all open positions.
    pub fn total_exposure(&self) -> Decimal {
        self.positions.values().map(Position::current_value).sum()
    }

    /// Cash plus exposure.
    pub fn portfolio_value(&self) -> Decimal {
        self.cash + self.total_exposure()
    }

    /// Checks a proposed trade against the portfolio limits without touching state.
    pub fn validate_trade(&self, token_id: &TokenId, side: Side, quantity: Decimal, price: Decimal) -> Result<()> {
        if quantity <= Decimal::ZERO || price <= Decimal::ZERO {
            return Err(Error::Vetoed {
                reason: format!("Quantity and price must be positive (quantity {quantity}, price {price})"),
            });
        }

        let trade_value = quantity * price;
        match side {
            Side::Buy => {
                let current_value = self.get(token_id).map(Position::current_value).unwrap_or_default();
                let new_position_value = current_value + trade_value;
                if new_position_value > self.limits.max_position_size {
                    return Err(Error::Vetoed {
                        reason: format!(
                            "Position size limit exceeded: ${:.2} > ${:.2}",
                            new_position_value, self.limits.max_position_size
                        ),
                    });
                }

                let new_exposure = self.total_exposure() + trade_value;
                if new_exposure > self.limits.max_total_exposure {
                    return Err(Error::Vetoed {
                        reason: format!(
                            "Total exposure limit exceeded: ${:.2} > ${:.2}",
                            new_exposure, self.limits.max_total_exposure
                        ),
                    });
                }

                // A buy at market converts cash into position value, so the
                // portfolio value after the trade equals the current one.
                let portfolio_value = self.portfolio_value();
                if portfolio_value > Decimal::ZERO {
                    let concentration = new_position_value / portfolio_value;
                    if concentration > MAX_CONCENTRATION {
                        return Err(Error::Vetoed {
                            reason: format!(
                                "Concentration risk: {:.1}% > {:.0}%",
                                concentration * dec!(100),
                                MAX_CONCENTRATION * dec!(100)
                            ),
                        });
                    }
                }
            }
            Side::Sell => {
                let Some(position) = self.get(token_id) else {
                    return Err(Error::Vetoed {
                        reason: "No position to sell".to_string(),
                    });
                };
                if quantity > position.quantity {
                    return Err(Error::Vetoed {
                        reason: format!("Insufficient position: {} < {}", position.quantity, quantity),
                    });
                }
            }
        }

        Ok(())
    }

    /// Token quantity to buy at `price` for a signal of the given confidence.
    /// Zero means "do not trade".
    pub fn position_size(&self, price: Decimal, confidence_score: f64) -> Decimal {
        if price <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let base_notional = (self.portfolio_value() * BASE_PORTFOLIO_FRACTION)
            .min(self.limits.max_position_size * BASE_MAX_POSITION_FRACTION);
        let adjusted_notional = base_notional * confidence_to_decimal(confidence_score);
        let headroom = self.limits.max_total_exposure - self.total_exposure();
        let capped_notional = adjusted_notional.min(self.limits.max_position_size).min(headroom);

        if capped_notional <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        capped_notional / price
    }

    /// Opens or averages into a position. Thresholds are set only when the
    /// position is first opened.
    pub fn add(
        &mut self,
        token_id: &TokenId,
        symbol: &str,
        quantity: Decimal,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(Position, TradeRecord)> {
        if quantity <= Decimal::ZERO || price <= Decimal::ZERO {
            return Err(Error::InvalidParameters(format!(
                "cannot add {quantity} @ {price} to {token_id}"
            )));
        }

        let stop_loss = price * (Decimal::ONE - self.limits.stop_loss_pct);
        let take_profit = price * (Decimal::ONE + self.limits.take_profit_pct);

        let position = self
            .positions
            .entry(token_id.clone())
            .and_modify(|pos| {
                let total_quantity = pos.quantity + quantity;
                let total_cost = pos.quantity * pos.avg_entry_price + quantity * price;
                pos.avg_entry_price = total_cost / total_quantity;
                pos.quantity = total_quantity;
                pos.unrealized_pnl = pos.quantity * (pos.current_price - pos.avg_entry_price);
            })
            .or_insert_with(|| {
                let mut pos = Position::open(token_id.clone(), symbol, quantity, price, now);
                pos.stop_loss_price = Some(stop_loss);
                pos.take_profit_price = Some(take_profit);
                pos
            })
            .clone();

        self.cash -= quantity * price;
        let record = self.record_trade(token_id, Side::Buy, quantity, price, None, now);
        Ok((position, record))
    }

    /// Sells `quantity` out of a position at `exit_price`.
    ///
    /// Returns the realised PnL, the remaining position (`None` once closed)
    /// and the trade record. On error the ledger is left untouched.
    pub fn reduce(
        &mut self,
        token_id: &TokenId,
        quantity: Decimal,
        exit_price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(Decimal, Option<Position>, TradeRecord)> {
        if quantity <= Decimal::ZERO || exit_price < Decimal::ZERO {
            return Err(Error::InvalidParameters(format!(
                "cannot reduce {token_id} by {quantity} @ {exit_price}"
            )));
        }
        let position = self
            .positions
            .get_mut(token_id)
            .ok_or_else(|| Error::PositionNotFound(token_id.clone()))?;
        if quantity > position.quantity {
            return Err(Error::InsufficientPosition {
                held: position.quantity,
                requested: quantity,
            });
        }

        let realized_pnl = quantity * (exit_price - position.avg_entry_price);
        position.quantity -= quantity;
        position.realized_pnl += realized_pnl;
        position.unrealized_pnl = position.quantity * (position.current_price - position.avg_entry_price);

        let remaining = if position.quantity <= Decimal::ZERO {
            self.positions.remove(token_id);
            None
        } else {
            Some(position.clone())
        };

        self.cash += quantity * exit_price;
        let record = self.record_trade(token_id, Side::Sell, quantity, exit_price, Some(realized_pnl), now);
        Ok((realized_pnl, remaining, record))
    }

    /// Marks every held token present in `prices` and records today's equity.
    /// Returns how many positions were repriced.
    pub fn mark_prices(&mut self, prices: &HashMap<TokenId, Decimal>, today: NaiveDate) -> usize {
        let mut updated = 0;
        for (token_id, price) in prices {
            if *price < Decimal::ZERO {
                continue;
            }
            if let Some(position) = self.positions.get_mut(token_id) {
                position.mark(*price);
                updated += 1;
            }
        }
        self.record_equity(today);
        updated
    }

    /// Positions whose current price crossed a threshold. Stop-loss is checked
    /// first, so a position yields at most one trigger.
    pub fn triggers(&self) -> Vec<StopTrigger> {
        self.positions
            .values()
            .filter_map(|pos| {
                let (kind, trigger_price) = match (pos.stop_loss_price, pos.take_profit_price) {
                    (Some(sl), _) if pos.current_price <= sl => (TriggerKind::StopLoss, sl),
                    (_, Some(tp)) if pos.current_price >= tp => (TriggerKind::TakeProfit, tp),
                    _ => return None,
                };
                Some(StopTrigger {
                    token_id: pos.token_id.clone(),
                    symbol: pos.symbol.clone(),
                    kind,
                    current_price: pos.current_price,
                    trigger_price,
                    quantity: pos.quantity,
                    pnl_pct: pos.pnl_percentage(),
                })
            })
            .collect()
    }

    pub fn metrics(&self, today: NaiveDate) -> RiskMetrics {
        let exposure = self.total_exposure();
        let portfolio_value = self.cash + exposure;
        let trades: Vec<TradeRecord> = self.trades.iter().cloned().collect();
        let stats = AnalyticsEngine::new().calculate(&trades, &self.equity_curve, today);

        let largest_position_pct = match self.positions.values().map(Position::current_value).max() {
            Some(largest) if portfolio_value > Decimal::ZERO => {
                (largest / portfolio_value).to_f64().unwrap_or(0.0)
            }
            _ => 0.0,
        };

        RiskMetrics {
            total_portfolio_value: portfolio_value,
            cash: self.cash,
            total_exposure: exposure,
            largest_position_pct,
            total_unrealized_pnl: self.positions.values().map(|p| p.unrealized_pnl).sum(),
            number_of_positions: self.positions.len(),
            daily_pnl: stats.daily_pnl,
            realized_pnl: stats.realized_pnl,
            max_drawdown: stats.max_drawdown,
            sharpe_ratio: stats.sharpe_ratio,
            win_rate: stats.win_rate,
        }
    }

    /// Everything that must be sold to flatten the book.
    pub fn close_all(&self) -> Vec<ClosePosition> {
        self.positions
            .values()
            .map(|pos| ClosePosition {
                token_id: pos.token_id.clone(),
                symbol: pos.symbol.clone(),
                quantity: pos.quantity,
                current_price: pos.current_price,
                reason: "emergency_close".to_string(),
            })
            .collect()
    }

    /// Reloads positions persisted by a previous run. Cash is reconstructed as
    /// the initial capital minus the cost basis of the restored book.
    pub fn restore(&mut self, positions: Vec<Position>) {
        for position in positions {
            if position.quantity <= Decimal::ZERO {
                continue;
            }
            self.positions.insert(position.token_id.clone(), position);
        }
        self.cash = self.limits.initial_capital - self.positions.values().map(Position::entry_value).sum::<Decimal>();
    }

    fn record_trade(
        &mut self,
        token_id: &TokenId,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        realized_pnl: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> TradeRecord {
        let record = TradeRecord {
            timestamp: now,
            token_id: token_id.clone(),
            side,
            quantity,
            price,
            realized_pnl,
        };
        if self.trades.len() >= MAX_TRADE_HISTORY {
            self.trades.pop_front();
        }
        self.trades.push_back(record.clone());
        record
    }

    fn record_equity(&mut self, today: NaiveDate) {
        let value = self.portfolio_value();
        match self.equity_curve.last_mut() {
            Some(last) if last.date == today => last.value = value,
            _ => {
                if self.equity_curve.len() >= MAX_EQUITY_POINTS {
                    self.equity_curve.remove(0);
                }
                self.equity_curve.push(EquityPoint { date: today, value });
            }
        }
    }
}

fn confidence_to_decimal(confidence_score: f64) -> Decimal {
    if !confidence_score.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_f64(confidence_score.clamp(0.0, 1.0)).unwrap_or(Decimal::ZERO)
}
