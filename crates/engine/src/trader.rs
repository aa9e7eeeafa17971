// In crates/engine/src/trader.rs

use crate::types::{HealthStatus, OpenOrder, PortfolioSummary, TradeOutcome, TradeStats, TraderSettings};
use crate::{Error, Result};
use core_types::{OrderStatus, Rating, Side, TokenCandidate, TokenId, TradingMode};
use execution::{Broker, OrderMonitor, OrderRequest};
use risk::RiskManager;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

const MIN_HEALTHY_SUCCESS_RATE: f64 = 0.7;

/// Turns trading signals into broker orders, under the risk manager's control.
///
/// Every public entry point takes `&self`, so a single `Arc<Trader>` can be
/// shared between the decision loop, the price refresher and the shutdown
/// handler.
pub struct Trader {
    risk: Arc<RiskManager>,
    broker: Arc<dyn Broker>,
    monitor: OrderMonitor,
    settings: TraderSettings,
    open_orders: Mutex<HashMap<String, OpenOrder>>,
    stats: Mutex<TradeStats>,
    /// Tokens with a sell order in flight. At most one close runs per token.
    closing: std::sync::Mutex<HashSet<TokenId>>,
}

/// Releases a token's close slot when dropped, including when the owning
/// future is cancelled mid-order.
struct CloseClaim<'a> {
    closing: &'a std::sync::Mutex<HashSet<TokenId>>,
    token_id: TokenId,
}

impl Drop for CloseClaim<'_> {
    fn drop(&mut self) {
        self.closing.lock().unwrap_or_else(|e| e.into_inner()).remove(&self.token_id);
    }
}

impl Trader {
    pub fn new(risk: Arc<RiskManager>, broker: Arc<dyn Broker>, monitor: OrderMonitor, settings: TraderSettings) -> Self {
        tracing::info!(broker = broker.name(), mode = %broker.mode(), "Creating trader.");
        Self {
            risk,
            broker,
            monitor,
            settings,
            open_orders: Mutex::new(HashMap::new()),
            stats: Mutex::new(TradeStats::default()),
            closing: std::sync::Mutex::new(HashSet::new()),
        }
    }

    pub fn mode(&self) -> TradingMode {
        self.broker.mode()
    }

    /// Acts on a rated token. Returns `true` when the requested action was
    /// carried out or nothing needed doing.
    ///
    /// Never fails: every error is logged and reported as `false`, so the
    /// decision loop keeps running across tokens.
    pub async fn execute_trade(
        &self,
        token_id: &TokenId,
        rating: Rating,
        token: &TokenCandidate,
        confidence_score: f64,
        max_slippage: f64,
    ) -> bool {
        match self.try_execute_trade(token_id, rating, token, confidence_score, max_slippage).await {
            Ok(TradeOutcome::Executed { side, quantity, price, realized_pnl }) => {
                tracing::info!(token = %token_id, symbol = %token.symbol, %rating, %side, %quantity, %price, ?realized_pnl, "Trade executed.");
                true
            }
            Ok(TradeOutcome::NoAction) => {
                tracing::debug!(token = %token_id, symbol = %token.symbol, %rating, "No action required.");
                true
            }
            Ok(TradeOutcome::Skipped { reason }) => {
                tracing::info!(token = %token_id, symbol = %token.symbol, %rating, %reason, "Trade skipped.");
                false
            }
            Err(e) => {
                tracing::error!(token = %token_id, symbol = %token.symbol, %rating, error = %e, "Trade failed.");
                false
            }
        }
    }

    pub async fn try_execute_trade(
        &self,
        token_id: &TokenId,
        rating: Rating,
        token: &TokenCandidate,
        confidence_score: f64,
        max_slippage: f64,
    ) -> Result<TradeOutcome> {
        if token.price > Decimal::ZERO {
            self.broker.observe_price(token_id, token.price).await;
        }
        match rating {
            Rating::Bullish => self.buy(token_id, &token.symbol, token.price, confidence_score, max_slippage).await,
            // Long-only: a bearish view closes what we hold and never opens a short.
            Rating::Bearish => self.sell(token_id, token.price, max_slippage, "bearish_signal").await,
            Rating::Neutral => self.manage_position(token_id, token.price).await,
        }
    }

    async fn buy(
        &self,
        token_id: &TokenId,
        symbol: &str,
        price: Decimal,
        confidence_score: f64,
        slippage: f64,
    ) -> Result<TradeOutcome> {
        if price <= Decimal::ZERO {
            return Ok(TradeOutcome::Skipped {
                reason: format!("invalid price {price}"),
            });
        }

        let quantity = self.risk.calculate_position_size(token_id, price, confidence_score).await;
        if quantity.is_zero() {
            return Ok(TradeOutcome::Skipped {
                reason: "position size is zero".to_string(),
            });
        }

        match self.risk.validate_trade(token_id, Side::Buy, quantity, price).await {
            Ok(()) => {}
            Err(risk::Error::Vetoed { reason }) => {
                tracing::warn!(token = %token_id, %symbol, %quantity, %price, %reason, "Buy vetoed by risk manager.");
                return Ok(TradeOutcome::Skipped { reason });
            }
            Err(e) => return Err(e.into()),
        }

        let fill_price = self.submit(token_id, symbol, Side::Buy, quantity, price, slippage).await?;
        let booked = self.risk.add_position(token_id, symbol, quantity, fill_price).await;
        self.settle(booked).await?;

        Ok(TradeOutcome::Executed {
            side: Side::Buy,
            quantity,
            price: fill_price,
            realized_pnl: None,
        })
    }

    /// Sells the whole holding. Selling a token we do not hold is a no-op.
    async fn sell(&self, token_id: &TokenId, price: Decimal, slippage: f64, reason: &str) -> Result<TradeOutcome> {
        let Some(position) = self.risk.position(token_id).await else {
            tracing::debug!(token = %token_id, reason, "Nothing to sell.");
            return Ok(TradeOutcome::NoAction);
        };
        let price = if price > Decimal::ZERO { price } else { position.current_price };
        self.close(token_id, &position.symbol, position.quantity, price, slippage, reason).await
    }

    async fn close(
        &self,
        token_id: &TokenId,
        symbol: &str,
        quantity: Decimal,
        price: Decimal,
        slippage: f64,
        reason: &str,
    ) -> Result<TradeOutcome> {
        let Some(_claim) = self.claim_close(token_id) else {
            tracing::debug!(token = %token_id, reason, "Close already in flight.");
            return Ok(TradeOutcome::NoAction);
        };
        // The ledger may have moved while we waited for the claim.
        let Some(held) = self.risk.position(token_id).await.map(|p| p.quantity) else {
            tracing::debug!(token = %token_id, reason, "Position already closed.");
            return Ok(TradeOutcome::NoAction);
        };
        let quantity = quantity.min(held);

        tracing::info!(token = %token_id, %symbol, %quantity, %price, reason, "Closing position.");
        let fill_price = self.submit(token_id, symbol, Side::Sell, quantity, price, slippage).await?;
        let reduced = self.risk.reduce_position(token_id, quantity, fill_price).await;
        let realized_pnl = self.settle(reduced).await?;
        tracing::info!(token = %token_id, %symbol, reason, pnl = %realized_pnl, "Position closed.");

        Ok(TradeOutcome::Executed {
            side: Side::Sell,
            quantity,
            price: fill_price,
            realized_pnl: Some(realized_pnl),
        })
    }

    /// Re-prices one token and sells it if a stop-loss or take-profit fired.
    async fn manage_position(&self, token_id: &TokenId, price: Decimal) -> Result<TradeOutcome> {
        if price > Decimal::ZERO {
            self.risk.update_prices(&HashMap::from([(token_id.clone(), price)])).await;
        }

        let trigger = self
            .risk
            .check_stop_losses()
            .await
            .into_iter()
            .find(|t| &t.token_id == token_id);

        match trigger {
            Some(t) => {
                tracing::warn!(token = %token_id, symbol = %t.symbol, kind = %t.kind, price = %t.current_price, trigger_price = %t.trigger_price, "Exit threshold crossed.");
                self.close(token_id, &t.symbol, t.quantity, t.current_price, self.settings.default_slippage, t.kind.as_str())
                    .await
            }
            None => Ok(TradeOutcome::NoAction),
        }
    }

    fn claim_close(&self, token_id: &TokenId) -> Option<CloseClaim<'_>> {
        let mut closing = self.closing.lock().unwrap_or_else(|e| e.into_inner());
        if !closing.insert(token_id.clone()) {
            return None;
        }
        Some(CloseClaim {
            closing: &self.closing,
            token_id: token_id.clone(),
        })
    }

    /// Books the ledger side of a filled order into the trade stats. A trade
    /// only counts as successful once the ledger has accepted it.
    async fn settle<T>(&self, booked: risk::Result<T>) -> Result<T> {
        let mut stats = self.stats.lock().await;
        match booked {
            Ok(value) => {
                stats.successful_trades += 1;
                Ok(value)
            }
            Err(e) => {
                stats.failed_trades += 1;
                Err(e.into())
            }
        }
    }

    /// Submits a market order and waits for it to fill. Returns the fill price.
    ///
    /// Counts the attempt and any broker-side failure; success is recorded by
    /// `settle` once the ledger is updated.
    async fn submit(
        &self,
        token_id: &TokenId,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        slippage: f64,
    ) -> Result<Decimal> {
        let slippage = slippage.min(self.settings.max_slippage);
        let order = OrderRequest::market(token_id.clone(), side, quantity, slippage, price);
        self.stats.lock().await.total_trades += 1;

        let ack = match self.broker.place_order(&order).await {
            Ok(ack) => ack,
            Err(e) => {
                self.stats.lock().await.failed_trades += 1;
                return Err(e.into());
            }
        };

        let filled = match ack.status {
            OrderStatus::Filled => true,
            status if status.is_terminal() => false,
            _ => {
                self.open_orders.lock().await.insert(
                    ack.order_id.clone(),
                    OpenOrder {
                        token_id: token_id.clone(),
                        side,
                        placed_at: Instant::now(),
                    },
                );
                let filled = self.monitor.monitor_order(&ack.order_id, symbol, self.settings.order_timeout).await;
                self.open_orders.lock().await.remove(&ack.order_id);
                filled
            }
        };

        if !filled {
            self.stats.lock().await.failed_trades += 1;
            return Err(Error::NotFilled { order_id: ack.order_id });
        }
        Ok(ack.fill_price.unwrap_or(price))
    }

    /// Pushes a batch of prices and sells every position whose exit threshold
    /// fired. Returns the number of positions closed.
    pub async fn update_all_positions(&self, prices: &HashMap<TokenId, Decimal>) -> usize {
        let updated = self.risk.update_prices(prices).await;
        tracing::debug!(updated, "Updated position prices.");

        let mut closed = 0;
        for trigger in self.risk.check_stop_losses().await {
            let reason = format!("auto_{}", trigger.kind.as_str());
            tracing::warn!(token = %trigger.token_id, symbol = %trigger.symbol, %reason, price = %trigger.current_price, "Exit threshold crossed.");
            match self
                .close(
                    &trigger.token_id,
                    &trigger.symbol,
                    trigger.quantity,
                    trigger.current_price,
                    self.settings.default_slippage,
                    &reason,
                )
                .await
            {
                Ok(TradeOutcome::Executed { .. }) => closed += 1,
                Ok(_) => tracing::debug!(token = %trigger.token_id, %reason, "Automatic exit not needed."),
                Err(e) => tracing::error!(token = %trigger.token_id, %reason, error = %e, "Automatic exit failed."),
            }
        }
        closed
    }

    /// Quotes every held token through the broker, then runs
    /// `update_all_positions` with whatever prices came back.
    pub async fn refresh_prices(&self) -> usize {
        let mut prices = HashMap::new();
        for position in self.risk.positions().await {
            match self.broker.get_token_info(&position.token_id).await {
                Ok(quote) if quote.price > Decimal::ZERO => {
                    prices.insert(position.token_id, quote.price);
                }
                Ok(quote) => tracing::warn!(token = %position.token_id, price = %quote.price, "Ignoring non-positive quote."),
                Err(e) => tracing::warn!(token = %position.token_id, error = %e, "Failed to quote held token."),
            }
        }
        if prices.is_empty() {
            return 0;
        }
        self.update_all_positions(&prices).await
    }

    /// Cancels every tracked order and liquidates the whole book.
    ///
    /// Best-effort: individual failures are logged and the procedure carries
    /// on. Returns `true` once every step has been attempted.
    pub async fn emergency_stop(&self) -> bool {
        tracing::error!("EMERGENCY STOP initiated.");

        let orders: Vec<(String, OpenOrder)> = self.open_orders.lock().await.drain().collect();
        for (order_id, order) in orders {
            match self.broker.cancel_order(&order_id).await {
                Ok(true) => tracing::info!(%order_id, token = %order.token_id, side = %order.side, "Cancelled open order."),
                Ok(false) => tracing::warn!(%order_id, token = %order.token_id, "Venue refused to cancel open order."),
                Err(e) => tracing::error!(%order_id, token = %order.token_id, error = %e, "Failed to cancel open order."),
            }
        }

        let closes = self.risk.emergency_close_all().await;
        let total = closes.len();
        let mut failed = 0;
        for close in closes {
            if let Err(e) = self
                .close(
                    &close.token_id,
                    &close.symbol,
                    close.quantity,
                    close.current_price,
                    self.settings.max_slippage,
                    &close.reason,
                )
                .await
            {
                failed += 1;
                tracing::error!(token = %close.token_id, symbol = %close.symbol, error = %e, "Emergency liquidation failed.");
            }
        }

        tracing::warn!(positions = total, failed, "Emergency stop completed.");
        true
    }

    pub async fn get_portfolio_summary(&self) -> PortfolioSummary {
        let risk = self.risk.get_risk_metrics().await;
        let stats = *self.stats.lock().await;
        let open_orders = self.open_orders.lock().await.len();
        PortfolioSummary {
            risk,
            stats,
            success_rate: stats.success_rate(),
            open_orders,
            trading_mode: self.broker.mode(),
        }
    }

    pub async fn health_check(&self) -> HealthStatus {
        let trading_mode = self.broker.mode();
        let broker_connected = match trading_mode {
            TradingMode::Paper => true,
            TradingMode::Live => self.broker.health_check().await,
        };
        let stuck_orders = self
            .open_orders
            .lock()
            .await
            .values()
            .filter(|o| o.placed_at.elapsed() > self.settings.stuck_order_threshold)
            .count();
        let success_rate = self.stats.lock().await.success_rate();

        let mut issues = Vec::new();
        if !broker_connected {
            issues.push("broker unreachable".to_string());
        }
        if stuck_orders > 0 {
            issues.push(format!("{stuck_orders} order(s) stuck"));
        }
        if success_rate < MIN_HEALTHY_SUCCESS_RATE {
            issues.push(format!("success rate {:.0}% below threshold", success_rate * 100.0));
        }

        HealthStatus {
            healthy: issues.is_empty(),
            broker_connected,
            stuck_orders,
            success_rate,
            trading_mode,
            issues,
        }
    }
}
