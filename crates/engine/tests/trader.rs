use async_trait::async_trait;
use core_types::{OrderStatus, Rating, Side, TokenCandidate, TokenId, TradingMode};
use database::MemorySink;
use engine::{Trader, TraderSettings};
use execution::{Broker, Error, OrderAck, OrderMonitor, OrderRequest, Result, TokenQuote};
use risk::{RiskLimits, RiskManager};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// A broker double. Paper-mode orders fill on placement; live-mode orders are
/// acknowledged as pending and fill on the first status poll, except for
/// tokens listed in `stuck`, which never leave `pending`. A non-zero
/// `fill_delay` holds every placement open for that long.
struct StubBroker {
    mode: TradingMode,
    stuck: HashSet<TokenId>,
    fill_delay: Duration,
    placed: Mutex<Vec<OrderRequest>>,
    order_tokens: Mutex<HashMap<String, TokenId>>,
    quotes: Mutex<HashMap<TokenId, Decimal>>,
    reject_orders: AtomicBool,
    fail_cancel: bool,
    healthy: AtomicBool,
    cancels: AtomicUsize,
}

impl StubBroker {
    fn new(mode: TradingMode) -> Self {
        Self {
            mode,
            stuck: HashSet::new(),
            fill_delay: Duration::ZERO,
            placed: Mutex::new(Vec::new()),
            order_tokens: Mutex::new(HashMap::new()),
            quotes: Mutex::new(HashMap::new()),
            reject_orders: AtomicBool::new(false),
            fail_cancel: false,
            healthy: AtomicBool::new(true),
            cancels: AtomicUsize::new(0),
        }
    }

    async fn placed_sides(&self) -> Vec<(TokenId, Side)> {
        self.placed.lock().await.iter().map(|o| (o.token_id.clone(), o.side)).collect()
    }
}

#[async_trait]
impl Broker for StubBroker {
    fn name(&self) -> &'static str {
        "StubBroker"
    }

    fn mode(&self) -> TradingMode {
        self.mode
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck> {
        if !self.fill_delay.is_zero() {
            tokio::time::sleep(self.fill_delay).await;
        }
        let mut placed = self.placed.lock().await;
        placed.push(order.clone());
        if self.reject_orders.load(Ordering::SeqCst) {
            return Err(Error::InsufficientFunds("balance too low".into()));
        }
        let order_id = format!("order-{}", placed.len());
        self.order_tokens.lock().await.insert(order_id.clone(), order.token_id.clone());

        Ok(match self.mode {
            TradingMode::Paper => OrderAck {
                order_id,
                status: OrderStatus::Filled,
                fill_price: Some(order.reference_price),
            },
            TradingMode::Live => OrderAck {
                order_id,
                status: OrderStatus::Pending,
                fill_price: None,
            },
        })
    }

    async fn check_order_status(&self, order_id: &str) -> Result<OrderStatus> {
        let tokens = self.order_tokens.lock().await;
        match tokens.get(order_id) {
            Some(token) if self.stuck.contains(token) => Ok(OrderStatus::Pending),
            Some(_) => Ok(OrderStatus::Filled),
            None => Ok(OrderStatus::Unknown),
        }
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<bool> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        if self.fail_cancel {
            return Err(Error::Transient { reason: "venue unreachable".into() });
        }
        Ok(true)
    }

    async fn get_token_info(&self, token_id: &TokenId) -> Result<TokenQuote> {
        let quotes = self.quotes.lock().await;
        let price = quotes
            .get(token_id)
            .copied()
            .ok_or_else(|| Error::InvalidToken(token_id.to_string()))?;
        Ok(TokenQuote { token_id: token_id.clone(), price })
    }

    async fn health_check(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

fn limits() -> RiskLimits {
    RiskLimits {
        initial_capital: dec!(10000),
        max_position_size: dec!(1000),
        max_total_exposure: dec!(5000),
        stop_loss_pct: dec!(0.15),
        take_profit_pct: dec!(0.5),
    }
}

struct Harness {
    trader: Arc<Trader>,
    risk: Arc<RiskManager>,
    broker: Arc<StubBroker>,
    sink: Arc<MemorySink>,
}

fn harness(broker: StubBroker) -> Harness {
    harness_with(broker, TraderSettings::default())
}

fn harness_with(broker: StubBroker, settings: TraderSettings) -> Harness {
    let broker = Arc::new(broker);
    let sink = Arc::new(MemorySink::new());
    let risk = Arc::new(RiskManager::with_limits(limits(), sink.clone()));
    let monitor = OrderMonitor::with_intervals(broker.clone(), sink.clone(), Duration::from_secs(3), Duration::from_secs(2));
    let trader = Arc::new(Trader::new(risk.clone(), broker.clone(), monitor, settings));
    Harness { trader, risk, broker, sink }
}

async fn sells(h: &Harness) -> Vec<TokenId> {
    h.broker
        .placed_sides()
        .await
        .into_iter()
        .filter(|(_, side)| *side == Side::Sell)
        .map(|(token, _)| token)
        .collect()
}

fn candidate(address: &str, price: Decimal, rating: Rating) -> TokenCandidate {
    TokenCandidate {
        address: TokenId::from(address),
        symbol: address.trim_start_matches("0x").to_uppercase(),
        price,
        volume: dec!(250000),
        liquidity: dec!(80000),
        age_hours: 6.0,
        filter_score: 0.9,
        rating,
        confidence_score: 1.0,
        max_slippage: None,
    }
}

async fn trade(h: &Harness, address: &str, price: Decimal, rating: Rating) -> bool {
    let c = candidate(address, price, rating);
    h.trader.execute_trade(&c.address, rating, &c, c.confidence_score, 0.02).await
}

#[tokio::test]
async fn bullish_signal_opens_a_sized_position() {
    let h = harness(StubBroker::new(TradingMode::Paper));

    assert!(trade(&h, "0xa", dec!(2), Rating::Bullish).await);

    let position = h.risk.position(&TokenId::from("0xa")).await.unwrap();
    assert_eq!(position.quantity, dec!(50));
    assert_eq!(position.avg_entry_price, dec!(2));
    assert_eq!(position.stop_loss_price, Some(dec!(1.70)));
    assert_eq!(h.broker.placed_sides().await, vec![(TokenId::from("0xa"), Side::Buy)]);
    assert_eq!(h.sink.positions().await.len(), 1);
}

#[tokio::test]
async fn bullish_signal_with_zero_price_is_skipped() {
    let h = harness(StubBroker::new(TradingMode::Paper));

    assert!(!trade(&h, "0xa", dec!(0), Rating::Bullish).await);
    assert!(h.broker.placed.lock().await.is_empty());
}

#[tokio::test]
async fn bearish_signal_without_a_position_is_a_benign_no_op() {
    let h = harness(StubBroker::new(TradingMode::Paper));

    assert!(trade(&h, "0xa", dec!(2), Rating::Bearish).await);
    assert!(h.broker.placed.lock().await.is_empty());
}

#[tokio::test]
async fn bearish_signal_sells_the_whole_holding() {
    let h = harness(StubBroker::new(TradingMode::Paper));
    assert!(trade(&h, "0xa", dec!(2), Rating::Bullish).await);

    assert!(trade(&h, "0xa", dec!(2.5), Rating::Bearish).await);

    assert!(h.risk.position(&TokenId::from("0xa")).await.is_none());
    let placed = h.broker.placed.lock().await.clone();
    assert_eq!(placed[1].side, Side::Sell);
    assert_eq!(placed[1].quantity, dec!(50));
    let last = h.risk.trade_history().await.pop().unwrap();
    assert_eq!(last.realized_pnl, Some(dec!(25)));
}

#[tokio::test]
async fn neutral_signal_never_changes_quantity_or_cost_basis() {
    let h = harness(StubBroker::new(TradingMode::Paper));
    assert!(trade(&h, "0xa", dec!(2), Rating::Bullish).await);
    let before = h.risk.position(&TokenId::from("0xa")).await.unwrap();

    assert!(trade(&h, "0xa", dec!(2.2), Rating::Neutral).await);
    assert!(trade(&h, "0xa", dec!(2.2), Rating::Neutral).await);

    let after = h.risk.position(&TokenId::from("0xa")).await.unwrap();
    assert_eq!(after.quantity, before.quantity);
    assert_eq!(after.avg_entry_price, before.avg_entry_price);
    assert_eq!(after.current_price, dec!(2.2));
    assert_eq!(h.broker.placed.lock().await.len(), 1);
}

#[tokio::test]
async fn neutral_signal_executes_a_fired_stop_loss() {
    let h = harness(StubBroker::new(TradingMode::Paper));
    assert!(trade(&h, "0xa", dec!(2), Rating::Bullish).await);

    assert!(trade(&h, "0xa", dec!(1.65), Rating::Neutral).await);

    assert!(h.risk.position(&TokenId::from("0xa")).await.is_none());
    let last = h.risk.trade_history().await.pop().unwrap();
    assert_eq!(last.side, Side::Sell);
    assert_eq!(last.realized_pnl, Some(dec!(-17.5)));
}

#[tokio::test]
async fn batch_price_update_auto_exits_every_triggered_position() {
    let h = harness(StubBroker::new(TradingMode::Paper));
    assert!(trade(&h, "0xa", dec!(2), Rating::Bullish).await);
    assert!(trade(&h, "0xb", dec!(1), Rating::Bullish).await);
    assert!(trade(&h, "0xc", dec!(4), Rating::Bullish).await);

    let prices = HashMap::from([
        (TokenId::from("0xa"), dec!(1.5)),
        (TokenId::from("0xb"), dec!(1.6)),
        (TokenId::from("0xc"), dec!(4.1)),
    ]);
    assert_eq!(h.trader.update_all_positions(&prices).await, 2);

    let held: Vec<TokenId> = h.risk.positions().await.into_iter().map(|p| p.token_id).collect();
    assert_eq!(held, vec![TokenId::from("0xc")]);
}

#[tokio::test]
async fn refresh_prices_quotes_held_tokens_through_the_broker() {
    let h = harness(StubBroker::new(TradingMode::Paper));
    assert!(trade(&h, "0xa", dec!(2), Rating::Bullish).await);
    assert!(trade(&h, "0xb", dec!(1), Rating::Bullish).await);
    h.broker.quotes.lock().await.insert(TokenId::from("0xa"), dec!(3.1));

    // 0xb has no quote and is left alone.
    assert_eq!(h.trader.refresh_prices().await, 1);
    assert!(h.risk.position(&TokenId::from("0xa")).await.is_none());
    assert!(h.risk.position(&TokenId::from("0xb")).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn concurrent_exits_sell_a_position_only_once() {
    let mut broker = StubBroker::new(TradingMode::Paper);
    broker.fill_delay = Duration::from_secs(5);
    let h = harness(broker);
    let token = TokenId::from("0xa");
    h.risk.add_position(&token, "A", dec!(50), dec!(2)).await.unwrap();
    h.broker.quotes.lock().await.insert(token.clone(), dec!(1));

    // The refresher's stop-loss exit and a bearish signal race for the same holding.
    let (_, bearish) = tokio::join!(h.trader.refresh_prices(), trade(&h, "0xa", dec!(1), Rating::Bearish));

    assert!(bearish);
    assert_eq!(sells(&h).await, vec![token.clone()]);
    assert!(h.risk.position(&token).await.is_none());
    assert_eq!(h.risk.trade_history().await.len(), 2);
    let stats = h.trader.get_portfolio_summary().await.stats;
    assert_eq!(stats.total_trades, 1);
    assert_eq!(stats.successful_trades, 1);
    assert_eq!(stats.failed_trades, 0);
}

#[tokio::test]
async fn broker_rejection_is_a_failed_trade_not_a_crash() {
    let h = harness(StubBroker::new(TradingMode::Paper));
    h.broker.reject_orders.store(true, Ordering::SeqCst);

    assert!(!trade(&h, "0xa", dec!(2), Rating::Bullish).await);

    assert!(h.risk.positions().await.is_empty());
    let summary = h.trader.get_portfolio_summary().await;
    assert_eq!(summary.stats.total_trades, 1);
    assert_eq!(summary.stats.failed_trades, 1);
    assert_eq!(summary.success_rate, 0.0);
    assert!(!h.trader.health_check().await.healthy);
}

#[tokio::test]
async fn live_buy_is_recorded_only_after_the_monitor_sees_a_fill() {
    let h = harness(StubBroker::new(TradingMode::Live));

    assert!(trade(&h, "0xa", dec!(2), Rating::Bullish).await);

    assert!(h.risk.position(&TokenId::from("0xa")).await.is_some());
    assert_eq!(h.sink.order_statuses().await, vec![("order-1".to_string(), OrderStatus::Filled)]);
    assert_eq!(h.trader.get_portfolio_summary().await.open_orders, 0);
}

#[tokio::test(start_paused = true)]
async fn live_buy_that_never_fills_is_cancelled_and_not_recorded() {
    let mut broker = StubBroker::new(TradingMode::Live);
    broker.stuck.insert(TokenId::from("0xa"));
    let h = harness(broker);

    assert!(!trade(&h, "0xa", dec!(2), Rating::Bullish).await);

    assert!(h.risk.positions().await.is_empty());
    assert_eq!(h.broker.cancels.load(Ordering::SeqCst), 1);
    assert_eq!(h.trader.get_portfolio_summary().await.stats.failed_trades, 1);
}

#[tokio::test(start_paused = true)]
async fn emergency_stop_liquidates_even_when_a_cancel_fails() {
    let mut broker = StubBroker::new(TradingMode::Live);
    broker.stuck.insert(TokenId::from("0xstuck"));
    broker.fail_cancel = true;
    let h = harness(broker);
    h.risk.add_position(&TokenId::from("0xa"), "A", dec!(50), dec!(2)).await.unwrap();
    h.risk.add_position(&TokenId::from("0xb"), "B", dec!(100), dec!(1)).await.unwrap();

    let trader = h.trader.clone();
    let pending = tokio::spawn(async move {
        let c = candidate("0xstuck", dec!(1), Rating::Bullish);
        trader.execute_trade(&c.address, Rating::Bullish, &c, 1.0, 0.02).await
    });
    while h.trader.get_portfolio_summary().await.open_orders == 0 {
        tokio::task::yield_now().await;
    }

    assert!(h.trader.emergency_stop().await);

    assert_eq!(h.broker.cancels.load(Ordering::SeqCst), 1);
    assert!(h.risk.positions().await.is_empty());
    assert_eq!(sells(&h).await, vec![TokenId::from("0xa"), TokenId::from("0xb")]);
    assert_eq!(h.trader.get_portfolio_summary().await.open_orders, 0);

    pending.abort();
}

#[tokio::test(start_paused = true)]
async fn order_pending_past_the_stuck_threshold_makes_the_trader_unhealthy() {
    let mut broker = StubBroker::new(TradingMode::Live);
    broker.stuck.insert(TokenId::from("0xstuck"));
    let settings = TraderSettings {
        order_timeout: Duration::from_secs(900),
        stuck_order_threshold: Duration::from_secs(600),
        ..TraderSettings::default()
    };
    let h = harness_with(broker, settings);
    // Keeps the success rate above the health floor while one order is in flight.
    for (address, price) in [("0xa", dec!(2)), ("0xb", dec!(1)), ("0xc", dec!(4))] {
        assert!(trade(&h, address, price, Rating::Bullish).await);
    }

    let trader = h.trader.clone();
    let pending = tokio::spawn(async move {
        let c = candidate("0xstuck", dec!(1), Rating::Bullish);
        trader.execute_trade(&c.address, Rating::Bullish, &c, 1.0, 0.02).await
    });
    while h.trader.get_portfolio_summary().await.open_orders == 0 {
        tokio::task::yield_now().await;
    }

    let status = h.trader.health_check().await;
    assert_eq!(status.stuck_orders, 0);
    assert!(status.healthy);

    tokio::time::advance(Duration::from_secs(601)).await;

    let status = h.trader.health_check().await;
    assert_eq!(status.stuck_orders, 1);
    assert!(!status.healthy);
    assert_eq!(status.issues, vec!["1 order(s) stuck".to_string()]);

    pending.abort();
}

#[tokio::test]
async fn health_reflects_broker_connectivity_in_live_mode_only() {
    let live = harness(StubBroker::new(TradingMode::Live));
    live.broker.healthy.store(false, Ordering::SeqCst);
    let status = live.trader.health_check().await;
    assert!(!status.healthy);
    assert!(!status.broker_connected);

    let paper = harness(StubBroker::new(TradingMode::Paper));
    paper.broker.healthy.store(false, Ordering::SeqCst);
    let status = paper.trader.health_check().await;
    assert!(status.healthy);
    assert_eq!(status.success_rate, 1.0);
    assert!(status.issues.is_empty());
}
