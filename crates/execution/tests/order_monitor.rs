use async_trait::async_trait;
use core_types::{OrderStatus, TokenId, TradingMode};
use database::MemorySink;
use execution::{Broker, Error, MonitorOutcome, OrderAck, OrderMonitor, OrderRequest, Result, TokenQuote};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Replays a fixed sequence of status responses, then repeats the last one.
struct ScriptedBroker {
    script: Mutex<VecDeque<Result<OrderStatus>>>,
    last: Mutex<Result<OrderStatus>>,
    polls: AtomicUsize,
    cancels: AtomicUsize,
}

impl ScriptedBroker {
    fn new(script: Vec<Result<OrderStatus>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(Ok(OrderStatus::Pending)),
            polls: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Broker for ScriptedBroker {
    fn name(&self) -> &'static str {
        "ScriptedBroker"
    }

    fn mode(&self) -> TradingMode {
        TradingMode::Live
    }

    async fn place_order(&self, _order: &OrderRequest) -> Result<OrderAck> {
        Err(Error::ExecutionFailed { reason: "not scripted".into() })
    }

    async fn check_order_status(&self, _order_id: &str) -> Result<OrderStatus> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().await;
        if let Some(next) = self.script.lock().await.pop_front() {
            *last = next;
        }
        last.clone()
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<bool> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn get_token_info(&self, token_id: &TokenId) -> Result<TokenQuote> {
        Err(Error::InvalidToken(token_id.to_string()))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

fn monitor(broker: Arc<ScriptedBroker>, sink: Arc<MemorySink>) -> OrderMonitor {
    OrderMonitor::with_intervals(broker, sink, Duration::from_secs(3), Duration::from_secs(2))
}

#[tokio::test(start_paused = true)]
async fn pending_then_filled_reports_success_and_records_every_poll() {
    let broker = ScriptedBroker::new(vec![
        Ok(OrderStatus::Pending),
        Ok(OrderStatus::Pending),
        Ok(OrderStatus::Pending),
        Ok(OrderStatus::Filled),
    ]);
    let sink = Arc::new(MemorySink::new());
    let monitor = monitor(broker.clone(), sink.clone());

    let started = Instant::now();
    let filled = monitor.monitor_order("ord-1", "TKN", Duration::from_secs(60)).await;

    assert!(filled);
    assert_eq!(started.elapsed(), Duration::from_secs(9));
    assert_eq!(broker.polls.load(Ordering::SeqCst), 4);
    assert_eq!(broker.cancels.load(Ordering::SeqCst), 0);

    let saved = sink.order_statuses().await;
    assert_eq!(saved.len(), 4);
    assert!(saved.iter().all(|(id, _)| id == "ord-1"));
    assert_eq!(saved.last().map(|(_, s)| *s), Some(OrderStatus::Filled));
}

#[tokio::test(start_paused = true)]
async fn rejected_orders_end_without_cancelling() {
    let broker = ScriptedBroker::new(vec![Ok(OrderStatus::Pending), Ok(OrderStatus::Rejected)]);
    let sink = Arc::new(MemorySink::new());
    let monitor = monitor(broker.clone(), sink.clone());

    let outcome = monitor.watch("ord-2", "TKN", Duration::from_secs(60)).await;

    assert_eq!(outcome, MonitorOutcome::Failed(OrderStatus::Rejected));
    assert_eq!(broker.cancels.load(Ordering::SeqCst), 0);
    assert_eq!(sink.order_statuses().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn timeout_cancels_exactly_once() {
    let broker = ScriptedBroker::new(vec![Ok(OrderStatus::Pending)]);
    let sink = Arc::new(MemorySink::new());
    let monitor = monitor(broker.clone(), sink);

    let started = Instant::now();
    let filled = monitor.monitor_order("ord-3", "TKN", Duration::from_secs(10)).await;

    assert!(!filled);
    assert_eq!(started.elapsed(), Duration::from_secs(10));
    assert_eq!(broker.cancels.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_errors_pause_and_keep_polling() {
    let broker = ScriptedBroker::new(vec![
        Err(Error::Transient { reason: "503".into() }),
        Err(Error::Transient { reason: "timeout".into() }),
        Ok(OrderStatus::Partial),
        Ok(OrderStatus::Filled),
    ]);
    let sink = Arc::new(MemorySink::new());
    let monitor = monitor(broker.clone(), sink.clone());

    let started = Instant::now();
    let filled = monitor.monitor_order("ord-4", "TKN", Duration::from_secs(60)).await;

    assert!(filled);
    // Two error pauses of 2s, then one poll interval of 3s.
    assert_eq!(started.elapsed(), Duration::from_secs(7));
    // Failed polls are not persisted.
    assert_eq!(sink.order_statuses().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn zero_timeout_polls_once_then_cancels() {
    let broker = ScriptedBroker::new(vec![Ok(OrderStatus::Pending)]);
    let sink = Arc::new(MemorySink::new());
    let monitor = monitor(broker.clone(), sink);

    assert_eq!(monitor.watch("ord-5", "TKN", Duration::ZERO).await, MonitorOutcome::TimedOut);
    assert_eq!(broker.polls.load(Ordering::SeqCst), 1);
    assert_eq!(broker.cancels.load(Ordering::SeqCst), 1);
}
