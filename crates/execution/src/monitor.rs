// In crates/execution/src/monitor.rs

use crate::Broker;
use app_config::MonitorSettings;
use core_types::OrderStatus;
use database::PersistenceSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// How a watched order ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    Filled,
    /// Reached a terminal status other than `Filled`.
    Failed(OrderStatus),
    /// Still open at the deadline. One cancellation was attempted.
    TimedOut,
}

/// Polls a placed order until it fills, fails or times out.
pub struct OrderMonitor {
    broker: Arc<dyn Broker>,
    sink: Arc<dyn PersistenceSink>,
    poll_interval: Duration,
    error_pause: Duration,
}

impl OrderMonitor {
    pub fn new(broker: Arc<dyn Broker>, sink: Arc<dyn PersistenceSink>, settings: &MonitorSettings) -> Self {
        Self::with_intervals(broker, sink, settings.poll_interval(), settings.error_pause())
    }

    pub fn with_intervals(
        broker: Arc<dyn Broker>,
        sink: Arc<dyn PersistenceSink>,
        poll_interval: Duration,
        error_pause: Duration,
    ) -> Self {
        Self {
            broker,
            sink,
            poll_interval,
            error_pause,
        }
    }

    /// Returns `true` only if the order reached `Filled` within `timeout`.
    pub async fn monitor_order(&self, order_id: &str, symbol: &str, timeout: Duration) -> bool {
        self.watch(order_id, symbol, timeout).await == MonitorOutcome::Filled
    }

    pub async fn watch(&self, order_id: &str, symbol: &str, timeout: Duration) -> MonitorOutcome {
        let deadline = Instant::now() + timeout;
        let mut last: Option<OrderStatus> = None;

        loop {
            let pause = match self.broker.check_order_status(order_id).await {
                Ok(status) => {
                    if let Some(previous) = last {
                        if previous != status && !previous.can_transition_to(status) {
                            tracing::warn!(order_id, symbol, from = %previous, to = %status, "Venue reported an illegal status transition.");
                        }
                    }
                    if last != Some(status) {
                        tracing::info!(order_id, symbol, %status, "Order status changed.");
                    }
                    if let Err(e) = self.sink.save_order_status(order_id, status).await {
                        tracing::warn!(order_id, error = %e, "Failed to persist order status.");
                    }
                    last = Some(status);

                    if status == OrderStatus::Filled {
                        return MonitorOutcome::Filled;
                    }
                    if status.is_terminal() {
                        tracing::warn!(order_id, symbol, %status, "Order ended without a fill.");
                        return MonitorOutcome::Failed(status);
                    }
                    self.poll_interval
                }
                Err(e) => {
                    tracing::warn!(order_id, symbol, error = %e, retryable = e.is_retryable(), "Order status check failed.");
                    self.error_pause
                }
            };

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            sleep(pause.min(deadline - now)).await;
        }

        tracing::warn!(order_id, symbol, ?timeout, "Order monitoring timed out. Cancelling.");
        match self.broker.cancel_order(order_id).await {
            Ok(true) => tracing::info!(order_id, "Timed-out order cancelled."),
            Ok(false) => tracing::warn!(order_id, "Venue refused to cancel timed-out order."),
            Err(e) => tracing::warn!(order_id, error = %e, "Failed to cancel timed-out order."),
        }
        MonitorOutcome::TimedOut
    }
}
