// In crates/engine/src/refresher.rs

use crate::trader::Trader;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};

/// A background task that periodically re-prices the book through the broker
/// and lets the trader act on any exit threshold that fired.
pub struct PriceRefresher {
    trader: Arc<Trader>,
    period: Duration,
}

impl PriceRefresher {
    pub fn new(trader: Arc<Trader>, period: Duration) -> Self {
        Self { trader, period }
    }

    /// The main refresh loop. Runs until the task is dropped.
    pub async fn run(&self) {
        let mut interval = interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let closed = self.trader.refresh_prices().await;
            if closed > 0 {
                tracing::info!(closed, "Price refresh closed positions.");
            }
        }
    }
}
