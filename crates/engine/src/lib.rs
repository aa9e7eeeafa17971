// In crates/engine/src/lib.rs

pub mod error;
pub mod feed;
pub mod refresher;
pub mod trader;
pub mod types;

pub use error::{Error, Result};
pub use feed::CandidateFeed;
pub use refresher::PriceRefresher;
pub use trader::Trader;
pub use types::{HealthStatus, PortfolioSummary, TradeOutcome, TradeStats, TraderSettings};

use app_config::TradingSettings;
use core_types::TokenCandidate;
use database::PersistenceSink;
use futures::{Stream, StreamExt};
use std::sync::Arc;

/// Counters for one pass of the decision loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub processed: u64,
    pub filtered: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// The decision loop: feeds rated candidates to the trader one at a time.
pub struct Engine {
    trader: Arc<Trader>,
    sink: Arc<dyn PersistenceSink>,
    settings: TradingSettings,
}

impl Engine {
    pub fn new(trader: Arc<Trader>, sink: Arc<dyn PersistenceSink>, settings: TradingSettings) -> Self {
        Self { trader, sink, settings }
    }

    pub fn trader(&self) -> &Arc<Trader> {
        &self.trader
    }

    /// Handles one candidate. Returns `None` when it was filtered out.
    pub async fn process(&self, candidate: &TokenCandidate) -> Option<bool> {
        if let Err(e) = self.sink.save_token_snapshot(candidate).await {
            tracing::warn!(token = %candidate.address, error = %e, "Failed to save token snapshot.");
        }

        if candidate.filter_score < self.settings.min_filter_score {
            tracing::debug!(
                token = %candidate.address,
                symbol = %candidate.symbol,
                score = candidate.filter_score,
                min = self.settings.min_filter_score,
                "Candidate below filter threshold."
            );
            return None;
        }

        let slippage = candidate
            .max_slippage
            .unwrap_or(self.settings.default_slippage)
            .min(self.settings.max_slippage);

        tracing::info!(
            token = %candidate.address,
            symbol = %candidate.symbol,
            rating = %candidate.rating,
            confidence = candidate.confidence_score,
            "Evaluating candidate."
        );
        Some(
            self.trader
                .execute_trade(&candidate.address, candidate.rating, candidate, candidate.confidence_score, slippage)
                .await,
        )
    }

    /// Drives the trader until the candidate stream ends.
    pub async fn run<S>(&self, candidates: S) -> LoopStats
    where
        S: Stream<Item = TokenCandidate>,
    {
        tracing::info!(mode = %self.trader.mode(), "Starting decision loop.");
        let mut candidates = Box::pin(candidates);
        let mut stats = LoopStats::default();

        while let Some(candidate) = candidates.next().await {
            stats.processed += 1;
            match self.process(&candidate).await {
                None => stats.filtered += 1,
                Some(true) => stats.succeeded += 1,
                Some(false) => stats.failed += 1,
            }
        }

        tracing::info!(?stats, "Candidate stream ended.");
        stats
    }
}
