// In crates/execution/src/lib.rs

use async_trait::async_trait;
use core_types::{OrderStatus, TokenId, TradingMode};

pub mod error;
pub mod live;
pub mod monitor;
pub mod simulated;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use live::LiveBroker;
pub use monitor::{MonitorOutcome, OrderMonitor};
pub use simulated::PaperBroker;
pub use types::{OrderAck, OrderRequest, SimulationSettings, TokenQuote};

/// The universal interface for an order venue.
///
/// A `Broker` takes an already risk-approved `OrderRequest` and submits it to
/// a target, which could be a live venue or a paper-trading simulation. Both
/// variants are interchangeable behind this trait, so the trader never has to
/// branch on the trading mode.
#[async_trait]
pub trait Broker: Send + Sync {
    /// The name of the broker (e.g., "LiveBroker", "PaperBroker").
    fn name(&self) -> &'static str;

    fn mode(&self) -> TradingMode;

    /// Submits an order and returns the venue's acknowledgement.
    ///
    /// An acknowledgement is not a fill. Callers must watch the order until it
    /// reaches a terminal status unless `OrderAck::status` already is one.
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck>;

    async fn check_order_status(&self, order_id: &str) -> Result<OrderStatus>;

    /// Requests cancellation. `Ok(false)` means the venue refused.
    async fn cancel_order(&self, order_id: &str) -> Result<bool>;

    async fn get_token_info(&self, token_id: &TokenId) -> Result<TokenQuote>;

    /// Never fails; an unreachable venue is simply unhealthy.
    async fn health_check(&self) -> bool;

    /// Tells the broker about a price seen elsewhere. Venues with their own
    /// market data ignore it.
    async fn observe_price(&self, _token_id: &TokenId, _price: rust_decimal::Decimal) {}
}
