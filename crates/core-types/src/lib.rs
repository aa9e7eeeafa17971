// In crates/core-types/src/lib.rs

pub mod error;
pub mod order;
pub mod position;
pub mod types;

// Re-export the most important types for easy access from other crates.
pub use error::{Error, Result};
pub use order::{OrderStatus, OrderType};
pub use position::{Position, TradeRecord};
pub use types::{Rating, Side, TokenCandidate, TokenId, TradingMode, TriggerKind};
