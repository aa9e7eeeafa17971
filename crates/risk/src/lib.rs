// In crates/risk/src/lib.rs

pub mod error;
pub mod ledger;
pub mod manager;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use ledger::PositionLedger;
pub use manager::RiskManager;
pub use types::{ClosePosition, RiskLimits, RiskMetrics, RiskSettings, StopTrigger};
