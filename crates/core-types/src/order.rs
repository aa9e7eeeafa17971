// In crates/core-types/src/order.rs

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
        }
    }
}

impl FromStr for OrderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            other => Err(Error::UnknownOrderType(other.to_string())),
        }
    }
}

/// The lifecycle state of an order as reported by the venue.
///
/// ```text
/// pending -> {partial, filled, cancelled, failed, rejected}
/// partial -> {partial, filled, cancelled, failed, rejected}
/// ```
///
/// `filled`, `cancelled`, `failed` and `rejected` are terminal. `unknown` is
/// what we record when the venue reports something we do not recognise; it is
/// never terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Partial,
    Filled,
    Cancelled,
    Failed,
    Rejected,
    Unknown,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Partial => "partial",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Failed => "failed",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Unknown => "unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Failed | OrderStatus::Rejected
        )
    }

    /// Whether the venue may legally move an order from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match self {
            OrderStatus::Unknown => true,
            OrderStatus::Pending => next != OrderStatus::Unknown,
            OrderStatus::Partial => !matches!(next, OrderStatus::Pending | OrderStatus::Unknown),
            _ => false,
        }
    }

    /// Lenient parse of a venue status string. Spelling variants seen on
    /// DEX aggregators are folded into the canonical states.
    pub fn from_venue(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "new" | "open" | "submitted" => OrderStatus::Pending,
            "partial" | "partially_filled" | "partiallyfilled" => OrderStatus::Partial,
            "filled" | "completed" | "executed" => OrderStatus::Filled,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            "failed" | "expired" => OrderStatus::Failed,
            "rejected" => OrderStatus::Rejected,
            _ => OrderStatus::Unknown,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
