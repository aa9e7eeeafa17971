// In crates/risk/src/error.rs

use core_types::TokenId;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("Trade was vetoed by risk manager: {reason}")]
    Vetoed { reason: String },

    #[error("Invalid risk parameters: {0}")]
    InvalidParameters(String),

    #[error("No open position for {0}")]
    PositionNotFound(TokenId),

    #[error("Insufficient position: holding {held}, requested {requested}")]
    InsufficientPosition { held: Decimal, requested: Decimal },
}

pub type Result<T> = std::result::Result<T, Error>;
