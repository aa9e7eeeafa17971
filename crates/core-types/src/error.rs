// In crates/core-types/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown order side: {0}")]
    UnknownSide(String),

    #[error("Unknown rating: {0}")]
    UnknownRating(String),

    #[error("Unknown order type: {0}")]
    UnknownOrderType(String),
}

pub type Result<T> = std::result::Result<T, Error>;
