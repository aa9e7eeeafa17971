// In crates/engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Risk manager error: {0}")]
    Risk(#[from] risk::Error),

    #[error("Broker error: {0}")]
    Broker(#[from] execution::Error),

    #[error("Order {order_id} was not filled")]
    NotFilled { order_id: String },
}

pub type Result<T> = std::result::Result<T, Error>;
