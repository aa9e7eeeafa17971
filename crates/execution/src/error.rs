// In crates/execution/src/error.rs

use thiserror::Error;

/// Why a broker call did not succeed.
///
/// Only `Transient` is worth retrying. Everything else ends the current trade
/// attempt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Transient broker failure: {reason}")]
    Transient { reason: String },

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Invalid or unsupported token: {0}")]
    InvalidToken(String),

    #[error("Order rejected: {reason}")]
    Rejected { reason: String },

    #[error("Execution failed: {reason}")]
    ExecutionFailed { reason: String },
}

impl Error {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transient { .. })
    }
}

impl From<api_client::Error> for Error {
    fn from(e: api_client::Error) -> Self {
        if e.is_transient() {
            return Error::Transient { reason: e.to_string() };
        }
        match e {
            api_client::Error::ApiError { status, msg } => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("insufficient") {
                    Error::InsufficientFunds(msg)
                } else if status == 404 || lower.contains("invalid token") || lower.contains("unsupported token") {
                    Error::InvalidToken(msg)
                } else {
                    Error::Rejected { reason: format!("status {status}: {msg}") }
                }
            }
            other => Error::ExecutionFailed { reason: other.to_string() },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, msg: &str) -> api_client::Error {
        api_client::Error::ApiError { status, msg: msg.to_string() }
    }

    #[test]
    fn venue_errors_map_onto_the_taxonomy() {
        assert!(Error::from(api(503, "down")).is_retryable());
        assert!(Error::from(api(429, "slow down")).is_retryable());
        assert!(matches!(Error::from(api(400, "Insufficient funds")), Error::InsufficientFunds(_)));
        assert!(matches!(Error::from(api(404, "no such token")), Error::InvalidToken(_)));
        assert!(matches!(Error::from(api(422, "bad quantity")), Error::Rejected { .. }));
    }
}
