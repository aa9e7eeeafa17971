// In crates/api-client/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to build the API client: {0}")]
    ClientBuildError(String),
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(#[from] serde_json::Error),
    #[error("API error: status {status}, msg: {msg}")]
    ApiError { status: u16, msg: String },
}

impl Error {
    /// Whether the failure is worth retrying: transport errors, rate limits
    /// and server-side errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::RequestFailed(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.status().is_some_and(|s| s.is_server_error()),
            Error::ApiError { status, .. } => *status == 429 || *status >= 500,
            Error::ClientBuildError(_) | Error::DeserializationFailed(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_and_server_errors_are_transient() {
        assert!(Error::ApiError { status: 429, msg: String::new() }.is_transient());
        assert!(Error::ApiError { status: 503, msg: String::new() }.is_transient());
        assert!(!Error::ApiError { status: 400, msg: "insufficient funds".into() }.is_transient());
    }
}
