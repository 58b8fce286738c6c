//! Broker error types.

use rankbook::ExternalError;

/// Errors that can occur during broker operations.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// The venue failed in a way that leaves an order's fate unknown
    /// (e.g. a 5xx after submission).
    #[error("unknown outcome: {0}")]
    UnknownOutcome(String),

    #[error("order error: {0}")]
    Order(String),

    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("rate limit exceeded")]
    RateLimit,

    #[error("malformed response: {0}")]
    Parse(String),
}

impl From<BrokerError> for ExternalError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::Timeout(_) | BrokerError::UnknownOutcome(_) => {
                ExternalError::Timeout(err.to_string())
            }
            BrokerError::Parse(_) | BrokerError::InvalidSymbol(_) => {
                ExternalError::Data(err.to_string())
            }
            other => ExternalError::Connection(other.to_string()),
        }
    }
}
