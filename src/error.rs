//! Error types for ranking and reconciliation.

use chrono::NaiveDate;

use crate::types::Symbol;

/// Errors returned by external collaborators (signal store, venue).
///
/// `Timeout` is kept distinct: for a submission it means the venue may or
/// may not have received the order.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExternalError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("bad data: {0}")]
    Data(String),
}

impl ExternalError {
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExternalError::Timeout(_))
    }
}

/// Errors that abort an aggregation, ranking, or reconciliation cycle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("no signal history on or before {as_of}")]
    NoHistory { as_of: NaiveDate },

    #[error("cannot form disjoint long/short sets from {available} symbols with top_k={top_k}")]
    InsufficientUniverse { available: usize, top_k: usize },

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("a reconciliation cycle is already running")]
    CycleInProgress,

    #[error("{op} timed out: {detail}")]
    Timeout { op: &'static str, detail: String },

    #[error("{op} failed: {source}")]
    External {
        op: &'static str,
        #[source]
        source: ExternalError,
    },
}

impl Error {
    /// Wrap a collaborator failure, keeping timeouts distinguishable.
    pub fn from_external(op: &'static str, err: ExternalError) -> Self {
        match err {
            ExternalError::Timeout(detail) => Error::Timeout { op, detail },
            source => Error::External { op, source },
        }
    }
}

/// Per-symbol failures during execution. Never fatal to the cycle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SymbolError {
    #[error("{0}: no market data")]
    MarketDataUnavailable(Symbol),

    #[error("{symbol}: order rejected: {detail}")]
    OrderRejected { symbol: Symbol, detail: String },

    /// Unknown outcome; the next cycle's fresh position read settles it.
    #[error("{symbol}: timed out ({detail}), outcome unknown")]
    Timeout { symbol: Symbol, detail: String },

    #[error("{symbol}: {source}")]
    External {
        symbol: Symbol,
        #[source]
        source: ExternalError,
    },
}

impl SymbolError {
    pub fn from_external(symbol: &Symbol, err: ExternalError) -> Self {
        match err {
            ExternalError::Timeout(detail) => SymbolError::Timeout {
                symbol: symbol.clone(),
                detail,
            },
            source => SymbolError::External {
                symbol: symbol.clone(),
                source,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_stay_distinct() {
        let err = Error::from_external("positions", ExternalError::Timeout("10s".into()));
        assert!(matches!(err, Error::Timeout { op: "positions", .. }));

        let err = Error::from_external("positions", ExternalError::Connection("refused".into()));
        assert!(matches!(err, Error::External { op: "positions", .. }));
    }

    #[test]
    fn symbol_error_from_timeout() {
        let err = SymbolError::from_external(&Symbol::new("BTC"), ExternalError::Timeout("5s".into()));
        assert!(matches!(err, SymbolError::Timeout { .. }));
        assert!(err.to_string().contains("outcome unknown"));
    }

    #[test]
    fn display() {
        let err = Error::InsufficientUniverse {
            available: 3,
            top_k: 3,
        };
        assert_eq!(
            err.to_string(),
            "cannot form disjoint long/short sets from 3 symbols with top_k=3"
        );
    }
}
