//! Error types for the rebalancer.

use std::path::PathBuf;

use rankbook_broker::BrokerError;

/// All errors that can occur during rebalancer operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("signal file error: {0}")]
    Signal(String),

    #[error("failed to read signal file {path}: {source}")]
    SignalRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse signal JSON: {0}")]
    SignalParse(#[from] serde_json::Error),

    #[error("venue error: {0}")]
    Venue(#[from] BrokerError),

    #[error("another run holds the lock {}", path.display())]
    Locked { path: PathBuf },

    #[error("run lock {} I/O error: {source}", path.display())]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{count} orders planned but max_orders_per_run is {max}")]
    TooManyOrders { count: usize, max: usize },

    #[error(transparent)]
    Cycle(#[from] rankbook::Error),

    #[error("execution aborted: {0}")]
    Aborted(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

impl Error {
    /// Errors that mean "not safe to trade right now" rather than a bug or bad input.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::Locked { .. }
                | Error::TooManyOrders { .. }
                | Error::Cycle(rankbook::Error::Precondition(_))
                | Error::Cycle(rankbook::Error::CycleInProgress)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
