//! rankbook-rebalancer: signal-ranked, dollar-neutral rebalancer for a
//! Binance USDⓈ-M futures account.
//!
//! Reads a JSON signal history, ranks it into long/short target weights,
//! connects to the venue for live equity, positions and quotes, and runs one
//! reconciliation cycle with an audit trail and a per-account run lock.

pub mod audit;
pub mod config;
pub mod error;
pub mod execution;
pub mod lock;
pub mod signals;
