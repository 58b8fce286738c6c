//! # rankbook
//!
//! Turns a ranked external signal into a dollar-neutral target portfolio and
//! reconciles a live account toward it.
//!
//! ## Pipeline
//!
//! 1. [`SignalAggregator`] reduces the trailing `window` dates of a
//!    [`SignalStore`] into one [`Score`] per symbol.
//! 2. [`rank`] goes long the top `k` and short the bottom `k`, equal
//!    weighted, gross exposure 1.0.
//! 3. [`Reconciler::run_cycle`] cancels resting orders, snapshots the account,
//!    computes dollar deltas, sizes them with [`size`], and submits limit
//!    orders. Per-symbol failures land in the [`CycleReport`].
//!
//! ## Quick Start
//!
//! ```
//! use std::collections::BTreeSet;
//! use chrono::NaiveDate;
//! use rankbook::{rank, Reducer, SignalAggregator, SignalObservation, Symbol};
//!
//! let t0 = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
//! let t1 = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
//! let obs = |d, s, v| SignalObservation::new(d, Symbol::new(s), v);
//! let history = vec![
//!     obs(t0, "A", 4.0), obs(t0, "B", 1.0), obs(t0, "C", 0.0), obs(t0, "D", -3.0),
//!     obs(t1, "A", 5.0), obs(t1, "B", 3.0), obs(t1, "C", -1.0), obs(t1, "D", -4.0),
//! ];
//! let universe: BTreeSet<Symbol> = ["A", "B", "C", "D"].iter().map(|s| Symbol::new(s)).collect();
//!
//! let score = SignalAggregator::new(2, Reducer::Sum)?.aggregate(&history, t1, &universe)?;
//! assert_eq!(score.get(&Symbol::new("A")), Some(9.0));
//!
//! let weights = rank(&score, 1)?;
//! assert_eq!(weights.get(&Symbol::new("A")), Some(0.5));
//! assert_eq!(weights.get(&Symbol::new("D")), Some(-0.5));
//! # Ok::<(), rankbook::Error>(())
//! ```
//!
//! ## Order Sizing
//!
//! ```
//! use rankbook::{size, InstrumentSpec, Side, Sizing, Symbol};
//!
//! let spec = InstrumentSpec::new(3, 12.0);
//! // Too small to trade
//! assert!(matches!(size(&Symbol::new("BTC"), 10.0, &spec, 60_000.0), Sizing::Skip(_)));
//!
//! let Sizing::Order(order) = size(&Symbol::new("BTC"), -3000.0, &spec, 60_000.0) else {
//!     unreachable!()
//! };
//! assert_eq!(order.side, Side::Sell);
//! assert_eq!(order.quantity, 0.05);
//! ```

mod error;
pub mod rank;
pub mod reconcile;
pub mod report;
mod side;
pub mod signal;
pub mod sizer;
mod tif;
mod types;
pub mod venue;

// Re-export public API
pub use error::{Error, ExternalError, Result, SymbolError};
pub use rank::{TargetWeights, rank};
pub use reconcile::{
    AccountSnapshot, CancelToken, CycleState, IntentReason, OrderIntent, ReconcileConfig,
    Reconciler, compute_deltas,
};
pub use report::{CycleReport, IntentOutcome, Outcome};
pub use side::Side;
pub use signal::{Reducer, Score, SignalAggregator, SignalObservation, SignalStore};
pub use sizer::{InstrumentSpec, OrderQuantity, SkipReason, Sizing, size};
pub use tif::TimeInForce;
pub use types::{MAX_SYMBOL_LEN, Notional, Symbol};
pub use venue::{
    AccountState, InstrumentSource, OrderRequest, OrderSubmitter, PriceOracle, SubmitAck, Venue,
    VenueResult,
};
