//! Collaborator contracts for the execution venue.
//!
//! The reconciler needs four capabilities; adapters implement whichever they
//! can and [`Venue`] is blanket-implemented for anything that has all four.
//! Every call is blocking and must return within the adapter's configured
//! timeout, reporting [`ExternalError::Timeout`] when it does not.

use std::collections::BTreeMap;

use crate::error::ExternalError;
use crate::side::Side;
use crate::sizer::InstrumentSpec;
use crate::tif::TimeInForce;
use crate::types::{Notional, Symbol};

pub type VenueResult<T> = std::result::Result<T, ExternalError>;

/// Live account state.
pub trait AccountState {
    /// Total account equity.
    fn equity(&self) -> VenueResult<f64>;

    /// Signed dollar notional per symbol (positive = long).
    fn positions(&self) -> VenueResult<BTreeMap<Symbol, Notional>>;

    /// Cancel every resting order. `Ok(false)` means the venue refused.
    fn cancel_all_orders(&self) -> VenueResult<bool>;
}

/// Top-of-book quotes.
pub trait PriceOracle {
    /// `(best_bid, best_ask)`; either side may be missing.
    fn best_bid_ask(&self, symbol: &Symbol) -> VenueResult<(Option<f64>, Option<f64>)>;
}

/// A limit order as handed to the venue.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: f64,
    pub limit_price: f64,
    pub time_in_force: TimeInForce,
}

/// Venue acknowledgement of a submission.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubmitAck {
    pub accepted: bool,
    pub detail: String,
}

impl SubmitAck {
    pub fn accepted(detail: impl Into<String>) -> Self {
        Self {
            accepted: true,
            detail: detail.into(),
        }
    }

    pub fn rejected(detail: impl Into<String>) -> Self {
        Self {
            accepted: false,
            detail: detail.into(),
        }
    }
}

/// Order entry.
pub trait OrderSubmitter {
    fn submit(&self, order: &OrderRequest) -> VenueResult<SubmitAck>;
}

/// Static instrument metadata.
pub trait InstrumentSource {
    /// `None` when the venue publishes no rules for `symbol`.
    fn instrument(&self, symbol: &Symbol) -> VenueResult<Option<InstrumentSpec>>;
}

/// Everything the reconciler needs from a venue.
pub trait Venue: AccountState + PriceOracle + OrderSubmitter + InstrumentSource {}

impl<T: AccountState + PriceOracle + OrderSubmitter + InstrumentSource + ?Sized> Venue for T {}
