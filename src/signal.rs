//! Signal aggregation: trailing-window reduction of per-date signal values.
//!
//! A [`SignalStore`] supplies raw observations; [`SignalAggregator`] collapses
//! the most recent `window` distinct dates into one [`Score`] per symbol.
//! Symbols without observations in the window are absent from the score,
//! never zero.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, ExternalError, Result};
use crate::types::Symbol;

/// One external signal value for one symbol on one date.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalObservation {
    pub date: NaiveDate,
    pub symbol: Symbol,
    pub value: f64,
}

impl SignalObservation {
    pub fn new(date: NaiveDate, symbol: Symbol, value: f64) -> Self {
        Self {
            date,
            symbol,
            value,
        }
    }
}

/// Read-only source of signal history.
pub trait SignalStore {
    /// All observations dated on or before `date`, in any order.
    fn observations_up_to(
        &self,
        date: NaiveDate,
    ) -> std::result::Result<Vec<SignalObservation>, ExternalError>;

    /// Symbols tradable on `date`.
    fn tradable_universe(
        &self,
        date: NaiveDate,
    ) -> std::result::Result<BTreeSet<Symbol>, ExternalError>;

    /// Most recent observation date, or `None` for an empty store.
    fn latest_date(&self) -> std::result::Result<Option<NaiveDate>, ExternalError>;
}

/// How a symbol's values inside the window collapse into one score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Reducer {
    #[default]
    Sum,
    Mean,
    /// Value on the most recent date the symbol was observed.
    Last,
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reducer::Sum => write!(f, "sum"),
            Reducer::Mean => write!(f, "mean"),
            Reducer::Last => write!(f, "last"),
        }
    }
}

impl FromStr for Reducer {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(Reducer::Sum),
            "mean" => Ok(Reducer::Mean),
            "last" => Ok(Reducer::Last),
            other => Err(format!("unknown reducer: {other}")),
        }
    }
}

/// Aggregated score per symbol.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Score(BTreeMap<Symbol, f64>);

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol, value: f64) {
        self.0.insert(symbol, value);
    }

    /// `None` means the symbol had no observations in the window.
    pub fn get(&self, symbol: &Symbol) -> Option<f64> {
        self.0.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, f64)> {
        self.0.iter().map(|(s, v)| (s, *v))
    }
}

impl FromIterator<(Symbol, f64)> for Score {
    fn from_iter<I: IntoIterator<Item = (Symbol, f64)>>(iter: I) -> Self {
        Score(iter.into_iter().collect())
    }
}

/// Trailing-window signal aggregator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalAggregator {
    window: usize,
    reducer: Reducer,
}

impl SignalAggregator {
    /// Create an aggregator over the last `window` distinct dates.
    pub fn new(window: usize, reducer: Reducer) -> Result<Self> {
        if window == 0 {
            return Err(Error::InvalidInput("window must be >= 1".into()));
        }
        Ok(Self { window, reducer })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn reducer(&self) -> Reducer {
        self.reducer
    }

    /// Aggregate straight from a store.
    ///
    /// Fails with `InvalidInput` if `as_of` is later than the store's latest
    /// date and with `NoHistory` if nothing is dated on or before `as_of`.
    pub fn aggregate_from<S: SignalStore + ?Sized>(
        &self,
        store: &S,
        as_of: NaiveDate,
    ) -> Result<Score> {
        let latest = store
            .latest_date()
            .map_err(|e| Error::from_external("signal latest_date", e))?
            .ok_or(Error::NoHistory { as_of })?;
        if as_of > latest {
            return Err(Error::InvalidInput(format!(
                "as_of {as_of} is after the latest signal date {latest}"
            )));
        }

        let observations = store
            .observations_up_to(as_of)
            .map_err(|e| Error::from_external("signal observations", e))?;
        let universe = store
            .tradable_universe(as_of)
            .map_err(|e| Error::from_external("signal universe", e))?;

        self.aggregate(&observations, as_of, &universe)
    }

    /// Aggregate a slice of observations.
    ///
    /// Observations dated after `as_of` are ignored, as are non-finite values.
    pub fn aggregate(
        &self,
        observations: &[SignalObservation],
        as_of: NaiveDate,
        universe: &BTreeSet<Symbol>,
    ) -> Result<Score> {
        let dates: BTreeSet<NaiveDate> = observations
            .iter()
            .filter(|o| o.date <= as_of)
            .map(|o| o.date)
            .collect();
        if dates.is_empty() {
            return Err(Error::NoHistory { as_of });
        }

        let window_dates: FxHashSet<NaiveDate> =
            dates.iter().rev().take(self.window).copied().collect();
        debug!(
            "aggregating {} of {} available dates up to {as_of}",
            window_dates.len(),
            dates.len()
        );

        // (sum, count, last date, last value) per symbol
        let mut acc: FxHashMap<&Symbol, (f64, usize, NaiveDate, f64)> = FxHashMap::default();
        let mut dropped = 0usize;
        for obs in observations {
            if !window_dates.contains(&obs.date) || !universe.contains(&obs.symbol) {
                continue;
            }
            if !obs.value.is_finite() {
                dropped += 1;
                continue;
            }
            let entry = acc
                .entry(&obs.symbol)
                .or_insert((0.0, 0, obs.date, obs.value));
            entry.0 += obs.value;
            entry.1 += 1;
            if obs.date >= entry.2 {
                entry.2 = obs.date;
                entry.3 = obs.value;
            }
        }
        if dropped > 0 {
            warn!("ignored {dropped} non-finite signal values");
        }

        let reducer = self.reducer;
        Ok(acc
            .into_iter()
            .map(|(sym, (sum, count, _, last))| {
                let value = match reducer {
                    Reducer::Sum => sum,
                    Reducer::Mean => sum / count as f64,
                    Reducer::Last => last,
                };
                (sym.clone(), value)
            })
            .collect())
    }
}
