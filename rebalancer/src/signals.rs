//! JSON signal file: the rebalancer's `SignalStore`.
//!
//! ```json
//! {
//!   "observations": [
//!     { "date": "2024-03-10", "symbol": "BTC", "value": 1.25 }
//!   ],
//!   "universe": { "2024-03-01": ["BTC", "ETH"] }
//! }
//! ```
//!
//! `universe` is optional. Without it, the tradable universe on a date is
//! every symbol observed on the latest observation date on or before it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::NaiveDate;
use log::{info, warn};
use rankbook::{ExternalError, SignalObservation, SignalStore, Symbol};
use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct SignalFile {
    observations: Vec<SignalObservation>,
    #[serde(default)]
    universe: Option<BTreeMap<NaiveDate, Vec<Symbol>>>,
}

/// Signal history loaded fully into memory, sorted by date.
#[derive(Debug, Clone)]
pub struct JsonSignalStore {
    observations: Vec<SignalObservation>,
    universe: Option<BTreeMap<NaiveDate, BTreeSet<Symbol>>>,
}

impl JsonSignalStore {
    /// Load and validate a signal file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::SignalRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let store = Self::from_json(&contents)?;
        info!(
            "Loaded {} signal observations from {}",
            store.observations.len(),
            path.display()
        );
        Ok(store)
    }

    /// Parse a signal file from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SignalFile = serde_json::from_str(json)?;
        Self::new(file.observations, file.universe)
    }

    pub fn new(
        mut observations: Vec<SignalObservation>,
        universe: Option<BTreeMap<NaiveDate, Vec<Symbol>>>,
    ) -> Result<Self> {
        let mut seen: FxHashSet<(NaiveDate, &Symbol)> = FxHashSet::default();
        for o in &observations {
            if !seen.insert((o.date, &o.symbol)) {
                return Err(Error::Signal(format!(
                    "duplicate observation for {} on {}",
                    o.symbol, o.date
                )));
            }
        }
        drop(seen);

        let non_finite = observations.iter().filter(|o| !o.value.is_finite()).count();
        if non_finite > 0 {
            warn!("{non_finite} signal observations are not finite and will be ignored");
        }

        observations.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.symbol.cmp(&b.symbol)));
        let universe = universe.map(|u| {
            u.into_iter()
                .map(|(date, symbols)| (date, symbols.into_iter().collect()))
                .collect()
        });

        Ok(Self {
            observations,
            universe,
        })
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    fn observed_universe(&self, date: NaiveDate) -> BTreeSet<Symbol> {
        let Some(last) = self
            .observations
            .iter()
            .rev()
            .find(|o| o.date <= date)
            .map(|o| o.date)
        else {
            return BTreeSet::new();
        };
        self.observations
            .iter()
            .filter(|o| o.date == last)
            .map(|o| o.symbol.clone())
            .collect()
    }
}

impl SignalStore for JsonSignalStore {
    fn observations_up_to(
        &self,
        date: NaiveDate,
    ) -> std::result::Result<Vec<SignalObservation>, ExternalError> {
        let end = self.observations.partition_point(|o| o.date <= date);
        Ok(self.observations[..end].to_vec())
    }

    fn tradable_universe(
        &self,
        date: NaiveDate,
    ) -> std::result::Result<BTreeSet<Symbol>, ExternalError> {
        Ok(match &self.universe {
            Some(u) => u
                .range(..=date)
                .next_back()
                .map(|(_, symbols)| symbols.clone())
                .unwrap_or_default(),
            None => self.observed_universe(date),
        })
    }

    fn latest_date(&self) -> std::result::Result<Option<NaiveDate>, ExternalError> {
        Ok(self.observations.last().map(|o| o.date))
    }
}
