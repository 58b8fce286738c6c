//! Reconciliation cycle: account snapshot + target weights → sized orders.
//!
//! One cycle walks `Idle → FetchingState → ComputingDeltas → Executing → Done`
//! and fails into `Failed` only while fetching state. Nothing is carried from
//! one cycle to the next: positions and equity are read once per cycle into an
//! [`AccountSnapshot`] and every delta is computed against that snapshot.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::{Error, Result, SymbolError};
use crate::rank::TargetWeights;
use crate::report::{CycleReport, IntentOutcome, Outcome};
use crate::side::Side;
use crate::sizer::{self, DEFAULT_MIN_NOTIONAL, InstrumentSpec, Sizing};
use crate::tif::TimeInForce;
use crate::types::{Notional, Symbol};
use crate::venue::{AccountState, OrderRequest, Venue};

/// Where a cycle currently is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CycleState {
    #[default]
    Idle,
    FetchingState,
    ComputingDeltas,
    Executing,
    Done,
    Failed,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CycleState::Idle => "idle",
            CycleState::FetchingState => "fetching state",
            CycleState::ComputingDeltas => "computing deltas",
            CycleState::Executing => "executing",
            CycleState::Done => "done",
            CycleState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why an intent exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum IntentReason {
    /// Held symbol no longer in the target.
    Close,
    /// Move toward a target weight.
    Rebalance,
}

/// Signed dollar amount to trade in one symbol this cycle.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderIntent {
    pub symbol: Symbol,
    pub dollar_delta: Notional,
    pub reason: IntentReason,
}

/// Equity and positions as read at the start of a cycle.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccountSnapshot {
    pub equity: f64,
    /// Signed dollar notional; flat symbols are omitted.
    pub positions: BTreeMap<Symbol, Notional>,
}

impl AccountSnapshot {
    pub fn new(equity: f64, positions: BTreeMap<Symbol, Notional>) -> Self {
        Self { equity, positions }
    }

    /// Read equity and positions from the venue and validate them.
    pub fn read<A: AccountState + ?Sized>(account: &A) -> Result<Self> {
        let equity = account
            .equity()
            .map_err(|e| Error::from_external("equity", e))?;
        if !equity.is_finite() || equity < 0.0 {
            return Err(Error::Precondition(format!("unusable equity {equity}")));
        }

        let mut positions = account
            .positions()
            .map_err(|e| Error::from_external("positions", e))?;
        if let Some((sym, v)) = positions.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::Precondition(format!(
                "unusable position notional {v} for {sym}"
            )));
        }
        positions.retain(|_, v| *v != 0.0);

        Ok(Self { equity, positions })
    }

    pub fn position(&self, symbol: &Symbol) -> Notional {
        self.positions.get(symbol).copied().unwrap_or(0.0)
    }
}

/// Compute the intents that move `snapshot` onto `targets`.
///
/// Closes come first, then rebalances; each group is in symbol order.
/// Zero deltas produce no intent.
pub fn compute_deltas(targets: &TargetWeights, snapshot: &AccountSnapshot) -> Vec<OrderIntent> {
    let mut intents: Vec<OrderIntent> = snapshot
        .positions
        .iter()
        .filter(|(sym, _)| !targets.contains(sym))
        .map(|(sym, notional)| OrderIntent {
            symbol: sym.clone(),
            dollar_delta: -notional,
            reason: IntentReason::Close,
        })
        .collect();

    for (sym, weight) in targets.iter() {
        let desired = weight * snapshot.equity;
        let delta = desired - snapshot.position(sym);
        if delta == 0.0 {
            continue;
        }
        intents.push(OrderIntent {
            symbol: sym.clone(),
            dollar_delta: delta,
            reason: IntentReason::Rebalance,
        });
    }

    intents.retain(|i| i.dollar_delta != 0.0);
    intents
}

/// Cooperative cancellation for a running cycle.
///
/// Checked between per-symbol submissions; an order already handed to the
/// venue is never pulled back.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reconciler settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconcileConfig {
    /// Floor applied on top of each instrument's own minimum notional.
    pub min_notional: f64,
    pub time_in_force: TimeInForce,
    /// Rules for symbols the venue publishes no metadata for.
    pub default_instrument: InstrumentSpec,
    /// Pause after each submission.
    pub order_interval: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            min_notional: DEFAULT_MIN_NOTIONAL,
            time_in_force: TimeInForce::GTC,
            default_instrument: InstrumentSpec::default(),
            order_interval: Duration::ZERO,
        }
    }
}

/// Drives reconciliation cycles against a [`Venue`].
///
/// At most one cycle runs at a time per reconciler; a second concurrent
/// call fails with [`Error::CycleInProgress`].
#[derive(Debug, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
    active: AtomicBool,
    state: Mutex<CycleState>,
}

/// Releases the single-flight flag when a cycle ends, however it ends.
struct ActiveCycle<'a>(&'a AtomicBool);

impl Drop for ActiveCycle<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Self {
            config,
            active: AtomicBool::new(false),
            state: Mutex::new(CycleState::Idle),
        }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// State of the current (or last) cycle.
    pub fn state(&self) -> CycleState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: CycleState) {
        debug!("cycle state -> {state}");
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn begin(&self) -> Result<ActiveCycle<'_>> {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| Error::CycleInProgress)?;
        Ok(ActiveCycle(&self.active))
    }

    /// Run one full cycle.
    ///
    /// Errors while fetching state abort the cycle before anything is
    /// submitted. Errors while executing are recorded per symbol in the
    /// returned report.
    pub fn run_cycle<V: Venue + ?Sized>(
        &self,
        venue: &V,
        targets: &TargetWeights,
        cancel: &CancelToken,
    ) -> Result<CycleReport> {
        let _active = self.begin()?;

        self.set_state(CycleState::FetchingState);
        let snapshot = match self.fetch_state(venue) {
            Ok(s) => s,
            Err(e) => {
                self.set_state(CycleState::Failed);
                return Err(e);
            }
        };
        info!(
            "snapshot: equity {:.2}, {} open positions",
            snapshot.equity,
            snapshot.positions.len()
        );

        self.set_state(CycleState::ComputingDeltas);
        let intents = compute_deltas(targets, &snapshot);
        info!("{} intents to execute", intents.len());

        self.set_state(CycleState::Executing);
        let mut outcomes = Vec::with_capacity(intents.len());
        let mut cancelled = false;
        for intent in intents {
            if cancel.is_cancelled() {
                if !cancelled {
                    warn!("cycle cancelled before {}", intent.symbol);
                }
                cancelled = true;
                outcomes.push(IntentOutcome {
                    intent,
                    outcome: Outcome::NotAttempted,
                });
                continue;
            }

            let outcome = self.execute(venue, &intent);
            let pause = outcome.is_submitted() && !self.config.order_interval.is_zero();
            outcomes.push(IntentOutcome { intent, outcome });
            if pause {
                thread::sleep(self.config.order_interval);
            }
        }

        self.set_state(CycleState::Done);
        Ok(CycleReport {
            equity: snapshot.equity,
            state: CycleState::Done,
            outcomes,
            cancelled,
        })
    }

    fn fetch_state<V: Venue + ?Sized>(&self, venue: &V) -> Result<AccountSnapshot> {
        // Resting orders would be double-counted against the fresh positions.
        match venue.cancel_all_orders() {
            Ok(true) => {}
            Ok(false) => {
                return Err(Error::Precondition(
                    "venue refused to cancel resting orders".into(),
                ));
            }
            Err(e) => {
                return Err(Error::Precondition(format!(
                    "cancelling resting orders: {e}"
                )));
            }
        }
        AccountSnapshot::read(venue)
    }

    fn execute<V: Venue + ?Sized>(&self, venue: &V, intent: &OrderIntent) -> Outcome {
        let symbol = &intent.symbol;
        let side = Side::for_delta(intent.dollar_delta);

        let (bid, ask) = match venue.best_bid_ask(symbol) {
            Ok(q) => q,
            Err(e) => return self.fail(SymbolError::from_external(symbol, e)),
        };
        let price = match side {
            Side::Buy => ask,
            Side::Sell => bid,
        };
        let Some(price) = price else {
            return self.fail(SymbolError::MarketDataUnavailable(symbol.clone()));
        };

        let instrument = match venue.instrument(symbol) {
            Ok(Some(spec)) => spec,
            Ok(None) => {
                debug!("{symbol}: no instrument metadata, using defaults");
                self.config.default_instrument
            }
            Err(e) => return self.fail(SymbolError::from_external(symbol, e)),
        }
        .with_min_notional_floor(self.config.min_notional);

        let sized = match sizer::size(symbol, intent.dollar_delta, &instrument, price) {
            Sizing::Order(q) => q,
            Sizing::Skip(reason) => {
                debug!("{symbol}: skipped ({reason})");
                return Outcome::Skipped(reason);
            }
        };

        let order = OrderRequest {
            symbol: sized.symbol,
            side: sized.side,
            quantity: sized.quantity,
            limit_price: sized.price,
            time_in_force: self.config.time_in_force,
        };
        match venue.submit(&order) {
            Ok(ack) if ack.accepted => {
                info!(
                    "{symbol}: {} {} @ {} accepted ({})",
                    order.side, order.quantity, order.limit_price, ack.detail
                );
                Outcome::Submitted {
                    order,
                    detail: ack.detail,
                }
            }
            Ok(ack) => self.fail(SymbolError::OrderRejected {
                symbol: symbol.clone(),
                detail: ack.detail,
            }),
            Err(e) => self.fail(SymbolError::from_external(symbol, e)),
        }
    }

    fn fail(&self, err: SymbolError) -> Outcome {
        warn!("{err}");
        Outcome::Failed(err)
    }
}
