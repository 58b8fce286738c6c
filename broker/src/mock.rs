//! Mock venue for testing — implements the rankbook venue traits with
//! configurable behavior.
//!
//! Use this in integration tests to simulate venue responses without network calls.
//!
//! ```
//! use rankbook::Symbol;
//! use rankbook_broker::mock::{FillMode, MockVenue};
//!
//! let venue = MockVenue::builder()
//!     .fill_mode(FillMode::ImmediateFull)
//!     .with_equity(10_000.0)
//!     .with_position(Symbol::new("BTC"), 2_500.0)
//!     .with_quote(Symbol::new("BTC"), 59_990.0, 60_010.0)
//!     .build();
//! assert_eq!(venue.position(&Symbol::new("BTC")), 2_500.0);
//! ```

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use rankbook::{
    AccountState, ExternalError, InstrumentSource, InstrumentSpec, Notional, OrderRequest,
    OrderSubmitter, PriceOracle, SubmitAck, Symbol, VenueResult,
};

/// How the mock venue handles submitted orders.
#[derive(Clone, Debug, PartialEq)]
pub enum FillMode {
    /// Orders fill completely at their limit price.
    ImmediateFull,
    /// Orders fill the given fraction (e.g. 0.5 = 50%) at their limit price.
    ImmediatePartial(f64),
    /// All orders are rejected.
    Reject,
    /// All submissions time out without reaching the book.
    Timeout,
}

/// Builder for `MockVenue`.
pub struct MockVenueBuilder {
    fill_mode: FillMode,
    equity: f64,
    positions: BTreeMap<Symbol, Notional>,
    quotes: BTreeMap<Symbol, (Option<f64>, Option<f64>)>,
    instruments: BTreeMap<Symbol, InstrumentSpec>,
    rejected: Vec<Symbol>,
    cancel_succeeds: bool,
}

impl MockVenueBuilder {
    pub fn fill_mode(mut self, mode: FillMode) -> Self {
        self.fill_mode = mode;
        self
    }

    pub fn with_equity(mut self, equity: f64) -> Self {
        self.equity = equity;
        self
    }

    pub fn with_position(mut self, symbol: Symbol, notional: Notional) -> Self {
        self.positions.insert(symbol, notional);
        self
    }

    pub fn with_quote(mut self, symbol: Symbol, bid: f64, ask: f64) -> Self {
        self.quotes.insert(symbol, (Some(bid), Some(ask)));
        self
    }

    /// Quote with either side possibly missing; `(None, None)` means no market data.
    pub fn with_partial_quote(mut self, symbol: Symbol, bid: Option<f64>, ask: Option<f64>) -> Self {
        self.quotes.insert(symbol, (bid, ask));
        self
    }

    pub fn with_instrument(mut self, symbol: Symbol, spec: InstrumentSpec) -> Self {
        self.instruments.insert(symbol, spec);
        self
    }

    /// Reject orders for `symbol` regardless of fill mode.
    pub fn rejecting(mut self, symbol: Symbol) -> Self {
        self.rejected.push(symbol);
        self
    }

    /// Make `cancel_all_orders` report failure.
    pub fn failing_cancel(mut self) -> Self {
        self.cancel_succeeds = false;
        self
    }

    pub fn build(self) -> MockVenue {
        MockVenue {
            fill_mode: self.fill_mode,
            equity: self.equity,
            quotes: self.quotes,
            instruments: self.instruments,
            rejected: self.rejected,
            cancel_succeeds: self.cancel_succeeds,
            positions: Mutex::new(self.positions),
            submitted_orders: Mutex::new(Vec::new()),
            cancel_calls: Mutex::new(0),
        }
    }
}

/// A mock venue that records submitted orders and applies fills to its positions.
pub struct MockVenue {
    fill_mode: FillMode,
    equity: f64,
    quotes: BTreeMap<Symbol, (Option<f64>, Option<f64>)>,
    instruments: BTreeMap<Symbol, InstrumentSpec>,
    rejected: Vec<Symbol>,
    cancel_succeeds: bool,
    positions: Mutex<BTreeMap<Symbol, Notional>>,
    submitted_orders: Mutex<Vec<OrderRequest>>,
    cancel_calls: Mutex<usize>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MockVenue {
    pub fn builder() -> MockVenueBuilder {
        MockVenueBuilder {
            fill_mode: FillMode::ImmediateFull,
            equity: 10_000.0,
            positions: BTreeMap::new(),
            quotes: BTreeMap::new(),
            instruments: BTreeMap::new(),
            rejected: Vec::new(),
            cancel_succeeds: true,
        }
    }

    /// All orders that reached the venue (for assertion in tests).
    pub fn submitted_orders(&self) -> Vec<OrderRequest> {
        lock(&self.submitted_orders).clone()
    }

    /// Current notional held in `symbol`.
    pub fn position(&self, symbol: &Symbol) -> Notional {
        lock(&self.positions).get(symbol).copied().unwrap_or(0.0)
    }

    /// How many times `cancel_all_orders` was called.
    pub fn cancel_calls(&self) -> usize {
        *lock(&self.cancel_calls)
    }
}

impl AccountState for MockVenue {
    fn equity(&self) -> VenueResult<f64> {
        Ok(self.equity)
    }

    fn positions(&self) -> VenueResult<BTreeMap<Symbol, Notional>> {
        Ok(lock(&self.positions).clone())
    }

    fn cancel_all_orders(&self) -> VenueResult<bool> {
        *lock(&self.cancel_calls) += 1;
        Ok(self.cancel_succeeds)
    }
}

impl PriceOracle for MockVenue {
    fn best_bid_ask(&self, symbol: &Symbol) -> VenueResult<(Option<f64>, Option<f64>)> {
        Ok(self.quotes.get(symbol).copied().unwrap_or((None, None)))
    }
}

impl InstrumentSource for MockVenue {
    fn instrument(&self, symbol: &Symbol) -> VenueResult<Option<InstrumentSpec>> {
        Ok(self.instruments.get(symbol).copied())
    }
}

impl OrderSubmitter for MockVenue {
    fn submit(&self, order: &OrderRequest) -> VenueResult<SubmitAck> {
        if self.fill_mode == FillMode::Timeout {
            return Err(ExternalError::Timeout(format!(
                "mock: submit {} timed out",
                order.symbol
            )));
        }

        let mut submitted = lock(&self.submitted_orders);
        submitted.push(order.clone());
        let id = submitted.len();

        if self.rejected.contains(&order.symbol) {
            return Ok(SubmitAck::rejected(format!("mock: {} rejected", order.symbol)));
        }

        let fraction = match self.fill_mode {
            FillMode::ImmediateFull => 1.0,
            FillMode::ImmediatePartial(f) => f,
            FillMode::Reject => return Ok(SubmitAck::rejected("mock: order rejected")),
            FillMode::Timeout => unreachable!("handled above"),
        };

        let filled = order.side.sign() * order.quantity * fraction * order.limit_price;
        let mut positions = lock(&self.positions);
        let held = positions.entry(order.symbol.clone()).or_insert(0.0);
        *held += filled;
        if *held == 0.0 {
            positions.remove(&order.symbol);
        }

        Ok(SubmitAck::accepted(format!("mock-{id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rankbook::{Side, TimeInForce};

    fn btc() -> Symbol {
        Symbol::new("BTC")
    }

    fn order(side: Side, quantity: f64, price: f64) -> OrderRequest {
        OrderRequest {
            symbol: btc(),
            side,
            quantity,
            limit_price: price,
            time_in_force: TimeInForce::GTC,
        }
    }

    #[test]
    fn builder_basic() {
        let venue = MockVenue::builder()
            .with_equity(50_000.0)
            .with_position(btc(), 1_000.0)
            .with_quote(btc(), 99.0, 101.0)
            .with_instrument(btc(), InstrumentSpec::new(3, 5.0))
            .build();

        assert_eq!(venue.equity().unwrap(), 50_000.0);
        assert_eq!(venue.positions().unwrap().len(), 1);
        assert_eq!(venue.best_bid_ask(&btc()).unwrap(), (Some(99.0), Some(101.0)));
        assert_eq!(
            venue.instrument(&btc()).unwrap(),
            Some(InstrumentSpec::new(3, 5.0))
        );
    }

    #[test]
    fn unknown_symbol_has_no_quote() {
        let venue = MockVenue::builder().build();
        assert_eq!(venue.best_bid_ask(&btc()).unwrap(), (None, None));
        assert_eq!(venue.instrument(&btc()).unwrap(), None);
    }

    #[test]
    fn full_fill_updates_position() {
        let venue = MockVenue::builder().with_position(btc(), 500.0).build();
        let ack = venue.submit(&order(Side::Sell, 5.0, 100.0)).unwrap();
        assert!(ack.accepted);
        assert_eq!(ack.detail, "mock-1");
        // 500 - 5 * 100 = 0 → flat
        assert_eq!(venue.position(&btc()), 0.0);
        assert!(venue.positions().unwrap().is_empty());
    }

    #[test]
    fn partial_fill() {
        let venue = MockVenue::builder()
            .fill_mode(FillMode::ImmediatePartial(0.5))
            .build();
        venue.submit(&order(Side::Buy, 10.0, 100.0)).unwrap();
        assert_eq!(venue.position(&btc()), 500.0);
    }

    #[test]
    fn reject_mode_records_but_does_not_fill() {
        let venue = MockVenue::builder().fill_mode(FillMode::Reject).build();
        let ack = venue.submit(&order(Side::Buy, 1.0, 100.0)).unwrap();
        assert!(!ack.accepted);
        assert_eq!(venue.submitted_orders().len(), 1);
        assert_eq!(venue.position(&btc()), 0.0);
    }

    #[test]
    fn timeout_mode() {
        let venue = MockVenue::builder().fill_mode(FillMode::Timeout).build();
        let err = venue.submit(&order(Side::Buy, 1.0, 100.0)).unwrap_err();
        assert!(err.is_timeout());
        assert!(venue.submitted_orders().is_empty());
    }

    #[test]
    fn failing_cancel() {
        let venue = MockVenue::builder().failing_cancel().build();
        assert!(!venue.cancel_all_orders().unwrap());
        assert_eq!(venue.cancel_calls(), 1);
    }
}
