//! Order sizing: dollar delta + price → venue-valid quantity.

use std::fmt;

use crate::side::Side;
use crate::types::{Notional, Symbol};

/// Minimum tradable notional when the venue publishes none.
pub const DEFAULT_MIN_NOTIONAL: f64 = 12.0;

/// Largest quantity precision a venue can meaningfully express in an `f64`.
pub const MAX_QUANTITY_PRECISION: u32 = 18;

/// Static per-symbol trading rules.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstrumentSpec {
    /// Decimal places allowed in the order quantity.
    pub quantity_precision: u32,
    /// Smallest order notional the venue accepts.
    pub min_notional: f64,
}

impl InstrumentSpec {
    pub fn new(quantity_precision: u32, min_notional: f64) -> Self {
        Self {
            quantity_precision,
            min_notional,
        }
    }

    /// Same rules with the minimum notional raised to at least `floor`.
    pub fn with_min_notional_floor(self, floor: f64) -> Self {
        Self {
            min_notional: self.min_notional.max(floor),
            ..self
        }
    }
}

impl Default for InstrumentSpec {
    fn default() -> Self {
        Self {
            quantity_precision: 3,
            min_notional: DEFAULT_MIN_NOTIONAL,
        }
    }
}

/// A sized order ready for submission.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderQuantity {
    pub symbol: Symbol,
    pub side: Side,
    /// Always positive, rounded to the instrument's precision.
    pub quantity: f64,
    /// Price the quantity was sized against; used as the limit price.
    pub price: f64,
}

impl OrderQuantity {
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }
}

/// Why an order was not sized.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SkipReason {
    /// `|delta|` below the instrument minimum.
    BelowMinNotional { delta: f64, min_notional: f64 },
    /// Rounding to the quantity precision pushed the notional below the minimum.
    RoundsBelowMinNotional { notional: f64, min_notional: f64 },
    InvalidPrice(f64),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::BelowMinNotional {
                delta,
                min_notional,
            } => write!(f, "delta ${:.2} below min ${min_notional:.2}", delta.abs()),
            SkipReason::RoundsBelowMinNotional {
                notional,
                min_notional,
            } => write!(
                f,
                "rounded notional ${notional:.2} below min ${min_notional:.2}"
            ),
            SkipReason::InvalidPrice(p) => write!(f, "invalid price {p}"),
        }
    }
}

/// Result of sizing one delta.
#[derive(Clone, Debug, PartialEq)]
pub enum Sizing {
    Order(OrderQuantity),
    Skip(SkipReason),
}

/// Size an order for `dollar_delta` at `price`.
///
/// The caller picks the price: best ask for buys, best bid for sells.
/// A returned order always has positive quantity and notional at or above
/// the instrument's minimum.
pub fn size(
    symbol: &Symbol,
    dollar_delta: Notional,
    instrument: &InstrumentSpec,
    price: f64,
) -> Sizing {
    let min_notional = instrument.min_notional;
    if !dollar_delta.is_finite() || dollar_delta.abs() < min_notional {
        return Sizing::Skip(SkipReason::BelowMinNotional {
            delta: dollar_delta,
            min_notional,
        });
    }
    if !price.is_finite() || price <= 0.0 {
        return Sizing::Skip(SkipReason::InvalidPrice(price));
    }

    let quantity = round_to_precision(dollar_delta.abs() / price, instrument.quantity_precision);
    let notional = quantity * price;
    if !quantity.is_finite() || quantity <= 0.0 || notional < min_notional {
        return Sizing::Skip(SkipReason::RoundsBelowMinNotional {
            notional,
            min_notional,
        });
    }

    Sizing::Order(OrderQuantity {
        symbol: symbol.clone(),
        side: Side::for_delta(dollar_delta),
        quantity,
        price,
    })
}

/// Round half away from zero to `precision` decimal places.
pub fn round_to_precision(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn btc() -> Symbol {
        Symbol::new("BTC")
    }

    #[test]
    fn below_min_notional_skips() {
        let s = size(&btc(), 10.0, &InstrumentSpec::default(), 100.0);
        assert!(matches!(
            s,
            Sizing::Skip(SkipReason::BelowMinNotional { .. })
        ));
    }

    #[test]
    fn buy_sized_and_rounded() {
        let spec = InstrumentSpec::new(3, 12.0);
        let Sizing::Order(o) = size(&btc(), 1000.0, &spec, 60_000.0) else {
            panic!("expected order");
        };
        assert_eq!(o.side, Side::Buy);
        // 1000 / 60000 = 0.016666.. → 0.017
        assert_eq!(o.quantity, 0.017);
        assert_eq!(o.price, 60_000.0);
    }

    #[test]
    fn negative_delta_sells_positive_quantity() {
        let spec = InstrumentSpec::new(2, 5.0);
        let Sizing::Order(o) = size(&btc(), -5000.0, &spec, 250.0) else {
            panic!("expected order");
        };
        assert_eq!(o.side, Side::Sell);
        assert_eq!(o.quantity, 20.0);
    }

    #[test]
    fn rounding_to_zero_skips() {
        // 15 / 100 = 0.15 → 0 at precision 0
        let spec = InstrumentSpec::new(0, 12.0);
        assert!(matches!(
            size(&btc(), 15.0, &spec, 100.0),
            Sizing::Skip(SkipReason::RoundsBelowMinNotional { .. })
        ));
    }

    #[test]
    fn rounding_below_min_skips() {
        // 14 / 10 = 1.4 → 1 at precision 0 → $10 < $12
        let spec = InstrumentSpec::new(0, 12.0);
        assert!(matches!(
            size(&btc(), 14.0, &spec, 10.0),
            Sizing::Skip(SkipReason::RoundsBelowMinNotional { .. })
        ));
    }

    #[test]
    fn invalid_price_skips() {
        let spec = InstrumentSpec::default();
        assert!(matches!(
            size(&btc(), 100.0, &spec, 0.0),
            Sizing::Skip(SkipReason::InvalidPrice(_))
        ));
        assert!(matches!(
            size(&btc(), 100.0, &spec, f64::NAN),
            Sizing::Skip(SkipReason::InvalidPrice(_))
        ));
    }

    #[test]
    fn min_notional_floor() {
        let spec = InstrumentSpec::new(3, 5.0).with_min_notional_floor(12.0);
        assert_eq!(spec.min_notional, 12.0);
        let spec = InstrumentSpec::new(3, 20.0).with_min_notional_floor(12.0);
        assert_eq!(spec.min_notional, 20.0);
    }

    #[test]
    fn round_half_away_from_zero() {
        assert_eq!(round_to_precision(1.25, 1), 1.3);
        assert_eq!(round_to_precision(0.0004, 3), 0.0);
        assert_eq!(round_to_precision(12.0, 0), 12.0);
    }

    #[test]
    fn oversized_precision_skips_instead_of_nan() {
        // 10^400 overflows, so the rounded quantity is not finite
        let spec = InstrumentSpec::new(400, 12.0);
        match size(&btc(), 1000.0, &spec, 100.0) {
            Sizing::Skip(SkipReason::RoundsBelowMinNotional { .. }) => {}
            other => panic!("expected skip, got {other:?}"),
        }
    }
}
