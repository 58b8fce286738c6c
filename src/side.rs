//! Order side: Buy or Sell

use std::fmt;

use crate::types::Notional;

/// Side of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Side that moves a position by `dollar_delta`: buy for positive, sell otherwise.
    #[inline]
    pub fn for_delta(dollar_delta: Notional) -> Self {
        if dollar_delta > 0.0 {
            Side::Buy
        } else {
            Side::Sell
        }
    }

    /// Venue wire name: "BUY" or "SELL".
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    /// +1 for buys, -1 for sells.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
