//! Time-in-force policy for rebalance limit orders

use std::fmt;
use std::str::FromStr;

/// Time-in-force determines how long a submitted limit order stays live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum TimeInForce {
    /// Good-til-cancelled: rests until filled or cancelled by the next cycle's
    /// cancel-all.
    #[default]
    GTC,

    /// Immediate-or-cancel: fill what crosses now, drop the remainder.
    IOC,

    /// Fill-or-kill: fill entirely or not at all.
    FOK,

    /// Good-til-crossing (post-only): rejected by the venue if it would take
    /// liquidity.
    GTX,
}

impl TimeInForce {
    /// Venue wire code.
    pub fn as_str(self) -> &'static str {
        match self {
            TimeInForce::GTC => "GTC",
            TimeInForce::IOC => "IOC",
            TimeInForce::FOK => "FOK",
            TimeInForce::GTX => "GTX",
        }
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeInForce {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GTC" => Ok(TimeInForce::GTC),
            "IOC" => Ok(TimeInForce::IOC),
            "FOK" => Ok(TimeInForce::FOK),
            "GTX" | "POST_ONLY" => Ok(TimeInForce::GTX),
            other => Err(format!("unknown time-in-force: {other}")),
        }
    }
}
