//! Core types: Symbol, Notional

use std::fmt;

/// Maximum symbol length in bytes.
pub const MAX_SYMBOL_LEN: usize = 32;

/// Signed dollar value. Positive = long / buy, negative = short / sell.
pub type Notional = f64;

/// A tradable ticker.
///
/// Symbols are upper-cased on construction so `btc` and `BTC` compare equal.
/// Ordering is lexical and is the tie-break the ranker relies on.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Symbol(String);

impl Symbol {
    /// Create a symbol, panicking on invalid input.
    ///
    /// Intended for literals in tests and examples; use [`Symbol::try_new`]
    /// for anything read from the outside world.
    pub fn new(s: &str) -> Self {
        match Self::try_new(s) {
            Some(sym) => sym,
            None => panic!("invalid symbol: {s:?}"),
        }
    }

    /// Create a symbol, returning `None` if it is empty, too long, or
    /// contains characters outside `[A-Za-z0-9-_./]`.
    pub fn try_new(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || s.len() > MAX_SYMBOL_LEN {
            return None;
        }
        let valid = s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'/'));
        if !valid {
            return None;
        }
        Some(Symbol(s.to_ascii_uppercase()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Honor width/alignment so table output lines up.
        f.pad(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Symbol {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Symbol::try_new(&s).ok_or_else(|| format!("invalid symbol: {s:?}"))
    }
}

impl From<Symbol> for String {
    fn from(sym: Symbol) -> Self {
        sym.0
    }
}
