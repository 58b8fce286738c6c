//! Portfolio ranking: scores → dollar-neutral target weights.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::signal::Score;
use crate::types::Symbol;

/// Tolerance for the gross-exposure invariant.
pub const GROSS_TOLERANCE: f64 = 1e-6;

/// Default number of symbols on each side.
pub const DEFAULT_TOP_K: usize = 3;

/// Target portfolio weights, as fractions of equity.
///
/// Produced by [`rank`]: `sum(|w|) == 1.0` and long and short legs have equal
/// magnitude.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetWeights(BTreeMap<Symbol, f64>);

impl TargetWeights {
    pub fn get(&self, symbol: &Symbol) -> Option<f64> {
        self.0.get(symbol).copied()
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.0.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, f64)> {
        self.0.iter().map(|(s, w)| (s, *w))
    }

    /// Sum of absolute weights.
    pub fn gross_exposure(&self) -> f64 {
        self.0.values().map(|w| w.abs()).sum()
    }

    /// Sum of signed weights; zero for a dollar-neutral book.
    pub fn net_exposure(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn longs(&self) -> impl Iterator<Item = &Symbol> {
        self.0.iter().filter(|(_, w)| **w > 0.0).map(|(s, _)| s)
    }

    pub fn shorts(&self) -> impl Iterator<Item = &Symbol> {
        self.0.iter().filter(|(_, w)| **w < 0.0).map(|(s, _)| s)
    }
}

impl FromIterator<(Symbol, f64)> for TargetWeights {
    /// Build weights as given; no normalization is applied.
    fn from_iter<I: IntoIterator<Item = (Symbol, f64)>>(iter: I) -> Self {
        TargetWeights(iter.into_iter().collect())
    }
}

impl fmt::Display for TargetWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TARGET WEIGHTS:")?;
        for (sym, w) in &self.0 {
            writeln!(f, "  {:10} {:>+8.2}%", sym, w * 100.0)?;
        }
        writeln!(
            f,
            "  gross {:.2}%  net {:+.2}%",
            self.gross_exposure() * 100.0,
            self.net_exposure() * 100.0
        )
    }
}

/// Select the top `top_k` symbols long and the bottom `top_k` short, equal
/// weighted, gross exposure 1.0.
///
/// Ordering is descending by score with ties broken by symbol, so the result
/// is fully determined by its inputs. When the universe is too small for the
/// two sets to be disjoint, symbols claimed by both sides are dropped from
/// both; if that leaves either side empty the ranking fails with
/// [`Error::InsufficientUniverse`].
pub fn rank(score: &Score, top_k: usize) -> Result<TargetWeights> {
    if top_k == 0 {
        return Err(Error::InvalidInput("top_k must be >= 1".into()));
    }

    let mut ranked: Vec<(&Symbol, f64)> = score.iter().filter(|(_, v)| v.is_finite()).collect();
    if ranked.len() < score.len() {
        warn!(
            "dropped {} non-finite scores before ranking",
            score.len() - ranked.len()
        );
    }
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let n = ranked.len();
    let k = top_k.min(n);
    let top = &ranked[..k];
    let bottom = &ranked[n - k..];

    // Overlap can only happen when n < 2k; the contested band is the middle.
    let longs: Vec<&Symbol> = top
        .iter()
        .filter(|(s, _)| !bottom.iter().any(|(b, _)| b == s))
        .map(|(s, _)| *s)
        .collect();
    let shorts: Vec<&Symbol> = bottom
        .iter()
        .filter(|(s, _)| !top.iter().any(|(t, _)| t == s))
        .map(|(s, _)| *s)
        .collect();

    if longs.is_empty() || shorts.is_empty() {
        return Err(Error::InsufficientUniverse {
            available: n,
            top_k,
        });
    }

    let gross = (longs.len() + shorts.len()) as f64;
    let weights: TargetWeights = longs
        .iter()
        .map(|s| ((*s).clone(), 1.0 / gross))
        .chain(shorts.iter().map(|s| ((*s).clone(), -1.0 / gross)))
        .collect();

    debug!(
        "ranked {n} symbols: {} long, {} short",
        longs.len(),
        shorts.len()
    );
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(entries: &[(&str, f64)]) -> Score {
        entries.iter().map(|(s, v)| (Symbol::new(s), *v)).collect()
    }

    #[test]
    fn top_one_each_side() {
        let s = score(&[("A", 9.0), ("B", 4.0), ("C", -1.0), ("D", -7.0)]);
        let w = rank(&s, 1).unwrap();
        assert_eq!(w.len(), 2);
        assert_eq!(w.get(&Symbol::new("A")), Some(0.5));
        assert_eq!(w.get(&Symbol::new("D")), Some(-0.5));
    }

    #[test]
    fn default_top_k_of_larger_universe() {
        let s = score(&[
            ("A", 8.0),
            ("B", 7.0),
            ("C", 6.0),
            ("D", 5.0),
            ("E", 4.0),
            ("F", 3.0),
            ("G", 2.0),
            ("H", 1.0),
        ]);
        let w = rank(&s, DEFAULT_TOP_K).unwrap();
        assert_eq!(w.len(), 6);
        let longs: Vec<&str> = w.longs().map(Symbol::as_str).collect();
        let shorts: Vec<&str> = w.shorts().map(Symbol::as_str).collect();
        assert_eq!(longs, ["A", "B", "C"]);
        assert_eq!(shorts, ["F", "G", "H"]);
        assert!((w.gross_exposure() - 1.0).abs() < GROSS_TOLERANCE);
        assert!(w.net_exposure().abs() < GROSS_TOLERANCE);
    }

    #[test]
    fn ties_break_by_symbol() {
        let s = score(&[("C", 1.0), ("A", 1.0), ("B", 1.0), ("D", 1.0)]);
        let w = rank(&s, 1).unwrap();
        assert_eq!(w.get(&Symbol::new("A")), Some(0.5));
        assert_eq!(w.get(&Symbol::new("D")), Some(-0.5));
    }

    #[test]
    fn overlapping_sets_shrink() {
        // 4 symbols, k=3: top {A,B,C}, bottom {B,C,D} → contested B,C dropped.
        let s = score(&[("A", 4.0), ("B", 3.0), ("C", 2.0), ("D", 1.0)]);
        let w = rank(&s, 3).unwrap();
        assert_eq!(w.len(), 2);
        assert_eq!(w.get(&Symbol::new("A")), Some(0.5));
        assert_eq!(w.get(&Symbol::new("D")), Some(-0.5));
    }

    #[test]
    fn odd_universe_drops_middle() {
        let s = score(&[("A", 5.0), ("B", 4.0), ("C", 3.0), ("D", 2.0), ("E", 1.0)]);
        let w = rank(&s, 3).unwrap();
        assert_eq!(w.len(), 4);
        assert!(!w.contains(&Symbol::new("C")));
        assert_eq!(w.get(&Symbol::new("A")), Some(0.25));
        assert_eq!(w.get(&Symbol::new("E")), Some(-0.25));
    }

    #[test]
    fn three_symbols_top_three_is_insufficient() {
        let s = score(&[("A", 3.0), ("B", 2.0), ("C", 1.0)]);
        assert_eq!(
            rank(&s, 3),
            Err(Error::InsufficientUniverse {
                available: 3,
                top_k: 3
            })
        );
    }

    #[test]
    fn single_symbol_is_insufficient() {
        let s = score(&[("A", 3.0)]);
        assert!(matches!(
            rank(&s, 1),
            Err(Error::InsufficientUniverse { .. })
        ));
    }

    #[test]
    fn empty_score_is_insufficient() {
        assert!(matches!(
            rank(&Score::new(), 2),
            Err(Error::InsufficientUniverse { available: 0, .. })
        ));
    }

    #[test]
    fn zero_top_k_rejected() {
        let s = score(&[("A", 1.0), ("B", 0.0)]);
        assert!(matches!(rank(&s, 0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn non_finite_scores_are_dropped() {
        let s = score(&[("A", f64::NAN), ("B", 2.0), ("C", 1.0)]);
        let w = rank(&s, 1).unwrap();
        assert!(!w.contains(&Symbol::new("A")));
        assert_eq!(w.get(&Symbol::new("B")), Some(0.5));
    }

    #[test]
    fn display_lists_weights() {
        let s = score(&[("A", 1.0), ("B", -1.0)]);
        let out = rank(&s, 1).unwrap().to_string();
        assert!(out.contains("+50.00%"));
        assert!(out.contains("gross 100.00%"));
    }
}
