//! Cycle report: what happened to every intent in one reconciliation cycle.

use std::fmt;

use crate::error::SymbolError;
use crate::reconcile::{CycleState, IntentReason, OrderIntent};
use crate::sizer::SkipReason;
use crate::venue::OrderRequest;

/// Outcome of a single intent.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The venue accepted the order.
    Submitted { order: OrderRequest, detail: String },
    /// Too small to trade, or unpriceable.
    Skipped(SkipReason),
    /// Isolated per-symbol failure; the rest of the cycle carried on.
    Failed(SymbolError),
    /// The cycle was cancelled before this intent was reached.
    NotAttempted,
}

impl Outcome {
    /// True for outcomes that are a legitimate "nothing to do this cycle".
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Outcome::Skipped(_) | Outcome::Failed(SymbolError::MarketDataUnavailable(_))
        )
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, Outcome::Submitted { .. })
    }
}

/// An intent and what became of it.
#[derive(Clone, Debug, PartialEq)]
pub struct IntentOutcome {
    pub intent: OrderIntent,
    pub outcome: Outcome,
}

/// Result of one reconciliation cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    pub equity: f64,
    pub state: CycleState,
    pub outcomes: Vec<IntentOutcome>,
    pub cancelled: bool,
}

impl CycleReport {
    pub fn submitted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_submitted()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_skip()).count()
    }

    /// Failures other than missing market data.
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Failed(_)) && !o.outcome.is_skip())
            .count()
    }

    pub fn not_attempted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome == Outcome::NotAttempted)
            .count()
    }

    /// Per-symbol errors collected during execution.
    pub fn errors(&self) -> impl Iterator<Item = &SymbolError> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            Outcome::Failed(e) => Some(e),
            _ => None,
        })
    }
}

impl fmt::Display for IntentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntentReason::Rebalance => "rebalance",
            IntentReason::Close => "close",
        };
        f.pad(s)
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CYCLE ({}, equity ${:.2}):", self.state, self.equity)?;
        writeln!(
            f,
            "  {:10} {:9} {:>12}  {}",
            "Symbol", "Reason", "Delta", "Outcome"
        )?;
        for o in &self.outcomes {
            let outcome = match &o.outcome {
                Outcome::Submitted { order, .. } => format!(
                    "{} {} @ {}",
                    order.side, order.quantity, order.limit_price
                ),
                Outcome::Skipped(reason) => format!("skip: {reason}"),
                Outcome::Failed(e) => format!("FAILED: {e}"),
                Outcome::NotAttempted => "not attempted".to_string(),
            };
            writeln!(
                f,
                "  {:10} {:9} {:>+12.2}  {}",
                o.intent.symbol, o.intent.reason, o.intent.dollar_delta, outcome
            )?;
        }
        write!(
            f,
            "\n  {} submitted, {} skipped, {} failed",
            self.submitted(),
            self.skipped(),
            self.failed()
        )?;
        if self.cancelled {
            write!(f, ", {} not attempted (cancelled)", self.not_attempted())?;
        }
        writeln!(f)
    }
}
