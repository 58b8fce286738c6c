//! Execution orchestrator: signals → targets → preview → confirm → cycle.
//!
//! This is the main workflow that ties together all components.

use chrono::{NaiveDate, Utc};
use log::{error, info};
use rankbook::{
    AccountSnapshot, AccountState, CancelToken, CycleReport, OrderIntent, Reconciler, Score,
    SignalAggregator, SignalStore, TargetWeights, Venue, compute_deltas, rank,
};
use rankbook_broker::binance::BinanceVenue;

use crate::audit::{self, AuditLog};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::lock::RunLock;

/// Options for a rebalance run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub force: bool,
    /// Evaluation date; defaults to the latest date in the signal file.
    pub as_of: Option<NaiveDate>,
    pub signal_file: String,
}

/// Scores and target weights for one evaluation date.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub as_of: NaiveDate,
    pub score: Score,
    pub targets: TargetWeights,
}

/// Connect to the configured venue.
pub fn connect(config: &Config) -> Result<BinanceVenue> {
    let settings = config.binance_settings()?;
    Ok(BinanceVenue::connect(&settings)?)
}

/// Aggregate the signal and rank it into target weights.
pub fn plan<S: SignalStore + ?Sized>(
    config: &Config,
    store: &S,
    as_of: Option<NaiveDate>,
) -> Result<Plan> {
    let as_of = match as_of {
        Some(d) => d,
        None => store
            .latest_date()
            .map_err(|e| rankbook::Error::from_external("signal latest_date", e))?
            .unwrap_or_else(|| Utc::now().date_naive()),
    };

    let aggregator = SignalAggregator::new(config.signal.window, config.signal.reducer)?;
    let score = aggregator.aggregate_from(store, as_of)?;
    let targets = rank(&score, config.portfolio.top_k)?;
    info!(
        "Ranked {} symbols as of {as_of}: {} long, {} short",
        score.len(),
        targets.longs().count(),
        targets.shorts().count()
    );

    Ok(Plan {
        as_of,
        score,
        targets,
    })
}

/// Execute a full rebalance run.
///
/// Returns `None` for dry runs and declined confirmations. The preview is
/// computed from a snapshot taken before resting orders are cancelled; the
/// cycle itself re-reads the account, so executed deltas can differ slightly
/// when orders were filling in between.
pub fn run<V: Venue + ?Sized, S: SignalStore + ?Sized>(
    config: &Config,
    venue: &V,
    store: &S,
    opts: &RunOptions,
) -> Result<Option<CycleReport>> {
    // 1. One run per account
    let _lock = RunLock::acquire(&config.lock_path())?;

    // 2. Open audit log; from here on every failure is recorded
    let mut audit = AuditLog::open(&config.audit_path())?;
    audit::log_cycle_started(
        &mut audit,
        &config.account.id,
        &opts.signal_file,
        opts.as_of,
        opts.dry_run,
    )?;

    match run_logged(config, venue, store, opts, &mut audit) {
        Ok(report) => Ok(report),
        Err(e) => {
            error!("Run failed: {e}");
            audit::log_cycle_failed(&mut audit, &e)?;
            Err(e)
        }
    }
}

fn run_logged<V: Venue + ?Sized, S: SignalStore + ?Sized>(
    config: &Config,
    venue: &V,
    store: &S,
    opts: &RunOptions,
    audit: &mut AuditLog,
) -> Result<Option<CycleReport>> {
    // 3. Targets
    let plan = plan(config, store, opts.as_of)?;
    audit::log_targets(audit, plan.as_of, &plan.targets)?;
    print!("\n{}", plan.targets);

    // 4. Preview against the current account
    let snapshot = AccountSnapshot::read(venue)?;
    audit::log_snapshot(audit, &snapshot)?;
    display_snapshot(&snapshot);

    let intents = compute_deltas(&plan.targets, &snapshot);
    if intents.is_empty() {
        println!("\nNo rebalancing needed — portfolio matches target.");
        audit.log_simple("no_rebalance_needed")?;
        return Ok(None);
    }
    display_intents(&intents);
    enforce_max_orders_per_run(intents.len(), config.execution.max_orders_per_run)?;

    // 5. Dry run stops here
    if opts.dry_run {
        println!("\n[DRY RUN] No orders submitted.");
        return Ok(None);
    }

    // 6. Confirm execution
    if !opts.force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Execute?")
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;

        audit.log("user_confirmed", serde_json::json!({ "approved": confirmed }))?;
        if !confirmed {
            println!("Aborted.");
            return Ok(None);
        }
    }

    // 7. Reconcile
    let reconciler = Reconciler::new(config.reconcile_config());
    let report = reconciler.run_cycle(venue, &plan.targets, &CancelToken::new())?;

    for outcome in &report.outcomes {
        audit::log_intent_outcome(audit, outcome)?;
    }
    audit::log_cycle_completed(audit, &report)?;

    print!("\n{report}");
    println!("Audit logged to {}", config.audit_path().display());
    Ok(Some(report))
}

/// Show the current account.
pub fn show_positions<A: AccountState + ?Sized>(account: &A) -> Result<AccountSnapshot> {
    let snapshot = AccountSnapshot::read(account)?;
    display_snapshot(&snapshot);
    Ok(snapshot)
}

/// Check venue connectivity and credentials.
pub fn check_status(config: &Config) -> Result<()> {
    print!("Connecting to {}... ", config.base_url());
    let venue = connect(config)?;
    println!("OK");

    let equity = venue
        .equity()
        .map_err(|e| rankbook::Error::from_external("equity", e))?;
    println!("Account {}: ${equity:.2} equity", config.account.id);
    Ok(())
}

pub fn enforce_max_orders_per_run(count: usize, max: usize) -> Result<()> {
    if count > max {
        return Err(Error::TooManyOrders { count, max });
    }
    Ok(())
}

fn display_snapshot(snapshot: &AccountSnapshot) {
    println!("\nEquity: ${:.2}", snapshot.equity);
    if snapshot.positions.is_empty() {
        println!("No positions.");
        return;
    }

    println!("CURRENT POSITIONS:");
    for (symbol, notional) in &snapshot.positions {
        let weight = if snapshot.equity > 0.0 {
            notional / snapshot.equity
        } else {
            0.0
        };
        println!(
            "  {:10} ${:>+12.2}  ({:+.1}%)",
            symbol,
            notional,
            weight * 100.0
        );
    }
}

fn display_intents(intents: &[OrderIntent]) {
    println!("\nPLANNED DELTAS:");
    println!("  {:>3}  {:10} {:9} {:>12}", "#", "Symbol", "Reason", "Delta");
    for (i, intent) in intents.iter().enumerate() {
        println!(
            "  {:>3}  {:10} {:9} ${:>+11.2}",
            i + 1,
            intent.symbol,
            intent.reason,
            intent.dollar_delta
        );
    }
}
