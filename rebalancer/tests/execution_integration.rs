//! Integration tests for the rebalancer workflow against the mock venue.

use std::path::Path;

use rankbook::{IntentReason, Outcome, Side, Symbol};
use rankbook_broker::mock::{FillMode, MockVenue};
use rankbook_rebalancer::config::Config;
use rankbook_rebalancer::error::Error;
use rankbook_rebalancer::execution::{self, RunOptions, enforce_max_orders_per_run};
use rankbook_rebalancer::lock::RunLock;
use rankbook_rebalancer::signals::JsonSignalStore;

fn sym(s: &str) -> Symbol {
    Symbol::new(s)
}

const SIGNALS: &str = r#"{
    "observations": [
        { "date": "2024-03-10", "symbol": "A", "value": 4.0 },
        { "date": "2024-03-10", "symbol": "B", "value": 1.0 },
        { "date": "2024-03-10", "symbol": "C", "value": 0.0 },
        { "date": "2024-03-10", "symbol": "D", "value": -3.0 },
        { "date": "2024-03-11", "symbol": "A", "value": 5.0 },
        { "date": "2024-03-11", "symbol": "B", "value": 3.0 },
        { "date": "2024-03-11", "symbol": "C", "value": -1.0 },
        { "date": "2024-03-11", "symbol": "D", "value": -4.0 }
    ]
}"#;

fn config(dir: &Path, max_orders: usize) -> Config {
    let toml = format!(
        r#"
[account]
id = "test"

[venue]
testnet = true

[signal]
path = "unused.json"
window = 2

[portfolio]
top_k = 1

[execution]
order_interval_ms = 0
max_orders_per_run = {max_orders}

[logging]
dir = '{}'
"#,
        dir.display()
    );
    Config::from_toml(&toml).unwrap()
}

fn force() -> RunOptions {
    RunOptions {
        force: true,
        signal_file: "signals.json".into(),
        ..Default::default()
    }
}

/// Equity 10 000, long A $4 000, long C $200, quotes for A, C, D.
fn venue(fill: FillMode) -> MockVenue {
    MockVenue::builder()
        .fill_mode(fill)
        .with_equity(10_000.0)
        .with_position(sym("A"), 4_000.0)
        .with_position(sym("C"), 200.0)
        .with_quote(sym("A"), 99.9, 100.0)
        .with_quote(sym("C"), 20.0, 20.02)
        .with_quote(sym("D"), 50.0, 50.05)
        .build()
}

fn audit_events(config: &Config) -> Vec<String> {
    std::fs::read_to_string(config.audit_path())
        .unwrap()
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["event"].as_str().unwrap().to_string()
        })
        .collect()
}

// ============================================================================
// plan
// ============================================================================

#[test]
fn plan_ranks_latest_window() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 50);
    let store = JsonSignalStore::from_json(SIGNALS).unwrap();

    let plan = execution::plan(&config, &store, None).unwrap();
    assert_eq!(plan.as_of.to_string(), "2024-03-11");
    assert_eq!(plan.score.get(&sym("A")), Some(9.0));
    assert_eq!(plan.score.get(&sym("B")), Some(4.0));
    assert_eq!(plan.score.get(&sym("C")), Some(-1.0));
    assert_eq!(plan.score.get(&sym("D")), Some(-7.0));
    assert_eq!(plan.targets.get(&sym("A")), Some(0.5));
    assert_eq!(plan.targets.get(&sym("D")), Some(-0.5));
    assert_eq!(plan.targets.len(), 2);
}

#[test]
fn plan_on_empty_signal_file_has_no_history() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 50);
    let store = JsonSignalStore::from_json(r#"{ "observations": [] }"#).unwrap();

    let err = execution::plan(&config, &store, None).unwrap_err();
    assert!(matches!(
        err,
        Error::Cycle(rankbook::Error::NoHistory { .. })
    ));
}

// ============================================================================
// run
// ============================================================================

#[test]
fn run_reconciles_then_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 50);
    let store = JsonSignalStore::from_json(SIGNALS).unwrap();
    let venue = venue(FillMode::ImmediateFull);

    let report = execution::run(&config, &venue, &store, &force())
        .unwrap()
        .expect("orders expected on first run");
    assert_eq!(report.submitted(), 3);
    assert_eq!(venue.cancel_calls(), 1);

    // Closes first, then by symbol
    let order: Vec<_> = report
        .outcomes
        .iter()
        .map(|o| (o.intent.symbol.as_str().to_string(), o.intent.reason))
        .collect();
    assert_eq!(
        order,
        vec![
            ("C".to_string(), IntentReason::Close),
            ("A".to_string(), IntentReason::Rebalance),
            ("D".to_string(), IntentReason::Rebalance),
        ]
    );

    let submitted = venue.submitted_orders();
    assert_eq!(submitted[1].side, Side::Buy);
    assert_eq!(submitted[1].limit_price, 100.0);
    assert_eq!(submitted[1].quantity, 10.0);
    assert_eq!(submitted[2].side, Side::Sell);
    assert_eq!(submitted[2].limit_price, 50.0);
    assert_eq!(submitted[2].quantity, 100.0);

    assert_eq!(venue.position(&sym("A")), 5_000.0);
    assert_eq!(venue.position(&sym("C")), 0.0);
    assert_eq!(venue.position(&sym("D")), -5_000.0);

    // Second run finds nothing to do
    let again = execution::run(&config, &venue, &store, &force()).unwrap();
    assert!(again.is_none());
    assert_eq!(venue.submitted_orders().len(), 3);

    let events = audit_events(&config);
    assert_eq!(events.iter().filter(|e| *e == "intent_outcome").count(), 3);
    assert_eq!(events.iter().filter(|e| *e == "cycle_started").count(), 2);
    assert!(events.contains(&"cycle_completed".to_string()));
    assert!(events.contains(&"no_rebalance_needed".to_string()));

    // Lock released after each run
    assert!(!config.lock_path().exists());
}

#[test]
fn dry_run_submits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 50);
    let store = JsonSignalStore::from_json(SIGNALS).unwrap();
    let venue = venue(FillMode::ImmediateFull);

    let opts = RunOptions {
        dry_run: true,
        ..force()
    };
    assert!(execution::run(&config, &venue, &store, &opts).unwrap().is_none());
    assert!(venue.submitted_orders().is_empty());
    assert_eq!(venue.cancel_calls(), 0);
    assert_eq!(
        audit_events(&config),
        vec!["cycle_started", "targets_computed", "snapshot"]
    );
}

#[test]
fn rejections_are_isolated_per_symbol() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 50);
    let store = JsonSignalStore::from_json(SIGNALS).unwrap();
    let venue = MockVenue::builder()
        .with_equity(10_000.0)
        .with_quote(sym("A"), 99.9, 100.0)
        .with_quote(sym("D"), 50.0, 50.05)
        .rejecting(sym("A"))
        .build();

    let report = execution::run(&config, &venue, &store, &force())
        .unwrap()
        .unwrap();
    assert_eq!(report.submitted(), 1);
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.outcomes[0].outcome,
        Outcome::Failed(rankbook::SymbolError::OrderRejected { .. })
    ));
    assert_eq!(venue.position(&sym("D")), -5_000.0);
}

#[test]
fn failed_cancel_aborts_before_submitting() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 50);
    let store = JsonSignalStore::from_json(SIGNALS).unwrap();
    let venue = MockVenue::builder()
        .with_equity(10_000.0)
        .with_quote(sym("A"), 99.9, 100.0)
        .with_quote(sym("D"), 50.0, 50.05)
        .failing_cancel()
        .build();

    let err = execution::run(&config, &venue, &store, &force()).unwrap_err();
    assert!(err.is_precondition());
    assert!(venue.submitted_orders().is_empty());
    assert!(audit_events(&config).contains(&"cycle_failed".to_string()));
}

#[test]
fn planning_failure_is_audited() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 50);
    let store = JsonSignalStore::from_json(r#"{ "observations": [] }"#).unwrap();
    let venue = venue(FillMode::ImmediateFull);

    let err = execution::run(&config, &venue, &store, &force()).unwrap_err();
    assert!(matches!(
        err,
        Error::Cycle(rankbook::Error::NoHistory { .. })
    ));
    assert_eq!(audit_events(&config), vec!["cycle_started", "cycle_failed"]);
    assert!(!config.lock_path().exists());
}

#[test]
fn unusable_preview_snapshot_is_audited() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 50);
    let store = JsonSignalStore::from_json(SIGNALS).unwrap();
    let venue = MockVenue::builder()
        .with_equity(-1.0)
        .with_quote(sym("A"), 99.9, 100.0)
        .build();

    let err = execution::run(&config, &venue, &store, &force()).unwrap_err();
    assert!(err.is_precondition());
    assert_eq!(
        audit_events(&config),
        vec!["cycle_started", "targets_computed", "cycle_failed"]
    );
    assert!(venue.submitted_orders().is_empty());
}

#[test]
fn held_lock_blocks_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 50);
    let store = JsonSignalStore::from_json(SIGNALS).unwrap();
    let venue = venue(FillMode::ImmediateFull);

    let _held = RunLock::acquire(&config.lock_path()).unwrap();
    let err = execution::run(&config, &venue, &store, &force()).unwrap_err();
    assert!(matches!(err, Error::Locked { .. }));
    assert!(err.is_precondition());
    assert!(venue.submitted_orders().is_empty());
}

#[test]
fn too_many_orders_blocks_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 2);
    let store = JsonSignalStore::from_json(SIGNALS).unwrap();
    let venue = venue(FillMode::ImmediateFull);

    let err = execution::run(&config, &venue, &store, &force()).unwrap_err();
    assert!(matches!(err, Error::TooManyOrders { count: 3, max: 2 }));
    assert!(venue.submitted_orders().is_empty());
}

#[test]
fn show_positions_reads_snapshot() {
    let snapshot = execution::show_positions(&venue(FillMode::ImmediateFull)).unwrap();
    assert_eq!(snapshot.equity, 10_000.0);
    assert_eq!(snapshot.position(&sym("A")), 4_000.0);
}

// ============================================================================
// enforce_max_orders_per_run
// ============================================================================

#[test]
fn enforce_max_orders_per_run_allows_under_limit() {
    assert!(enforce_max_orders_per_run(3, 5).is_ok());
    assert!(enforce_max_orders_per_run(5, 5).is_ok());
}

#[test]
fn enforce_max_orders_per_run_rejects_over_limit() {
    let err = enforce_max_orders_per_run(10, 5).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("10 orders planned"));
    assert!(msg.contains("max_orders_per_run is 5"));
}
