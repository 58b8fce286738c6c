//! JSONL audit trail logging.
//!
//! Each rebalancer run appends events to an audit.jsonl file,
//! one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rankbook::{AccountSnapshot, CycleReport, IntentOutcome, Outcome, TargetWeights};
use serde::Serialize;

use crate::error::Result;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

pub fn log_cycle_started(
    audit: &mut AuditLog,
    account_id: &str,
    signal_file: &str,
    requested_as_of: Option<NaiveDate>,
    dry_run: bool,
) -> Result<()> {
    audit.log(
        "cycle_started",
        serde_json::json!({
            "account": account_id,
            "signal_file": signal_file,
            "requested_as_of": requested_as_of,
            "dry_run": dry_run,
        }),
    )
}

pub fn log_targets(audit: &mut AuditLog, as_of: NaiveDate, targets: &TargetWeights) -> Result<()> {
    let weights: serde_json::Map<String, serde_json::Value> = targets
        .iter()
        .map(|(sym, w)| (sym.to_string(), serde_json::json!(w)))
        .collect();
    audit.log(
        "targets_computed",
        serde_json::json!({
            "as_of": as_of,
            "weights": weights,
            "gross": targets.gross_exposure(),
            "net": targets.net_exposure(),
        }),
    )
}

pub fn log_snapshot(audit: &mut AuditLog, snapshot: &AccountSnapshot) -> Result<()> {
    audit.log(
        "snapshot",
        serde_json::json!({
            "equity": snapshot.equity,
            "positions": snapshot.positions,
        }),
    )
}

pub fn log_intent_outcome(audit: &mut AuditLog, item: &IntentOutcome) -> Result<()> {
    let intent = &item.intent;
    let mut data = serde_json::json!({
        "symbol": intent.symbol.as_str(),
        "reason": intent.reason.to_string(),
        "delta": intent.dollar_delta,
    });
    let outcome = match &item.outcome {
        Outcome::Submitted { order, detail } => serde_json::json!({
            "status": "submitted",
            "side": order.side.as_str(),
            "qty": order.quantity,
            "limit": order.limit_price,
            "tif": order.time_in_force.as_str(),
            "detail": detail,
        }),
        Outcome::Skipped(reason) => serde_json::json!({
            "status": "skipped",
            "detail": reason.to_string(),
        }),
        Outcome::Failed(e) => {
            let status = if item.outcome.is_skip() {
                "skipped"
            } else {
                "failed"
            };
            serde_json::json!({ "status": status, "detail": e.to_string() })
        }
        Outcome::NotAttempted => serde_json::json!({ "status": "not_attempted" }),
    };
    if let (Some(fields), serde_json::Value::Object(extra)) = (data.as_object_mut(), outcome) {
        fields.extend(extra);
    }
    audit.log("intent_outcome", data)
}

pub fn log_cycle_completed(audit: &mut AuditLog, report: &CycleReport) -> Result<()> {
    audit.log(
        "cycle_completed",
        serde_json::json!({
            "state": report.state.to_string(),
            "submitted": report.submitted(),
            "skipped": report.skipped(),
            "failed": report.failed(),
            "not_attempted": report.not_attempted(),
            "cancelled": report.cancelled,
        }),
    )
}

pub fn log_cycle_failed(audit: &mut AuditLog, error: &dyn std::fmt::Display) -> Result<()> {
    audit.log(
        "cycle_failed",
        serde_json::json!({ "error": error.to_string() }),
    )
}
