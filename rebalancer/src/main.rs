//! CLI entry point for the rankbook rebalancer.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use rankbook_rebalancer::config::Config;
use rankbook_rebalancer::error::Error;
use rankbook_rebalancer::execution::{self, RunOptions};
use rankbook_rebalancer::signals::JsonSignalStore;

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Signal-ranked dollar-neutral rebalancer: rankbook → Binance futures")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rank signals, preview deltas, confirm, and run one reconciliation cycle
    Run {
        /// Signal file (overrides [signal].path)
        #[arg(long)]
        signals: Option<PathBuf>,

        /// Evaluation date (YYYY-MM-DD); defaults to the latest signal date
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Show plan without executing
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation prompt (for automation/cron)
        #[arg(long)]
        force: bool,
    },

    /// Print scores and target weights without touching the venue
    Plan {
        /// Signal file (overrides [signal].path)
        #[arg(long)]
        signals: Option<PathBuf>,

        /// Evaluation date (YYYY-MM-DD); defaults to the latest signal date
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Show current venue positions
    Positions,

    /// Check venue connection and credentials
    Status,
}

fn load_inputs(
    config_path: &Path,
    signals: Option<PathBuf>,
) -> anyhow::Result<(Config, JsonSignalStore, PathBuf)> {
    let config = Config::load(config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let signal_path = signals.unwrap_or_else(|| config.signal.path.clone());
    let store = JsonSignalStore::load(&signal_path)
        .with_context(|| format!("loading signals {}", signal_path.display()))?;
    Ok((config, store, signal_path))
}

fn load_config(config_path: &Path) -> anyhow::Result<Config> {
    Config::load(config_path).with_context(|| format!("loading config {}", config_path.display()))
}

fn exit_on_load_error<T>(result: anyhow::Result<T>) -> T {
    result.unwrap_or_else(|e| {
        eprintln!("Error: {e:#}");
        process::exit(1);
    })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run {
            signals,
            as_of,
            dry_run,
            force,
        } => {
            let (config, store, signal_path) = exit_on_load_error(load_inputs(&cli.config, signals));
            let opts = RunOptions {
                dry_run,
                force,
                as_of,
                signal_file: signal_path.display().to_string(),
            };
            execution::connect(&config)
                .and_then(|venue| execution::run(&config, &venue, &store, &opts))
                .map(|_| ())
        }
        Command::Plan { signals, as_of } => {
            let (config, store, _) = exit_on_load_error(load_inputs(&cli.config, signals));
            execution::plan(&config, &store, as_of).map(|plan| {
                println!("Scores as of {}:", plan.as_of);
                for (symbol, score) in plan.score.iter() {
                    println!("  {symbol:10} {score:>12.4}");
                }
                print!("\n{}", plan.targets);
            })
        }
        Command::Positions => {
            let config = exit_on_load_error(load_config(&cli.config));
            execution::connect(&config)
                .and_then(|venue| execution::show_positions(&venue))
                .map(|_| ())
        }
        Command::Status => {
            let config = exit_on_load_error(load_config(&cli.config));
            execution::check_status(&config)
        }
    };

    if let Err(e) = result {
        match &e {
            e if e.is_precondition() => {
                eprintln!("\nAborted: {e}");
                process::exit(2);
            }
            Error::Aborted(msg) => {
                eprintln!("{msg}");
                process::exit(0);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}
