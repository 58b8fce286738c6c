//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rankbook::{InstrumentSpec, ReconcileConfig, Reducer, TimeInForce};
use rankbook_broker::binance::BinanceSettings;
use rankbook_broker::binance::client::{MAINNET_URL, TESTNET_URL};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub account: AccountConfig,
    pub venue: VenueConfig,
    pub signal: SignalConfig,
    #[serde(default)]
    pub portfolio: PortfolioConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    /// Names the lock file and audit entries; one rebalancer per id at a time.
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    #[serde(default)]
    pub testnet: bool,
    /// Overrides the mainnet/testnet URL.
    pub base_url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: String,
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_recv_window")]
    pub recv_window_ms: u64,
}

fn default_api_key_env() -> String {
    "BINANCE_API_KEY".into()
}
fn default_secret_key_env() -> String {
    "BINANCE_SECRET_KEY".into()
}
fn default_quote_asset() -> String {
    "USDT".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_recv_window() -> u64 {
    5_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignalConfig {
    pub path: PathBuf,
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default)]
    pub reducer: Reducer,
}

fn default_window() -> usize {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    rankbook::rank::DEFAULT_TOP_K
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_min_notional")]
    pub min_notional: f64,
    #[serde(default)]
    pub time_in_force: TimeInForce,
    #[serde(default = "default_quantity_precision")]
    pub default_quantity_precision: u32,
    #[serde(default = "default_interval")]
    pub order_interval_ms: u64,
    #[serde(default = "default_max_orders")]
    pub max_orders_per_run: usize,
}

fn default_min_notional() -> f64 {
    rankbook::sizer::DEFAULT_MIN_NOTIONAL
}
fn default_quantity_precision() -> u32 {
    3
}
fn default_interval() -> u64 {
    100
}
fn default_max_orders() -> usize {
    50
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            min_notional: default_min_notional(),
            time_in_force: TimeInForce::default(),
            default_quantity_precision: default_quantity_precision(),
            order_interval_ms: default_interval(),
            max_orders_per_run: default_max_orders(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        let id = &self.account.id;
        if id.is_empty() {
            return Err(Error::Config("account id must not be empty".into()));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::Config(
                "account id may only contain [A-Za-z0-9_-]".into(),
            ));
        }
        if self.venue.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be > 0".into()));
        }
        if self.venue.quote_asset.is_empty() {
            return Err(Error::Config("quote_asset must not be empty".into()));
        }
        if self.venue.api_key_env.is_empty() || self.venue.secret_key_env.is_empty() {
            return Err(Error::Config("credential env var names must not be empty".into()));
        }
        if self.execution.default_quantity_precision > rankbook::sizer::MAX_QUANTITY_PRECISION {
            return Err(Error::Config(format!(
                "default_quantity_precision must be <= {}",
                rankbook::sizer::MAX_QUANTITY_PRECISION
            )));
        }
        if self.signal.window == 0 {
            return Err(Error::Config("signal window must be >= 1".into()));
        }
        if self.portfolio.top_k == 0 {
            return Err(Error::Config("top_k must be >= 1".into()));
        }
        let min = self.execution.min_notional;
        if !min.is_finite() || min < 0.0 {
            return Err(Error::Config("min_notional must be >= 0".into()));
        }
        if self.execution.max_orders_per_run == 0 {
            return Err(Error::Config("max_orders_per_run must be > 0".into()));
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        match &self.venue.base_url {
            Some(url) => url.as_str(),
            None if self.venue.testnet => TESTNET_URL,
            None => MAINNET_URL,
        }
    }

    /// Venue settings with credentials read from the configured env vars.
    pub fn binance_settings(&self) -> Result<BinanceSettings> {
        let read = |name: &str| {
            std::env::var(name)
                .map_err(|_| Error::Config(format!("environment variable {name} is not set")))
        };
        let mut settings = BinanceSettings::new(
            &read(&self.venue.api_key_env)?,
            &read(&self.venue.secret_key_env)?,
        );
        settings.base_url = self.base_url().to_string();
        settings.timeout = Duration::from_secs(self.venue.timeout_secs);
        settings.recv_window_ms = self.venue.recv_window_ms;
        settings.quote_asset = self.venue.quote_asset.clone();
        Ok(settings)
    }

    pub fn reconcile_config(&self) -> ReconcileConfig {
        let exec = &self.execution;
        ReconcileConfig {
            min_notional: exec.min_notional,
            time_in_force: exec.time_in_force,
            default_instrument: InstrumentSpec::new(
                exec.default_quantity_precision,
                exec.min_notional,
            ),
            order_interval: Duration::from_millis(exec.order_interval_ms),
        }
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }

    /// Per-account lock file held for the duration of a run.
    pub fn lock_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(format!("{}.lock", self.account.id))
    }
}
