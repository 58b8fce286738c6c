//! Binance USDⓈ-M futures venue.
//!
//! rankbook symbols are base assets ("BTC"); the venue trades them against a
//! single quote asset ("BTCUSDT"). Instrument rules are loaded once from
//! `exchangeInfo` at connect time.

pub mod auth;
pub mod client;
pub mod types;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use log::{debug, info, warn};
use rankbook::{
    AccountState, InstrumentSource, InstrumentSpec, Notional, OrderRequest, OrderSubmitter,
    PriceOracle, SubmitAck, Symbol, VenueResult,
};

use crate::error::BrokerError;
use client::{BinanceFuturesClient, OrderReply};
use types::{ExchangeInfo, SymbolFilter};

/// Connection settings for [`BinanceVenue`].
#[derive(Clone, Debug)]
pub struct BinanceSettings {
    pub api_key: String,
    pub secret_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub recv_window_ms: u64,
    pub quote_asset: String,
}

impl BinanceSettings {
    pub fn new(api_key: &str, secret_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            secret_key: secret_key.to_string(),
            base_url: client::MAINNET_URL.to_string(),
            timeout: Duration::from_secs(10),
            recv_window_ms: auth::DEFAULT_RECV_WINDOW_MS,
            quote_asset: "USDT".to_string(),
        }
    }

    pub fn testnet(mut self) -> Self {
        self.base_url = client::TESTNET_URL.to_string();
        self
    }
}

/// Trading rules for one contract.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarketRules {
    pub quantity_precision: u32,
    pub price_precision: u32,
    pub min_notional: f64,
}

impl MarketRules {
    pub fn spec(&self) -> InstrumentSpec {
        InstrumentSpec::new(self.quantity_precision, self.min_notional)
    }
}

/// Binance USDⓈ-M futures venue implementing the rankbook venue traits.
pub struct BinanceVenue {
    client: BinanceFuturesClient,
    quote_asset: String,
    /// Keyed by exchange symbol ("BTCUSDT").
    rules: BTreeMap<String, MarketRules>,
}

impl BinanceVenue {
    /// Ping the venue and load instrument rules.
    pub fn connect(settings: &BinanceSettings) -> Result<Self, BrokerError> {
        if settings.api_key.is_empty() || settings.secret_key.is_empty() {
            return Err(BrokerError::Auth("missing API credentials".into()));
        }
        let client = BinanceFuturesClient::new(
            &settings.api_key,
            &settings.secret_key,
            &settings.base_url,
            settings.timeout,
        )?
        .with_recv_window(settings.recv_window_ms);

        client.ping()?;
        let rules = market_rules(&client.exchange_info()?, &settings.quote_asset);
        info!(
            "Connected to {} ({} {} contracts)",
            settings.base_url,
            rules.len(),
            settings.quote_asset
        );

        Ok(Self {
            client,
            quote_asset: settings.quote_asset.clone(),
            rules,
        })
    }

    /// "BTC" → "BTCUSDT"
    pub fn to_exchange_symbol(&self, symbol: &Symbol) -> String {
        format!("{}{}", symbol.as_str(), self.quote_asset)
    }

    /// "BTCUSDT" → "BTC"; `None` for contracts in another quote asset.
    pub fn from_exchange_symbol(&self, exchange: &str) -> Option<Symbol> {
        let base = exchange.strip_suffix(self.quote_asset.as_str())?;
        Symbol::try_new(base)
    }

    pub fn rules(&self, symbol: &Symbol) -> Option<&MarketRules> {
        self.rules.get(&self.to_exchange_symbol(symbol))
    }
}

impl AccountState for BinanceVenue {
    fn equity(&self) -> VenueResult<f64> {
        let info = self.client.account_info()?;
        Ok(parse_decimal(&info.total_margin_balance, "totalMarginBalance")?)
    }

    fn positions(&self) -> VenueResult<BTreeMap<Symbol, Notional>> {
        let info = self.client.account_info()?;
        let mut positions = BTreeMap::new();
        for p in &info.positions {
            let amount = parse_decimal(&p.position_amt, "positionAmt")?;
            if amount == 0.0 {
                continue;
            }
            let Some(symbol) = self.from_exchange_symbol(&p.symbol) else {
                warn!("Ignoring position in {} (not a {} contract)", p.symbol, self.quote_asset);
                continue;
            };
            let notional = parse_decimal(&p.notional, "notional")?;
            positions.insert(symbol, notional);
        }
        Ok(positions)
    }

    fn cancel_all_orders(&self) -> VenueResult<bool> {
        let open = self.client.open_orders()?;
        let symbols: BTreeSet<&str> = open.iter().map(|o| o.symbol.as_str()).collect();
        for symbol in symbols {
            debug!("Cancelling open orders in {symbol}");
            self.client.cancel_all_open_orders(symbol)?;
        }
        let remaining = self.client.open_orders()?;
        if !remaining.is_empty() {
            warn!("{} orders still open after cancel", remaining.len());
        }
        Ok(remaining.is_empty())
    }
}

impl PriceOracle for BinanceVenue {
    fn best_bid_ask(&self, symbol: &Symbol) -> VenueResult<(Option<f64>, Option<f64>)> {
        let ticker = match self.client.book_ticker(&self.to_exchange_symbol(symbol)) {
            Ok(t) => t,
            Err(BrokerError::InvalidSymbol(s)) => {
                debug!("No book for {s}");
                return Ok((None, None));
            }
            Err(e) => return Err(e.into()),
        };
        let bid = parse_decimal(&ticker.bid_price, "bidPrice")?;
        let ask = parse_decimal(&ticker.ask_price, "askPrice")?;
        Ok((positive(bid), positive(ask)))
    }
}

impl InstrumentSource for BinanceVenue {
    fn instrument(&self, symbol: &Symbol) -> VenueResult<Option<InstrumentSpec>> {
        Ok(self.rules(symbol).map(MarketRules::spec))
    }
}

impl OrderSubmitter for BinanceVenue {
    fn submit(&self, order: &OrderRequest) -> VenueResult<SubmitAck> {
        let exchange = self.to_exchange_symbol(&order.symbol);
        let (quantity, price) = wire_quantity_and_price(order, self.rules.get(&exchange));

        let reply = self.client.new_limit_order(
            &exchange,
            order.side.as_str(),
            &quantity,
            &price,
            order.time_in_force.as_str(),
        )?;

        Ok(match reply {
            OrderReply::Accepted(resp) => SubmitAck::accepted(format!(
                "orderId={} status={}",
                resp.order_id, resp.status
            )),
            OrderReply::Rejected(err) => SubmitAck::rejected(format!("{}: {}", err.code, err.msg)),
        })
    }
}

/// Extract per-contract rules for every trading contract in `quote_asset`.
pub fn market_rules(info: &ExchangeInfo, quote_asset: &str) -> BTreeMap<String, MarketRules> {
    let mut rules = BTreeMap::new();
    for s in &info.symbols {
        if s.quote_asset != quote_asset || (!s.status.is_empty() && s.status != "TRADING") {
            continue;
        }
        let mut r = MarketRules {
            quantity_precision: s.quantity_precision,
            price_precision: s.price_precision,
            min_notional: InstrumentSpec::default().min_notional,
        };
        for f in &s.filters {
            match f {
                SymbolFilter::LotSize { step_size, .. } => {
                    r.quantity_precision = step_decimals(step_size);
                }
                SymbolFilter::PriceFilter { tick_size } => {
                    r.price_precision = step_decimals(tick_size);
                }
                SymbolFilter::MinNotional { notional } => {
                    if let Ok(n) = notional.parse::<f64>() {
                        r.min_notional = n;
                    }
                }
                SymbolFilter::Other => {}
            }
        }
        rules.insert(s.symbol.clone(), r);
    }
    rules
}

/// Number of decimals a step size allows: "0.001" → 3, "1" → 0, "0.10" → 1.
pub fn step_decimals(step: &str) -> u32 {
    match step.split_once('.') {
        Some((_, frac)) => frac.trim_end_matches('0').len() as u32,
        None => 0,
    }
}

/// Render quantity and limit price for the order endpoint.
///
/// Without exchange rules the values are sent as sized, since the sizer
/// already rounded them to the configured precision.
pub fn wire_quantity_and_price(order: &OrderRequest, rules: Option<&MarketRules>) -> (String, String) {
    match rules {
        Some(r) => (
            format_decimal(order.quantity, r.quantity_precision),
            format_decimal(order.limit_price, r.price_precision),
        ),
        None => (order.quantity.to_string(), order.limit_price.to_string()),
    }
}

/// Fixed-point rendering without trailing zeros: (0.050, 3) → "0.05".
pub fn format_decimal(value: f64, precision: u32) -> String {
    let s = format!("{:.*}", precision as usize, value);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

fn parse_decimal(s: &str, field: &str) -> Result<f64, BrokerError> {
    s.parse::<f64>()
        .map_err(|_| BrokerError::Parse(format!("{field}: {s:?} is not a number")))
}

fn positive(v: f64) -> Option<f64> {
    (v.is_finite() && v > 0.0).then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_sizes() {
        assert_eq!(step_decimals("0.001"), 3);
        assert_eq!(step_decimals("1"), 0);
        assert_eq!(step_decimals("1.000"), 0);
        assert_eq!(step_decimals("0.10"), 1);
    }

    #[test]
    fn decimal_formatting() {
        assert_eq!(format_decimal(0.05, 3), "0.05");
        assert_eq!(format_decimal(60010.0, 1), "60010");
        assert_eq!(format_decimal(1.23456, 2), "1.23");
        assert_eq!(format_decimal(3.0, 0), "3");
    }

    #[test]
    fn rejects_missing_credentials() {
        let settings = BinanceSettings::new("", "");
        assert!(matches!(
            BinanceVenue::connect(&settings),
            Err(BrokerError::Auth(_))
        ));
    }

    #[test]
    fn positive_filters_empty_book() {
        assert_eq!(positive(0.0), None);
        assert_eq!(positive(f64::NAN), None);
        assert_eq!(positive(1.5), Some(1.5));
    }

    #[test]
    fn unruled_contracts_keep_sized_precision() {
        let order = OrderRequest {
            symbol: Symbol::new("NEW"),
            side: rankbook::Side::Buy,
            quantity: 12.34567,
            limit_price: 0.81234,
            time_in_force: rankbook::TimeInForce::GTC,
        };
        assert_eq!(
            wire_quantity_and_price(&order, None),
            ("12.34567".to_string(), "0.81234".to_string())
        );

        let rules = MarketRules {
            quantity_precision: 2,
            price_precision: 3,
            min_notional: 5.0,
        };
        assert_eq!(
            wire_quantity_and_price(&order, Some(&rules)),
            ("12.35".to_string(), "0.812".to_string())
        );
    }
}
