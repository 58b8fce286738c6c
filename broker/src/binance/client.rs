//! Binance USDⓈ-M futures REST client.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use zeroize::Zeroizing;

use super::auth::{DEFAULT_RECV_WINDOW_MS, SignedQuery};
use super::types::{AccountInfo, ApiError, BookTicker, ExchangeInfo, OpenOrder, OrderResponse};
use crate::error::BrokerError;

pub const MAINNET_URL: &str = "https://fapi.binance.com";
pub const TESTNET_URL: &str = "https://testnet.binancefuture.com";

/// What the venue said about a new order.
#[derive(Debug)]
pub enum OrderReply {
    Accepted(OrderResponse),
    /// 4xx with an error body: the order never reached the book.
    Rejected(ApiError),
}

/// Blocking futures REST client. Every request is bounded by `timeout`.
pub struct BinanceFuturesClient {
    client: Client,
    api_key: String,
    secret_key: Zeroizing<String>,
    base_url: String,
    recv_window_ms: u64,
}

impl BinanceFuturesClient {
    pub fn new(
        api_key: &str,
        secret_key: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, BrokerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrokerError::Connection(format!("http client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            secret_key: Zeroizing::new(secret_key.to_string()),
            base_url: base_url.trim_end_matches('/').to_string(),
            recv_window_ms: DEFAULT_RECV_WINDOW_MS,
        })
    }

    pub fn with_recv_window(mut self, ms: u64) -> Self {
        self.recv_window_ms = ms;
        self
    }

    /// GET /fapi/v1/ping
    pub fn ping(&self) -> Result<(), BrokerError> {
        let url = format!("{}/fapi/v1/ping", self.base_url);
        let resp = self.client.get(&url).send().map_err(transport("ping"))?;
        check(resp, "ping")?;
        Ok(())
    }

    /// GET /fapi/v2/account
    pub fn account_info(&self) -> Result<AccountInfo, BrokerError> {
        let query = self.sign(SignedQuery::new());
        let url = format!("{}/fapi/v2/account?{query}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .map_err(transport("account"))?;
        parse(check(resp, "account")?, "account")
    }

    /// GET /fapi/v1/openOrders (all symbols)
    pub fn open_orders(&self) -> Result<Vec<OpenOrder>, BrokerError> {
        let query = self.sign(SignedQuery::new());
        let url = format!("{}/fapi/v1/openOrders?{query}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .map_err(transport("openOrders"))?;
        parse(check(resp, "openOrders")?, "openOrders")
    }

    /// DELETE /fapi/v1/allOpenOrders for one symbol.
    pub fn cancel_all_open_orders(&self, symbol: &str) -> Result<(), BrokerError> {
        let query = self.sign(SignedQuery::new().param("symbol", symbol));
        let url = format!("{}/fapi/v1/allOpenOrders?{query}", self.base_url);
        let resp = self
            .client
            .delete(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .map_err(transport("allOpenOrders"))?;
        check(resp, "allOpenOrders")?;
        Ok(())
    }

    /// GET /fapi/v1/ticker/bookTicker
    pub fn book_ticker(&self, symbol: &str) -> Result<BookTicker, BrokerError> {
        let url = format!(
            "{}/fapi/v1/ticker/bookTicker?symbol={symbol}",
            self.base_url
        );
        let resp = self.client.get(&url).send().map_err(transport("bookTicker"))?;
        if resp.status() == StatusCode::BAD_REQUEST {
            return Err(BrokerError::InvalidSymbol(symbol.to_string()));
        }
        parse(check(resp, "bookTicker")?, "bookTicker")
    }

    /// GET /fapi/v1/exchangeInfo
    pub fn exchange_info(&self) -> Result<ExchangeInfo, BrokerError> {
        let url = format!("{}/fapi/v1/exchangeInfo", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(transport("exchangeInfo"))?;
        parse(check(resp, "exchangeInfo")?, "exchangeInfo")
    }

    /// POST /fapi/v1/order, LIMIT only.
    ///
    /// A timeout or 5xx after the request left leaves the order's fate
    /// unknown and is reported as such, never as a rejection.
    pub fn new_limit_order(
        &self,
        symbol: &str,
        side: &str,
        quantity: &str,
        price: &str,
        time_in_force: &str,
    ) -> Result<OrderReply, BrokerError> {
        let query = SignedQuery::new()
            .param("symbol", symbol)
            .param("side", side)
            .param("type", "LIMIT")
            .param("timeInForce", time_in_force)
            .param("quantity", quantity)
            .param("price", price);
        debug!("Submitting Binance futures order: {}", query.encode());
        let body = self.sign(query);

        let url = format!("{}/fapi/v1/order", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    BrokerError::UnknownOutcome(format!("order request timed out: {e}"))
                } else if e.is_connect() {
                    BrokerError::Connection(format!("order request failed: {e}"))
                } else {
                    BrokerError::UnknownOutcome(format!("order request failed: {e}"))
                }
            })?;

        let status = resp.status();
        if status.is_server_error() {
            let body = resp.text().unwrap_or_default();
            return Err(BrokerError::UnknownOutcome(format!(
                "order returned {status}: {body}"
            )));
        }
        if status.is_client_error() && !is_throttled(status) {
            let body = resp.text().unwrap_or_default();
            return match serde_json::from_str::<ApiError>(&body) {
                Ok(err) => Ok(OrderReply::Rejected(err)),
                Err(_) => Err(BrokerError::Order(format!("order returned {status}: {body}"))),
            };
        }
        parse(check(resp, "order")?, "order").map(OrderReply::Accepted)
    }

    fn sign(&self, query: SignedQuery) -> String {
        query.finish(self.recv_window_ms, current_timestamp_ms(), &self.secret_key)
    }
}

fn is_throttled(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418
}

fn transport(op: &'static str) -> impl Fn(reqwest::Error) -> BrokerError {
    move |e| {
        if e.is_timeout() {
            BrokerError::Timeout(format!("{op}: {e}"))
        } else {
            BrokerError::Connection(format!("{op} request failed: {e}"))
        }
    }
}

fn check(resp: Response, op: &str) -> Result<Response, BrokerError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if is_throttled(status) {
        return Err(BrokerError::RateLimit);
    }
    let body = resp.text().unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(BrokerError::Auth(format!("{op} returned {status}: {body}")));
    }
    Err(BrokerError::Connection(format!(
        "{op} returned {status}: {body}"
    )))
}

fn parse<T: serde::de::DeserializeOwned>(resp: Response, op: &str) -> Result<T, BrokerError> {
    resp.json::<T>()
        .map_err(|e| BrokerError::Parse(format!("{op}: {e}")))
}

/// Current timestamp in milliseconds.
fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}
