//! Binance USDⓈ-M futures response types.
//!
//! Binance sends decimals as strings; they are kept as strings here and
//! parsed at the adapter boundary.

use serde::Deserialize;

/// GET /fapi/v2/account
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub total_margin_balance: String,
    #[serde(default)]
    pub total_wallet_balance: String,
    #[serde(default)]
    pub can_trade: bool,
    #[serde(default)]
    pub positions: Vec<PositionInfo>,
}

/// One entry of `AccountInfo::positions`. `notional` is signed (negative = short).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionInfo {
    pub symbol: String,
    pub position_amt: String,
    #[serde(default)]
    pub notional: String,
}

/// GET /fapi/v1/openOrders entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrder {
    pub symbol: String,
    pub order_id: u64,
    pub status: String,
}

/// GET /fapi/v1/ticker/bookTicker
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookTicker {
    pub symbol: String,
    pub bid_price: String,
    pub bid_qty: String,
    pub ask_price: String,
    pub ask_qty: String,
}

/// GET /fapi/v1/exchangeInfo
#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
    #[serde(default)]
    pub price_precision: u32,
    #[serde(default)]
    pub quantity_precision: u32,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

/// Exchange filters we read; the rest are ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize {
        min_qty: String,
        max_qty: String,
        step_size: String,
    },
    #[serde(rename = "PRICE_FILTER", rename_all = "camelCase")]
    PriceFilter { tick_size: String },
    #[serde(rename = "MIN_NOTIONAL")]
    MinNotional { notional: String },
    #[serde(other)]
    Other,
}

/// POST /fapi/v1/order
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub symbol: String,
    pub order_id: u64,
    pub status: String,
    #[serde(default)]
    pub executed_qty: String,
    #[serde(default)]
    pub price: String,
}

/// Error body, e.g. `{"code":-2019,"msg":"Margin is insufficient."}`.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: i64,
    pub msg: String,
}
