//! HMAC-SHA256 request signing for Binance signed endpoints.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Default `recvWindow` in milliseconds.
pub const DEFAULT_RECV_WINDOW_MS: u64 = 5_000;

/// Sign a query string with HMAC-SHA256.
///
/// Returns the hex-encoded signature to append as `&signature=<sig>`.
pub fn sign(query_string: &str, secret_key: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret_key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(query_string.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Builds the query string of a signed request.
///
/// Parameters keep insertion order; `recvWindow` and `timestamp` are appended
/// last and the signature covers everything before it.
#[derive(Debug, Default)]
pub struct SignedQuery {
    params: Vec<(String, String)>,
}

impl SignedQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Unsigned `k=v&k=v` form.
    pub fn encode(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Append `recvWindow` and `timestamp`, then the signature.
    pub fn finish(self, recv_window_ms: u64, timestamp_ms: u64, secret_key: &str) -> String {
        let query = self
            .param("recvWindow", recv_window_ms)
            .param("timestamp", timestamp_ms)
            .encode();
        let signature = sign(&query, secret_key);
        format!("{query}&signature={signature}")
    }
}
