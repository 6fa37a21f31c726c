//! REST provider traits and structured error types.
//!
//! The traits abstract over the two REST sources so the orchestrator can be
//! driven by in-process fakes in tests. Implementations issue exactly one HTTP
//! call per method invocation; pacing between calls is the caller's job.

use super::coingecko::{CoinMarket, MarketChart};
use super::coinmarketcap::CmcAsset;
use std::collections::BTreeMap;
use thiserror::Error;

/// Structured error types for a single provider call.
///
/// Every variant is recoverable: the orchestrator logs it against the item
/// being fetched and moves on.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("response format changed: {reason}")]
    ResponseFormatChanged { reason: String, body: String },

    #[error("provider error {code}: {message}")]
    ProviderError { code: i64, message: String },

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl DataError {
    /// HTTP status code, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            DataError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body, when the failure carried one.
    pub fn body(&self) -> Option<&str> {
        match self {
            DataError::HttpStatus { body, .. } | DataError::ResponseFormatChanged { body, .. } => {
                Some(body)
            }
            _ => None,
        }
    }
}

/// Source A: historical series and batched current markets.
pub trait MarketDataApi {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch `days` of daily price, market-cap and volume history for one token.
    fn fetch_historical(&self, token_id: &str, days: u32) -> Result<MarketChart, DataError>;

    /// Fetch current market data for a batch of token ids (one call).
    fn fetch_current_batch(&self, token_ids: &[String]) -> Result<Vec<CoinMarket>, DataError>;
}

/// Source B: authenticated batched quotes keyed by symbol.
pub trait QuoteApi {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch latest quotes for a batch of exchange symbols (one call).
    fn fetch_quote_batch(
        &self,
        symbols: &[String],
    ) -> Result<BTreeMap<String, CmcAsset>, DataError>;
}

/// Truncate a response body for log lines and error values.
pub(crate) fn body_excerpt(body: &str) -> String {
    const LIMIT: usize = 512;
    if body.len() <= LIMIT {
        return body.to_string();
    }
    let mut end = LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
