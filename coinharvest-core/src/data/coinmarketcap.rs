//! CoinMarketCap data provider (source B).
//!
//! Authenticated: every request carries the `X-CMC_PRO_API_KEY` header.
//! The quotes endpoint reports provider-level failures through
//! `status.error_code` even when the HTTP status is 200, so a decoded body
//! is only a success when that code is zero.

use super::http::{build_client, decode_json, send_for_body};
use super::provider::{DataError, QuoteApi};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Default professional API root.
pub const DEFAULT_BASE_URL: &str = "https://pro-api.coinmarketcap.com";

const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

/// Envelope of every CoinMarketCap response.
#[derive(Debug, Clone, Deserialize)]
pub struct CmcResponse {
    #[serde(default)]
    pub data: BTreeMap<String, CmcAsset>,
    pub status: CmcStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CmcStatus {
    #[serde(default)]
    pub error_code: i64,
    pub error_message: Option<String>,
}

/// One asset in a quotes response, keyed by its exchange symbol.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CmcAsset {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub slug: String,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    /// Quotes keyed by convert currency (`USD`).
    #[serde(default)]
    pub quote: BTreeMap<String, CmcQuote>,
}

impl CmcAsset {
    /// The USD quote, if present.
    pub fn usd(&self) -> Option<&CmcQuote> {
        self.quote.get("USD")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CmcQuote {
    pub price: Option<f64>,
    pub volume_24h: Option<f64>,
    pub volume_change_24h: Option<f64>,
    pub percent_change_1h: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub percent_change_7d: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_dominance: Option<f64>,
    #[serde(default)]
    pub last_updated: String,
}

/// CoinMarketCap REST client.
pub struct CoinMarketCapClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl CoinMarketCapClient {
    /// Create a client. An empty key is rejected up front.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DataError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DataError::AuthenticationRequired(
                "CoinMarketCap API key is empty".into(),
            ));
        }
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn quotes_url(&self, symbols: &[String]) -> String {
        format!(
            "{}/v1/cryptocurrency/quotes/latest?symbol={}&convert=USD",
            self.base_url,
            symbols.join(",")
        )
    }

    /// Parse a quotes body and check the provider status.
    pub fn parse_quotes(body: &str) -> Result<BTreeMap<String, CmcAsset>, DataError> {
        let resp: CmcResponse = decode_json(body, "quotes response")?;
        if resp.status.error_code != 0 {
            return Err(DataError::ProviderError {
                code: resp.status.error_code,
                message: resp
                    .status
                    .error_message
                    .unwrap_or_else(|| "no error message".into()),
            });
        }
        Ok(resp.data)
    }
}

impl QuoteApi for CoinMarketCapClient {
    fn name(&self) -> &str {
        "coinmarketcap"
    }

    fn fetch_quote_batch(
        &self,
        symbols: &[String],
    ) -> Result<BTreeMap<String, CmcAsset>, DataError> {
        tracing::debug!(count = symbols.len(), "requesting quotes batch");
        let req = self
            .client
            .get(self.quotes_url(symbols))
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json");
        let body = send_for_body(req)?;
        Self::parse_quotes(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OK_BODY: &str = r#"{
        "status": {"timestamp": "2024-05-01T12:00:00.000Z", "error_code": 0, "error_message": null},
        "data": {
            "BTC": {
                "id": 1, "name": "Bitcoin", "symbol": "BTC", "slug": "bitcoin",
                "circulating_supply": 19690000, "total_supply": 19690000, "max_supply": 21000000,
                "quote": {"USD": {
                    "price": 60123.45678901, "volume_24h": 31000000000.5,
                    "volume_change_24h": -4.2, "percent_change_1h": 0.11,
                    "percent_change_24h": -1.5, "percent_change_7d": 3.25,
                    "market_cap": 1183000000000.12, "market_cap_dominance": 53.1,
                    "last_updated": "2024-05-01T11:59:00.000Z"
                }}
            },
            "ETH": {
                "id": 1027, "name": "Ethereum", "symbol": "ETH", "slug": "ethereum",
                "circulating_supply": 120100000, "total_supply": 120100000, "max_supply": null,
                "quote": {"USD": {"price": 3000.5, "last_updated": "2024-05-01T11:59:00.000Z"}}
            }
        }
    }"#;

    #[test]
    fn parses_quotes_keyed_by_symbol() {
        let data = CoinMarketCapClient::parse_quotes(OK_BODY).unwrap();
        assert_eq!(data.len(), 2);
        let btc = &data["BTC"];
        assert_eq!(btc.slug, "bitcoin");
        assert_eq!(btc.max_supply, Some(21_000_000.0));
        let usd = btc.usd().unwrap();
        assert_eq!(usd.percent_change_7d, Some(3.25));

        let eth = &data["ETH"];
        assert_eq!(eth.max_supply, None);
        assert_eq!(eth.usd().unwrap().volume_24h, None);
    }

    #[test]
    fn nonzero_error_code_is_failure_even_on_200() {
        let body = r#"{
            "status": {"error_code": 1008, "error_message": "You've exceeded your API Key's HTTP request rate limit."}
        }"#;
        match CoinMarketCapClient::parse_quotes(body).unwrap_err() {
            DataError::ProviderError { code, message } => {
                assert_eq!(code, 1008);
                assert!(message.contains("rate limit"));
            }
            other => panic!("expected ProviderError, got {other:?}"),
        }
    }

    #[test]
    fn missing_status_is_format_change() {
        let err = CoinMarketCapClient::parse_quotes(r#"{"data": {}}"#).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged { .. }));
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = CoinMarketCapClient::new(DEFAULT_BASE_URL, "  ", Duration::from_secs(5));
        assert!(matches!(err, Err(DataError::AuthenticationRequired(_))));
    }

    #[test]
    fn quotes_url_shape() {
        let c = CoinMarketCapClient::new("https://example.test/", "k", Duration::from_secs(5))
            .unwrap();
        let url = c.quotes_url(&["BTC".into(), "ETH".into()]);
        assert_eq!(
            url,
            "https://example.test/v1/cryptocurrency/quotes/latest?symbol=BTC,ETH&convert=USD"
        );
    }
}
