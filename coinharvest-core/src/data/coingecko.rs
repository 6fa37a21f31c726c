//! CoinGecko data provider (source A).
//!
//! Two endpoints: `/coins/{id}/market_chart` for daily history (parallel
//! `[timestamp_ms, value]` arrays) and `/coins/markets` for a batched
//! snapshot of current values. No credential is required; a demo key is
//! appended as a query parameter when configured.

use super::http::{build_client, decode_json, send_for_body};
use super::provider::{DataError, MarketDataApi};
use serde::Deserialize;
use std::time::Duration;

/// Default public API root.
pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// One `[timestamp_ms, value]` point of a market chart series.
pub type SeriesPoint = (f64, Option<f64>);

/// `/coins/{id}/market_chart` response.
///
/// The three series are parallel by index, but the provider does not
/// guarantee equal lengths.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketChart {
    #[serde(default)]
    pub prices: Vec<SeriesPoint>,
    #[serde(default)]
    pub market_caps: Vec<SeriesPoint>,
    #[serde(default)]
    pub total_volumes: Vec<SeriesPoint>,
}

/// One element of the `/coins/markets` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub total_volume: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub ath: Option<f64>,
    pub ath_date: Option<String>,
}

/// CoinGecko REST client.
pub struct CoinGeckoClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DataError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// Build the market chart URL for a token.
    fn market_chart_url(&self, token_id: &str, days: u32) -> String {
        let url = format!(
            "{}/coins/{token_id}/market_chart?vs_currency=usd&days={days}&interval=daily",
            self.base_url
        );
        self.with_key(url)
    }

    /// Build the batched markets URL for a list of token ids.
    fn markets_url(&self, token_ids: &[String]) -> String {
        let url = format!(
            "{}/coins/markets?vs_currency=usd&ids={}&order=market_cap_desc\
             &sparkline=false&price_change_percentage=1h,24h,7d",
            self.base_url,
            token_ids.join(",")
        );
        self.with_key(url)
    }

    fn with_key(&self, url: String) -> String {
        match &self.api_key {
            Some(key) => format!("{url}&x_cg_demo_api_key={key}"),
            None => url,
        }
    }

    /// Parse a market chart body.
    pub fn parse_market_chart(body: &str) -> Result<MarketChart, DataError> {
        decode_json(body, "market_chart response")
    }

    /// Parse a markets body.
    pub fn parse_markets(body: &str) -> Result<Vec<CoinMarket>, DataError> {
        decode_json(body, "markets response")
    }
}

impl MarketDataApi for CoinGeckoClient {
    fn name(&self) -> &str {
        "coingecko"
    }

    fn fetch_historical(&self, token_id: &str, days: u32) -> Result<MarketChart, DataError> {
        tracing::debug!(token = token_id, days, "requesting market chart");
        let body = send_for_body(self.client.get(self.market_chart_url(token_id, days)))?;
        Self::parse_market_chart(&body)
    }

    fn fetch_current_batch(&self, token_ids: &[String]) -> Result<Vec<CoinMarket>, DataError> {
        tracing::debug!(count = token_ids.len(), "requesting markets batch");
        let body = send_for_body(self.client.get(self.markets_url(token_ids)))?;
        Self::parse_markets(&body)
    }
}
