//! Record normalizer: provider payloads to canonical records.
//!
//! Pure functions, no I/O. Every provider/endpoint pairing has one
//! [`ProviderPayload`] variant and normalizes into exactly one
//! [`NormalizedBatch`] variant, which in turn names the output file.

use crate::data::coingecko::{CoinMarket, MarketChart};
use crate::data::coinmarketcap::CmcAsset;
use crate::domain::{utc_date, CatalogEntry, MarketRecord, OhlcRecord, QuoteRecord, SourceTag};
use crate::scrape::HistoricalRow;
use std::collections::BTreeMap;

/// A decoded provider response, tagged by where it came from.
#[derive(Debug, Clone)]
pub enum ProviderPayload {
    /// `/coins/{id}/market_chart` for one token.
    HistoricalChart { token_id: String, chart: MarketChart },
    /// `/coins/markets` for one batch, observed at `observed_at`.
    CurrentMarkets {
        observed_at: i64,
        markets: Vec<CoinMarket>,
    },
    /// CoinMarketCap latest quotes for one batch.
    Quotes {
        observed_at: i64,
        quotes: BTreeMap<String, CmcAsset>,
    },
    /// Rows scraped from one token's historical-data page.
    ScrapedHistory {
        entry: CatalogEntry,
        rows: Vec<HistoricalRow>,
    },
}

/// Canonical records ready for one output file.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedBatch {
    Market(Vec<MarketRecord>),
    Quotes(Vec<QuoteRecord>),
    Ohlc(Vec<OhlcRecord>),
}

impl NormalizedBatch {
    pub fn len(&self) -> usize {
        match self {
            NormalizedBatch::Market(r) => r.len(),
            NormalizedBatch::Quotes(r) => r.len(),
            NormalizedBatch::Ohlc(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn normalize(payload: ProviderPayload) -> NormalizedBatch {
    match payload {
        ProviderPayload::HistoricalChart { token_id, chart } => {
            NormalizedBatch::Market(normalize_historical(&token_id, &chart))
        }
        ProviderPayload::CurrentMarkets {
            observed_at,
            markets,
        } => NormalizedBatch::Market(normalize_current(observed_at, &markets)),
        ProviderPayload::Quotes {
            observed_at,
            quotes,
        } => NormalizedBatch::Quotes(normalize_quotes(observed_at, &quotes)),
        ProviderPayload::ScrapedHistory { entry, rows } => {
            NormalizedBatch::Ohlc(normalize_scraped(&entry, &rows))
        }
    }
}

/// One record per price point; market caps and volumes align by index and
/// are absent past the end of their (possibly shorter) series.
pub fn normalize_historical(token_id: &str, chart: &MarketChart) -> Vec<MarketRecord> {
    chart
        .prices
        .iter()
        .enumerate()
        .map(|(i, &(ts_ms, price))| {
            let market_cap = chart.market_caps.get(i).and_then(|p| p.1);
            let volume = chart.total_volumes.get(i).and_then(|p| p.1);
            MarketRecord::historical(
                token_id,
                (ts_ms / 1000.0) as i64,
                price,
                market_cap,
                volume,
            )
        })
        .collect()
}

pub fn normalize_current(observed_at: i64, markets: &[CoinMarket]) -> Vec<MarketRecord> {
    markets
        .iter()
        .map(|m| MarketRecord {
            observed_at,
            observation_date: utc_date(observed_at),
            token_id: m.id.clone(),
            token_symbol: m.symbol.clone(),
            token_name: m.name.clone(),
            price: m.current_price,
            market_cap: m.market_cap,
            volume_24h: m.total_volume,
            high_24h: m.high_24h,
            low_24h: m.low_24h,
            price_change_24h: m.price_change_24h,
            price_change_pct_24h: m.price_change_percentage_24h,
            circulating_supply: m.circulating_supply,
            total_supply: m.total_supply,
            all_time_high: m.ath,
            all_time_high_date: m.ath_date.clone(),
            source: SourceTag::CoinGeckoCurrent,
        })
        .collect()
}

/// Assets without a USD quote still produce a row; their quote fields are empty.
pub fn normalize_quotes(observed_at: i64, quotes: &BTreeMap<String, CmcAsset>) -> Vec<QuoteRecord> {
    quotes
        .iter()
        .map(|(key, asset)| {
            let usd = asset.usd().cloned().unwrap_or_default();
            let symbol = if asset.symbol.is_empty() {
                key.clone()
            } else {
                asset.symbol.clone()
            };
            QuoteRecord {
                observed_at,
                observation_date: utc_date(observed_at),
                symbol,
                name: asset.name.clone(),
                slug: asset.slug.clone(),
                price: usd.price,
                volume_24h: usd.volume_24h,
                volume_change_24h: usd.volume_change_24h,
                percent_change_1h: usd.percent_change_1h,
                percent_change_24h: usd.percent_change_24h,
                percent_change_7d: usd.percent_change_7d,
                market_cap: usd.market_cap,
                market_cap_dominance: usd.market_cap_dominance,
                circulating_supply: asset.circulating_supply,
                total_supply: asset.total_supply,
                max_supply: asset.max_supply,
                last_updated: usd.last_updated,
                source: SourceTag::CoinMarketCap,
            }
        })
        .collect()
}

pub fn normalize_scraped(entry: &CatalogEntry, rows: &[HistoricalRow]) -> Vec<OhlcRecord> {
    let symbol = entry.symbol.to_uppercase();
    rows.iter()
        .map(|r| OhlcRecord {
            date: r.date.clone(),
            token_symbol: symbol.clone(),
            token_name: entry.name.clone(),
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
            market_cap: r.market_cap,
            source: SourceTag::CoinMarketCapScrape,
        })
        .collect()
}
