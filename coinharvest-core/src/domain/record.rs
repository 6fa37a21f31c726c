//! Canonical record shapes, one per output file.
//!
//! Records are built once by the normalizer and never mutated afterwards.
//! Optional numeric fields are `None` when the provider did not send a value;
//! they are written as empty cells, never as zero.

use super::source::SourceTag;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// Canonical market row (output file A): CoinGecko historical and current data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRecord {
    /// Epoch seconds the market state corresponds to.
    pub observed_at: i64,
    /// UTC calendar date of `observed_at`.
    pub observation_date: NaiveDate,
    pub token_id: String,
    /// Empty for historical rows.
    pub token_symbol: String,
    /// Empty for historical rows.
    pub token_name: String,
    pub price: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub price_change_pct_24h: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub all_time_high: Option<f64>,
    pub all_time_high_date: Option<String>,
    pub source: SourceTag,
}

impl MarketRecord {
    /// A historical row: only the time series fields are populated.
    pub fn historical(
        token_id: &str,
        observed_at: i64,
        price: Option<f64>,
        market_cap: Option<f64>,
        volume_24h: Option<f64>,
    ) -> Self {
        Self {
            observed_at,
            observation_date: utc_date(observed_at),
            token_id: token_id.to_string(),
            token_symbol: String::new(),
            token_name: String::new(),
            price,
            market_cap,
            volume_24h,
            high_24h: None,
            low_24h: None,
            price_change_24h: None,
            price_change_pct_24h: None,
            circulating_supply: None,
            total_supply: None,
            all_time_high: None,
            all_time_high_date: None,
            source: SourceTag::CoinGeckoHistorical,
        }
    }
}

/// Canonical quote row (output file B): CoinMarketCap latest quotes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub observed_at: i64,
    pub observation_date: NaiveDate,
    pub symbol: String,
    pub name: String,
    pub slug: String,
    pub price: Option<f64>,
    pub volume_24h: Option<f64>,
    pub volume_change_24h: Option<f64>,
    pub percent_change_1h: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub percent_change_7d: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_dominance: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    /// Provider timestamp of the quote, passed through verbatim.
    pub last_updated: String,
    pub source: SourceTag,
}

/// Canonical daily OHLC row (output file C): scraped history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcRecord {
    /// `YYYY-MM-DD` when the page's date parsed, raw page text otherwise.
    pub date: String,
    pub token_symbol: String,
    pub token_name: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub market_cap: f64,
    pub source: SourceTag,
}

impl OhlcRecord {
    /// The row's date, if it is in canonical `YYYY-MM-DD` form.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }
}

/// UTC calendar date for an epoch-seconds instant.
///
/// Out-of-range instants fall back to the epoch date rather than panicking.
pub fn utc_date(epoch_secs: i64) -> NaiveDate {
    DateTime::from_timestamp(epoch_secs, 0)
        .map(|dt| dt.date_naive())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn historical_row_leaves_snapshot_fields_empty() {
        let rec = MarketRecord::historical("bitcoin", 1_704_067_200, Some(42000.0), None, None);
        assert_eq!(
            rec.observation_date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert!(rec.token_symbol.is_empty());
        assert!(rec.high_24h.is_none());
        assert!(rec.all_time_high_date.is_none());
        assert_eq!(rec.source, SourceTag::CoinGeckoHistorical);
    }

    #[test]
    fn utc_date_is_host_timezone_independent() {
        // 23:30 UTC on 2024-03-09
        assert_eq!(
            utc_date(1_710_027_000),
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
        );
    }

    #[test]
    fn ohlc_parsed_date_rejects_raw_text() {
        let mut row = OhlcRecord {
            date: "2024-05-01".into(),
            token_symbol: "BTC".into(),
            token_name: "Bitcoin".into(),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 0.0,
            market_cap: 0.0,
            source: SourceTag::CoinMarketCapScrape,
        };
        assert!(row.parsed_date().is_some());
        row.date = "May the 1st".into();
        assert!(row.parsed_date().is_none());
    }
}
