//! Fixed column layouts of the three output files and row encoding.
//!
//! Numeric formatting: prices to 8 decimals, market caps, volumes and
//! supplies to 2, percentages to 4. Absent values are empty cells.

use crate::domain::{MarketRecord, OhlcRecord, QuoteRecord};

pub const MARKET_HEADER: &[&str] = &[
    "timestamp",
    "date",
    "token_id",
    "symbol",
    "name",
    "price",
    "market_cap",
    "total_volume",
    "high_24h",
    "low_24h",
    "price_change_24h",
    "price_change_percentage_24h",
    "circulating_supply",
    "total_supply",
    "ath",
    "ath_date",
    "source",
];

pub const QUOTE_HEADER: &[&str] = &[
    "timestamp",
    "date",
    "symbol",
    "name",
    "slug",
    "price",
    "volume_24h",
    "volume_change_24h",
    "percent_change_1h",
    "percent_change_24h",
    "percent_change_7d",
    "market_cap",
    "market_cap_dominance",
    "circulating_supply",
    "total_supply",
    "max_supply",
    "last_updated",
    "source",
];

pub const OHLC_HEADER: &[&str] = &[
    "date",
    "token_symbol",
    "token_name",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "market_cap",
    "source",
];

/// A canonical record that can be written as one CSV row.
pub trait CsvRow {
    /// Column names, in file order.
    const HEADER: &'static [&'static str];

    /// Cell values in `HEADER` order.
    fn fields(&self) -> Vec<String>;
}

fn price(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.8}")).unwrap_or_default()
}

fn amount(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}")).unwrap_or_default()
}

fn pct(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.4}")).unwrap_or_default()
}

impl CsvRow for MarketRecord {
    const HEADER: &'static [&'static str] = MARKET_HEADER;

    fn fields(&self) -> Vec<String> {
        vec![
            self.observed_at.to_string(),
            self.observation_date.format("%Y-%m-%d").to_string(),
            self.token_id.clone(),
            self.token_symbol.clone(),
            self.token_name.clone(),
            price(self.price),
            amount(self.market_cap),
            amount(self.volume_24h),
            price(self.high_24h),
            price(self.low_24h),
            price(self.price_change_24h),
            pct(self.price_change_pct_24h),
            amount(self.circulating_supply),
            amount(self.total_supply),
            price(self.all_time_high),
            self.all_time_high_date.clone().unwrap_or_default(),
            self.source.as_str().to_string(),
        ]
    }
}

impl CsvRow for QuoteRecord {
    const HEADER: &'static [&'static str] = QUOTE_HEADER;

    fn fields(&self) -> Vec<String> {
        vec![
            self.observed_at.to_string(),
            self.observation_date.format("%Y-%m-%d").to_string(),
            self.symbol.clone(),
            self.name.clone(),
            self.slug.clone(),
            price(self.price),
            amount(self.volume_24h),
            pct(self.volume_change_24h),
            pct(self.percent_change_1h),
            pct(self.percent_change_24h),
            pct(self.percent_change_7d),
            amount(self.market_cap),
            pct(self.market_cap_dominance),
            amount(self.circulating_supply),
            amount(self.total_supply),
            amount(self.max_supply),
            self.last_updated.clone(),
            self.source.as_str().to_string(),
        ]
    }
}

impl CsvRow for OhlcRecord {
    const HEADER: &'static [&'static str] = OHLC_HEADER;

    fn fields(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.token_symbol.clone(),
            self.token_name.clone(),
            format!("{:.8}", self.open),
            format!("{:.8}", self.high),
            format!("{:.8}", self.low),
            format!("{:.8}", self.close),
            format!("{:.2}", self.volume),
            format!("{:.2}", self.market_cap),
            self.source.as_str().to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceTag;

    #[test]
    fn field_counts_match_headers() {
        let m = MarketRecord::historical("bitcoin", 1_704_067_200, Some(1.0), None, None);
        assert_eq!(m.fields().len(), MARKET_HEADER.len());

        let q = QuoteRecord {
            observed_at: 0,
            observation_date: Default::default(),
            symbol: "BTC".into(),
            name: "Bitcoin".into(),
            slug: "bitcoin".into(),
            price: None,
            volume_24h: None,
            volume_change_24h: None,
            percent_change_1h: None,
            percent_change_24h: None,
            percent_change_7d: None,
            market_cap: None,
            market_cap_dominance: None,
            circulating_supply: None,
            total_supply: None,
            max_supply: None,
            last_updated: String::new(),
            source: SourceTag::CoinMarketCap,
        };
        assert_eq!(q.fields().len(), QUOTE_HEADER.len());
    }

    #[test]
    fn historical_row_formatting() {
        let m = MarketRecord::historical(
            "bitcoin",
            1_704_067_200,
            Some(42280.123456789),
            Some(828_000_000_000.456),
            None,
        );
        let f = m.fields();
        assert_eq!(f[0], "1704067200");
        assert_eq!(f[1], "2024-01-01");
        assert_eq!(f[5], "42280.12345679");
        assert_eq!(f[6], "828000000000.46");
        // absent volume is an empty cell, not zero
        assert_eq!(f[7], "");
        assert!(f[8..16].iter().all(String::is_empty));
        assert_eq!(f[16], "coingecko_historical");
    }

    #[test]
    fn ohlc_row_formatting() {
        let r = OhlcRecord {
            date: "2024-03-03".into(),
            token_symbol: "SOL".into(),
            token_name: "Solana".into(),
            open: 10.0,
            high: 11.0,
            low: 9.0,
            close: 10.5,
            volume: 1e8,
            market_cap: 1e9,
            source: SourceTag::CoinMarketCapScrape,
        };
        assert_eq!(
            r.fields(),
            vec![
                "2024-03-03",
                "SOL",
                "Solana",
                "10.00000000",
                "11.00000000",
                "9.00000000",
                "10.50000000",
                "100000000.00",
                "1000000000.00",
                "CoinMarketCap",
            ]
        );
    }
}
