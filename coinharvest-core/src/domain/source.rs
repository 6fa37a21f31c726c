use serde::{Deserialize, Serialize};
use std::fmt;

/// Provenance of a canonical record: one variant per provider-and-endpoint pairing.
///
/// The tag is the only column that tells otherwise identical rows apart, so
/// every record carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTag {
    /// CoinGecko `/coins/{id}/market_chart` time series.
    CoinGeckoHistorical,
    /// CoinGecko `/coins/markets` batched snapshot.
    CoinGeckoCurrent,
    /// CoinMarketCap `/cryptocurrency/quotes/latest` batched quotes.
    CoinMarketCap,
    /// CoinMarketCap historical-data page, scraped through a browser.
    CoinMarketCapScrape,
}

impl SourceTag {
    /// The tag written into the `source` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::CoinGeckoHistorical => "coingecko_historical",
            SourceTag::CoinGeckoCurrent => "coingecko_current",
            SourceTag::CoinMarketCap => "coinmarketcap",
            // Existing scraped files were written with this spelling.
            SourceTag::CoinMarketCapScrape => "CoinMarketCap",
        }
    }

    /// Parse a `source` column value back into a tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "coingecko_historical" => Some(SourceTag::CoinGeckoHistorical),
            "coingecko_current" => Some(SourceTag::CoinGeckoCurrent),
            "coinmarketcap" => Some(SourceTag::CoinMarketCap),
            "CoinMarketCap" => Some(SourceTag::CoinMarketCapScrape),
            _ => None,
        }
    }

    /// Whether rows with this tag describe a historical series rather than a snapshot.
    pub fn is_historical(&self) -> bool {
        matches!(
            self,
            SourceTag::CoinGeckoHistorical | SourceTag::CoinMarketCapScrape
        )
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_distinct_and_parse_back() {
        let all = [
            SourceTag::CoinGeckoHistorical,
            SourceTag::CoinGeckoCurrent,
            SourceTag::CoinMarketCap,
            SourceTag::CoinMarketCapScrape,
        ];
        for tag in all {
            assert_eq!(SourceTag::from_tag(tag.as_str()), Some(tag));
        }
        assert_eq!(SourceTag::from_tag("yahoo"), None);
    }

    #[test]
    fn scrape_and_api_tags_differ_by_case() {
        assert_ne!(
            SourceTag::CoinMarketCap.as_str(),
            SourceTag::CoinMarketCapScrape.as_str()
        );
        assert!(SourceTag::CoinMarketCapScrape.is_historical());
        assert!(!SourceTag::CoinMarketCap.is_historical());
    }
}
