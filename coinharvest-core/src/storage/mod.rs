//! Append-only persistence: output files, row layouts and the run-state marker.

pub mod csv_table;
pub mod run_state;
pub mod schema;

pub use csv_table::{CsvTable, StorageError};
pub use run_state::{token_fingerprint, RunStateMarker, MARKER_FILE};
pub use schema::{CsvRow, MARKET_HEADER, OHLC_HEADER, QUOTE_HEADER};

use crate::domain::{MarketRecord, OhlcRecord, QuoteRecord};
use crate::normalize::NormalizedBatch;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MARKET_FILE: &str = "coingecko_market.csv";
pub const DEFAULT_QUOTES_FILE: &str = "coinmarketcap_quotes.csv";
pub const DEFAULT_OHLC_FILE: &str = "coinmarketcap_history.csv";

/// Locations of everything the pipeline writes.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub dir: PathBuf,
    /// File A: CoinGecko historical and current market rows.
    pub market: PathBuf,
    /// File B: CoinMarketCap quotes.
    pub quotes: PathBuf,
    /// File C: scraped daily OHLC history.
    pub ohlc: PathBuf,
    pub marker: PathBuf,
}

impl OutputPaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::with_names(dir, DEFAULT_MARKET_FILE, DEFAULT_QUOTES_FILE, DEFAULT_OHLC_FILE)
    }

    pub fn with_names(dir: impl Into<PathBuf>, market: &str, quotes: &str, ohlc: &str) -> Self {
        let dir = dir.into();
        Self {
            market: dir.join(market),
            quotes: dir.join(quotes),
            ohlc: dir.join(ohlc),
            marker: dir.join(MARKER_FILE),
            dir,
        }
    }

    /// Create the output directory if needed.
    pub fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::CreateDir {
            path: self.dir.clone(),
            source,
        })
    }
}

/// The three output tables, with routing of normalized batches.
#[derive(Debug, Clone)]
pub struct OutputSet {
    pub market: CsvTable<MarketRecord>,
    pub quotes: CsvTable<QuoteRecord>,
    pub ohlc: CsvTable<OhlcRecord>,
}

impl OutputSet {
    pub fn new(paths: &OutputPaths) -> Self {
        Self {
            market: CsvTable::new(&paths.market),
            quotes: CsvTable::new(&paths.quotes),
            ohlc: CsvTable::new(&paths.ohlc),
        }
    }

    /// Append a batch to the file its variant belongs to. Returns rows written.
    pub fn append(&self, batch: &NormalizedBatch) -> usize {
        match batch {
            NormalizedBatch::Market(rows) => self.market.append(rows),
            NormalizedBatch::Quotes(rows) => self.quotes.append(rows),
            NormalizedBatch::Ohlc(rows) => self.ohlc.append(rows),
        }
    }

    /// Path a batch would be written to.
    pub fn path_for(&self, batch: &NormalizedBatch) -> &Path {
        match batch {
            NormalizedBatch::Market(_) => self.market.path(),
            NormalizedBatch::Quotes(_) => self.quotes.path(),
            NormalizedBatch::Ohlc(_) => self.ohlc.path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceTag;

    #[test]
    fn batches_route_to_their_own_file() {
        let dir = std::env::temp_dir().join(format!("coinharvest_route_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let paths = OutputPaths::in_dir(&dir);
        paths.ensure_dir().unwrap();
        let out = OutputSet::new(&paths);
        out.market.initialize().unwrap();
        out.ohlc.initialize().unwrap();

        let market = NormalizedBatch::Market(vec![MarketRecord::historical(
            "bitcoin",
            1_704_067_200,
            Some(1.0),
            None,
            None,
        )]);
        let ohlc = NormalizedBatch::Ohlc(vec![OhlcRecord {
            date: "2024-01-01".into(),
            token_symbol: "BTC".into(),
            token_name: "Bitcoin".into(),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1.0,
            market_cap: 1.0,
            source: SourceTag::CoinMarketCapScrape,
        }]);

        assert_eq!(out.append(&market), 1);
        assert_eq!(out.append(&ohlc), 1);
        // empty batch: nothing written, nothing created
        assert_eq!(out.append(&NormalizedBatch::Quotes(vec![])), 0);
        assert!(!paths.quotes.exists());
        assert_eq!(out.path_for(&ohlc), paths.ohlc.as_path());

        assert_eq!(out.market.row_count().unwrap(), 1);
        assert_eq!(out.ohlc.row_count().unwrap(), 1);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn default_layout() {
        let p = OutputPaths::in_dir("data");
        assert_eq!(p.market, Path::new("data/coingecko_market.csv"));
        assert_eq!(p.marker, Path::new("data/.run_state.json"));
    }
}
