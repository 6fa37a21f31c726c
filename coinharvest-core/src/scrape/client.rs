//! Historical-data page scraper.

use super::driver::{PageDriver, ScrapeError, ROW_SELECTORS};
use super::parse::{normalize_date, parse_amount};
use chrono::NaiveDate;

/// Default site root for the historical-data pages.
pub const DEFAULT_BASE_URL: &str = "https://coinmarketcap.com";

/// Cells a data row must have: date, open, high, low, close, volume, market cap.
pub const MIN_CELLS: usize = 7;

/// One row of the historical-data table, before catalog enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalRow {
    /// `YYYY-MM-DD`, or the raw cell text when the layout was not recognized.
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub market_cap: f64,
}

impl HistoricalRow {
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }
}

/// What happened while extracting one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeDiagnostics {
    /// Rows returned by the matching selector.
    pub rows_seen: usize,
    /// Rows discarded for having fewer than the minimum cells.
    pub short_rows: usize,
    /// Rows dropped by the validity gate (empty date or non-positive close).
    pub rejected_rows: usize,
    /// Numeric cells that could not be parsed and were recorded as zero.
    pub parse_failures: usize,
    pub selector: Option<String>,
    pub html_len: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ScrapeOutcome {
    pub rows: Vec<HistoricalRow>,
    pub diagnostics: ScrapeDiagnostics,
}

/// Scrapes daily OHLC history for one slug at a time through a [`PageDriver`].
pub struct HistoryScraper<D> {
    driver: D,
    base_url: String,
    min_cells: usize,
}

impl<D: PageDriver> HistoryScraper<D> {
    pub fn new(driver: D, base_url: impl Into<String>) -> Self {
        Self {
            driver,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            min_cells: MIN_CELLS,
        }
    }

    pub fn with_min_cells(mut self, min_cells: usize) -> Self {
        self.min_cells = min_cells.max(MIN_CELLS);
        self
    }

    /// Page URL for a slug and inclusive date range.
    pub fn history_url(&self, slug: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/currencies/{slug}/historical-data/?start={}&end={}",
            self.base_url,
            start.format("%Y%m%d"),
            end.format("%Y%m%d")
        )
    }

    /// Load the page for `slug` and extract every valid row.
    ///
    /// Navigation and browser failures are returned as errors; a page
    /// without matching rows is an empty outcome.
    pub fn scrape_historical(
        &self,
        slug: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ScrapeOutcome, ScrapeError> {
        let url = self.history_url(slug, start, end);
        tracing::debug!(slug, %url, "loading historical-data page");
        let snapshot = self.driver.load_table(&url, ROW_SELECTORS)?;

        let mut outcome = extract_rows(&snapshot.rows, self.min_cells);
        outcome.diagnostics.selector = snapshot.selector;
        outcome.diagnostics.html_len = snapshot.html_len;

        if outcome.diagnostics.rows_seen == 0 {
            tracing::warn!(
                slug,
                html_len = outcome.diagnostics.html_len.unwrap_or(0),
                "no table rows found"
            );
        }
        if outcome.diagnostics.parse_failures > 0 {
            tracing::warn!(
                slug,
                cells = outcome.diagnostics.parse_failures,
                "unparseable numeric cells recorded as zero"
            );
        }
        Ok(outcome)
    }
}

/// Turn raw cell text into rows, applying the minimum-cell rule and the
/// validity gate.
pub fn extract_rows(rows: &[Vec<String>], min_cells: usize) -> ScrapeOutcome {
    let mut out = ScrapeOutcome::default();
    out.diagnostics.rows_seen = rows.len();

    for cells in rows {
        if cells.len() < min_cells {
            out.diagnostics.short_rows += 1;
            continue;
        }

        let mut amount = |i: usize| match parse_amount(&cells[i]) {
            Some(v) => v,
            None => {
                out.diagnostics.parse_failures += 1;
                0.0
            }
        };

        let row = HistoricalRow {
            date: normalize_date(&cells[0]),
            open: amount(1),
            high: amount(2),
            low: amount(3),
            close: amount(4),
            volume: amount(5),
            market_cap: amount(6),
        };

        if row.date.is_empty() || row.close <= 0.0 {
            out.diagnostics.rejected_rows += 1;
            continue;
        }
        out.rows.push(row);
    }

    out
}
