//! Headless-browser scraping of the historical-data pages.

pub mod client;
pub mod driver;
pub mod parse;

pub use client::{extract_rows, HistoricalRow, HistoryScraper, ScrapeDiagnostics, ScrapeOutcome};
pub use driver::{
    ChromeDriver, ChromeLauncher, DriverTimings, PageDriver, PageLauncher, ScrapeError,
    TableSnapshot, ROW_SELECTORS,
};
pub use parse::{amount_or_zero, normalize_date, parse_amount, parse_date};
