//! coinharvest core: market-data sources, normalization and persistence.
//!
//! - Domain types (canonical records, source tags, token catalog)
//! - REST providers for CoinGecko and CoinMarketCap, with batching and pacing
//! - Headless-browser scraping of historical-data pages
//! - Pure record normalizer from provider payloads to canonical rows
//! - Append-only CSV persistence and the run-state marker
//! - Run-mode detection (first run vs recurring run)

pub mod data;
pub mod domain;
pub mod normalize;
pub mod run_mode;
pub mod scrape;
pub mod storage;

pub use normalize::{normalize, NormalizedBatch, ProviderPayload};
pub use run_mode::{detect, DecisionBasis, RunDecision, RunMode};
