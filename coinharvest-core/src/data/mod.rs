//! REST data providers, batching and rate limiting.

pub mod batch;
pub mod coingecko;
pub mod coinmarketcap;
mod http;
pub mod provider;
pub mod rate_limit;

pub use batch::{batch_count, batches};
pub use coingecko::{CoinGeckoClient, CoinMarket, MarketChart};
pub use coinmarketcap::{CmcAsset, CmcQuote, CoinMarketCapClient};
pub use provider::{DataError, MarketDataApi, QuoteApi};
pub use rate_limit::RateLimiter;
