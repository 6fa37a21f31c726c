//! Domain types: canonical records, source tags, token catalog.

pub mod catalog;
pub mod record;
pub mod source;

pub use catalog::{
    CatalogEntry, CatalogError, TokenCatalog, DEFAULT_REST_TOKENS, DEFAULT_SCRAPE_TOKENS,
};
pub use record::{utc_date, MarketRecord, OhlcRecord, QuoteRecord};
pub use source::SourceTag;
