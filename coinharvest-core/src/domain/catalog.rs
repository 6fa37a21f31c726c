//! Token catalog: canonical token id to exchange symbol, display name and scrape slug.
//!
//! Canonical ids are CoinGecko ids. The catalog can be loaded from TOML
//! (a table per id) and merged over the built-in default list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Metadata for one token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Exchange symbol, lowercase as CoinGecko reports it (e.g. `btc`).
    pub symbol: String,
    pub name: String,
    /// CoinMarketCap page slug. Defaults to the canonical id when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("token '{token}' has no catalog entry")]
    Unmapped { token: String },
}

/// The complete token catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenCatalog {
    pub entries: BTreeMap<String, CatalogEntry>,
}

impl TokenCatalog {
    /// Load a catalog from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read catalog file: {e}"))?;
        Self::from_toml(&content)
    }

    /// Parse a catalog from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("parse catalog TOML: {e}"))
    }

    /// Serialize the catalog to TOML.
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("serialize catalog: {e}"))
    }

    pub fn get(&self, token_id: &str) -> Option<&CatalogEntry> {
        self.entries.get(token_id)
    }

    /// Look up a token, treating a missing entry as a configuration error.
    pub fn require(&self, token_id: &str) -> Result<&CatalogEntry, CatalogError> {
        self.get(token_id).ok_or_else(|| CatalogError::Unmapped {
            token: token_id.to_string(),
        })
    }

    /// Check that every id in `token_ids` is mapped; reports the first one that is not.
    pub fn ensure_mapped<S: AsRef<str>>(&self, token_ids: &[S]) -> Result<(), CatalogError> {
        for id in token_ids {
            self.require(id.as_ref())?;
        }
        Ok(())
    }

    /// Upper-cased exchange symbols for the given ids, in order.
    ///
    /// Unmapped ids are skipped; callers validate with [`ensure_mapped`](Self::ensure_mapped) first.
    pub fn exchange_symbols<S: AsRef<str>>(&self, token_ids: &[S]) -> Vec<String> {
        token_ids
            .iter()
            .filter_map(|id| self.get(id.as_ref()))
            .map(|e| e.symbol.to_uppercase())
            .collect()
    }

    /// Page slug for a token: the explicit slug, or the id itself.
    pub fn slug_for<'a>(&'a self, token_id: &'a str) -> &'a str {
        self.get(token_id)
            .and_then(|e| e.slug.as_deref())
            .unwrap_or(token_id)
    }

    /// Insert or replace entries from `other`.
    pub fn merge(&mut self, other: TokenCatalog) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The built-in catalog: the default REST tokens plus the scrape-only tokens.
    pub fn default_crypto() -> Self {
        let rows: [(&str, &str, &str, Option<&str>); 26] = [
            ("bitcoin", "btc", "Bitcoin", None),
            ("ethereum", "eth", "Ethereum", None),
            ("solana", "sol", "Solana", None),
            ("cardano", "ada", "Cardano", None),
            ("ripple", "xrp", "XRP", None),
            ("polkadot", "dot", "Polkadot", None),
            ("dogecoin", "doge", "Dogecoin", None),
            ("avalanche-2", "avax", "Avalanche", Some("avalanche-2012")),
            ("chainlink", "link", "Chainlink", None),
            ("polygon", "matic", "Polygon", None),
            ("uniswap", "uni", "Uniswap", None),
            ("litecoin", "ltc", "Litecoin", None),
            ("stellar", "xlm", "Stellar", None),
            ("cosmos", "atom", "Cosmos", None),
            ("monero", "xmr", "Monero", None),
            ("tron", "trx", "TRON", None),
            ("ethereum-classic", "etc", "Ethereum Classic", None),
            ("filecoin", "fil", "Filecoin", None),
            ("hedera-hashgraph", "hbar", "Hedera", None),
            ("aptos", "apt", "Aptos", None),
            ("internet-computer", "icp", "Internet Computer", None),
            ("shiba-inu", "shib", "Shiba Inu", None),
            ("wrapped-bitcoin", "wbtc", "Wrapped Bitcoin", None),
            ("dai", "dai", "Dai", None),
            ("leo-token", "leo", "LEO Token", None),
            ("the-open-network", "ton", "Toncoin", Some("toncoin")),
        ];

        let entries = rows
            .into_iter()
            .map(|(id, symbol, name, slug)| {
                (
                    id.to_string(),
                    CatalogEntry {
                        symbol: symbol.to_string(),
                        name: name.to_string(),
                        slug: slug.map(String::from),
                    },
                )
            })
            .collect();

        Self { entries }
    }
}

/// Default token ids collected from the REST sources.
pub const DEFAULT_REST_TOKENS: &[&str] = &[
    "bitcoin",
    "ethereum",
    "solana",
    "cardano",
    "ripple",
    "polkadot",
    "dogecoin",
    "avalanche-2",
    "chainlink",
    "polygon",
    "uniswap",
    "litecoin",
    "stellar",
    "cosmos",
    "monero",
    "tron",
    "ethereum-classic",
    "filecoin",
    "hedera-hashgraph",
    "aptos",
];

/// Default token ids scraped from the historical-data pages.
pub const DEFAULT_SCRAPE_TOKENS: &[&str] = &[
    "bitcoin",
    "ethereum",
    "solana",
    "cardano",
    "ripple",
    "polkadot",
    "dogecoin",
    "avalanche-2",
    "chainlink",
    "polygon",
    "uniswap",
    "litecoin",
    "stellar",
    "cosmos",
    "monero",
    "tron",
    "ethereum-classic",
    "filecoin",
    "internet-computer",
    "aptos",
    "shiba-inu",
    "wrapped-bitcoin",
    "dai",
    "leo-token",
    "the-open-network",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_maps_every_default_token() {
        let c = TokenCatalog::default_crypto();
        assert!(c.ensure_mapped(DEFAULT_REST_TOKENS).is_ok());
        assert!(c.ensure_mapped(DEFAULT_SCRAPE_TOKENS).is_ok());
    }

    #[test]
    fn unmapped_token_is_reported() {
        let c = TokenCatalog::default_crypto();
        let err = c.ensure_mapped(&["bitcoin", "pepe"]).unwrap_err();
        assert_eq!(
            err,
            CatalogError::Unmapped {
                token: "pepe".into()
            }
        );
    }

    #[test]
    fn exchange_symbols_are_uppercased_in_order() {
        let c = TokenCatalog::default_crypto();
        let syms = c.exchange_symbols(&["ethereum", "bitcoin", "avalanche-2"]);
        assert_eq!(syms, vec!["ETH", "BTC", "AVAX"]);
    }

    #[test]
    fn slug_falls_back_to_id() {
        let c = TokenCatalog::default_crypto();
        assert_eq!(c.slug_for("the-open-network"), "toncoin");
        assert_eq!(c.slug_for("bitcoin"), "bitcoin");
        assert_eq!(c.slug_for("unknown-coin"), "unknown-coin");
    }

    #[test]
    fn toml_overrides_merge_over_defaults() {
        let overrides = TokenCatalog::from_toml(
            r#"
            [bitcoin]
            symbol = "btc"
            name = "Bitcoin (override)"

            [pepe]
            symbol = "pepe"
            name = "Pepe"
            slug = "pepe"
            "#,
        )
        .unwrap();

        let mut c = TokenCatalog::default_crypto();
        let before = c.len();
        c.merge(overrides);
        assert_eq!(c.len(), before + 1);
        assert_eq!(c.get("bitcoin").unwrap().name, "Bitcoin (override)");
        assert_eq!(c.slug_for("pepe"), "pepe");
    }
}
