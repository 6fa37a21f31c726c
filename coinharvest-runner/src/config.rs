//! Collector configuration.
//!
//! Loaded from an optional TOML file; every field has a default, so an
//! empty file (or no file) yields the stock setup. Credentials never come
//! from the file: they are read from `COINGECKO_API_KEY` and `CMC_API_KEY`.

use coinharvest_core::data::{coingecko, coinmarketcap};
use coinharvest_core::domain::{TokenCatalog, DEFAULT_REST_TOKENS, DEFAULT_SCRAPE_TOKENS};
use coinharvest_core::scrape::client as scrape_client;
use coinharvest_core::storage::{
    OutputPaths, DEFAULT_MARKET_FILE, DEFAULT_OHLC_FILE, DEFAULT_QUOTES_FILE,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "coinharvest.toml";

pub const COINGECKO_KEY_ENV: &str = "COINGECKO_API_KEY";
pub const CMC_KEY_ENV: &str = "CMC_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("token '{token}' in [tokens].{list} has no catalog entry")]
    UnmappedToken { token: String, list: &'static str },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectorConfig {
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    pub coingecko: CoinGeckoConfig,
    pub coinmarketcap: CoinMarketCapConfig,
    pub scrape: ScrapeConfig,
    pub tokens: TokensConfig,
    /// Catalog entries added to (or replacing) the built-in catalog.
    pub catalog: TokenCatalog,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub market_file: String,
    pub quotes_file: String,
    pub ohlc_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            market_file: DEFAULT_MARKET_FILE.into(),
            quotes_file: DEFAULT_QUOTES_FILE.into(),
            ohlc_file: DEFAULT_OHLC_FILE.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log file name, relative to the output directory.
    pub file: String,
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: "collector.log".into(),
            level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    pub delay_secs: u64,
    pub batch_size: usize,
    pub history_days: u32,
    pub timeout_secs: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: coingecko::DEFAULT_BASE_URL.into(),
            delay_secs: 7,
            batch_size: 50,
            history_days: 365,
            timeout_secs: 30,
            api_key: None,
        }
    }
}

impl CoinGeckoConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoinMarketCapConfig {
    pub base_url: String,
    pub delay_secs: u64,
    pub batch_size: usize,
    pub timeout_secs: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for CoinMarketCapConfig {
    fn default() -> Self {
        Self {
            base_url: coinmarketcap::DEFAULT_BASE_URL.into(),
            delay_secs: 3,
            batch_size: 50,
            timeout_secs: 30,
            api_key: None,
        }
    }
}

impl CoinMarketCapConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrapeConfig {
    pub enabled: bool,
    pub base_url: String,
    pub delay_secs: u64,
    /// Days of history requested for a slug that has never been scraped.
    pub history_days: u32,
    pub navigation_timeout_secs: u64,
    pub settle_secs: u64,
    pub min_cells: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: scrape_client::DEFAULT_BASE_URL.into(),
            delay_secs: 3,
            history_days: 365,
            navigation_timeout_secs: 45,
            settle_secs: 2,
            min_cells: scrape_client::MIN_CELLS,
        }
    }
}

impl ScrapeConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

/// Canonical token ids per source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokensConfig {
    pub rest: Vec<String>,
    pub scrape: Vec<String>,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            rest: DEFAULT_REST_TOKENS.iter().map(|s| s.to_string()).collect(),
            scrape: DEFAULT_SCRAPE_TOKENS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CollectorConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load `path` if given (it must exist), otherwise [`DEFAULT_CONFIG_FILE`]
    /// if present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Read credentials from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_credentials(
            std::env::var(COINGECKO_KEY_ENV).ok(),
            std::env::var(CMC_KEY_ENV).ok(),
        );
    }

    /// Set credentials; blank values count as absent.
    pub fn apply_credentials(&mut self, coingecko: Option<String>, coinmarketcap: Option<String>) {
        let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        self.coingecko.api_key = non_blank(coingecko);
        self.coinmarketcap.api_key = non_blank(coinmarketcap);
    }

    /// Apply command-line overrides.
    pub fn apply_overrides(&mut self, output_dir: Option<PathBuf>, no_scrape: bool) {
        if let Some(dir) = output_dir {
            self.output.dir = dir;
        }
        if no_scrape {
            self.scrape.enabled = false;
        }
    }

    /// Built-in catalog with the configured entries merged over it.
    pub fn catalog(&self) -> TokenCatalog {
        let mut catalog = TokenCatalog::default_crypto();
        catalog.merge(self.catalog.clone());
        catalog
    }

    /// Check the configuration and return the effective catalog.
    pub fn validate(&self) -> Result<TokenCatalog, ConfigError> {
        if self.coingecko.batch_size == 0 || self.coinmarketcap.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }
        if self.coingecko.history_days == 0 || self.scrape.history_days == 0 {
            return Err(ConfigError::Invalid("history_days must be at least 1".into()));
        }
        if self.coingecko.timeout_secs == 0 || self.coinmarketcap.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be at least 1".into()));
        }
        if self.scrape.min_cells < scrape_client::MIN_CELLS {
            return Err(ConfigError::Invalid(format!(
                "scrape.min_cells must be at least {}",
                scrape_client::MIN_CELLS
            )));
        }

        let catalog = self.catalog();
        for (list, tokens) in [("rest", &self.tokens.rest), ("scrape", &self.tokens.scrape)] {
            if let Some(token) = tokens.iter().find(|t| catalog.get(t).is_none()) {
                return Err(ConfigError::UnmappedToken {
                    token: token.clone(),
                    list,
                });
            }
        }
        Ok(catalog)
    }

    pub fn output_paths(&self) -> OutputPaths {
        OutputPaths::with_names(
            &self.output.dir,
            &self.output.market_file,
            &self.output.quotes_file,
            &self.output.ohlc_file,
        )
    }

    pub fn log_path(&self) -> PathBuf {
        self.output.dir.join(&self.logging.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let c = CollectorConfig::from_toml_str("").unwrap();
        assert_eq!(c, CollectorConfig::default());
        assert_eq!(c.coingecko.delay(), Duration::from_secs(7));
        assert_eq!(c.coinmarketcap.delay(), Duration::from_secs(3));
        assert_eq!(c.coingecko.batch_size, 50);
        assert_eq!(c.tokens.rest.len(), 20);
        assert_eq!(c.tokens.scrape.len(), 25);
        assert!(c.scrape.enabled);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let c = CollectorConfig::from_toml_str(
            r#"
            [output]
            dir = "/var/lib/coinharvest"

            [coingecko]
            delay_secs = 10

            [tokens]
            rest = ["bitcoin", "ethereum"]
            "#,
        )
        .unwrap();
        assert_eq!(c.output.dir, PathBuf::from("/var/lib/coinharvest"));
        assert_eq!(c.output.market_file, DEFAULT_MARKET_FILE);
        assert_eq!(c.coingecko.delay_secs, 10);
        assert_eq!(c.coingecko.history_days, 365);
        assert_eq!(c.tokens.rest, vec!["bitcoin", "ethereum"]);
        assert_eq!(c.tokens.scrape.len(), 25);
    }

    #[test]
    fn unmapped_token_is_rejected() {
        let c = CollectorConfig::from_toml_str(
            r#"
            [tokens]
            rest = ["bitcoin", "pepe"]
            "#,
        )
        .unwrap();
        match c.validate().unwrap_err() {
            ConfigError::UnmappedToken { token, list } => {
                assert_eq!(token, "pepe");
                assert_eq!(list, "rest");
            }
            other => panic!("expected UnmappedToken, got {other}"),
        }
    }

    #[test]
    fn catalog_section_maps_extra_tokens() {
        let c = CollectorConfig::from_toml_str(
            r#"
            [tokens]
            scrape = ["pepe"]

            [catalog.pepe]
            symbol = "pepe"
            name = "Pepe"
            "#,
        )
        .unwrap();
        let catalog = c.validate().unwrap();
        assert_eq!(catalog.get("pepe").unwrap().name, "Pepe");
        assert!(catalog.get("bitcoin").is_some());
    }

    #[test]
    fn zero_batch_size_is_invalid() {
        let c = CollectorConfig::from_toml_str("[coinmarketcap]\nbatch_size = 0\n").unwrap();
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        let err = CollectorConfig::from_toml_str("[coingecko]\napi_key = \"secret\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn blank_credentials_are_absent() {
        let mut c = CollectorConfig::default();
        c.apply_credentials(Some("  ".into()), Some("cmc-key".into()));
        assert_eq!(c.coingecko.api_key, None);
        assert_eq!(c.coinmarketcap.api_key.as_deref(), Some("cmc-key"));
    }

    #[test]
    fn cli_overrides() {
        let mut c = CollectorConfig::default();
        c.apply_overrides(Some(PathBuf::from("/tmp/out")), true);
        assert_eq!(c.output.dir, PathBuf::from("/tmp/out"));
        assert!(!c.scrape.enabled);
        assert_eq!(c.output_paths().marker, PathBuf::from("/tmp/out/.run_state.json"));
        assert_eq!(c.log_path(), PathBuf::from("/tmp/out/collector.log"));
    }

    #[test]
    fn missing_explicit_file_is_read_error() {
        let err = CollectorConfig::load(Some(Path::new("/nonexistent/coinharvest.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
