//! Persisted run-state marker (`.run_state.json` in the output directory).
//!
//! Records whether the historical backfill has run, which tokens it has
//! already written, and how far each slug's scraped history reaches. Writes are atomic:
//! the marker is written to a `.tmp` sibling and renamed into place.

use super::csv_table::StorageError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

pub const MARKER_FILE: &str = ".run_state.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStateMarker {
    /// Set when a backfill phase begins.
    #[serde(default)]
    pub backfill_started: bool,
    /// Set once every configured token has been backfilled.
    #[serde(default)]
    pub backfill_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backfill_completed_at: Option<DateTime<Utc>>,
    /// BLAKE3 fingerprint of the token list the backfill covered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_fingerprint: Option<String>,
    /// Tokens whose history has been appended. A resumed backfill skips them.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub backfilled: BTreeSet<String>,
    /// Newest scraped date per page slug.
    #[serde(default)]
    pub scraped_through: BTreeMap<String, NaiveDate>,
}

impl RunStateMarker {
    /// Load the marker. A missing file is `Ok(None)`; an unreadable or
    /// corrupt one is an error the caller may choose to treat as absent.
    pub fn load(path: &Path) -> Result<Option<Self>, StorageError> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Marker(format!("read {}: {e}", path.display()))),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::Marker(format!("parse {}: {e}", path.display())))
    }

    /// Load the marker, treating an unreadable one as absent (with a warning).
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(m) => m.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable run-state marker");
                Self::default()
            }
        }
    }

    /// Load the marker before updating it.
    ///
    /// An unreadable marker is moved aside to `.run_state.json.corrupt`
    /// instead of being overwritten by the next save, so the progress it
    /// held can still be recovered by hand.
    pub fn load_for_update(path: &Path) -> Self {
        match Self::load(path) {
            Ok(m) => m.unwrap_or_default(),
            Err(e) => {
                let aside = path.with_extension("json.corrupt");
                match fs::rename(path, &aside) {
                    Ok(()) => tracing::warn!(
                        error = %e,
                        moved_to = %aside.display(),
                        "unreadable run-state marker moved aside"
                    ),
                    Err(rename) => tracing::error!(
                        error = %e,
                        rename_error = %rename,
                        "unreadable run-state marker could not be moved aside"
                    ),
                }
                Self::default()
            }
        }
    }

    /// Atomically write the marker to `path`.
    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StorageError::Marker(format!("serialize: {e}")))?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|source| StorageError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            StorageError::Io {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    pub fn record_backfill_started(&mut self) {
        self.backfill_started = true;
    }

    pub fn record_backfill_completed<S: AsRef<str>>(&mut self, tokens: &[S], at: DateTime<Utc>) {
        self.backfill_started = true;
        self.backfill_completed = true;
        self.backfill_completed_at = Some(at);
        self.token_fingerprint = Some(token_fingerprint(tokens));
    }

    /// Note that `token_id`'s history has been appended.
    pub fn record_backfilled(&mut self, token_id: &str) {
        self.backfilled.insert(token_id.to_string());
    }

    pub fn is_backfilled(&self, token_id: &str) -> bool {
        self.backfilled.contains(token_id)
    }

    /// Whether every token in `tokens` has been backfilled.
    pub fn backfill_covers<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        tokens.iter().all(|t| self.is_backfilled(t.as_ref()))
    }

    /// Last scraped date for a slug.
    pub fn scraped_through(&self, slug: &str) -> Option<NaiveDate> {
        self.scraped_through.get(slug).copied()
    }

    /// Advance a slug's scrape progress. Progress never moves backwards.
    pub fn record_scrape(&mut self, slug: &str, through: NaiveDate) {
        let entry = self
            .scraped_through
            .entry(slug.to_string())
            .or_insert(through);
        if through > *entry {
            *entry = through;
        }
    }

    /// Whether `tokens` differ from the list the backfill covered.
    pub fn tokens_changed<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        match &self.token_fingerprint {
            Some(fp) => *fp != token_fingerprint(tokens),
            None => false,
        }
    }
}

/// Order-independent BLAKE3 fingerprint of a token id list.
pub fn token_fingerprint<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut ids: Vec<&str> = tokens.iter().map(|t| t.as_ref()).collect();
    ids.sort_unstable();
    ids.dedup();
    let mut hasher = blake3::Hasher::new();
    for id in ids {
        hasher.update(id.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "coinharvest_marker_{name}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn save_and_load() {
        let dir = temp_dir("roundtrip");
        let path = dir.join(MARKER_FILE);
        assert_eq!(RunStateMarker::load(&path).unwrap(), None);

        let mut m = RunStateMarker::default();
        m.record_backfilled("bitcoin");
        m.record_backfill_completed(&["bitcoin", "ethereum"], Utc::now());
        m.record_scrape("bitcoin", d(2024, 4, 30));
        m.save(&path).unwrap();

        let loaded = RunStateMarker::load(&path).unwrap().unwrap();
        assert_eq!(loaded, m);
        assert!(!dir.join(".run_state.json.tmp").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_marker_is_an_error_but_loads_as_default() {
        let dir = temp_dir("corrupt");
        let path = dir.join(MARKER_FILE);
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            RunStateMarker::load(&path),
            Err(StorageError::Marker(_))
        ));
        assert_eq!(RunStateMarker::load_or_default(&path), RunStateMarker::default());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_marker_is_moved_aside_before_update() {
        let dir = temp_dir("aside");
        let path = dir.join(MARKER_FILE);
        fs::write(&path, "{ not json").unwrap();

        let m = RunStateMarker::load_for_update(&path);
        assert_eq!(m, RunStateMarker::default());
        assert!(!path.exists());
        let aside = dir.join(".run_state.json.corrupt");
        assert_eq!(fs::read_to_string(&aside).unwrap(), "{ not json");

        m.save(&path).unwrap();
        assert_eq!(fs::read_to_string(&aside).unwrap(), "{ not json");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn backfill_progress_per_token() {
        let mut m = RunStateMarker::default();
        assert!(!m.backfill_covers(&["bitcoin"]));
        m.record_backfilled("bitcoin");
        m.record_backfilled("bitcoin");
        assert!(m.is_backfilled("bitcoin"));
        assert!(m.backfill_covers(&["bitcoin"]));
        assert!(!m.backfill_covers(&["bitcoin", "solana"]));
        assert!(m.backfill_covers::<&str>(&[]));
    }

    #[test]
    fn scrape_progress_never_regresses() {
        let mut m = RunStateMarker::default();
        m.record_scrape("solana", d(2024, 5, 1));
        m.record_scrape("solana", d(2024, 4, 1));
        assert_eq!(m.scraped_through("solana"), Some(d(2024, 5, 1)));
        m.record_scrape("solana", d(2024, 5, 3));
        assert_eq!(m.scraped_through("solana"), Some(d(2024, 5, 3)));
        assert_eq!(m.scraped_through("dai"), None);
    }

    #[test]
    fn fingerprint_ignores_order_and_duplicates() {
        assert_eq!(
            token_fingerprint(&["ethereum", "bitcoin"]),
            token_fingerprint(&["bitcoin", "ethereum", "bitcoin"])
        );
        assert_ne!(
            token_fingerprint(&["bitcoin"]),
            token_fingerprint(&["bitcoin", "solana"])
        );
    }

    #[test]
    fn token_change_detection() {
        let mut m = RunStateMarker::default();
        assert!(!m.tokens_changed(&["bitcoin"]));
        m.record_backfill_completed(&["bitcoin", "ethereum"], Utc::now());
        assert!(!m.tokens_changed(&["ethereum", "bitcoin"]));
        assert!(m.tokens_changed(&["bitcoin", "ethereum", "solana"]));
    }
}
