//! Append-only CSV table.
//!
//! One table per output file. The header is written once, when the file is
//! created; afterwards rows are only ever appended, never rewritten.

use super::schema::CsvRow;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV encoding error: {0}")]
    Csv(#[from] csv::Error),

    #[error("output file {0} does not exist; it must be initialized first")]
    MissingFile(PathBuf),

    #[error("run-state marker error: {0}")]
    Marker(String),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// An append-only CSV file holding rows of type `R`.
#[derive(Debug, Clone)]
pub struct CsvTable<R> {
    path: PathBuf,
    _row: PhantomData<fn(&R)>,
}

impl<R: CsvRow> CsvTable<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _row: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Create the file with its header row.
    ///
    /// A file that already exists and is non-empty is left untouched, so
    /// calling this on every run is safe. Returns whether a header was written.
    pub fn initialize(&self) -> Result<bool, StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        if fs::metadata(&self.path).map(|m| m.len() > 0).unwrap_or(false) {
            return Ok(false);
        }

        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(R::HEADER)?;
        let data = wtr
            .into_inner()
            .map_err(|e| StorageError::Io {
                path: self.path.clone(),
                source: e.into_error(),
            })?;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(io_err(&self.path))?;
        file.write_all(&data).map_err(io_err(&self.path))?;
        file.sync_all().map_err(io_err(&self.path))?;

        tracing::info!(path = %self.path.display(), "initialized output file");
        Ok(true)
    }

    /// Append `rows` in file column order.
    ///
    /// The file must already exist; it is never created here. Rows are
    /// encoded into a buffer and written with one call, then synced.
    pub fn try_append(&self, rows: &[R]) -> Result<usize, StorageError> {
        if rows.is_empty() {
            return Ok(0);
        }
        if !self.exists() {
            return Err(StorageError::MissingFile(self.path.clone()));
        }

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(vec![]);
        for row in rows {
            wtr.write_record(row.fields())?;
        }
        let data = wtr.into_inner().map_err(|e| StorageError::Io {
            path: self.path.clone(),
            source: e.into_error(),
        })?;

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(io_err(&self.path))?;
        file.write_all(&data).map_err(io_err(&self.path))?;
        file.sync_all().map_err(io_err(&self.path))?;

        Ok(rows.len())
    }

    /// [`try_append`](Self::try_append), logging failures and reporting zero rows.
    pub fn append(&self, rows: &[R]) -> usize {
        match self.try_append(rows) {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(path = %self.path.display(), rows = rows.len(), error = %e, "append failed");
                0
            }
        }
    }

    /// Number of data rows currently in the file (header excluded).
    pub fn row_count(&self) -> Result<usize, StorageError> {
        if !self.exists() {
            return Ok(0);
        }
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;
        let mut n = 0;
        for rec in rdr.records() {
            rec?;
            n += 1;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OhlcRecord, SourceTag};
    use crate::storage::schema::OHLC_HEADER;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "coinharvest_csv_{name}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn row(date: &str, close: f64) -> OhlcRecord {
        OhlcRecord {
            date: date.into(),
            token_symbol: "BTC".into(),
            token_name: "Bitcoin".into(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
            market_cap: 2.0,
            source: SourceTag::CoinMarketCapScrape,
        }
    }

    #[test]
    fn initialize_is_idempotent() {
        let dir = temp_dir("init");
        let table: CsvTable<OhlcRecord> = CsvTable::new(dir.join("nested/ohlc.csv"));

        assert!(table.initialize().unwrap());
        let first = fs::read_to_string(table.path()).unwrap();
        assert!(!table.initialize().unwrap());
        let second = fs::read_to_string(table.path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, format!("{}\n", OHLC_HEADER.join(",")));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn initialize_keeps_existing_rows() {
        let dir = temp_dir("keep");
        let table: CsvTable<OhlcRecord> = CsvTable::new(dir.join("ohlc.csv"));
        table.initialize().unwrap();
        table.try_append(&[row("2024-01-01", 1.0)]).unwrap();

        table.initialize().unwrap();
        assert_eq!(table.row_count().unwrap(), 1);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn append_never_creates_the_file() {
        let dir = temp_dir("missing");
        let table: CsvTable<OhlcRecord> = CsvTable::new(dir.join("ohlc.csv"));
        assert!(matches!(
            table.try_append(&[row("2024-01-01", 1.0)]),
            Err(StorageError::MissingFile(_))
        ));
        assert_eq!(table.append(&[row("2024-01-01", 1.0)]), 0);
        assert!(!table.exists());
    }

    #[test]
    fn appends_preserve_order() {
        let dir = temp_dir("order");
        let table: CsvTable<OhlcRecord> = CsvTable::new(dir.join("ohlc.csv"));
        table.initialize().unwrap();

        assert_eq!(table.append(&[row("2024-01-01", 1.0), row("2024-01-02", 2.0)]), 2);
        assert_eq!(table.append(&[]), 0);
        assert_eq!(table.append(&[row("2024-01-03", 3.0)]), 1);

        let content = fs::read_to_string(table.path()).unwrap();
        let dates: Vec<&str> = content
            .lines()
            .skip(1)
            .map(|l| l.split(',').next().unwrap())
            .collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        let dir = temp_dir("quote");
        let table: CsvTable<OhlcRecord> = CsvTable::new(dir.join("ohlc.csv"));
        table.initialize().unwrap();
        let mut r = row("2024-01-01", 1.0);
        r.token_name = "Foo, Inc".into();
        table.try_append(&[r]).unwrap();

        let mut rdr = csv::Reader::from_path(table.path()).unwrap();
        let rec = rdr.records().next().unwrap().unwrap();
        assert_eq!(&rec[2], "Foo, Inc");
        let _ = fs::remove_dir_all(&dir);
    }
}
