//! Run-mode controller: first run (backfill + snapshots) or recurring run
//! (snapshots only).

use crate::storage::{OutputPaths, RunStateMarker};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    FirstRun,
    RecurringRun,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::FirstRun => f.write_str("first run"),
            RunMode::RecurringRun => f.write_str("recurring run"),
        }
    }
}

/// What the decision was based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionBasis {
    /// The run-state marker recorded a completed backfill.
    MarkerCompleted,
    /// The marker recorded a backfill that never finished.
    MarkerInterrupted,
    /// No usable marker; at least one REST output file exists.
    ExistingFiles,
    /// No usable marker and no REST output files.
    NoOutputs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDecision {
    pub mode: RunMode,
    pub basis: DecisionBasis,
}

impl RunDecision {
    pub fn is_first_run(&self) -> bool {
        self.mode == RunMode::FirstRun
    }
}

/// Decide the run mode. Never fails: unreadable paths count as absent.
pub fn detect(paths: &OutputPaths) -> RunDecision {
    let market_exists = paths.market.is_file();
    let quotes_exists = paths.quotes.is_file();
    let marker = match RunStateMarker::load(&paths.marker) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, "run-state marker unreadable, falling back to file check");
            None
        }
    };

    if let Some(marker) = marker {
        if marker.backfill_completed {
            if !market_exists && !quotes_exists {
                tracing::warn!(
                    dir = %paths.dir.display(),
                    "marker records a completed backfill but no REST output files exist"
                );
            }
            return RunDecision {
                mode: RunMode::RecurringRun,
                basis: DecisionBasis::MarkerCompleted,
            };
        }
        if marker.backfill_started {
            tracing::warn!("previous backfill did not complete; resuming it");
            return RunDecision {
                mode: RunMode::FirstRun,
                basis: DecisionBasis::MarkerInterrupted,
            };
        }
    }

    match (market_exists, quotes_exists) {
        (false, false) => RunDecision {
            mode: RunMode::FirstRun,
            basis: DecisionBasis::NoOutputs,
        },
        (market, quotes) => {
            if market != quotes {
                tracing::warn!(
                    market_exists = market,
                    quotes_exists = quotes,
                    "only one REST output file exists; treating as recurring run without backfill"
                );
            }
            RunDecision {
                mode: RunMode::RecurringRun,
                basis: DecisionBasis::ExistingFiles,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::fs;
    use std::path::PathBuf;

    fn temp_paths(name: &str) -> (PathBuf, OutputPaths) {
        let dir = std::env::temp_dir().join(format!(
            "coinharvest_mode_{name}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let paths = OutputPaths::in_dir(&dir);
        (dir, paths)
    }

    #[test]
    fn empty_dir_is_first_run() {
        let (dir, paths) = temp_paths("empty");
        let d = detect(&paths);
        assert_eq!(d.mode, RunMode::FirstRun);
        assert_eq!(d.basis, DecisionBasis::NoOutputs);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_dir_is_first_run() {
        let paths = OutputPaths::in_dir("/nonexistent/coinharvest/out");
        assert!(detect(&paths).is_first_run());
    }

    #[test]
    fn either_rest_file_means_recurring() {
        let (dir, paths) = temp_paths("either");
        fs::write(&paths.quotes, "timestamp\n").unwrap();
        assert_eq!(detect(&paths).mode, RunMode::RecurringRun);

        fs::remove_file(&paths.quotes).unwrap();
        fs::write(&paths.market, "timestamp\n").unwrap();
        let d = detect(&paths);
        assert_eq!(d.mode, RunMode::RecurringRun);
        assert_eq!(d.basis, DecisionBasis::ExistingFiles);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn scraped_file_alone_does_not_count() {
        let (dir, paths) = temp_paths("ohlc");
        fs::write(&paths.ohlc, "date\n").unwrap();
        assert!(detect(&paths).is_first_run());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn completed_marker_overrides_missing_files() {
        let (dir, paths) = temp_paths("marker");
        let mut m = RunStateMarker::default();
        m.record_backfill_completed(&["bitcoin"], Utc::now());
        m.save(&paths.marker).unwrap();

        let d = detect(&paths);
        assert_eq!(d.mode, RunMode::RecurringRun);
        assert_eq!(d.basis, DecisionBasis::MarkerCompleted);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn interrupted_backfill_runs_again() {
        let (dir, paths) = temp_paths("interrupted");
        fs::write(&paths.market, "timestamp\n").unwrap();
        let mut m = RunStateMarker::default();
        m.record_backfill_started();
        m.save(&paths.marker).unwrap();

        let d = detect(&paths);
        assert_eq!(d.mode, RunMode::FirstRun);
        assert_eq!(d.basis, DecisionBasis::MarkerInterrupted);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_marker_falls_back_to_files() {
        let (dir, paths) = temp_paths("corrupt");
        fs::write(&paths.marker, "garbage").unwrap();
        fs::write(&paths.market, "timestamp\n").unwrap();
        assert_eq!(detect(&paths).basis, DecisionBasis::ExistingFiles);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn detection_is_deterministic() {
        let (dir, paths) = temp_paths("determinism");
        fs::write(&paths.market, "timestamp\n").unwrap();
        assert_eq!(detect(&paths), detect(&paths));
        let _ = fs::remove_dir_all(&dir);
    }
}
