//! Per-phase and per-run outcome summaries.

use crate::plan::{Phase, SkipReason};
use coinharvest_core::RunDecision;

/// Result of one item (token or batch) within a phase.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    /// Fetched, normalized and appended; carries the rows written.
    Appended(usize),
    /// Nothing to fetch for this item.
    UpToDate,
    /// Failed; carries the error text.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    pub item: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSummary {
    pub phase: Phase,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub up_to_date: usize,
    pub records_appended: usize,
    pub failures: Vec<ItemFailure>,
}

impl PhaseSummary {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            up_to_date: 0,
            records_appended: 0,
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, item: &str, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Appended(n) => {
                self.attempted += 1;
                self.succeeded += 1;
                self.records_appended += n;
            }
            ItemOutcome::UpToDate => self.up_to_date += 1,
            ItemOutcome::Failed(error) => {
                self.attempted += 1;
                self.failed += 1;
                self.failures.push(ItemFailure {
                    item: item.to_string(),
                    error: error.clone(),
                });
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub decision: RunDecision,
    pub phases: Vec<PhaseSummary>,
    pub skipped: Vec<(Phase, SkipReason)>,
}

impl RunReport {
    pub fn new(decision: RunDecision) -> Self {
        Self {
            decision,
            phases: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn phase(&self, phase: Phase) -> Option<&PhaseSummary> {
        self.phases.iter().find(|s| s.phase == phase)
    }

    pub fn total_records(&self) -> usize {
        self.phases.iter().map(|s| s.records_appended).sum()
    }

    pub fn total_failures(&self) -> usize {
        self.phases.iter().map(|s| s.failed).sum()
    }
}
