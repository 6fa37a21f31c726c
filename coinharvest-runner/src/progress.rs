//! Console narrative of a collection run, separate from the log file.

use crate::plan::{Phase, PhasePlan, PlanStep, SkipReason};
use crate::report::{ItemOutcome, PhaseSummary, RunReport};
use coinharvest_core::RunDecision;

/// Callbacks for every phase and item outcome.
pub trait CollectProgress {
    fn on_run_start(&self, decision: &RunDecision, plan: &PhasePlan);

    fn on_phase_start(&self, phase: Phase, items: usize);

    fn on_phase_skipped(&self, phase: Phase, reason: SkipReason);

    fn on_item_start(&self, phase: Phase, item: &str, index: usize, total: usize);

    fn on_item_complete(&self, phase: Phase, item: &str, outcome: &ItemOutcome);

    fn on_phase_complete(&self, summary: &PhaseSummary);

    fn on_run_complete(&self, report: &RunReport);
}

/// Prints the narrative to stdout.
pub struct StdoutProgress;

impl CollectProgress for StdoutProgress {
    fn on_run_start(&self, decision: &RunDecision, plan: &PhasePlan) {
        println!("Run mode: {} ({:?})", decision.mode, decision.basis);
        for step in plan.steps() {
            match step {
                PlanStep::Run(p) => println!("  - {p}"),
                PlanStep::Skip(p, reason) => println!("  - {p} (skip: {reason})"),
            }
        }
    }

    fn on_phase_start(&self, phase: Phase, items: usize) {
        println!("\n== {phase}: {items} item(s) ==");
    }

    fn on_phase_skipped(&self, phase: Phase, reason: SkipReason) {
        println!("\n== {phase}: skipped ({reason}) ==");
    }

    fn on_item_start(&self, _phase: Phase, item: &str, index: usize, total: usize) {
        println!("[{}/{}] {item}...", index + 1, total);
    }

    fn on_item_complete(&self, _phase: Phase, item: &str, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Appended(0) => println!("  WARN: {item}: no data"),
            ItemOutcome::Appended(n) => println!("  OK: {item}: {n} record(s)"),
            ItemOutcome::UpToDate => println!("  SKIP: {item}: up to date"),
            ItemOutcome::Failed(e) => println!("  FAIL: {item}: {e}"),
        }
    }

    fn on_phase_complete(&self, s: &PhaseSummary) {
        println!(
            "{}: {}/{} succeeded, {} failed, {} record(s) appended",
            s.phase, s.succeeded, s.attempted, s.failed, s.records_appended
        );
    }

    fn on_run_complete(&self, report: &RunReport) {
        println!(
            "\nCollection complete: {} record(s) appended, {} item failure(s)",
            report.total_records(),
            report.total_failures()
        );
    }
}
