//! Phase plan: the ordered list of collection phases, each either run or
//! skipped with a reason, decided before any network call is made.

use coinharvest_core::RunDecision;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Per-token CoinGecko history (first run only).
    HistoricalBackfill,
    /// Batched CoinGecko current markets.
    MarketSnapshot,
    /// Batched CoinMarketCap quotes.
    QuoteSnapshot,
    /// Per-token historical-data page scrape.
    ScrapeHistory,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::HistoricalBackfill => "historical backfill",
            Phase::MarketSnapshot => "market snapshot",
            Phase::QuoteSnapshot => "quote snapshot",
            Phase::ScrapeHistory => "history scrape",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Backfill already done on an earlier run.
    RecurringRun,
    /// `CMC_API_KEY` is not set.
    MissingCredential,
    /// Disabled in config or on the command line.
    ScrapeDisabled,
    /// The browser could not be started.
    BrowserUnavailable,
    /// Not part of the requested command.
    NotRequested,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::RecurringRun => "recurring run, backfill already done",
            SkipReason::MissingCredential => "CMC_API_KEY not set",
            SkipReason::ScrapeDisabled => "scraping disabled",
            SkipReason::BrowserUnavailable => "headless browser unavailable",
            SkipReason::NotRequested => "not requested",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStep {
    Run(Phase),
    Skip(Phase, SkipReason),
}

impl PlanStep {
    pub fn phase(&self) -> Phase {
        match self {
            PlanStep::Run(p) | PlanStep::Skip(p, _) => *p,
        }
    }
}

/// What the sources available to this run can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub quote_credential: bool,
    pub scrape_enabled: bool,
    pub browser_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhasePlan {
    steps: Vec<PlanStep>,
}

impl PhasePlan {
    /// Full collection: backfill (first run) → market → quotes → scrape.
    pub fn collect(decision: &RunDecision, caps: Capabilities) -> Self {
        let backfill = if decision.is_first_run() {
            PlanStep::Run(Phase::HistoricalBackfill)
        } else {
            PlanStep::Skip(Phase::HistoricalBackfill, SkipReason::RecurringRun)
        };
        let quotes = if caps.quote_credential {
            PlanStep::Run(Phase::QuoteSnapshot)
        } else {
            PlanStep::Skip(Phase::QuoteSnapshot, SkipReason::MissingCredential)
        };
        Self {
            steps: vec![
                backfill,
                PlanStep::Run(Phase::MarketSnapshot),
                quotes,
                Self::scrape_step(caps),
            ],
        }
    }

    /// Scrape phase only; the REST phases are not requested.
    pub fn scrape_only(caps: Capabilities) -> Self {
        Self {
            steps: vec![
                PlanStep::Skip(Phase::HistoricalBackfill, SkipReason::NotRequested),
                PlanStep::Skip(Phase::MarketSnapshot, SkipReason::NotRequested),
                PlanStep::Skip(Phase::QuoteSnapshot, SkipReason::NotRequested),
                Self::scrape_step(caps),
            ],
        }
    }

    fn scrape_step(caps: Capabilities) -> PlanStep {
        if !caps.scrape_enabled {
            PlanStep::Skip(Phase::ScrapeHistory, SkipReason::ScrapeDisabled)
        } else if !caps.browser_available {
            PlanStep::Skip(Phase::ScrapeHistory, SkipReason::BrowserUnavailable)
        } else {
            PlanStep::Run(Phase::ScrapeHistory)
        }
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn runs(&self, phase: Phase) -> bool {
        self.steps.contains(&PlanStep::Run(phase))
    }
}
