//! Collection orchestrator.
//!
//! Executes a [`PhasePlan`] with one sequential control loop. Every item
//! (token or batch) goes fetch → normalize → append, and every outbound
//! call is followed by the source's rate-limit pause whether it succeeded
//! or not. Item failures are logged and recorded; only storage failures
//! that make the run meaningless (output directory, header writes) abort.

use crate::config::CollectorConfig;
use crate::plan::{Capabilities, Phase, PhasePlan, PlanStep, SkipReason};
use crate::progress::CollectProgress;
use crate::report::{ItemOutcome, PhaseSummary, RunReport};
use chrono::{DateTime, Days, NaiveDate, Utc};
use coinharvest_core::data::{batch_count, batches, DataError, MarketDataApi, QuoteApi, RateLimiter};
use coinharvest_core::domain::TokenCatalog;
use coinharvest_core::scrape::{HistoricalRow, HistoryScraper, PageDriver, PageLauncher};
use coinharvest_core::storage::{OutputPaths, OutputSet, RunStateMarker, StorageError};
use coinharvest_core::{detect, normalize, NormalizedBatch, ProviderPayload, RunDecision};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct Collector<'a> {
    config: &'a CollectorConfig,
    catalog: TokenCatalog,
    paths: OutputPaths,
    outputs: OutputSet,
    market_limiter: RateLimiter,
    quote_limiter: RateLimiter,
    scrape_limiter: RateLimiter,
    progress: &'a dyn CollectProgress,
    clock: Box<dyn Fn() -> DateTime<Utc> + 'a>,
}

impl<'a> Collector<'a> {
    /// `catalog` is the validated catalog returned by [`CollectorConfig::validate`].
    pub fn new(
        config: &'a CollectorConfig,
        catalog: TokenCatalog,
        progress: &'a dyn CollectProgress,
    ) -> Self {
        let paths = config.output_paths();
        Self {
            outputs: OutputSet::new(&paths),
            paths,
            catalog,
            market_limiter: RateLimiter::new("coingecko", config.coingecko.delay()),
            quote_limiter: RateLimiter::new("coinmarketcap", config.coinmarketcap.delay()),
            scrape_limiter: RateLimiter::new("scrape", config.scrape.delay()),
            config,
            progress,
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the wall clock (observation timestamps, scrape date ranges).
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + 'a) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    pub fn market_limiter(&self) -> &RateLimiter {
        &self.market_limiter
    }

    pub fn quote_limiter(&self) -> &RateLimiter {
        &self.quote_limiter
    }

    pub fn scrape_limiter(&self) -> &RateLimiter {
        &self.scrape_limiter
    }

    /// Full collection run. `quotes` is `None` when no credential is set;
    /// `pages` is `None` when no browser is available. The browser is only
    /// launched once the REST phases are done.
    pub fn collect(
        &self,
        market: &dyn MarketDataApi,
        quotes: Option<&dyn QuoteApi>,
        pages: Option<&dyn PageLauncher>,
    ) -> Result<RunReport, CollectError> {
        let decision = detect(&self.paths);
        tracing::info!(mode = %decision.mode, basis = ?decision.basis, "run mode decided");

        if !decision.is_first_run() {
            let marker = RunStateMarker::load_or_default(&self.paths.marker);
            if marker.tokens_changed(&self.config.tokens.rest) {
                tracing::warn!(
                    "token list differs from the backfilled one; added tokens will not be backfilled"
                );
            }
        }

        let plan = PhasePlan::collect(
            &decision,
            Capabilities {
                quote_credential: quotes.is_some(),
                scrape_enabled: self.config.scrape.enabled,
                browser_available: pages.is_some(),
            },
        );

        self.paths.ensure_dir()?;
        self.outputs.market.initialize()?;
        self.outputs.quotes.initialize()?;

        self.execute(&decision, &plan, Some(market), quotes, pages)
    }

    /// Scrape phase only.
    pub fn scrape(&self, pages: Option<&dyn PageLauncher>) -> Result<RunReport, CollectError> {
        let decision = detect(&self.paths);
        let plan = PhasePlan::scrape_only(Capabilities {
            quote_credential: false,
            scrape_enabled: self.config.scrape.enabled,
            browser_available: pages.is_some(),
        });
        self.paths.ensure_dir()?;
        self.execute(&decision, &plan, None, None, pages)
    }

    fn execute(
        &self,
        decision: &RunDecision,
        plan: &PhasePlan,
        market: Option<&dyn MarketDataApi>,
        quotes: Option<&dyn QuoteApi>,
        pages: Option<&dyn PageLauncher>,
    ) -> Result<RunReport, CollectError> {
        self.progress.on_run_start(decision, plan);
        let mut report = RunReport::new(*decision);

        for step in plan.steps() {
            let phase = match *step {
                PlanStep::Skip(phase, reason) => {
                    self.skip(&mut report, phase, reason);
                    continue;
                }
                PlanStep::Run(phase) => phase,
            };

            tracing::info!(phase = %phase, "phase started");
            let summary = match (phase, market, quotes, pages) {
                (Phase::HistoricalBackfill, Some(api), _, _) => self.run_backfill(api),
                (Phase::MarketSnapshot, Some(api), _, _) => self.run_market_snapshot(api),
                (Phase::QuoteSnapshot, _, Some(api), _) => self.run_quote_snapshot(api),
                (Phase::ScrapeHistory, _, _, Some(launcher)) => match launcher.launch() {
                    Ok(driver) => self.run_scrape(&*driver)?,
                    Err(e) => {
                        tracing::warn!(error = %e, "browser launch failed");
                        self.skip(&mut report, phase, SkipReason::BrowserUnavailable);
                        continue;
                    }
                },
                _ => {
                    self.skip(&mut report, phase, SkipReason::NotRequested);
                    continue;
                }
            };
            tracing::info!(
                phase = %phase,
                attempted = summary.attempted,
                succeeded = summary.succeeded,
                failed = summary.failed,
                records = summary.records_appended,
                "phase complete"
            );
            self.progress.on_phase_complete(&summary);
            report.phases.push(summary);
        }

        self.progress.on_run_complete(&report);
        Ok(report)
    }

    fn skip(&self, report: &mut RunReport, phase: Phase, reason: SkipReason) {
        match reason {
            SkipReason::MissingCredential | SkipReason::BrowserUnavailable => {
                tracing::warn!(phase = %phase, %reason, "phase skipped")
            }
            _ => tracing::info!(phase = %phase, %reason, "phase skipped"),
        }
        self.progress.on_phase_skipped(phase, reason);
        report.skipped.push((phase, reason));
    }

    // ─── REST phases ─────────────────────────────────────────────────

    fn run_backfill(&self, api: &dyn MarketDataApi) -> PhaseSummary {
        let phase = Phase::HistoricalBackfill;
        let tokens = &self.config.tokens.rest;
        let days = self.config.coingecko.history_days;
        let mut summary = PhaseSummary::new(phase);
        self.progress.on_phase_start(phase, tokens.len());

        let mut marker = RunStateMarker::load_for_update(&self.paths.marker);
        marker.record_backfill_started();
        self.save_marker(&marker);

        for (i, token) in tokens.iter().enumerate() {
            self.progress.on_item_start(phase, token, i, tokens.len());
            if marker.is_backfilled(token) {
                tracing::debug!(token = token.as_str(), "history already backfilled");
                summary.record(token, &ItemOutcome::UpToDate);
                self.progress.on_item_complete(phase, token, &ItemOutcome::UpToDate);
                continue;
            }

            let outcome = match api.fetch_historical(token, days) {
                Ok(chart) => self.append(&normalize(ProviderPayload::HistoricalChart {
                    token_id: token.clone(),
                    chart,
                })),
                Err(e) => fetch_failed(api.name(), token, &e),
            };
            if let ItemOutcome::Appended(_) = outcome {
                marker.record_backfilled(token);
                self.save_marker(&marker);
            }
            self.market_limiter.pause();
            summary.record(token, &outcome);
            self.progress.on_item_complete(phase, token, &outcome);
        }

        if marker.backfill_covers(tokens) {
            marker.record_backfill_completed(tokens, (self.clock)());
            self.save_marker(&marker);
        } else {
            tracing::warn!(
                failed = summary.failed,
                "backfill incomplete; remaining tokens will be retried next run"
            );
        }
        summary
    }

    fn run_market_snapshot(&self, api: &dyn MarketDataApi) -> PhaseSummary {
        let phase = Phase::MarketSnapshot;
        let tokens = &self.config.tokens.rest;
        let size = self.config.coingecko.batch_size;
        let total = batch_count(tokens.len(), size);
        let mut summary = PhaseSummary::new(phase);
        self.progress.on_phase_start(phase, total);

        for (i, chunk) in batches(tokens, size).enumerate() {
            let label = batch_label(i, total, chunk.len());
            self.progress.on_item_start(phase, &label, i, total);
            let outcome = match api.fetch_current_batch(chunk) {
                Ok(markets) => {
                    if markets.len() < chunk.len() {
                        let missing: Vec<&str> = chunk
                            .iter()
                            .filter(|id| !markets.iter().any(|m| &m.id == *id))
                            .map(String::as_str)
                            .collect();
                        tracing::warn!(batch = %label, ?missing, "tokens missing from markets response");
                    }
                    self.append(&normalize(ProviderPayload::CurrentMarkets {
                        observed_at: (self.clock)().timestamp(),
                        markets,
                    }))
                }
                Err(e) => fetch_failed(api.name(), &label, &e),
            };
            self.market_limiter.pause();
            summary.record(&label, &outcome);
            self.progress.on_item_complete(phase, &label, &outcome);
        }
        summary
    }

    fn run_quote_snapshot(&self, api: &dyn QuoteApi) -> PhaseSummary {
        let phase = Phase::QuoteSnapshot;
        let symbols = self.catalog.exchange_symbols(&self.config.tokens.rest);
        let size = self.config.coinmarketcap.batch_size;
        let total = batch_count(symbols.len(), size);
        let mut summary = PhaseSummary::new(phase);
        self.progress.on_phase_start(phase, total);

        for (i, chunk) in batches(&symbols, size).enumerate() {
            let label = batch_label(i, total, chunk.len());
            self.progress.on_item_start(phase, &label, i, total);
            let outcome = match api.fetch_quote_batch(chunk) {
                Ok(quotes) => {
                    let missing: Vec<&str> = chunk
                        .iter()
                        .filter(|s| !quotes.contains_key(s.as_str()))
                        .map(String::as_str)
                        .collect();
                    if !missing.is_empty() {
                        tracing::warn!(batch = %label, ?missing, "symbols missing from quotes response");
                    }
                    self.append(&normalize(ProviderPayload::Quotes {
                        observed_at: (self.clock)().timestamp(),
                        quotes,
                    }))
                }
                Err(e) => fetch_failed(api.name(), &label, &e),
            };
            self.quote_limiter.pause();
            summary.record(&label, &outcome);
            self.progress.on_item_complete(phase, &label, &outcome);
        }
        summary
    }

    // ─── Scrape phase ────────────────────────────────────────────────

    fn run_scrape(&self, driver: &dyn PageDriver) -> Result<PhaseSummary, CollectError> {
        let phase = Phase::ScrapeHistory;
        self.outputs.ohlc.initialize()?;

        let scraper = HistoryScraper::new(driver, self.config.scrape.base_url.as_str())
            .with_min_cells(self.config.scrape.min_cells);
        let tokens = &self.config.tokens.scrape;
        let mut marker = RunStateMarker::load_for_update(&self.paths.marker);
        let today = (self.clock)().date_naive();
        let end = today.pred_opt().unwrap_or(today);
        let mut summary = PhaseSummary::new(phase);
        self.progress.on_phase_start(phase, tokens.len());

        for (i, token) in tokens.iter().enumerate() {
            self.progress.on_item_start(phase, token, i, tokens.len());

            let Some(entry) = self.catalog.get(token) else {
                let outcome = ItemOutcome::Failed(format!("'{token}' has no catalog entry"));
                summary.record(token, &outcome);
                self.progress.on_item_complete(phase, token, &outcome);
                continue;
            };
            let slug = self.catalog.slug_for(token);
            let last = marker.scraped_through(slug);

            let Some(start) = scrape_start(last, today, self.config.scrape.history_days)
                .filter(|start| *start <= end)
            else {
                tracing::debug!(slug, ?last, "scraped history up to date");
                summary.record(token, &ItemOutcome::UpToDate);
                self.progress.on_item_complete(phase, token, &ItemOutcome::UpToDate);
                continue;
            };

            let outcome = match scraper.scrape_historical(slug, start, end) {
                Ok(scraped) => {
                    let rows = new_rows(scraped.rows, last, end);
                    let newest = rows.iter().filter_map(HistoricalRow::parsed_date).max();
                    if rows.is_empty() {
                        tracing::warn!(
                            slug,
                            seen = scraped.diagnostics.rows_seen,
                            short = scraped.diagnostics.short_rows,
                            rejected = scraped.diagnostics.rejected_rows,
                            "no new rows scraped"
                        );
                    }
                    let outcome = self.append(&normalize(ProviderPayload::ScrapedHistory {
                        entry: entry.clone(),
                        rows,
                    }));
                    if let (ItemOutcome::Appended(n), Some(through)) = (&outcome, newest) {
                        if *n > 0 {
                            marker.record_scrape(slug, through);
                            self.save_marker(&marker);
                        }
                    }
                    outcome
                }
                Err(e) => {
                    tracing::warn!(slug, error = %e, "scrape failed");
                    ItemOutcome::Failed(e.to_string())
                }
            };
            self.scrape_limiter.pause();
            summary.record(token, &outcome);
            self.progress.on_item_complete(phase, token, &outcome);
        }

        Ok(summary)
    }

    // ─── Helpers ─────────────────────────────────────────────────────

    fn append(&self, batch: &NormalizedBatch) -> ItemOutcome {
        if batch.is_empty() {
            return ItemOutcome::Appended(0);
        }
        match self.outputs.append(batch) {
            0 => ItemOutcome::Failed(format!(
                "failed to append {} record(s) to {}",
                batch.len(),
                self.outputs.path_for(batch).display()
            )),
            n => ItemOutcome::Appended(n),
        }
    }

    fn save_marker(&self, marker: &RunStateMarker) {
        if let Err(e) = marker.save(&self.paths.marker) {
            tracing::error!(error = %e, "failed to persist run-state marker");
        }
    }
}

fn fetch_failed(source: &str, item: &str, e: &DataError) -> ItemOutcome {
    tracing::error!(
        source,
        item,
        status = ?e.status(),
        body = e.body().unwrap_or_default(),
        error = %e,
        "fetch failed"
    );
    ItemOutcome::Failed(e.to_string())
}

fn batch_label(index: usize, total: usize, len: usize) -> String {
    format!("batch {}/{} ({len} ids)", index + 1, total)
}

/// First date to request: the day after recorded progress, or `history_days`
/// back from today for a slug never scraped.
fn scrape_start(last: Option<NaiveDate>, today: NaiveDate, history_days: u32) -> Option<NaiveDate> {
    match last {
        Some(d) => d.succ_opt(),
        None => today.checked_sub_days(Days::new(u64::from(history_days))),
    }
}

/// Rows dated after `last` and no later than `end`. Rows whose date did not
/// parse are kept.
fn new_rows(rows: Vec<HistoricalRow>, last: Option<NaiveDate>, end: NaiveDate) -> Vec<HistoricalRow> {
    rows.into_iter()
        .filter(|r| match r.parsed_date() {
            Some(d) => d <= end && last.map_or(true, |l| d > l),
            None => true,
        })
        .collect()
}
