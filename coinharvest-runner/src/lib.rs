//! coinharvest runner: configuration, logging and collection orchestration.
//!
//! This crate builds on `coinharvest-core` to provide:
//! - TOML configuration with environment credentials and CLI overrides
//! - Log file setup for the structured `tracing` output
//! - The phase plan and the sequential collection orchestrator
//! - Per-phase summaries and the console progress narrative

pub mod collector;
pub mod config;
pub mod logging;
pub mod plan;
pub mod progress;
pub mod report;

pub use collector::{CollectError, Collector};
pub use config::{CollectorConfig, ConfigError};
pub use logging::init_file_logging;
pub use plan::{Capabilities, Phase, PhasePlan, PlanStep, SkipReason};
pub use progress::{CollectProgress, StdoutProgress};
pub use report::{ItemFailure, ItemOutcome, PhaseSummary, RunReport};
