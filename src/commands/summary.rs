//! Running every configuration file and summarising the outcome.
//!
//! Nothing here decides the exit code or prints directly: the caller gets an
//! ordered list of [`LogRecord`]s plus the JSON gathered from successful
//! configurations, and replays both once the run is over.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use serde_json::Value;
use tracing::{error, info};

use super::run::run_configuration;
use crate::{
    config::{Config, guard_configuration_contains_repository, parse_configuration},
    engine::Engine,
    request::ActionRequest,
};

// ─── Records ──────────────────────────────────────────────────────────────────

/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Critical,
}

/// One line of the end-of-run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Severity,
    pub message: String,
}

impl LogRecord {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Severity::Info,
            message: message.into(),
        }
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self {
            level: Severity::Critical,
            message: message.into(),
        }
    }

    /// Replay through the logger.  The subscriber's filter decides whether it
    /// is shown.
    pub fn emit(&self) {
        match self.level {
            Severity::Info => info!("{}", self.message),
            Severity::Critical => error!("{}", self.message),
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub records: Vec<LogRecord>,
    /// JSON documents from successful configurations, in run order.
    pub json_results: Vec<Value>,
}

impl RunSummary {
    pub fn has_critical(&self) -> bool {
        self.records.iter().any(|r| r.level >= Severity::Critical)
    }

    fn push(&mut self, record: LogRecord) {
        self.records.push(record);
    }
}

// ─── Driver ───────────────────────────────────────────────────────────────────

/// Parse and run each file in `config_filenames`, in order.
///
/// A file that fails to parse or run is recorded and the remaining files
/// still run.  For `--extract`, the requested repository is resolved across
/// all parsed files first; if that fails nothing runs at all.
/// `searched_paths` only appears in the message for an empty file list.
pub fn collect_configuration_run_summary_logs(
    config_filenames: &[PathBuf],
    searched_paths: &[PathBuf],
    request: &ActionRequest,
    engine: &dyn Engine,
    out: &mut dyn Write,
) -> RunSummary {
    let mut summary = RunSummary::default();

    let mut configs: Vec<(&Path, Config)> = Vec::with_capacity(config_filenames.len());
    for filename in config_filenames {
        info!("{}: Parsing configuration file", filename.display());
        match parse_configuration(filename) {
            Ok(config) => configs.push((filename.as_path(), config)),
            Err(err) => {
                summary.push(LogRecord::critical(format!(
                    "{}: Error parsing configuration file",
                    filename.display()
                )));
                summary.push(LogRecord::critical(err.to_string()));
            },
        }
    }

    if request.actions.extract {
        let guarded = guard_configuration_contains_repository(
            request.extract_repository(),
            configs.iter().map(|(_, config)| config),
        );
        if let Err(err) = guarded {
            summary.push(LogRecord::critical(err.to_string()));
            return summary;
        }
    }

    for (filename, config) in &configs {
        match run_configuration(filename, config, request, engine, out) {
            Ok(json_results) => {
                summary.json_results.extend(json_results);
                summary.push(LogRecord::info(format!(
                    "{}: Successfully ran configuration file",
                    filename.display()
                )));
            },
            Err(err) => {
                summary.push(LogRecord::critical(format!(
                    "{}: Error running configuration file",
                    filename.display()
                )));
                summary.push(LogRecord::critical(err.to_string()));
            },
        }
    }

    if config_filenames.is_empty() {
        let searched: Vec<String> = searched_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        summary.push(LogRecord::critical(format!(
            "{}: No configuration files found",
            searched.join(" ")
        )));
    }

    summary
}

// ─── Tests ────────────────────────────────────────────────────────────────────
