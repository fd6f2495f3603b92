//! Error types.
//!
//! Four families, one per boundary of a run:
//!
//! | Type              | Raised by                 | Scope of the failure         |
//! |-------------------|---------------------------|------------------------------|
//! | `ValidationError` | [`crate::request`]        | whole invocation, up front   |
//! | `ConfigError`     | [`crate::config`]         | one configuration file       |
//! | `GuardError`      | [`crate::config`]         | whole run, before any action |
//! | `ExecutionError`  | engine, hooks, output     | one configuration            |

use std::{io, path::PathBuf};

use thiserror::Error;

// ─── Validation ───────────────────────────────────────────────────────────────

/// An illegal combination of command-line flags.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The --excludes option has been replaced with exclude_patterns in configuration")]
    ExcludesDeprecated,

    #[error(
        "The --encryption, --append-only, and --storage-quota options can only be used with the \
         --init option"
    )]
    InitOptionsWithoutInit,

    #[error("The --init option cannot be used with the --dry-run option")]
    InitWithDryRun,

    #[error("The --encryption option is required with the --init option")]
    InitWithoutEncryption,

    /// Carries the offending flag, e.g. `"--archive"`.
    #[error("The {0} option can only be used with the --extract option")]
    ExtractOptionWithoutExtract(&'static str),

    #[error("The --archive option is required with the --extract option")]
    ExtractWithoutArchive,

    #[error("The --progress option can only be used with the --create and --extract options")]
    ProgressWithoutCreateOrExtract,

    #[error("The --json option can only be used with the --create, --list, or --info options")]
    JsonWithoutOutputAction,

    #[error("With the --json option, options --list and --info cannot be used together")]
    JsonWithListAndInfo,

    #[error("The --stats option can only be used when creating or pruning archives")]
    StatsWithoutCreateOrPrune,
}

// ─── Configuration ────────────────────────────────────────────────────────────

/// A configuration file that could not be turned into a [`crate::config::Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

/// The repository requested for `--extract` cannot be resolved.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuardError {
    #[error("Repository {0} not found in configuration files")]
    RepositoryNotFound(String),

    #[error("Can't determine which repository to use. Use --repository option to disambiguate")]
    AmbiguousRepository,
}

// ─── Execution ────────────────────────────────────────────────────────────────

/// Failure while running an engine action, a hook, or writing results.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The command could not be started at all.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The command ran and exited non-zero (or was killed by a signal).
    #[error("command `{command}` {}{}", exit_description(*code), stderr_suffix(stderr))]
    Process {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// `--json` output from the engine did not parse.
    #[error("{repository}: invalid JSON output: {source}")]
    InvalidJson {
        repository: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ExecutionError {
    /// Process and OS-level failures fire the `on_error` hook; malformed engine
    /// output does not.
    pub const fn triggers_error_hook(&self) -> bool {
        !matches!(self, Self::InvalidJson { .. })
    }
}

fn exit_description(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("returned non-zero exit status {code}"),
        None => "was terminated by a signal".into(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}
