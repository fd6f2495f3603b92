//! Configuration types and loading logic.
//!
//! `Config` is a direct 1-to-1 mapping of one configuration file.  Each file
//! describes a set of repositories plus the policies used when running Borg
//! against them.  Only `[location]` is mandatory; every other section falls
//! back to its `Default` implementation.
//!
//! # File format
//!
//! ```toml
//! [location]
//! source_directories = ["/home", "/etc"]
//! repositories       = ["user@backupserver:sourcehostname.borg", "~/local.borg"]
//! exclude_patterns   = ["*.pyc", "/home/*/.cache"]
//!
//! [storage]
//! encryption_passphrase = "correct horse battery staple"
//! compression           = "lz4"
//!
//! [retention]
//! keep_daily   = 7
//! keep_weekly  = 4
//! keep_monthly = 6
//!
//! [consistency]
//! checks      = ["repository", "archives"]
//! check_last  = 3
//!
//! [hooks]
//! before_backup = ["echo Starting a backup."]
//! after_backup  = ["echo Finished a backup."]
//! on_error      = ["echo Error during backup."]
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, GuardError};

// ─── Top-level ────────────────────────────────────────────────────────────────

/// Root configuration object, deserialised from one configuration file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Where to back up from and to.
    pub location: LocationConfig,

    /// How Borg talks to the repositories.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Which archives survive a prune.
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Which consistency checks run, and on which repositories.
    #[serde(default)]
    pub consistency: ConsistencyConfig,

    /// Shell commands run around a backup.
    #[serde(default)]
    pub hooks: HooksConfig,
}

// ─── [location] ───────────────────────────────────────────────────────────────

/// Sources, repositories, and exclusion rules.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct LocationConfig {
    /// Paths to include in every archive.  May start with `~`.
    pub source_directories: Vec<String>,

    /// Repository paths or `user@host:path` URLs, processed in this order.
    pub repositories: Vec<String>,

    /// Stay in the same filesystem (do not cross mount points).
    #[serde(default)]
    pub one_file_system: bool,

    /// Read device files as if they were regular files.
    #[serde(default)]
    pub read_special: bool,

    /// Record BSD file flags.  `false` passes `--nobsdflags`.
    #[serde(default = "default_true")]
    pub bsd_flags: bool,

    /// Local Borg executable.
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Borg executable on the remote side of an SSH repository.
    #[serde(default)]
    pub remote_path: Option<String>,

    /// Shell-style patterns forwarded to `borg create --exclude`.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Files containing exclude patterns, one per line.
    #[serde(default)]
    pub exclude_from: Vec<String>,

    /// Skip directories tagged with a `CACHEDIR.TAG` file.
    #[serde(default)]
    pub exclude_caches: bool,

    /// Skip directories containing a file with this name.
    #[serde(default)]
    pub exclude_if_present: Option<String>,
}

// ─── [storage] ────────────────────────────────────────────────────────────────

/// Engine invocation settings shared by every action.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Command whose output is the repository passphrase (`BORG_PASSCOMMAND`).
    #[serde(default)]
    pub encryption_passcommand: Option<String>,

    /// Repository passphrase (`BORG_PASSPHRASE`).
    #[serde(default)]
    pub encryption_passphrase: Option<String>,

    /// SSH command used for remote repositories (`BORG_RSH`).
    #[serde(default)]
    pub ssh_command: Option<String>,

    /// Compression setting, e.g. `lz4` or `zstd,3`.
    #[serde(default)]
    pub compression: Option<String>,

    /// Upload rate limit in KiB/s.
    #[serde(default)]
    pub remote_rate_limit: Option<u64>,

    /// Seconds between checkpoints during `create`.
    #[serde(default)]
    pub checkpoint_interval: Option<u64>,

    /// Passed through verbatim to `--chunker-params`.
    #[serde(default)]
    pub chunker_params: Option<String>,

    /// Octal umask for created files, e.g. `0077`.
    #[serde(default)]
    pub umask: Option<String>,

    /// Seconds to wait for a repository lock.
    #[serde(default)]
    pub lock_wait: Option<u64>,

    /// Archive name template; Borg expands the placeholders.
    #[serde(default = "default_archive_name_format")]
    pub archive_name_format: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            encryption_passcommand: None,
            encryption_passphrase: None,
            ssh_command: None,
            compression: None,
            remote_rate_limit: None,
            checkpoint_interval: None,
            chunker_params: None,
            umask: None,
            lock_wait: None,
            archive_name_format: default_archive_name_format(),
        }
    }
}

// ─── [retention] ──────────────────────────────────────────────────────────────

/// Pruning policy, passed to `borg prune`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Keep everything within this interval, e.g. `2H` or `7d`.
    #[serde(default)]
    pub keep_within: Option<String>,
    #[serde(default)]
    pub keep_secondly: Option<u32>,
    #[serde(default)]
    pub keep_minutely: Option<u32>,
    #[serde(default)]
    pub keep_hourly: Option<u32>,
    #[serde(default)]
    pub keep_daily: Option<u32>,
    #[serde(default)]
    pub keep_weekly: Option<u32>,
    #[serde(default)]
    pub keep_monthly: Option<u32>,
    #[serde(default)]
    pub keep_yearly: Option<u32>,

    /// Only consider archive names starting with this prefix.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            keep_within: None,
            keep_secondly: None,
            keep_minutely: None,
            keep_hourly: None,
            keep_daily: None,
            keep_weekly: None,
            keep_monthly: None,
            keep_yearly: None,
            prefix: default_prefix(),
        }
    }
}

// ─── [consistency] ────────────────────────────────────────────────────────────

/// A consistency check Borg can run.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Check {
    Repository,
    Archives,
    /// Turns all checks off.
    Disabled,
}

/// Consistency check policy, passed to `borg check`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConsistencyConfig {
    #[serde(default = "default_checks")]
    pub checks: Vec<Check>,

    /// Restrict checks to these repositories.  Empty means all of them.
    #[serde(default)]
    pub check_repositories: Vec<String>,

    /// Only check the most recent N archives.
    #[serde(default)]
    pub check_last: Option<u32>,

    /// Only check archive names starting with this prefix.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            checks: default_checks(),
            check_repositories: vec![],
            check_last: None,
            prefix: default_prefix(),
        }
    }
}

impl ConsistencyConfig {
    /// Whether `repository` should be checked at all.
    ///
    /// `check_repositories` entries are compared after `~` expansion so the
    /// config can spell a local repository either way.
    pub fn repository_enabled_for_checks(&self, repository: &str) -> bool {
        if self.checks.contains(&Check::Disabled) {
            return false;
        }
        self.check_repositories.is_empty()
            || self
                .check_repositories
                .iter()
                .any(|r| expand_home(r) == repository)
    }
}

// ─── [hooks] ──────────────────────────────────────────────────────────────────

/// Shell commands bound to the three lifecycle points.  Any of them may be
/// absent.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HooksConfig {
    #[serde(default)]
    pub before_backup: Option<Vec<String>>,
    #[serde(default)]
    pub after_backup: Option<Vec<String>>,
    #[serde(default)]
    pub on_error: Option<Vec<String>>,
}

// ─── Defaults ─────────────────────────────────────────────────────────────────

// These free functions are required by `#[serde(default = "…")]`; serde
// cannot call `Default::default()` for individual fields, only for whole
// structs.

const fn default_true() -> bool {
    true
}

pub fn default_local_path() -> String {
    "borg".into()
}

pub fn default_archive_name_format() -> String {
    "{hostname}-{now:%Y-%m-%dT%H:%M:%S.%f}".into()
}

pub fn default_prefix() -> String {
    "{hostname}-".into()
}

pub fn default_checks() -> Vec<Check> {
    vec![Check::Repository, Check::Archives]
}

// ─── Paths ────────────────────────────────────────────────────────────────────

/// Expand a leading `~` or `~/` to the current user's home directory.
///
/// Anything else (including `~otheruser/…` and remote `host:path` URLs) is
/// returned unchanged.
pub fn expand_home(path: &str) -> String {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return path.to_string(),
    };
    match dirs::home_dir() {
        Some(home) => format!("{}{rest}", home.display()),
        None => path.to_string(),
    }
}

// ─── Loader ───────────────────────────────────────────────────────────────────

/// Read, parse and check a `Config` from `path`.
///
/// Unlike a missing optional section, a missing file is an error: the caller
/// asked for this exact path.
pub fn parse_configuration(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_configuration_str(path, &text)
}

/// Parse configuration text; `path` is only used in error messages.
pub fn parse_configuration_str(path: &Path, text: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let invalid = |message: &str| ConfigError::Invalid {
        path: path.to_path_buf(),
        message: message.into(),
    };
    if config.location.repositories.is_empty() {
        return Err(invalid("location.repositories must list at least one repository"));
    }
    if config.location.source_directories.is_empty() {
        return Err(invalid(
            "location.source_directories must list at least one directory",
        ));
    }
    if config.storage.archive_name_format.is_empty() {
        return Err(invalid("storage.archive_name_format must not be empty"));
    }

    Ok(config)
}

// ─── Repository guard ─────────────────────────────────────────────────────────

/// Make sure the repository requested for `--extract` can be resolved across
/// all parsed configurations.
///
/// With an explicit `repository` it must appear in some configuration, spelled
/// either as written or after `~` expansion.  Without one, there must be at
/// most one repository in total, otherwise the request is ambiguous.
pub fn guard_configuration_contains_repository<'a>(
    repository: Option<&str>,
    configs: impl IntoIterator<Item = &'a Config>,
) -> Result<(), GuardError> {
    let mut all = configs
        .into_iter()
        .flat_map(|config| config.location.repositories.iter());

    match repository {
        None => {
            if all.count() > 1 {
                return Err(GuardError::AmbiguousRepository);
            }
            Ok(())
        },
        Some(requested) => {
            let expanded = expand_home(requested);
            if all.any(|r| r == requested || expand_home(r) == expanded) {
                Ok(())
            } else {
                Err(GuardError::RepositoryNotFound(requested.to_string()))
            }
        },
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
