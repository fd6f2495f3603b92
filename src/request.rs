//! Flag validation: turns a parsed [`Cli`] into an [`ActionRequest`].
//!
//! `clap` accepts any combination of flags.  This module decides which
//! combinations make sense and refuses the rest before a single repository is
//! touched.  Rules are checked one after another and the first violation wins.

use std::path::PathBuf;

use crate::{
    cli::{Cli, EncryptionMode},
    error::ValidationError,
};

/// Which actions run against every repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Actions {
    pub init: bool,
    pub prune: bool,
    pub create: bool,
    pub check: bool,
    pub extract: bool,
    pub list: bool,
    pub info: bool,
}

impl Actions {
    /// What runs when the user names no action at all.
    pub const DEFAULT: Self = Self {
        init: false,
        prune: true,
        create: true,
        check: true,
        extract: false,
        list: false,
        info: false,
    };

    pub const fn any(self) -> bool {
        self.init || self.prune || self.create || self.check || self.extract || self.list || self.info
    }
}

/// Settings for `--init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOptions {
    pub encryption_mode: EncryptionMode,
    pub append_only: bool,
    pub storage_quota: Option<String>,
}

/// Settings for `--extract`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Only extract from this repository; `None` means every repository.
    pub repository: Option<String>,
    pub archive: String,
    /// Empty means the whole archive.
    pub restore_paths: Vec<String>,
}

/// A validated, immutable description of what this invocation should do.
///
/// Built once by [`ActionRequest::from_cli`]; `init` is `Some` exactly when
/// `actions.init` is set, and `extract` is `Some` exactly when
/// `actions.extract` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ActionRequest {
    pub actions: Actions,
    pub init: Option<InitOptions>,
    pub extract: Option<ExtractOptions>,
    pub dry_run: bool,
    pub stats: bool,
    pub json: bool,
    pub progress: bool,
    pub verbosity: u8,
    /// Files or directories to search for configuration; `None` when the
    /// defaults should be used.
    pub config_paths: Option<Vec<PathBuf>>,
}

impl ActionRequest {
    /// Validate `cli` and build the request.
    pub fn from_cli(cli: &Cli) -> Result<Self, ValidationError> {
        if cli.excludes_filename.is_some() {
            return Err(ValidationError::ExcludesDeprecated);
        }

        let init_options_given =
            cli.encryption_mode.is_some() || cli.append_only || cli.storage_quota.is_some();
        if init_options_given && !cli.init {
            return Err(ValidationError::InitOptionsWithoutInit);
        }
        if cli.init && cli.dry_run {
            return Err(ValidationError::InitWithDryRun);
        }
        let init = match (cli.init, cli.encryption_mode) {
            (false, _) => None,
            (true, None) => return Err(ValidationError::InitWithoutEncryption),
            (true, Some(encryption_mode)) => Some(InitOptions {
                encryption_mode,
                append_only: cli.append_only,
                storage_quota: cli.storage_quota.clone(),
            }),
        };

        let restore_paths = cli.restore_paths.clone().unwrap_or_default();
        if !cli.extract {
            if cli.repository.is_some() {
                return Err(ValidationError::ExtractOptionWithoutExtract("--repository"));
            }
            if cli.archive.is_some() {
                return Err(ValidationError::ExtractOptionWithoutExtract("--archive"));
            }
            if !restore_paths.is_empty() {
                return Err(ValidationError::ExtractOptionWithoutExtract("--restore-path"));
            }
        }
        let extract = match (cli.extract, &cli.archive) {
            (false, _) => None,
            (true, None) => return Err(ValidationError::ExtractWithoutArchive),
            (true, Some(archive)) => Some(ExtractOptions {
                repository: cli.repository.clone(),
                archive: archive.clone(),
                restore_paths,
            }),
        };

        if cli.progress && !(cli.create || cli.extract) {
            return Err(ValidationError::ProgressWithoutCreateOrExtract);
        }
        if cli.json && !(cli.create || cli.list || cli.info) {
            return Err(ValidationError::JsonWithoutOutputAction);
        }
        if cli.json && cli.list && cli.info {
            return Err(ValidationError::JsonWithListAndInfo);
        }

        let explicit = Actions {
            init: cli.init,
            prune: cli.prune,
            create: cli.create,
            check: cli.check,
            extract: cli.extract,
            list: cli.list,
            info: cli.info,
        };
        let actions = if explicit.any() {
            explicit
        } else {
            Actions::DEFAULT
        };

        // Checked after defaulting: a bare `--stats` applies to the default
        // prune and create.
        if cli.stats && !(actions.create || actions.prune) {
            return Err(ValidationError::StatsWithoutCreateOrPrune);
        }

        Ok(Self {
            actions,
            init,
            extract,
            dry_run: cli.dry_run,
            stats: cli.stats,
            json: cli.json,
            progress: cli.progress,
            verbosity: cli.verbosity,
            config_paths: cli.config_paths.clone(),
        })
    }

    /// The `--repository` filter given with `--extract`, if any.
    pub fn extract_repository(&self) -> Option<&str> {
        self.extract.as_ref().and_then(|e| e.repository.as_deref())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
