//! The backup engine seam.
//!
//! [`Engine`] has one method per action.  The orchestration in
//! [`crate::commands::run`] only ever talks to this trait, so it can be driven
//! by [`Borg`] in production and by a recording fake in tests.

use std::io::{self, Write};

use tracing::debug;

use crate::{
    error::ExecutionError,
    runner::{
        Invocation, build_check_args, build_create_args, build_extract_args, build_info_args,
        build_init_args, build_list_args, build_prune_args,
    },
    ui::{self, display_command},
};

/// One operation per action.  Each call targets a single, already expanded
/// repository.
pub trait Engine {
    fn init(&self, inv: &Invocation<'_>, repository: &str) -> Result<(), ExecutionError>;

    fn prune(&self, inv: &Invocation<'_>, repository: &str) -> Result<(), ExecutionError>;

    /// Returns the engine's JSON document when `--json` is active.
    fn create(&self, inv: &Invocation<'_>, repository: &str)
    -> Result<Option<String>, ExecutionError>;

    fn check(&self, inv: &Invocation<'_>, repository: &str) -> Result<(), ExecutionError>;

    fn extract(&self, inv: &Invocation<'_>, repository: &str) -> Result<(), ExecutionError>;

    /// Raw text, or a JSON document when `--json` is active.
    fn list(&self, inv: &Invocation<'_>, repository: &str) -> Result<String, ExecutionError>;

    /// Raw text, or a JSON document when `--json` is active.
    fn info(&self, inv: &Invocation<'_>, repository: &str) -> Result<String, ExecutionError>;
}

/// Runs the real `borg` executable named by `location.local_path`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Borg;

impl Borg {
    /// Run behind a spinner and hand back stdout.
    fn capture(label: &str, args: &[String], inv: &Invocation<'_>) -> Result<String, ExecutionError> {
        debug!("{}", display_command(args));
        ui::run_stage(label, args, &inv.env)
    }

    /// Run an action whose output is only for the operator and echo its
    /// stdout once it finishes.
    ///
    /// Under `--json` stdout is reserved for the final array, so the echo
    /// goes to stderr instead.
    fn echo(label: &str, args: &[String], inv: &Invocation<'_>) -> Result<(), ExecutionError> {
        let stdout = Self::capture(label, args, inv)?;
        if stdout.is_empty() {
            return Ok(());
        }
        if inv.request.json {
            io::stderr().write_all(stdout.as_bytes())?;
        } else {
            io::stdout().write_all(stdout.as_bytes())?;
        }
        Ok(())
    }

    /// Like [`Borg::echo`], except that with `--progress` Borg gets the
    /// terminal.  Not under `--json`: an attached Borg would write to our
    /// stdout.
    fn perform(label: &str, args: &[String], inv: &Invocation<'_>) -> Result<(), ExecutionError> {
        if inv.request.progress && !inv.request.json {
            debug!("{}", display_command(args));
            return ui::run_interactive(args, &inv.env);
        }
        Self::echo(label, args, inv)
    }
}

impl Engine for Borg {
    fn init(&self, inv: &Invocation<'_>, repository: &str) -> Result<(), ExecutionError> {
        let Some(init) = &inv.request.init else {
            return Ok(());
        };
        let args = build_init_args(inv, repository, init);
        // `init` never takes --progress.
        Self::echo("Initializing", &args, inv)
    }

    fn prune(&self, inv: &Invocation<'_>, repository: &str) -> Result<(), ExecutionError> {
        let args = build_prune_args(inv, repository);
        Self::echo("Pruning", &args, inv)
    }

    fn create(
        &self,
        inv: &Invocation<'_>,
        repository: &str,
    ) -> Result<Option<String>, ExecutionError> {
        let args = build_create_args(inv, repository);
        if inv.request.json {
            return Self::capture("Creating archive", &args, inv).map(Some);
        }
        Self::perform("Creating archive", &args, inv).map(|()| None)
    }

    fn check(&self, inv: &Invocation<'_>, repository: &str) -> Result<(), ExecutionError> {
        let args = build_check_args(inv, repository);
        Self::echo("Checking", &args, inv)
    }

    fn extract(&self, inv: &Invocation<'_>, repository: &str) -> Result<(), ExecutionError> {
        let Some(extract) = &inv.request.extract else {
            return Ok(());
        };
        let args = build_extract_args(inv, repository, extract);
        Self::perform("Extracting", &args, inv)
    }

    fn list(&self, inv: &Invocation<'_>, repository: &str) -> Result<String, ExecutionError> {
        Self::capture("Listing", &build_list_args(inv, repository), inv)
    }

    fn info(&self, inv: &Invocation<'_>, repository: &str) -> Result<String, ExecutionError> {
        Self::capture("Gathering info", &build_info_args(inv, repository), inv)
    }
}
