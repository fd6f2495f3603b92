//! Running one configuration against all of its repositories.
//!
//! # Per-repository action order
//!
//! | # | Action  | Runs when                                                    |
//! |---|---------|--------------------------------------------------------------|
//! | 1 | init    | `--init`                                                     |
//! | 2 | prune   | `--prune` (or no action flags)                               |
//! | 3 | create  | `--create` (or no action flags)                              |
//! | 4 | check   | `--check` (or no action flags) and the repository is checked |
//! | 5 | extract | `--extract` and `--repository` is absent or names this repo  |
//! | 6 | list    | `--list`                                                     |
//! | 7 | info    | `--info`                                                     |
//!
//! When `--create` is active the repository loop is wrapped in the
//! `before_backup` / `after_backup` hooks.  A failure anywhere in that span
//! fires `on_error` once and is then returned unchanged; repositories after
//! the failing one are not attempted.

use std::{io::Write, path::Path};

use serde_json::Value;
use tracing::{error, info};

use crate::{
    config::{Config, expand_home},
    engine::Engine,
    error::ExecutionError,
    hooks::{LifecyclePoint, execute_hook},
    request::ActionRequest,
    runner::Invocation,
};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Run every enabled action of `request` against every repository of
/// `config`, wrapped in the configuration's hooks.
///
/// Raw text from list/info goes to `out`.  Under `--json`, the documents
/// produced by create/list/info are returned instead, in repository order.
pub fn run_configuration(
    config_filename: &Path,
    config: &Config,
    request: &ActionRequest,
    engine: &dyn Engine,
    out: &mut dyn Write,
) -> Result<Vec<Value>, ExecutionError> {
    // Built fresh for every configuration so no engine variable carries over.
    let inv = Invocation::new(config, request);
    let hooks = &config.hooks;

    let result = run_hooked(config_filename, &inv, engine, out);

    match result {
        Ok(json_results) => Ok(json_results),
        Err(err) if err.triggers_error_hook() => {
            if let Err(hook_err) = execute_hook(
                hooks.on_error.as_deref(),
                config_filename,
                LifecyclePoint::OnError,
                &inv.env,
            ) {
                error!(
                    "{}: Error running {} hook: {hook_err}",
                    config_filename.display(),
                    LifecyclePoint::OnError
                );
            }
            Err(err)
        },
        Err(err) => Err(err),
    }
}

fn run_hooked(
    config_filename: &Path,
    inv: &Invocation<'_>,
    engine: &dyn Engine,
    out: &mut dyn Write,
) -> Result<Vec<Value>, ExecutionError> {
    let hooks = &inv.config.hooks;
    let create = inv.request.actions.create;

    if create {
        execute_hook(
            hooks.before_backup.as_deref(),
            config_filename,
            LifecyclePoint::BeforeBackup,
            &inv.env,
        )?;
    }

    let mut json_results = Vec::new();
    for repository in &inv.config.location.repositories {
        run_commands_on_repository(inv, repository, engine, &mut json_results, out)?;
    }

    if create {
        execute_hook(
            hooks.after_backup.as_deref(),
            config_filename,
            LifecyclePoint::AfterBackup,
            &inv.env,
        )?;
    }

    Ok(json_results)
}

// ─── Repository ───────────────────────────────────────────────────────────────

/// Run the enabled actions against one repository, in the fixed order.
///
/// Stops at the first failing action.
pub fn run_commands_on_repository(
    inv: &Invocation<'_>,
    unexpanded_repository: &str,
    engine: &dyn Engine,
    json_results: &mut Vec<Value>,
    out: &mut dyn Write,
) -> Result<(), ExecutionError> {
    let repository = expand_home(unexpanded_repository);
    let repository = repository.as_str();
    let request = inv.request;
    let actions = request.actions;
    let dry_run_label = if request.dry_run {
        " (dry run; not making any changes)"
    } else {
        ""
    };

    if actions.init {
        info!("{repository}: Initializing repository");
        engine.init(inv, repository)?;
    }
    if actions.prune {
        info!("{repository}: Pruning archives{dry_run_label}");
        engine.prune(inv, repository)?;
    }
    if actions.create {
        info!("{repository}: Creating archive{dry_run_label}");
        if let Some(output) = engine.create(inv, repository)? {
            json_results.push(parse_json(repository, &output)?);
        }
    }
    if actions.check && inv.config.consistency.repository_enabled_for_checks(repository) {
        info!("{repository}: Running consistency checks");
        engine.check(inv, repository)?;
    }
    if let Some(extract) = &request.extract {
        let selected = extract
            .repository
            .as_deref()
            .is_none_or(|wanted| expand_home(wanted) == repository);
        if selected {
            info!(
                "{repository}: Extracting archive {}{dry_run_label}",
                extract.archive
            );
            engine.extract(inv, repository)?;
        }
    }
    if actions.list {
        info!("{repository}: Listing archives");
        let output = engine.list(inv, repository)?;
        emit(repository, &output, request, json_results, out)?;
    }
    if actions.info {
        info!("{repository}: Displaying summary info for archives");
        let output = engine.info(inv, repository)?;
        emit(repository, &output, request, json_results, out)?;
    }

    Ok(())
}

/// Route list/info output: parsed into the accumulator under `--json`,
/// written verbatim otherwise.
fn emit(
    repository: &str,
    output: &str,
    request: &ActionRequest,
    json_results: &mut Vec<Value>,
    out: &mut dyn Write,
) -> Result<(), ExecutionError> {
    if request.json {
        json_results.push(parse_json(repository, output)?);
    } else {
        out.write_all(output.as_bytes())?;
    }
    Ok(())
}

fn parse_json(repository: &str, output: &str) -> Result<Value, ExecutionError> {
    serde_json::from_str(output).map_err(|source| ExecutionError::InvalidJson {
        repository: repository.to_string(),
        source,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────
