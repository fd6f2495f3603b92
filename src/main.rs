//! `borgmate`: run Borg backups described by one or more config files.
//!
//! # Overview
//!
//! Each configuration file names source directories, repositories, a
//! retention policy, consistency checks, and hooks.  A run goes through every
//! configuration file in turn and, for each of its repositories, invokes Borg
//! for the requested actions.  A failing file is reported and the rest still
//! run; the exit code reflects whether anything failed.
//!
//! # Usage
//!
//! ```text
//! borgmate                          # prune, create and check every repository
//! borgmate -c /etc/borgmate.d       # use a directory of *.toml files
//! borgmate --list --json            # one JSON array covering every repository
//! borgmate -x --archive host-2024   # restore an archive into the current directory
//! borgmate -I -e repokey            # initialize the repositories
//! ```
//!
//! # Module layout
//!
//! | Module                   | Responsibility                                |
//! |--------------------------|-----------------------------------------------|
//! | [`cli`]                  | Argument types parsed by clap                 |
//! | [`request`]              | Flag validation into an `ActionRequest`       |
//! | [`collect`]              | Configuration file discovery                  |
//! | [`config`]               | `Config` structs, TOML loader, repo guard     |
//! | [`environment`]          | Per-configuration Borg environment variables  |
//! | [`runner`]               | Borg argument construction                    |
//! | [`ui`]                   | Spinner, captured execution, failure replay   |
//! | [`engine`]               | The `Engine` trait and the real `Borg`        |
//! | [`hooks`]                | before/after/on-error shell hooks             |
//! | [`commands::run`]        | One configuration across its repositories     |
//! | [`commands::summary`]    | Every configuration, summarised               |
//! | [`error`]                | Typed errors                                  |

mod cli;
mod collect;
mod commands;
mod config;
mod engine;
mod environment;
mod error;
mod hooks;
mod request;
mod runner;
mod ui;

use std::{io, process::ExitCode};

use clap::Parser;
use cli::Cli;
use commands::summary::collect_configuration_run_summary_logs;
use engine::Borg;
use request::ActionRequest;
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const HELP_LINK: &str = "Need some help? https://torsion.org/borgmatic/#issues";

fn main() -> ExitCode {
    let cli = Cli::parse();

    let request = match ActionRequest::from_cli(&cli) {
        Ok(request) => request,
        Err(err) => {
            init_logging(0);
            error!("{err}");
            return failure();
        },
    };

    init_logging(request.verbosity);

    let default_paths = collect::default_config_paths();
    let searched_paths = request
        .config_paths
        .clone()
        .unwrap_or_else(|| default_paths.clone());
    let config_filenames = match collect::collect_config_filenames(&searched_paths, &default_paths)
    {
        Ok(filenames) => filenames,
        Err(err) => {
            error!("{err:#}");
            return failure();
        },
    };

    let summary = collect_configuration_run_summary_logs(
        &config_filenames,
        &searched_paths,
        &request,
        &Borg,
        &mut io::stdout(),
    );

    if request.json {
        println!("{}", Value::Array(summary.json_results.clone()));
    }

    info!("");
    info!("summary:");
    for record in &summary.records {
        record.emit();
    }

    if summary.has_critical() {
        return failure();
    }
    ExitCode::SUCCESS
}

/// Log records go to stderr as bare messages so stdout stays free for
/// list/info output and JSON.
///
/// `RUST_LOG` overrides the level picked by `--verbosity`.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(false)
        .without_time()
        .init();
}

fn failure() -> ExitCode {
    error!("");
    error!("{HELP_LINK}");
    ExitCode::FAILURE
}
