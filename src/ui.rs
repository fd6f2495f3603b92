//! Terminal UI: spinners, captured command output, and failure replay.
//!
//! # Design goals
//!
//! - **Clean by default.** While Borg runs the user sees only a spinner and a short label. Output
//!   is captured and shown once the command finishes.
//! - **Informative on failure.** If a command exits non-zero its captured stdout is replayed and
//!   its stderr becomes part of the returned [`ExecutionError`], which ends up in the run summary.
//! - **Interactive when asked.** `--progress` needs Borg to own the terminal, so
//!   [`run_interactive`] inherits stdio and shows no spinner.
//!
//! Every entry point takes the configuration's [`EngineEnv`]; nothing here
//! reads or writes the process environment.

use std::{
    io::{self, Write},
    process::{Command, Output, Stdio},
    time::Duration,
};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{environment::EngineEnv, error::ExecutionError};

// ─── Icons ───────────────────────────────────────────────────────────────────

/// Braille spinner frames, as in indicatif's default.
static SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Red ✗, printed when a stage fails.
fn icon_err() -> console::StyledObject<&'static str> {
    style("✗").red().bold()
}

// ─── Captured output ─────────────────────────────────────────────────────────

/// What a finished command left behind.
#[derive(Debug)]
pub struct Captured {
    /// Whether the command exited zero.
    pub success: bool,
    /// Exit code, `None` when killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    fn from_output(output: &Output) -> Self {
        Self {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Render an argument vector the way it would be typed.
pub fn display_command(args: &[String]) -> String {
    args.join(" ")
}

fn build_command(args: &[String], env: &EngineEnv) -> Result<Command, ExecutionError> {
    let (prog, rest) = args.split_first().ok_or_else(|| ExecutionError::Spawn {
        command: String::new(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "cannot run an empty command"),
    })?;
    let mut command = Command::new(prog);
    command.args(rest);
    env.apply(&mut command);
    Ok(command)
}

// ─── Spinner ──────────────────────────────────────────────────────────────────

/// Create and start an indeterminate spinner for `label`.
///
/// indicatif draws to stderr and stays hidden when stderr is not a terminal,
/// so cron runs and piped output are unaffected.
fn make_spinner(label: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let template = ProgressStyle::with_template("  {spinner:.cyan}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(template.tick_chars(SPINNER_CHARS));
    pb.set_message(format!("{}", style(label).dim()));
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ─── Execution ────────────────────────────────────────────────────────────────

/// Run a command, capturing both stdout and stderr.
///
/// A non-zero exit is *not* an error here; see [`run_stage`] for that.
pub fn run_captured(args: &[String], env: &EngineEnv) -> Result<Captured, ExecutionError> {
    let output = build_command(args, env)?
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| ExecutionError::Spawn {
            command: display_command(args),
            source,
        })?;

    Ok(Captured::from_output(&output))
}

/// Run one engine stage behind a spinner and return its stdout.
///
/// On success, anything the command wrote to stderr (Borg's `--stats` and
/// `--list` output, warnings) is echoed to our stderr.  On failure, captured
/// stdout is replayed and the stderr is carried by the returned error.
pub fn run_stage(label: &str, args: &[String], env: &EngineEnv) -> Result<String, ExecutionError> {
    let spinner = make_spinner(label);
    let result = run_captured(args, env);
    spinner.finish_and_clear();

    let captured = result?;
    if captured.success {
        if !captured.stderr.is_empty() {
            io::stderr().write_all(captured.stderr.as_bytes())?;
        }
        return Ok(captured.stdout);
    }

    eprintln!("  {}  {}", icon_err(), style(label).bold());
    if !captured.stdout.is_empty() {
        eprintln!("  {} stdout:", style("►").dim());
        for line in captured.stdout.lines() {
            eprintln!("    {line}");
        }
    }

    Err(ExecutionError::Process {
        command: display_command(args),
        code: captured.code,
        stderr: captured.stderr,
    })
}

/// Run a command attached to the terminal (for `--progress` and hooks).
pub fn run_interactive(args: &[String], env: &EngineEnv) -> Result<(), ExecutionError> {
    let status = build_command(args, env)?
        .status()
        .map_err(|source| ExecutionError::Spawn {
            command: display_command(args),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(ExecutionError::Process {
            command: display_command(args),
            code: status.code(),
            stderr: String::new(),
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
