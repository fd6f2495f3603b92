//! Lifecycle hooks: shell commands configured under `[hooks]`.

use std::{fmt, path::Path};

use tracing::{debug, info};

use crate::{environment::EngineEnv, error::ExecutionError, ui};

/// The moments at which a configuration's hooks may fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePoint {
    BeforeBackup,
    AfterBackup,
    OnError,
}

impl fmt::Display for LifecyclePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BeforeBackup => "pre-backup",
            Self::AfterBackup => "post-backup",
            Self::OnError => "on-error",
        })
    }
}

/// Run the commands of one hook, in order, through `sh -c`.
///
/// An absent or empty hook does nothing.  The first command that fails to
/// start or exits non-zero stops the hook and its error is returned; the
/// remaining commands are not run.
pub fn execute_hook(
    commands: Option<&[String]>,
    config_filename: &Path,
    point: LifecyclePoint,
    env: &EngineEnv,
) -> Result<(), ExecutionError> {
    let commands = match commands {
        Some(commands) if !commands.is_empty() => commands,
        _ => {
            debug!(
                "{}: No commands to run for {point} hook",
                config_filename.display()
            );
            return Ok(());
        },
    };

    if commands.len() == 1 {
        info!("{}: Running command for {point} hook", config_filename.display());
    } else {
        info!(
            "{}: Running {} commands for {point} hook",
            config_filename.display(),
            commands.len()
        );
    }

    for command in commands {
        debug!("{}: Hook command: {command}", config_filename.display());
        ui::run_interactive(&["sh".into(), "-c".into(), command.clone()], env)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn cmds(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| (*c).to_string()).collect()
    }

    #[test]
    fn lifecycle_point_labels() {
        assert_eq!(LifecyclePoint::BeforeBackup.to_string(), "pre-backup");
        assert_eq!(LifecyclePoint::AfterBackup.to_string(), "post-backup");
        assert_eq!(LifecyclePoint::OnError.to_string(), "on-error");
    }

    #[test]
    fn absent_hook_is_noop() {
        let result = execute_hook(
            None,
            Path::new("c.toml"),
            LifecyclePoint::BeforeBackup,
            &EngineEnv::default(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn empty_hook_is_noop() {
        let result = execute_hook(
            Some(&[][..]),
            Path::new("c.toml"),
            LifecyclePoint::AfterBackup,
            &EngineEnv::default(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn commands_run_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log");
        let commands = cmds(&[
            &format!("echo one >> {}", log.display()),
            &format!("echo two >> {}", log.display()),
        ]);
        execute_hook(
            Some(commands.as_slice()),
            Path::new("c.toml"),
            LifecyclePoint::BeforeBackup,
            &EngineEnv::default(),
        )
        .unwrap();
        assert_eq!(fs::read_to_string(&log).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn failing_command_aborts_remaining() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("should-not-exist");
        let commands = cmds(&["exit 7", &format!("touch {}", marker.display())]);
        let err = execute_hook(
            Some(commands.as_slice()),
            Path::new("c.toml"),
            LifecyclePoint::OnError,
            &EngineEnv::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ExecutionError::Process { code: Some(7), .. }));
        assert!(!marker.exists());
    }
}
