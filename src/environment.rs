//! Engine-facing environment variables.
//!
//! Borg reads its passphrase and SSH command from the environment.  Rather
//! than mutating the process environment per configuration, an [`EngineEnv`]
//! is built once per configuration and applied to every child process.  Each
//! known variable is either set or explicitly removed, so nothing from the
//! parent shell or from a previous configuration leaks into the engine.

use std::process::Command;

use crate::config::StorageConfig;

/// Engine variables, in the order they are applied.
const VARIABLES: [&str; 3] = ["BORG_PASSCOMMAND", "BORG_PASSPHRASE", "BORG_RSH"];

/// The engine environment for one configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineEnv {
    passcommand: Option<String>,
    passphrase: Option<String>,
    rsh: Option<String>,
}

impl EngineEnv {
    /// Derive the environment from a `[storage]` section.
    pub fn from_storage(storage: &StorageConfig) -> Self {
        Self {
            passcommand: storage.encryption_passcommand.clone(),
            passphrase: storage.encryption_passphrase.clone(),
            rsh: storage.ssh_command.clone(),
        }
    }

    /// Every engine variable with its value, `None` meaning "unset".
    pub fn variables(&self) -> [(&'static str, Option<&str>); 3] {
        [
            (VARIABLES[0], self.passcommand.as_deref()),
            (VARIABLES[1], self.passphrase.as_deref()),
            (VARIABLES[2], self.rsh.as_deref()),
        ]
    }

    /// Set or clear each engine variable on `command`.
    pub fn apply(&self, command: &mut Command) {
        for (name, value) in self.variables() {
            match value {
                Some(value) => command.env(name, value),
                None => command.env_remove(name),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    fn envs_of(command: &Command) -> Vec<(String, Option<String>)> {
        command
            .get_envs()
            .map(|(k, v)| {
                (
                    k.to_string_lossy().into_owned(),
                    v.map(|v| v.to_string_lossy().into_owned()),
                )
            })
            .collect()
    }

    #[test]
    fn empty_storage_clears_every_variable() {
        let mut command = Command::new("true");
        EngineEnv::default().apply(&mut command);
        let envs = envs_of(&command);
        assert_eq!(envs.len(), 3);
        assert!(envs.iter().all(|(_, v)| v.is_none()));
    }

    #[test]
    fn storage_values_are_set() {
        let storage = StorageConfig {
            encryption_passphrase: Some("hunter2".into()),
            ssh_command: Some("ssh -i key".into()),
            ..StorageConfig::default()
        };
        let mut command = Command::new("true");
        EngineEnv::from_storage(&storage).apply(&mut command);

        let passphrase = command
            .get_envs()
            .find(|(k, _)| *k == OsStr::new("BORG_PASSPHRASE"))
            .and_then(|(_, v)| v);
        assert_eq!(passphrase, Some(OsStr::new("hunter2")));
        let passcommand = command
            .get_envs()
            .find(|(k, _)| *k == OsStr::new("BORG_PASSCOMMAND"))
            .map(|(_, v)| v);
        assert_eq!(passcommand, Some(None));
    }

    #[test]
    fn child_does_not_inherit_previous_configuration() {
        let first = EngineEnv::from_storage(&StorageConfig {
            encryption_passphrase: Some("first".into()),
            ..StorageConfig::default()
        });
        let second = EngineEnv::from_storage(&StorageConfig::default());

        let mut command = Command::new("sh");
        command.args(["-c", "printf %s \"${BORG_PASSPHRASE-unset}\""]);
        first.apply(&mut command);
        second.apply(&mut command);

        let out = command.output().unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout), "unset");
    }
}
