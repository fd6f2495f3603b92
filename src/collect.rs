//! Configuration file discovery.
//!
//! Turns the `--config` arguments (or the built-in defaults) into an ordered
//! list of files to parse.  A directory stands for every `*.toml` file inside
//! it, sorted by name; anything else is passed through as is so that a
//! missing explicit path is reported by the parser rather than dropped.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

/// Extension a file must have to be picked up from a configuration directory.
const CONFIG_EXTENSION: &str = "toml";

/// Where configuration is looked for when `--config` is not given, in order:
///
/// 1. `/etc/borgmate/config.toml`
/// 2. `/etc/borgmate.d`
/// 3. `<user config dir>/borgmate/config.toml` (e.g. `~/.config/borgmate/config.toml`)
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("/etc/borgmate/config.toml"),
        PathBuf::from("/etc/borgmate.d"),
    ];
    if let Some(dir) = dirs_next::config_dir() {
        paths.push(dir.join("borgmate").join("config.toml"));
    }
    paths
}

/// Expand `config_paths` into the configuration files to run, in order.
///
/// `default_paths` are allowed to be missing: a default path that does not
/// exist is silently skipped.  A path that exists and is a directory expands
/// to its `*.toml` entries (subdirectories are ignored).
pub fn collect_config_filenames(
    config_paths: &[PathBuf],
    default_paths: &[PathBuf],
) -> Result<Vec<PathBuf>> {
    let mut filenames = Vec::new();

    for path in config_paths {
        let exists = path.exists();
        if !exists && default_paths.contains(path) {
            continue;
        }
        if !exists || !path.is_dir() {
            filenames.push(path.clone());
            continue;
        }
        filenames.extend(config_files_in(path)?);
    }

    Ok(filenames)
}

fn config_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry
            .with_context(|| format!("reading {}", dir.display()))?
            .path();
        let is_config = path.extension().is_some_and(|ext| ext == CONFIG_EXTENSION);
        if is_config && !path.is_dir() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn default_paths_cover_system_and_user_locations() {
        let paths = default_config_paths();
        assert_eq!(paths[0], PathBuf::from("/etc/borgmate/config.toml"));
        assert_eq!(paths[1], PathBuf::from("/etc/borgmate.d"));
        assert!(paths.len() <= 3);
    }

    #[test]
    fn missing_default_path_is_skipped() {
        let missing = PathBuf::from("/tmp/borgmate-missing-default-xyz/config.toml");
        let found = collect_config_filenames(&[missing.clone()], &[missing]).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn missing_explicit_path_is_kept() {
        let missing = PathBuf::from("/tmp/borgmate-missing-explicit-xyz.toml");
        let found = collect_config_filenames(&[missing.clone()], &[]).unwrap();
        assert_eq!(found, vec![missing]);
    }

    #[test]
    fn file_path_is_kept_regardless_of_extension() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.conf");
        fs::write(&file, "").unwrap();
        let found = collect_config_filenames(&[file.clone()], &[]).unwrap();
        assert_eq!(found, vec![file]);
    }

    #[test]
    fn directory_expands_to_sorted_toml_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.toml"), "").unwrap();
        fs::write(dir.path().join("a.toml"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested.toml")).unwrap();

        let found = collect_config_filenames(&[dir.path().to_path_buf()], &[]).unwrap();
        assert_eq!(found, vec![dir.path().join("a.toml"), dir.path().join("b.toml")]);
    }

    #[test]
    fn order_of_arguments_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("z.toml");
        let second = dir.path().join("a.toml");
        fs::write(&first, "").unwrap();
        fs::write(&second, "").unwrap();

        let found = collect_config_filenames(&[first.clone(), second.clone()], &[]).unwrap();
        assert_eq!(found, vec![first, second]);
    }
}
