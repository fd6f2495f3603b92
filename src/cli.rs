//! Command-line interface definition.
//!
//! All argument parsing lives here so the rest of the codebase can stay
//! agnostic to `clap`.  `clap` only checks that each flag is well-formed; the
//! rules about which flags may be combined live in [`crate::request`], which
//! turns a [`Cli`] into a validated [`crate::request::ActionRequest`].

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Top-level CLI arguments.
///
/// If none of the action flags are given, borgmate defaults to: prune,
/// create, and check archives.
#[derive(Parser, Debug)]
#[command(
    name    = "borgmate",
    about   = "A simple wrapper for the Borg backup software that creates and prunes backups",
    version,
    // Show a compact two-column help layout.
    help_template = "\
{before-help}{name} {version}
{about}

{usage-heading} {usage}

{all-args}{after-help}"
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    // ── actions ───────────────────────────────────────────────────────────────
    /// Initialize an empty Borg repository.
    #[arg(short = 'I', long, help_heading = "Actions")]
    pub init: bool,

    /// Prune archives according to the retention policy.
    #[arg(short, long, help_heading = "Actions")]
    pub prune: bool,

    /// Create archives (actually perform backups).
    #[arg(short = 'C', long, help_heading = "Actions")]
    pub create: bool,

    /// Check archives for consistency.
    #[arg(short = 'k', long, help_heading = "Actions")]
    pub check: bool,

    /// Extract a named archive to the current directory.
    #[arg(short = 'x', long, help_heading = "Actions")]
    pub extract: bool,

    /// List archives.
    #[arg(short, long, help_heading = "Actions")]
    pub list: bool,

    /// Display summary information on archives.
    #[arg(short, long, help_heading = "Actions")]
    pub info: bool,

    // ── options for --init ────────────────────────────────────────────────────
    /// Borg repository encryption mode.
    #[arg(short, long = "encryption", value_enum, help_heading = "Options for --init")]
    pub encryption_mode: Option<EncryptionMode>,

    /// Create an append-only repository.
    #[arg(long, help_heading = "Options for --init")]
    pub append_only: bool,

    /// Create a repository with a fixed storage quota, e.g. `5G`.
    #[arg(long, help_heading = "Options for --init")]
    pub storage_quota: Option<String>,

    // ── options for --create / --extract ──────────────────────────────────────
    /// Display progress for each file as it is backed up or extracted.
    #[arg(long, help_heading = "Options for --create and --extract")]
    pub progress: bool,

    // ── options for --extract ─────────────────────────────────────────────────
    /// Path of repository to restore from, defaults to the configured
    /// repository if there is only one.
    #[arg(long, help_heading = "Options for --extract")]
    pub repository: Option<String>,

    /// Name of archive to restore.
    #[arg(long, help_heading = "Options for --extract")]
    pub archive: Option<String>,

    /// Paths to restore from archive, defaults to the entire archive.
    #[arg(long = "restore-path", num_args = 1.., help_heading = "Options for --extract")]
    pub restore_paths: Option<Vec<String>>,

    // ── common options ────────────────────────────────────────────────────────
    /// Configuration filenames or directories.
    ///
    /// Defaults to `/etc/borgmate/config.toml`, `/etc/borgmate.d` and
    /// `~/.config/borgmate/config.toml`.
    #[arg(short, long = "config", num_args = 1..)]
    pub config_paths: Option<Vec<PathBuf>>,

    /// Deprecated in favor of exclude_patterns within configuration.
    #[arg(long = "excludes", hide = true)]
    pub excludes_filename: Option<PathBuf>,

    /// Display statistics of archive with --create or --prune option.
    #[arg(long)]
    pub stats: bool,

    /// Output results from the --create, --list, or --info options as json.
    #[arg(long)]
    pub json: bool,

    /// Go through the motions, but do not actually write to any repositories.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Display verbose progress (1 for some, 2 for lots).
    #[arg(short, long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub verbosity: u8,
}

/// Encryption modes accepted by `borg init --encryption`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionMode {
    None,
    Authenticated,
    #[value(name = "authenticated-blake2")]
    AuthenticatedBlake2,
    Repokey,
    Keyfile,
    #[value(name = "repokey-blake2")]
    RepokeyBlake2,
    #[value(name = "keyfile-blake2")]
    KeyfileBlake2,
}

impl EncryptionMode {
    /// The spelling Borg expects on its command line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Authenticated => "authenticated",
            Self::AuthenticatedBlake2 => "authenticated-blake2",
            Self::Repokey => "repokey",
            Self::Keyfile => "keyfile",
            Self::RepokeyBlake2 => "repokey-blake2",
            Self::KeyfileBlake2 => "keyfile-blake2",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("borgmate").chain(extra.iter().copied()))
    }

    #[test]
    fn short_flags_map_to_actions() {
        let cli = parse(&["-I", "-p", "-C", "-k", "-x", "-l", "-i"]);
        assert!(cli.init && cli.prune && cli.create && cli.check);
        assert!(cli.extract && cli.list && cli.info);
    }

    #[test]
    fn encryption_mode_parses_hyphenated_names() {
        let cli = parse(&["--init", "-e", "repokey-blake2"]);
        assert_eq!(cli.encryption_mode, Some(EncryptionMode::RepokeyBlake2));
        assert_eq!(EncryptionMode::RepokeyBlake2.as_str(), "repokey-blake2");
    }

    #[test]
    fn restore_path_accepts_several_values() {
        let cli = parse(&["-x", "--archive", "a", "--restore-path", "etc", "home/alice"]);
        assert_eq!(
            cli.restore_paths,
            Some(vec!["etc".to_string(), "home/alice".to_string()])
        );
    }

    #[test]
    fn config_accepts_several_paths() {
        let cli = parse(&["-c", "/etc/a.toml", "/etc/b.d"]);
        assert_eq!(
            cli.config_paths,
            Some(vec![PathBuf::from("/etc/a.toml"), PathBuf::from("/etc/b.d")])
        );
    }

    #[test]
    fn verbosity_outside_range_is_rejected() {
        let result = Cli::try_parse_from(["borgmate", "--verbosity", "3"]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_encryption_mode_is_rejected() {
        let result = Cli::try_parse_from(["borgmate", "--init", "--encryption", "rot13"]);
        assert!(result.is_err());
    }
}
