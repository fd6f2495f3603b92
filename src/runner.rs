//! Borg argument construction.
//!
//! This module is responsible for *building* the argument lists that will be
//! passed to Borg.  It deliberately does **not** execute anything; process
//! execution lives in [`crate::ui`] and is driven by [`crate::engine`].
//!
//! Keeping arg-building separate from execution means every function here is
//! pure and trivially unit-testable without spawning any child processes.
//!
//! Every vector starts with the configured `local_path` followed by the Borg
//! subcommand.

use crate::{
    config::{Check, Config, expand_home},
    environment::EngineEnv,
    request::{ActionRequest, ExtractOptions, InitOptions},
};

// ─── Invocation context ───────────────────────────────────────────────────────

/// Everything an engine call needs besides the repository: the configuration
/// being run, the validated request, and that configuration's environment.
#[derive(Debug)]
pub struct Invocation<'a> {
    pub config: &'a Config,
    pub request: &'a ActionRequest,
    pub env: EngineEnv,
}

impl<'a> Invocation<'a> {
    /// Build the context for one configuration, with a fresh environment
    /// derived from its `[storage]` section.
    pub fn new(config: &'a Config, request: &'a ActionRequest) -> Self {
        Self {
            config,
            request,
            env: EngineEnv::from_storage(&config.storage),
        }
    }

    pub fn local_path(&self) -> &str {
        &self.config.location.local_path
    }

    pub fn remote_path(&self) -> Option<&str> {
        self.config.location.remote_path.as_deref()
    }
}

// ─── Shared flags ─────────────────────────────────────────────────────────────

/// `borg <subcommand>` using the configured executable.
fn borg_base(inv: &Invocation<'_>, subcommand: &str) -> Vec<String> {
    vec![inv.local_path().to_string(), subcommand.to_string()]
}

fn verbosity_flags(verbosity: u8) -> Vec<String> {
    match verbosity {
        0 => vec![],
        1 => vec!["--info".into()],
        _ => vec!["--debug".into(), "--show-rc".into()],
    }
}

fn remote_path_flags(inv: &Invocation<'_>) -> Vec<String> {
    inv.remote_path()
        .map(|p| vec!["--remote-path".into(), p.to_string()])
        .unwrap_or_default()
}

fn lock_wait_flags(inv: &Invocation<'_>) -> Vec<String> {
    inv.config
        .storage
        .lock_wait
        .map(|secs| vec!["--lock-wait".into(), secs.to_string()])
        .unwrap_or_default()
}

fn umask_flags(inv: &Invocation<'_>) -> Vec<String> {
    inv.config
        .storage
        .umask
        .as_ref()
        .map(|umask| vec!["--umask".into(), umask.clone()])
        .unwrap_or_default()
}

fn flag_if(condition: bool, flag: &str) -> Option<String> {
    condition.then(|| flag.to_string())
}

// ─── Per-action builders ──────────────────────────────────────────────────────

/// Arguments for `borg init`.
pub fn build_init_args(inv: &Invocation<'_>, repository: &str, init: &InitOptions) -> Vec<String> {
    let mut cmd = borg_base(inv, "init");
    cmd.extend([
        repository.to_string(),
        "--encryption".into(),
        init.encryption_mode.as_str().into(),
    ]);
    cmd.extend(flag_if(init.append_only, "--append-only"));
    if let Some(quota) = &init.storage_quota {
        cmd.extend(["--storage-quota".into(), quota.clone()]);
    }
    cmd.extend(remote_path_flags(inv));
    cmd.extend(verbosity_flags(inv.request.verbosity));
    cmd
}

/// Arguments for `borg prune`, one `--keep-*` flag per configured window.
pub fn build_prune_args(inv: &Invocation<'_>, repository: &str) -> Vec<String> {
    let r = &inv.config.retention;
    let mut cmd = borg_base(inv, "prune");
    cmd.push(repository.to_string());

    if let Some(within) = &r.keep_within {
        cmd.extend(["--keep-within".into(), within.clone()]);
    }
    let counts = [
        ("--keep-secondly", r.keep_secondly),
        ("--keep-minutely", r.keep_minutely),
        ("--keep-hourly", r.keep_hourly),
        ("--keep-daily", r.keep_daily),
        ("--keep-weekly", r.keep_weekly),
        ("--keep-monthly", r.keep_monthly),
        ("--keep-yearly", r.keep_yearly),
    ];
    for (flag, count) in counts {
        if let Some(count) = count {
            cmd.extend([flag.into(), count.to_string()]);
        }
    }
    cmd.extend(["--prefix".into(), r.prefix.clone()]);

    cmd.extend(remote_path_flags(inv));
    cmd.extend(umask_flags(inv));
    cmd.extend(lock_wait_flags(inv));
    cmd.extend(flag_if(inv.request.stats, "--stats"));
    let verbosity = inv.request.verbosity;
    cmd.extend(verbosity_flags(verbosity));
    cmd.extend(flag_if(verbosity > 0, "--list"));
    cmd.extend(flag_if(inv.request.dry_run, "--dry-run"));
    cmd
}

/// Arguments for `borg create … REPO::NAME SOURCE…`.
pub fn build_create_args(inv: &Invocation<'_>, repository: &str) -> Vec<String> {
    let location = &inv.config.location;
    let storage = &inv.config.storage;
    let request = inv.request;
    let mut cmd = borg_base(inv, "create");

    for pattern in &location.exclude_patterns {
        cmd.extend(["--exclude".into(), pattern.clone()]);
    }
    for file in &location.exclude_from {
        cmd.extend(["--exclude-from".into(), expand_home(file)]);
    }
    cmd.extend(flag_if(location.exclude_caches, "--exclude-caches"));
    if let Some(marker) = &location.exclude_if_present {
        cmd.extend(["--exclude-if-present".into(), marker.clone()]);
    }
    if let Some(interval) = storage.checkpoint_interval {
        cmd.extend(["--checkpoint-interval".into(), interval.to_string()]);
    }
    if let Some(params) = &storage.chunker_params {
        cmd.extend(["--chunker-params".into(), params.clone()]);
    }
    if let Some(compression) = &storage.compression {
        cmd.extend(["--compression".into(), compression.clone()]);
    }
    if let Some(limit) = storage.remote_rate_limit {
        cmd.extend(["--remote-ratelimit".into(), limit.to_string()]);
    }
    cmd.extend(flag_if(location.one_file_system, "--one-file-system"));
    cmd.extend(flag_if(location.read_special, "--read-special"));
    cmd.extend(flag_if(!location.bsd_flags, "--nobsdflags"));
    cmd.extend(umask_flags(inv));
    cmd.extend(lock_wait_flags(inv));
    cmd.extend(remote_path_flags(inv));

    // File listings and human-readable stats would corrupt JSON output.
    cmd.extend(verbosity_flags(request.verbosity));
    if request.verbosity > 0 && !request.json {
        cmd.extend(["--list", "--filter", "AME-"].map(String::from));
    }
    cmd.extend(flag_if(request.stats && !request.json, "--stats"));
    cmd.extend(flag_if(request.dry_run, "--dry-run"));
    cmd.extend(flag_if(request.progress, "--progress"));
    cmd.extend(flag_if(request.json, "--json"));

    cmd.push(format!("{repository}::{}", storage.archive_name_format));
    cmd.extend(location.source_directories.iter().map(|s| expand_home(s)));
    cmd
}

/// Arguments for `borg check`.
///
/// Both checks enabled means no restricting flag; `--last` and `--prefix`
/// only apply when archives are checked.
pub fn build_check_args(inv: &Invocation<'_>, repository: &str) -> Vec<String> {
    let c = &inv.config.consistency;
    let repository_check = c.checks.contains(&Check::Repository);
    let archives_check = c.checks.contains(&Check::Archives);

    let mut cmd = borg_base(inv, "check");
    cmd.push(repository.to_string());
    match (repository_check, archives_check) {
        (true, false) => cmd.push("--repository-only".into()),
        (false, true) => cmd.push("--archives-only".into()),
        _ => {},
    }
    if archives_check {
        if let Some(last) = c.check_last {
            cmd.extend(["--last".into(), last.to_string()]);
        }
        cmd.extend(["--prefix".into(), c.prefix.clone()]);
    }
    cmd.extend(remote_path_flags(inv));
    cmd.extend(lock_wait_flags(inv));
    cmd.extend(verbosity_flags(inv.request.verbosity));
    cmd
}

/// Arguments for `borg extract … REPO::ARCHIVE [PATH…]`.
pub fn build_extract_args(
    inv: &Invocation<'_>,
    repository: &str,
    extract: &ExtractOptions,
) -> Vec<String> {
    let mut cmd = borg_base(inv, "extract");
    cmd.extend(remote_path_flags(inv));
    cmd.extend(lock_wait_flags(inv));
    cmd.extend(verbosity_flags(inv.request.verbosity));
    cmd.extend(flag_if(inv.request.dry_run, "--dry-run"));
    cmd.extend(flag_if(inv.request.progress, "--progress"));
    cmd.push(format!("{repository}::{}", extract.archive));
    cmd.extend(extract.restore_paths.iter().cloned());
    cmd
}

/// Arguments for `borg list`.
pub fn build_list_args(inv: &Invocation<'_>, repository: &str) -> Vec<String> {
    build_report_args(inv, "list", repository)
}

/// Arguments for `borg info`.
pub fn build_info_args(inv: &Invocation<'_>, repository: &str) -> Vec<String> {
    build_report_args(inv, "info", repository)
}

fn build_report_args(inv: &Invocation<'_>, subcommand: &str, repository: &str) -> Vec<String> {
    let mut cmd = borg_base(inv, subcommand);
    cmd.push(repository.to_string());
    cmd.extend(remote_path_flags(inv));
    cmd.extend(lock_wait_flags(inv));
    cmd.extend(verbosity_flags(inv.request.verbosity));
    cmd.extend(flag_if(inv.request.json, "--json"));
    cmd
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::Parser;

    use super::*;
    use crate::{cli::Cli, config::parse_configuration_str};

    const CONFIG: &str = r#"
        [location]
        source_directories = ["/home/alice", "/etc"]
        repositories       = ["/mnt/backup.borg"]
        exclude_patterns   = ["*.pyc", "/home/*/.cache"]
        exclude_caches     = true

        [storage]
        compression = "lz4"
        lock_wait   = 5

        [retention]
        keep_daily   = 7
        keep_weekly  = 4
        keep_monthly = 6
    "#;

    fn make_cfg(extra: &str) -> Config {
        parse_configuration_str(Path::new("test.toml"), &format!("{CONFIG}\n{extra}")).unwrap()
    }

    fn make_request(extra: &[&str]) -> ActionRequest {
        let cli = Cli::parse_from(std::iter::once("borgmate").chain(extra.iter().copied()));
        ActionRequest::from_cli(&cli).unwrap()
    }

    // ── shared flags ──────────────────────────────────────────────────────────

    #[test]
    fn local_path_is_the_program() {
        let mut cfg = make_cfg("");
        cfg.location.local_path = "/opt/borg1".into();
        let req = make_request(&[]);
        let args = build_list_args(&Invocation::new(&cfg, &req), "/r");
        assert_eq!(args[0], "/opt/borg1");
        assert_eq!(args[1], "list");
    }

    #[test]
    fn remote_path_is_forwarded() {
        let mut cfg = make_cfg("");
        cfg.location.remote_path = Some("borg1".into());
        let req = make_request(&["--list"]);
        let args = build_list_args(&Invocation::new(&cfg, &req), "/r");
        let idx = args.iter().position(|a| a == "--remote-path").unwrap();
        assert_eq!(args[idx + 1], "borg1");
    }

    #[test]
    fn verbosity_maps_to_borg_log_levels() {
        assert!(verbosity_flags(0).is_empty());
        assert_eq!(verbosity_flags(1), vec!["--info"]);
        assert_eq!(verbosity_flags(2), vec!["--debug", "--show-rc"]);
    }

    // ── prune ─────────────────────────────────────────────────────────────────

    #[test]
    fn prune_args_have_configured_retention_only() {
        let cfg = make_cfg("");
        let req = make_request(&[]);
        let args = build_prune_args(&Invocation::new(&cfg, &req), "/r");
        let d = args.iter().position(|a| a == "--keep-daily").unwrap();
        assert_eq!(args[d + 1], "7");
        assert!(!args.contains(&"--keep-yearly".to_string()));
    }

    #[test]
    fn prune_args_pass_dry_run_and_stats() {
        let cfg = make_cfg("");
        let req = make_request(&["--prune", "--stats", "--dry-run"]);
        let args = build_prune_args(&Invocation::new(&cfg, &req), "/r");
        assert!(args.contains(&"--stats".to_string()));
        assert_eq!(args.last().unwrap(), "--dry-run");
    }

    // ── create ────────────────────────────────────────────────────────────────

    #[test]
    fn create_args_end_with_archive_and_sources() {
        let cfg = make_cfg("");
        let req = make_request(&["--create"]);
        let args = build_create_args(&Invocation::new(&cfg, &req), "/r");
        let n = args.len();
        assert_eq!(args[n - 3], "/r::{hostname}-{now:%Y-%m-%dT%H:%M:%S.%f}");
        assert_eq!(args[n - 2], "/home/alice");
        assert_eq!(args[n - 1], "/etc");
    }

    #[test]
    fn create_args_keep_exclude_order() {
        let cfg = make_cfg("");
        let req = make_request(&["--create"]);
        let args = build_create_args(&Invocation::new(&cfg, &req), "/r");
        let excludes: Vec<_> = args
            .windows(2)
            .filter(|w| w[0] == "--exclude")
            .map(|w| w[1].as_str())
            .collect();
        assert_eq!(excludes, vec!["*.pyc", "/home/*/.cache"]);
    }

    #[test]
    fn create_json_suppresses_listing_and_stats() {
        let cfg = make_cfg("");
        let req = make_request(&["--create", "--json", "--stats", "-v", "1"]);
        let args = build_create_args(&Invocation::new(&cfg, &req), "/r");
        assert!(args.contains(&"--json".to_string()));
        assert!(!args.contains(&"--stats".to_string()));
        assert!(!args.contains(&"--list".to_string()));
    }

    #[test]
    fn create_bsd_flags_off_adds_nobsdflags() {
        let mut cfg = make_cfg("");
        cfg.location.bsd_flags = false;
        let req = make_request(&["--create"]);
        let args = build_create_args(&Invocation::new(&cfg, &req), "/r");
        assert!(args.contains(&"--nobsdflags".to_string()));
    }

    // ── check ─────────────────────────────────────────────────────────────────

    #[test]
    fn check_both_kinds_has_no_restriction() {
        let cfg = make_cfg("");
        let req = make_request(&[]);
        let args = build_check_args(&Invocation::new(&cfg, &req), "/r");
        assert!(!args.contains(&"--repository-only".to_string()));
        assert!(!args.contains(&"--archives-only".to_string()));
    }

    #[test]
    fn check_repository_only_ignores_last_and_prefix() {
        let cfg = make_cfg("[consistency]\nchecks = [\"repository\"]\ncheck_last = 3\n");
        let req = make_request(&["--check"]);
        let args = build_check_args(&Invocation::new(&cfg, &req), "/r");
        assert!(args.contains(&"--repository-only".to_string()));
        assert!(!args.contains(&"--last".to_string()));
        assert!(!args.contains(&"--prefix".to_string()));
    }

    #[test]
    fn check_archives_only_passes_last() {
        let cfg = make_cfg("[consistency]\nchecks = [\"archives\"]\ncheck_last = 3\n");
        let req = make_request(&["--check"]);
        let args = build_check_args(&Invocation::new(&cfg, &req), "/r");
        assert!(args.contains(&"--archives-only".to_string()));
        let idx = args.iter().position(|a| a == "--last").unwrap();
        assert_eq!(args[idx + 1], "3");
    }

    // ── list / info ───────────────────────────────────────────────────────────

    #[test]
    fn info_args_with_json() {
        let cfg = make_cfg("");
        let req = make_request(&["--info", "--json"]);
        let args = build_info_args(&Invocation::new(&cfg, &req), "/r");
        assert_eq!(args, vec!["borg", "info", "/r", "--lock-wait", "5", "--json"]);
    }

    // ── insta snapshots ───────────────────────────────────────────────────────
    // These lock down the exact argument vectors so any unintended change is
    // immediately visible in the diff.

    #[test]
    fn snapshot_init_args() {
        let cfg = make_cfg("");
        let req = make_request(&["-I", "-e", "repokey", "--append-only", "--storage-quota", "5G"]);
        let init = req.init.clone().unwrap();
        insta::assert_debug_snapshot!(build_init_args(&Invocation::new(&cfg, &req), "/r", &init), @r#"
        [
            "borg",
            "init",
            "/r",
            "--encryption",
            "repokey",
            "--append-only",
            "--storage-quota",
            "5G",
        ]
        "#);
    }

    #[test]
    fn snapshot_prune_args_default() {
        let cfg = make_cfg("");
        let req = make_request(&[]);
        insta::assert_debug_snapshot!(build_prune_args(&Invocation::new(&cfg, &req), "/r"), @r#"
        [
            "borg",
            "prune",
            "/r",
            "--keep-daily",
            "7",
            "--keep-weekly",
            "4",
            "--keep-monthly",
            "6",
            "--prefix",
            "{hostname}-",
            "--lock-wait",
            "5",
        ]
        "#);
    }

    #[test]
    fn snapshot_create_args_default() {
        let cfg = make_cfg("");
        let req = make_request(&[]);
        insta::assert_debug_snapshot!(build_create_args(&Invocation::new(&cfg, &req), "/r"), @r#"
        [
            "borg",
            "create",
            "--exclude",
            "*.pyc",
            "--exclude",
            "/home/*/.cache",
            "--exclude-caches",
            "--compression",
            "lz4",
            "--lock-wait",
            "5",
            "/r::{hostname}-{now:%Y-%m-%dT%H:%M:%S.%f}",
            "/home/alice",
            "/etc",
        ]
        "#);
    }

    #[test]
    fn snapshot_extract_args() {
        let cfg = make_cfg("");
        let req = make_request(&[
            "-x",
            "--archive",
            "host-2019-01-01",
            "--restore-path",
            "etc/hosts",
            "--progress",
        ]);
        let extract = req.extract.clone().unwrap();
        insta::assert_debug_snapshot!(build_extract_args(&Invocation::new(&cfg, &req), "/r", &extract), @r#"
        [
            "borg",
            "extract",
            "--lock-wait",
            "5",
            "--progress",
            "/r::host-2019-01-01",
            "etc/hosts",
        ]
        "#);
    }

    #[test]
    fn snapshot_list_args_verbose() {
        let cfg = make_cfg("");
        let req = make_request(&["--list", "-v", "2"]);
        insta::assert_debug_snapshot!(build_list_args(&Invocation::new(&cfg, &req), "/r"), @r#"
        [
            "borg",
            "list",
            "/r",
            "--lock-wait",
            "5",
            "--debug",
            "--show-rc",
        ]
        "#);
    }
}
