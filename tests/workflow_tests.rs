//! End-to-end tests of the backup workflow without running mksquashfs.
//!
//! Everything here is a dry run or stops before spawning the archiver.

mod helpers;

use chrono::NaiveDate;
use helpers::{snapshot, TestEnv};
use squash_backup::backup::{run_job, ArchiveJob, JobOutcome, JobRequest};
use squash_backup::cli::{normalize_args, Cli};
use squash_backup::command::{build_command, BuildOptions, CompressionSettings};
use squash_backup::error::BackupError;
use squash_backup::targets::TargetRegistry;
use squash_backup::verify::{SystemMounter, Verifier};
use std::fs;
use std::path::Path;

use clap::Parser;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
}

fn verifier(env: &TestEnv) -> Verifier<SystemMounter> {
    Verifier::new(SystemMounter { privileged: false }, &env.mount_root)
}

fn job_from_args(env: &TestEnv, args: &[&str]) -> anyhow::Result<ArchiveJob> {
    let mut argv = vec!["squash-backup"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(normalize_args(argv))?;
    ArchiveJob::resolve(
        &cli.into_request(),
        &TargetRegistry::new(&env.source),
        &env.config(),
        Path::new("/nonexistent-cwd"),
    )
}

#[test]
fn test_dry_run_literal_path_prints_and_exits() {
    let env = TestEnv::new();
    let source = env.source_str();
    let job = job_from_args(&env, &["-dry", &source, "-f", "^skip", "^also"]).unwrap();

    assert_eq!(job.target.exclude_patterns, ["^skip", "^also"]);

    let outcome = run_job(&job, &env.config(), date(), &verifier(&env)).unwrap();

    let JobOutcome::DryRun { image_path } = outcome else {
        panic!("expected a dry run");
    };
    let name = image_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.ends_with("-31-01-2025-c_zstd-b_256k-l_17.squash.img"));
    assert!(!image_path.exists());
}

#[test]
fn test_dry_run_only_creates_destination_dir() {
    let env = TestEnv::new();
    let before = snapshot(&env.source);
    let job = job_from_args(&env, &["--dry_run", &env.source_str()]).unwrap();

    for _ in 0..2 {
        run_job(&job, &env.config(), date(), &verifier(&env)).unwrap();
    }

    assert!(env.backups.is_dir());
    assert_eq!(fs::read_dir(&env.backups).unwrap().count(), 0);
    assert_eq!(snapshot(&env.source), before);
    assert!(!env.mount_root.exists());
}

#[test]
fn test_dry_run_registered_target_uses_prefix() {
    let env = TestEnv::new();
    // The registry's home directory is the demo source.
    let job = job_from_args(&env, &["-dry", "homenorepo", "-c", "4"]).unwrap();

    let outcome = run_job(&job, &env.config(), date(), &verifier(&env)).unwrap();

    let JobOutcome::DryRun { image_path } = outcome else {
        panic!("expected a dry run");
    };
    let name = image_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("home_no_repo__"));
    assert!(name.contains("l_4"));
    assert_eq!(image_path.parent().unwrap(), env.backups);
}

#[test]
fn test_missing_literal_source_fails_before_building() {
    let env = TestEnv::new();
    let job = job_from_args(&env, &["-dry", "bogus/path"]).unwrap();

    let err = run_job(&job, &env.config(), date(), &verifier(&env)).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<BackupError>(),
        Some(BackupError::InvalidSource(_))
    ));
    assert!(!env.backups.exists());
}

#[test]
fn test_unknown_target_is_an_error() {
    let env = TestEnv::new();
    let err = job_from_args(&env, &["-dry", "bogus"]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BackupError>(),
        Some(BackupError::TargetNotFound(_))
    ));
}

#[test]
fn test_sub_source_path_is_archived() {
    let env = TestEnv::new();
    fs::create_dir_all(env.source.join("nested")).unwrap();
    let job = job_from_args(&env, &["-dry", "home", "-sub", "nested"]).unwrap();

    assert_eq!(job.target.source_path, env.source.join("nested"));
    assert!(run_job(&job, &env.config(), date(), &verifier(&env)).is_ok());
}

#[test]
fn test_level_fragment_for_any_level() {
    let env = TestEnv::new();
    let options = BuildOptions {
        program: "mksquashfs".to_string(),
        mem: "1200M".to_string(),
        privileged: false,
        date: date(),
    };

    for level in 1..=22 {
        let built = build_command(
            &env.source,
            &env.backups,
            "",
            &CompressionSettings::with_level(level),
            &[],
            &options,
        )
        .unwrap();
        let name = built.image_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with(".squash.img"));
        assert!(name.contains(&format!("l_{}", level)));
        assert!(!name.starts_with('-'));
    }
}

#[test]
fn test_verify_of_empty_image_fails_without_mounting() {
    let env = TestEnv::new();
    fs::create_dir_all(&env.backups).unwrap();
    let image = env.backups.join("empty.squash.img");
    fs::write(&image, "").unwrap();

    let result = verifier(&env).verify(&image).unwrap();

    assert!(!result.passed());
    assert!(!result.mounted);
    assert!(!env.mount_root.exists());
}

#[test]
fn test_request_defaults_come_from_config() {
    let env = TestEnv::new();
    let request = JobRequest {
        source_path_or_target: env.source_str(),
        ..Default::default()
    };
    let mut config = env.config();
    config.compression_level = 9;

    let registry = TargetRegistry::new("/home/x");
    let job = ArchiveJob::resolve(&request, &registry, &config, Path::new("/")).unwrap();

    assert_eq!(job.settings.level, 9);
    assert_eq!(job.destination_dir, env.backups);
    assert!(job.verify);
}
