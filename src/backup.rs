//! One backup job from resolved arguments to a verified image.
//!
//! Flow: resolve target -> assemble excludes -> build command ->
//! print (dry run) or execute -> optionally verify.

use anyhow::Result;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use crate::command::{self, BuildOptions, CompressionSettings};
use crate::config::Config;
use crate::runner;
use crate::targets::{BackupTarget, TargetRegistry};
use crate::timing::Timer;
use crate::verify::{Mounter, VerificationResult, Verifier};

/// What the user asked for, before resolution.
#[derive(Debug, Clone, Default)]
pub struct JobRequest {
    pub source_path_or_target: String,
    pub dry_run: bool,
    pub exclude_filters: Vec<String>,
    pub backups_dir: Option<PathBuf>,
    pub use_current_working_dir: bool,
    pub compression_level: Option<i32>,
    pub no_verify: bool,
    pub sub_source_path: Option<PathBuf>,
    pub label_prefix: Option<String>,
}

/// A fully resolved job. Built once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveJob {
    pub target: BackupTarget,
    pub settings: CompressionSettings,
    pub destination_dir: PathBuf,
    pub dry_run: bool,
    pub verify: bool,
}

impl ArchiveJob {
    /// Resolve a request against the registry and configuration.
    ///
    /// User filters are appended after the target's preset excludes. An
    /// explicit label prefix wins over the target name.
    pub fn resolve(
        request: &JobRequest,
        registry: &TargetRegistry,
        config: &Config,
        cwd: &Path,
    ) -> Result<Self> {
        let mut target = registry.resolve(&request.source_path_or_target)?;

        target
            .exclude_patterns
            .extend(request.exclude_filters.iter().cloned());

        if let Some(sub) = &request.sub_source_path {
            let sub = sub.strip_prefix("/").unwrap_or(sub.as_path());
            target.source_path = target.source_path.join(sub);
        }

        if let Some(prefix) = &request.label_prefix {
            target.label_prefix = prefix.clone();
        }

        let destination_dir = if request.use_current_working_dir {
            cwd.to_path_buf()
        } else {
            request
                .backups_dir
                .clone()
                .unwrap_or_else(|| config.backups_dir.clone())
        };

        let level = request.compression_level.unwrap_or(config.compression_level);

        Ok(Self {
            target,
            settings: CompressionSettings::with_level(level),
            destination_dir,
            dry_run: request.dry_run,
            verify: !request.no_verify && !request.dry_run,
        })
    }

    pub fn print(&self) {
        println!("  Target: {}", self.target.name);
        println!("  Source: {}", self.target.source_path.display());
        println!("  Destination: {}", self.destination_dir.display());
        println!(
            "  Compression: {} level {} ({} blocks)",
            self.settings.algorithm,
            self.settings.level,
            self.settings.block_size_arg()
        );
        if !self.settings.algorithm.level_range().contains(&self.settings.level) {
            println!(
                "  Warning: {} expects levels {:?}, mksquashfs will likely reject {}",
                self.settings.algorithm,
                self.settings.algorithm.level_range(),
                self.settings.level
            );
        }
        println!("  Exclude patterns: {}", self.target.exclude_patterns.len());
        if self.dry_run {
            println!("  Mode: dry run");
        } else if !self.verify {
            println!("  Verification: skipped");
        }
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Command printed only.
    DryRun { image_path: PathBuf },
    /// Archiver ran. `verification` is `None` when skipped.
    Archived {
        image_path: PathBuf,
        verification: Option<VerificationResult>,
    },
}

impl JobOutcome {
    /// False only when verification ran and failed.
    pub fn is_success(&self) -> bool {
        match self {
            JobOutcome::DryRun { .. } => true,
            JobOutcome::Archived { verification, .. } => {
                verification.map_or(true, |v| v.passed())
            }
        }
    }
}

/// Run a resolved job.
///
/// An archiver failure is an error and skips verification. A failed
/// verification is not: it is reported and returned in the outcome.
pub fn run_job<M: Mounter>(
    job: &ArchiveJob,
    config: &Config,
    date: NaiveDate,
    verifier: &Verifier<M>,
) -> Result<JobOutcome> {
    println!("=== Squashfs Backup ===\n");
    job.print();
    println!();

    let options = BuildOptions {
        program: config.mksquashfs.clone(),
        mem: config.mksquashfs_mem.clone(),
        privileged: config.use_sudo,
        date,
    };
    let built = command::build_command(
        &job.target.source_path,
        &job.destination_dir,
        &job.target.label_prefix,
        &job.settings,
        &job.target.exclude_patterns,
        &options,
    )?;

    let timer = Timer::start("mksquashfs");
    let image_path = match runner::run_archiver(&built, job.dry_run)? {
        Some(path) => path,
        None => {
            return Ok(JobOutcome::DryRun {
                image_path: built.image_path,
            })
        }
    };
    timer.finish();

    let verification = if job.verify {
        let timer = Timer::start("verify");
        let result = verifier.verify(&image_path)?;
        timer.finish();
        Some(result)
    } else {
        None
    };

    let outcome = JobOutcome::Archived {
        image_path,
        verification,
    };
    report(&outcome);
    Ok(outcome)
}

fn report(outcome: &JobOutcome) {
    let JobOutcome::Archived { image_path, .. } = outcome else {
        return;
    };

    println!();
    if outcome.is_success() {
        println!("=== Backup Complete ===");
        println!("  Output: {}", image_path.display());
    } else {
        println!("=== Backup Verification FAILED ===");
        println!(
            "  The image may still exist at {}. Inspect it manually.",
            image_path.display()
        );
    }
}
