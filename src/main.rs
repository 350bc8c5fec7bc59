//! squash-backup - squashfs backup images via mksquashfs.
//!
//! Resolves a target (named shortcut or literal path), builds the
//! mksquashfs command with its exclude patterns, runs or prints it, and
//! verifies the image by mounting it read-only.

use anyhow::{Context, Result};

use squash_backup::backup::{self, ArchiveJob};
use squash_backup::cli::Cli;
use squash_backup::config::Config;
use squash_backup::preflight;
use squash_backup::targets::TargetRegistry;
use squash_backup::verify::{SystemMounter, Verifier};

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load .env if present
    dotenvy::dotenv().ok();
    let config = Config::load();

    let registry = TargetRegistry::for_current_user()?;
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let job = ArchiveJob::resolve(&cli.into_request(), &registry, &config, &cwd)?;

    // Dry runs execute nothing, so they need no host tools.
    if !job.dry_run {
        preflight::run_preflight_or_fail(&config.mksquashfs, config.use_sudo, job.verify)?;
    }

    let verifier = Verifier::new(
        SystemMounter {
            privileged: config.use_sudo,
        },
        &config.mount_root,
    );
    let today = chrono::Local::now().date_naive();

    backup::run_job(&job, &config, today, &verifier)?;
    Ok(())
}
