//! Shared test utilities for squash-backup tests.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use squash_backup::config::Config;

/// Test environment with a populated source tree and an empty backups root.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Directory to archive
    pub source: PathBuf,
    /// Destination directory (not created up front)
    pub backups: PathBuf,
    /// Mount root for verification
    pub mount_root: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let source = base.join("demo");
        fs::create_dir_all(&source).expect("Failed to create source dir");
        fs::write(source.join("notes.txt"), "hello").expect("Failed to write source file");

        Self {
            backups: base.join("backups"),
            mount_root: base.join("mnt"),
            source,
            _temp_dir: temp_dir,
        }
    }

    /// Configuration pointing at this environment, without sudo.
    pub fn config(&self) -> Config {
        Config {
            backups_dir: self.backups.clone(),
            mount_root: self.mount_root.clone(),
            use_sudo: false,
            ..Config::default()
        }
    }

    pub fn source_str(&self) -> String {
        self.source.to_string_lossy().into_owned()
    }
}

/// All paths below `root`, sorted, relative to `root`.
pub fn snapshot(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    paths.sort();
    paths
}
