//! Configuration management for squash-backup.
//!
//! Reads configuration from environment variables. `main` loads a `.env`
//! file first (via dotenvy), so values there act as defaults that the real
//! environment overrides. Command-line flags override both.

use std::path::PathBuf;

use crate::command::CompressionSettings;

pub const DEFAULT_BACKUPS_DIR: &str = "/backups";
pub const DEFAULT_MOUNT_ROOT: &str = "/mnt/squash-verify";
pub const DEFAULT_MKSQUASHFS_MEM: &str = "1200M";
pub const DEFAULT_MKSQUASHFS: &str = "mksquashfs";

/// Squash-backup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Destination for images (default: /backups)
    pub backups_dir: PathBuf,
    /// Where verification mounts images (default: /mnt/squash-verify)
    pub mount_root: PathBuf,
    /// Default zstd level (default: 17)
    pub compression_level: i32,
    /// Archiver executable, name or path (default: mksquashfs)
    pub mksquashfs: String,
    /// mksquashfs `-mem` value (default: 1200M)
    pub mksquashfs_mem: String,
    /// Run mksquashfs/mount/umount through sudo (default: true)
    pub use_sudo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backups_dir: PathBuf::from(DEFAULT_BACKUPS_DIR),
            mount_root: PathBuf::from(DEFAULT_MOUNT_ROOT),
            compression_level: CompressionSettings::DEFAULT_LEVEL,
            mksquashfs: DEFAULT_MKSQUASHFS.to_string(),
            mksquashfs_mem: DEFAULT_MKSQUASHFS_MEM.to_string(),
            use_sudo: true,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backups_dir = get("SQUASH_BACKUPS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.backups_dir);

        let mount_root = get("SQUASH_MOUNT_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.mount_root);

        let compression_level = match get("SQUASH_COMPRESSION_LEVEL") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                println!(
                    "Warning: SQUASH_COMPRESSION_LEVEL={} is not an integer, using {}",
                    raw, defaults.compression_level
                );
                defaults.compression_level
            }),
            None => defaults.compression_level,
        };

        let mksquashfs = get("SQUASH_MKSQUASHFS").unwrap_or(defaults.mksquashfs);
        let mksquashfs_mem = get("SQUASH_MKSQUASHFS_MEM").unwrap_or(defaults.mksquashfs_mem);

        let use_sudo = match get("SQUASH_USE_SUDO") {
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                println!("Warning: SQUASH_USE_SUDO={} is not a boolean, using true", raw);
                defaults.use_sudo
            }),
            None => defaults.use_sudo,
        };

        Self {
            backups_dir,
            mount_root,
            compression_level,
            mksquashfs,
            mksquashfs_mem,
            use_sudo,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
