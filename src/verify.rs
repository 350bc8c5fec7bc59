//! Post-build image verification.
//!
//! An image passes when it exists, is non-empty, mounts read-only and
//! contains at least one regular file. Per call:
//!
//! ```text
//! Start -> MountAttempted -> MountFailed
//!                         -> Mounted -> Listed -> Unmounted
//! ```
//!
//! No retries. Once a mount succeeded, unmount is always attempted, even
//! when listing the contents failed.

use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::BackupError;
use crate::process::Cmd;

/// Top-level entries printed after mounting.
const MAX_LISTED_ENTRIES: usize = 20;

/// Outcome of one verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerificationResult {
    pub mounted: bool,
    pub non_empty: bool,
    pub byte_size: u64,
}

impl VerificationResult {
    pub fn passed(&self) -> bool {
        self.byte_size > 0 && self.mounted && self.non_empty
    }
}

/// Mount operations used by the verifier.
pub trait Mounter {
    fn create_mount_point(&self, mount_point: &Path) -> Result<()>;
    /// Mount `image` read-only at an existing `mount_point`.
    fn mount(&self, image: &Path, mount_point: &Path) -> Result<()>;
    fn unmount(&self, mount_point: &Path) -> Result<()>;
    /// Remove an empty, unmounted mount point.
    fn remove_mount_point(&self, mount_point: &Path) -> Result<()>;
}

/// Loop-mounts through `mount`/`umount`, optionally via sudo.
#[derive(Debug, Clone, Copy)]
pub struct SystemMounter {
    pub privileged: bool,
}

impl Mounter for SystemMounter {
    fn create_mount_point(&self, mount_point: &Path) -> Result<()> {
        Cmd::privileged("mkdir", self.privileged)
            .arg("-p")
            .arg_path(mount_point)
            .error_msg(format!("Failed to create mount point {}", mount_point.display()))
            .run()?;
        Ok(())
    }

    fn mount(&self, image: &Path, mount_point: &Path) -> Result<()> {
        if !image.is_file() {
            bail!(BackupError::Mount {
                image: image.to_path_buf(),
                reason: "image file does not exist".to_string(),
            });
        }
        if !mount_point.is_dir() {
            bail!(BackupError::Mount {
                image: image.to_path_buf(),
                reason: format!("mount point {} does not exist", mount_point.display()),
            });
        }

        Cmd::privileged("mount", self.privileged)
            .args(["-t", "squashfs", "-o", "ro,loop"])
            .arg_path(image)
            .arg_path(mount_point)
            .run()
            .map_err(|e| BackupError::Mount {
                image: image.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn unmount(&self, mount_point: &Path) -> Result<()> {
        if !mount_point.exists() {
            bail!(BackupError::Unmount {
                mount_point: mount_point.to_path_buf(),
                reason: "mount point does not exist".to_string(),
            });
        }

        Cmd::privileged("umount", self.privileged)
            .arg_path(mount_point)
            .run()
            .map_err(|e| BackupError::Unmount {
                mount_point: mount_point.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn remove_mount_point(&self, mount_point: &Path) -> Result<()> {
        Cmd::privileged("rmdir", self.privileged)
            .arg_path(mount_point)
            .run()?;
        Ok(())
    }
}

/// Mounts images under a fixed root and inspects them.
pub struct Verifier<M: Mounter> {
    mounter: M,
    mount_root: PathBuf,
}

impl<M: Mounter> Verifier<M> {
    pub fn new(mounter: M, mount_root: impl Into<PathBuf>) -> Self {
        Self {
            mounter,
            mount_root: mount_root.into(),
        }
    }

    /// Fresh mount point under the mount root. Random so concurrent runs
    /// from separate processes do not collide.
    fn next_mount_point(&self) -> PathBuf {
        self.mount_root
            .join(format!("verify-{}", Uuid::new_v4().simple()))
    }

    /// Verify `image`.
    ///
    /// Verification failures come back as a result with `passed() == false`.
    /// Only a failed unmount is an error, since it leaves the image mounted.
    pub fn verify(&self, image: &Path) -> Result<VerificationResult> {
        println!("Verifying {}...", image.display());

        let mut result = VerificationResult::default();

        let byte_size = fs::metadata(image).map(|m| m.len()).unwrap_or(0);
        result.byte_size = byte_size;
        if byte_size == 0 {
            println!("  ✗ Image is missing or empty");
            return Ok(result);
        }
        println!("  Size: {} MB ({} bytes)", byte_size / 1024 / 1024, byte_size);

        let mount_point = self.next_mount_point();
        if let Err(e) = self.mounter.create_mount_point(&mount_point) {
            println!("  ✗ {:#}", e);
            return Ok(result);
        }

        if let Err(e) = self.mounter.mount(image, &mount_point) {
            println!("  ✗ Mount failed: {:#}", e);
            if let Err(e) = self.mounter.remove_mount_point(&mount_point) {
                println!("  Warning: could not remove {}: {:#}", mount_point.display(), e);
            }
            return Ok(result);
        }
        result.mounted = true;
        println!("  Mounted at {}", mount_point.display());

        let listing = scan_contents(&mount_point);

        self.mounter.unmount(&mount_point)?;
        if let Err(e) = self.mounter.remove_mount_point(&mount_point) {
            println!("  Warning: could not remove {}: {:#}", mount_point.display(), e);
        }
        println!("  Unmounted");

        match listing {
            Ok(has_files) => result.non_empty = has_files,
            Err(e) => println!("  ✗ Listing failed: {:#}", e),
        }

        if result.passed() {
            println!("  ✓ Image verified");
        } else if result.mounted && !result.non_empty {
            println!("  ✗ Image contains no files");
        }

        Ok(result)
    }
}

/// Print top-level entries and report whether any regular file exists.
///
/// Failing to read the top level is an error. Unreadable subdirectories
/// are skipped.
fn scan_contents(root: &Path) -> Result<bool> {
    let mut names: Vec<String> = fs::read_dir(root)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<_>>()?;
    names.sort();

    println!("  Contents ({} top-level entries):", names.len());
    for name in names.iter().take(MAX_LISTED_ENTRIES) {
        println!("    {}", name);
    }
    if names.len() > MAX_LISTED_ENTRIES {
        println!("    ... {} more", names.len() - MAX_LISTED_ENTRIES);
    }

    let has_files = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| e.file_type().is_file());

    Ok(has_files)
}
