//! Error kinds raised by the backup workflow.
//!
//! Everything is propagated as `anyhow::Error`; callers that need to react
//! to a specific kind use `err.downcast_ref::<BackupError>()`.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum BackupError {
    #[error("source directory {0} does not exist or is not a directory")]
    InvalidSource(PathBuf),

    #[error("destination {0} cannot be used: parent is missing or not a directory")]
    InvalidDestination(PathBuf),

    #[error("unknown target '{0}' (known: home, home_no_repo, sys_no_home, sys_data_no_home)")]
    TargetNotFound(String),

    #[error("cannot mount {image}: {reason}")]
    Mount { image: PathBuf, reason: String },

    #[error("cannot unmount {mount_point}: {reason}")]
    Unmount { mount_point: PathBuf, reason: String },

    #[error("mksquashfs exited with code {code}")]
    ArchiverFailed { code: i32 },
}
