//! Exclude-pattern catalog.
//!
//! Patterns are POSIX regular expressions handed to `mksquashfs -regex -e`.
//! They match paths relative to the archived source directory, so `^dev`
//! only hits the top-level `dev` of a root backup.
//!
//! Each list is a plain concatenation of fixed tables. Order only matters
//! for reproducible command lines; mksquashfs treats the set as unordered.

/// Noise present in any tree: caches, logs, dependency folders.
const UNIVERSAL: &[&str] = &[
    r"\.cache",
    r".*\.cache\/.*",
    r".*cache\/.*",
    r".*\/logs\/.*",
    r".+/node_modules",
    r"node_modules/*",
    // Earlier backups sitting inside the tree
    r".*\.squash\.img",
];

/// User-profile noise: editor servers, package manager caches, build output.
const HOME: &[&str] = &[
    r"^\.nvm",
    r"^\.npm",
    r"^\.vscode-server",
    r"^\.cargo/registry",
    r"^\.rustup",
    r"^.*.img",
    r".+/dist",
    r"dist/*",
    r".+/target/debug",
    r".+/target/release",
];

/// Pseudo filesystems, mount points and ephemeral state of a root tree.
const SYSTEM: &[&str] = &[
    // Device nodes
    r"^dev",
    // Removable media mounts
    r"^media",
    // Kernel and device state
    r"^sys",
    // Kernel images and bootloader
    r"^boot",
    // fsck leftovers
    r"lost\+found",
    // Manually mounted volumes
    r"^mnt",
    r"^proc",
    r"^tmp",
    r"^run",
    r"var/run",
    r"var/lock",
    r"^var/backups",
    r"var/cache",
    r"var/log",
    r"var/tmp",
    r"var/lib",
    r"var/spool",
];

/// Trees a package manager can reinstall: executables, libraries, headers.
const SYSTEM_DATA: &[&str] = &[
    r"^bin",
    r"^sbin",
    r"^lib",
    r"^lib32",
    r"^lib64",
    r"^libx32",
    r"^usr/bin",
    r"^usr/sbin",
    r"^usr/lib",
    r"^usr/lib32",
    r"^usr/lib64",
    r"^usr/libexec",
    r"^usr/include",
    r"^usr/share",
    r"^usr/src",
    r"^opt",
    r"^snap",
];

fn to_owned(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}

/// Patterns applicable to any backup.
pub fn universal_excludes() -> Vec<String> {
    to_owned(UNIVERSAL)
}

/// Home directory patterns, including [`universal_excludes`].
pub fn home_excludes() -> Vec<String> {
    let mut patterns = to_owned(HOME);
    patterns.extend(universal_excludes());
    patterns
}

/// Root filesystem patterns, including [`universal_excludes`].
pub fn system_excludes() -> Vec<String> {
    let mut patterns = to_owned(SYSTEM);
    patterns.extend(universal_excludes());
    patterns
}

/// Extra root filesystem patterns leaving only configuration and variable
/// state. Meant to be combined with [`system_excludes`].
pub fn system_data_excludes() -> Vec<String> {
    to_owned(SYSTEM_DATA)
}
