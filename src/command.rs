//! mksquashfs command construction.
//!
//! Produces the argument vector for one archive job together with the
//! image path it will write. Image names are deterministic:
//!
//! ```text
//! <prefix>__<source-label>-<DD-MM-YYYY>-c_<algo>-b_<block>-l_<level>.squash.img
//! ```

use anyhow::{bail, Result};
use chrono::NaiveDate;
use std::fmt;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::error::BackupError;
use crate::process::Cmd;

/// Extension of every generated image.
pub const IMAGE_EXTENSION: &str = ".squash.img";

/// Label used when the source is the filesystem root.
pub const ROOT_LABEL: &str = "rootfs";

/// Separator between label prefix and source label.
const PREFIX_SEPARATOR: &str = "__";

/// Compression algorithm passed to `-comp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    Zstd,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::Zstd => "zstd",
        }
    }

    /// Levels mksquashfs accepts for `-Xcompression-level`.
    ///
    /// Informational only: out-of-range levels are rejected by mksquashfs.
    pub fn level_range(&self) -> RangeInclusive<i32> {
        match self {
            Compression::Zstd => 1..=22,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compression parameters for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionSettings {
    pub algorithm: Compression,
    pub block_size_kib: u32,
    pub level: i32,
}

impl CompressionSettings {
    pub const DEFAULT_BLOCK_SIZE_KIB: u32 = 256;
    pub const DEFAULT_LEVEL: i32 = 17;

    pub fn with_level(level: i32) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// Block size as mksquashfs expects it (`256k`).
    pub fn block_size_arg(&self) -> String {
        format!("{}k", self.block_size_kib)
    }

    /// Settings fragment embedded in image names.
    pub fn name_fragment(&self) -> String {
        format!(
            "c_{}-b_{}-l_{}",
            self.algorithm,
            self.block_size_arg(),
            self.level
        )
    }
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            algorithm: Compression::Zstd,
            block_size_kib: Self::DEFAULT_BLOCK_SIZE_KIB,
            level: Self::DEFAULT_LEVEL,
        }
    }
}

/// Knobs that do not affect the image name.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Archiver program, normally `mksquashfs`.
    pub program: String,
    /// Value of `-mem`.
    pub mem: String,
    /// Run mksquashfs through sudo.
    pub privileged: bool,
    /// Date stamped into the image name.
    pub date: NaiveDate,
}

/// A ready-to-run archive command.
#[derive(Debug, Clone)]
pub struct BuiltCommand {
    pub argv: Vec<String>,
    pub image_path: PathBuf,
}

impl BuiltCommand {
    pub fn to_cmd(&self) -> Result<Cmd> {
        Cmd::from_argv(&self.argv)
    }
}

/// Turn a source path into a file-name-safe label.
///
/// Separators become `-`, leading and trailing ones are dropped, and the
/// root collapses to [`ROOT_LABEL`].
pub fn source_label(source: &Path) -> String {
    let raw = source.to_string_lossy().replace('/', "-");
    let label = raw.trim_matches('-');
    if label.is_empty() {
        ROOT_LABEL.to_string()
    } else {
        label.to_string()
    }
}

/// Generate the image file name for a job.
pub fn image_file_name(
    label_prefix: &str,
    source: &Path,
    date: NaiveDate,
    settings: &CompressionSettings,
) -> String {
    let mut name = String::new();
    if !label_prefix.is_empty() {
        name.push_str(label_prefix);
        name.push_str(PREFIX_SEPARATOR);
    }
    name.push_str(&source_label(source));
    name.push('-');
    name.push_str(&date.format("%d-%m-%Y").to_string());
    name.push('-');
    name.push_str(&settings.name_fragment());
    name.push_str(IMAGE_EXTENSION);

    name.trim_start_matches('-').to_string()
}

/// Regex pattern that matches only the image itself.
pub fn self_exclude_pattern(file_name: &str) -> String {
    regex::escape(file_name)
}

/// Create the destination directory if needed.
///
/// Idempotent. Fails with `InvalidDestination` when the path (or one of its
/// ancestors) exists but is not a directory.
pub fn ensure_destination(dest_dir: &Path) -> Result<()> {
    if dest_dir.is_dir() {
        return Ok(());
    }
    if dest_dir.exists() {
        bail!(BackupError::InvalidDestination(dest_dir.to_path_buf()));
    }
    if fs::create_dir_all(dest_dir).is_err() {
        bail!(BackupError::InvalidDestination(dest_dir.to_path_buf()));
    }
    Ok(())
}

/// Build the mksquashfs invocation for `source`.
///
/// Ensures `dest_dir` exists. A pattern excluding the image's own file name
/// is appended after `excludes` so overlapping source and destination never
/// archive the image into itself.
///
/// mksquashfs reads everything after `-e` as exclude patterns, so `-e`
/// appears exactly once and is the last option.
pub fn build_command(
    source: &Path,
    dest_dir: &Path,
    label_prefix: &str,
    settings: &CompressionSettings,
    excludes: &[String],
    options: &BuildOptions,
) -> Result<BuiltCommand> {
    if !source.is_dir() {
        bail!(BackupError::InvalidSource(source.to_path_buf()));
    }

    ensure_destination(dest_dir)?;

    let file_name = image_file_name(label_prefix, source, options.date, settings);
    let image_path = dest_dir.join(&file_name);

    let mut patterns = excludes.to_vec();
    patterns.push(self_exclude_pattern(&file_name));

    let cmd = Cmd::privileged(&options.program, options.privileged)
        .arg_path(source)
        .arg_path(&image_path)
        .args(["-comp", settings.algorithm.as_str()])
        .args(["-Xcompression-level", &settings.level.to_string()])
        .args(["-b", &settings.block_size_arg()])
        .args(["-mem", &options.mem])
        .args(["-info", "-progress", "-noappend"])
        .args(["-regex", "-e"])
        .args(&patterns);

    Ok(BuiltCommand {
        argv: cmd.argv(),
        image_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    fn options() -> BuildOptions {
        BuildOptions {
            program: "mksquashfs".to_string(),
            mem: "1200M".to_string(),
            privileged: false,
            date: date(),
        }
    }

    #[test]
    fn test_source_label() {
        assert_eq!(source_label(Path::new("/")), "rootfs");
        assert_eq!(source_label(Path::new("/home/user")), "home-user");
        assert_eq!(source_label(Path::new("/home/user/")), "home-user");
        assert_eq!(source_label(Path::new("bogus/path")), "bogus-path");
    }

    #[test]
    fn test_image_file_name() {
        let settings = CompressionSettings::default();
        assert_eq!(
            image_file_name("", Path::new("/srv/data"), date(), &settings),
            "srv-data-07-03-2024-c_zstd-b_256k-l_17.squash.img"
        );
        assert_eq!(
            image_file_name("home", Path::new("/home/me"), date(), &settings),
            "home__home-me-07-03-2024-c_zstd-b_256k-l_17.squash.img"
        );
        assert_eq!(
            image_file_name("sys_no_home", Path::new("/"), date(), &settings),
            "sys_no_home__rootfs-07-03-2024-c_zstd-b_256k-l_17.squash.img"
        );
    }

    #[test]
    fn test_name_never_starts_with_separator() {
        let settings = CompressionSettings::with_level(3);
        for source in ["/", "/a", "//a//b", "/tmp/x/"] {
            let name = image_file_name("", Path::new(source), date(), &settings);
            assert!(!name.starts_with('-'), "{}", name);
        }
        // A prefix made of separators is stripped too.
        let name = image_file_name("-", Path::new("/a"), date(), &settings);
        assert!(!name.starts_with('-'));
    }

    #[test]
    fn test_build_command_layout() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        let dest = temp.path().join("out");
        fs::create_dir_all(&source).unwrap();

        let excludes = vec!["^cache".to_string()];
        let settings = CompressionSettings::with_level(9);
        let built = build_command(&source, &dest, "", &settings, &excludes, &options()).unwrap();

        assert!(dest.is_dir());
        let name = built.image_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with(".squash.img"));
        assert!(name.contains("l_9"));

        assert_eq!(built.argv[0], "mksquashfs");
        assert_eq!(built.argv[1], source.to_string_lossy());
        assert_eq!(built.argv[2], built.image_path.to_string_lossy());

        let regex_at = built.argv.iter().position(|a| a == "-regex").unwrap();
        assert_eq!(
            &built.argv[regex_at + 1..],
            &["-e".to_string(), "^cache".to_string(), regex::escape(&name)]
        );
    }

    #[test]
    fn test_exclude_list_follows_single_e_flag() {
        let temp = TempDir::new().unwrap();
        let excludes = vec!["^a".to_string(), "^My Docs".to_string(), r".*cache\/.*".to_string()];
        let built = build_command(
            temp.path(),
            temp.path(),
            "",
            &CompressionSettings::default(),
            &excludes,
            &options(),
        )
        .unwrap();

        assert_eq!(built.argv.iter().filter(|a| *a == "-e").count(), 1);
        let e_at = built.argv.iter().position(|a| a == "-e").unwrap();
        assert_eq!(built.argv[e_at - 1], "-regex");
        assert_eq!(&built.argv[e_at + 1..e_at + 4], excludes.as_slice());
        assert_eq!(built.argv.len(), e_at + 5);
    }

    #[test]
    fn test_archiver_program_is_configurable() {
        let temp = TempDir::new().unwrap();
        let opts = BuildOptions {
            program: "/opt/squashfs/bin/mksquashfs".to_string(),
            ..options()
        };
        let built = build_command(
            temp.path(),
            temp.path(),
            "",
            &CompressionSettings::default(),
            &[],
            &opts,
        )
        .unwrap();
        assert_eq!(built.argv[0], "/opt/squashfs/bin/mksquashfs");
    }

    #[test]
    fn test_build_command_with_sudo() {
        let temp = TempDir::new().unwrap();
        let opts = BuildOptions {
            privileged: true,
            ..options()
        };
        let built = build_command(
            temp.path(),
            temp.path(),
            "x",
            &CompressionSettings::default(),
            &[],
            &opts,
        )
        .unwrap();
        assert_eq!(&built.argv[..2], &["sudo".to_string(), "mksquashfs".to_string()]);
    }

    #[test]
    fn test_missing_source_is_rejected() {
        let temp = TempDir::new().unwrap();
        let err = build_command(
            &temp.path().join("missing"),
            temp.path(),
            "",
            &CompressionSettings::default(),
            &[],
            &options(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BackupError>(),
            Some(BackupError::InvalidSource(_))
        ));
    }

    #[test]
    fn test_file_source_is_rejected() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        fs::write(&file, "x").unwrap();
        let err = build_command(
            &file,
            temp.path(),
            "",
            &CompressionSettings::default(),
            &[],
            &options(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BackupError>(),
            Some(BackupError::InvalidSource(_))
        ));
    }

    #[test]
    fn test_destination_that_is_a_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        fs::write(&file, "x").unwrap();
        let err = ensure_destination(&file).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BackupError>(),
            Some(BackupError::InvalidDestination(_))
        ));
        assert!(ensure_destination(&file.join("nested")).is_err());
    }

    #[test]
    fn test_ensure_destination_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a/b/c");
        ensure_destination(&dest).unwrap();
        ensure_destination(&dest).unwrap();
        assert!(dest.is_dir());
    }
}
