//! Command-line interface.
//!
//! The historical single-dash spellings (`-dry`, `-cwd`, `-nv`, `-sub`,
//! `-pre`) are rewritten to their long forms before clap sees them.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::backup::JobRequest;

/// Single-dash multi-letter flags and their long equivalents.
const LEGACY_FLAGS: &[(&str, &str)] = &[
    ("-dry", "--dry_run"),
    ("-cwd", "--use_current_working_dir"),
    ("-nv", "--no_verify"),
    ("-sub", "--sub_source_path"),
    ("-pre", "--label_prefix"),
];

#[derive(Parser, Debug)]
#[command(name = "squash-backup")]
#[command(about = "Create and verify squashfs backup images with mksquashfs")]
#[command(after_help = concat!(
    "TARGETS:\n",
    "  home              Home directory without caches and build output\n",
    "  home_no_repo      Same as home, also skipping ~/repos (alias: homenorepo)\n",
    "  sys_no_home       Root filesystem without /home and runtime state",
    " (aliases: sysnohome, sys)\n",
    "  sys_data_no_home  Configuration and state only (alias: sysdatanohome)\n",
    "\n",
    "Anything containing '/' is archived as a literal path.\n",
    "zstd accepts compression levels 1-22.\n",
    "The single-dash spellings -dry, -cwd, -nv, -sub and -pre are also accepted."
))]
pub struct Cli {
    /// Source directory to back up, or the name of a preconfigured target
    pub source_path_or_target: String,

    /// Print the command without running or verifying it (also: -dry)
    #[arg(long = "dry_run")]
    pub dry_run: bool,

    /// POSIX regular expressions to exclude, after any preset ones
    #[arg(
        short = 'f',
        long = "exclude_regex_filters",
        visible_aliases = ["regex_filters", "filters"],
        num_args = 1..,
        action = ArgAction::Append
    )]
    pub exclude_regex_filters: Vec<String>,

    /// Directory the image is written to (default: SQUASH_BACKUPS_DIR or /backups)
    #[arg(short = 'b', long = "backups_dir", visible_alias = "target_dir")]
    pub backups_dir: Option<PathBuf>,

    /// Write the image to the current working directory (also: -cwd)
    #[arg(long = "use_current_working_dir")]
    pub use_current_working_dir: bool,

    /// zstd compression level (default: SQUASH_COMPRESSION_LEVEL or 17)
    #[arg(
        short = 'c',
        long = "compression_level",
        visible_alias = "compression",
        allow_negative_numbers = true
    )]
    pub compression_level: Option<i32>,

    /// Skip mounting and checking the produced image (also: -nv)
    #[arg(long = "no_verify")]
    pub no_verify: bool,

    /// Archive only this path below the resolved source (also: -sub)
    #[arg(long = "sub_source_path")]
    pub sub_source_path: Option<PathBuf>,

    /// Prefix for the image name, default the target name (also: -pre)
    #[arg(long = "label_prefix")]
    pub label_prefix: Option<String>,
}

impl Cli {
    /// Parse process arguments, accepting legacy single-dash flags.
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args()))
    }

    pub fn into_request(self) -> JobRequest {
        JobRequest {
            source_path_or_target: self.source_path_or_target,
            dry_run: self.dry_run,
            exclude_filters: self.exclude_regex_filters,
            backups_dir: self.backups_dir,
            use_current_working_dir: self.use_current_working_dir,
            compression_level: self.compression_level,
            no_verify: self.no_verify,
            sub_source_path: self.sub_source_path,
            label_prefix: self.label_prefix,
        }
    }
}

/// Rewrite legacy single-dash flags (also in `-flag=value` form).
pub fn normalize_args<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            let (flag, value) = match arg.split_once('=') {
                Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
                None => (arg.clone(), None),
            };
            match LEGACY_FLAGS.iter().find(|(legacy, _)| *legacy == flag) {
                Some((_, long)) => match value {
                    Some(value) => format!("{}={}", long, value),
                    None => long.to_string(),
                },
                None => arg,
            }
        })
        .collect()
}
