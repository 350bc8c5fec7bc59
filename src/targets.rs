//! Named backup targets.
//!
//! A target is a shortcut for a source directory plus a preset exclude set.
//! Identifiers containing a `/` bypass the registry and are archived as a
//! literal path with no preset excludes.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::error::BackupError;
use crate::excludes;

/// A resolved source to archive. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTarget {
    /// Canonical target name, or the literal path as given.
    pub name: String,
    pub source_path: PathBuf,
    pub exclude_patterns: Vec<String>,
    /// Empty for literal paths.
    pub label_prefix: String,
}

impl BackupTarget {
    /// Target for a literal source directory.
    pub fn literal(path: &str) -> Self {
        Self {
            name: path.to_string(),
            source_path: PathBuf::from(path),
            exclude_patterns: Vec::new(),
            label_prefix: String::new(),
        }
    }
}

/// Where a registered target reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRoot {
    /// The invoking user's home directory.
    Home,
    /// The filesystem root.
    Root,
}

/// One row of the registry table.
#[derive(Debug, Clone, Copy)]
pub struct TargetSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub source: SourceRoot,
    pub excludes: fn() -> Vec<String>,
}

impl TargetSpec {
    fn matches(&self, identifier: &str) -> bool {
        self.name == identifier || self.aliases.contains(&identifier)
    }
}

fn home_no_repo_excludes() -> Vec<String> {
    let mut patterns = excludes::home_excludes();
    patterns.push(r"^repos".to_string());
    patterns
}

fn sys_no_home_excludes() -> Vec<String> {
    let mut patterns = excludes::system_excludes();
    patterns.push(r"^home".to_string());
    patterns
}

fn sys_data_no_home_excludes() -> Vec<String> {
    let mut patterns = excludes::system_excludes();
    patterns.extend(excludes::system_data_excludes());
    patterns.push(r"^home".to_string());
    patterns
}

/// Built-in targets. Aliases are exact, case-sensitive strings.
pub const BUILTIN_TARGETS: &[TargetSpec] = &[
    TargetSpec {
        name: "home",
        aliases: &[],
        source: SourceRoot::Home,
        excludes: excludes::home_excludes,
    },
    TargetSpec {
        name: "home_no_repo",
        aliases: &["homenorepo"],
        source: SourceRoot::Home,
        excludes: home_no_repo_excludes,
    },
    TargetSpec {
        name: "sys_no_home",
        aliases: &["sysnohome", "sys"],
        source: SourceRoot::Root,
        excludes: sys_no_home_excludes,
    },
    TargetSpec {
        name: "sys_data_no_home",
        aliases: &["sysdatanohome"],
        source: SourceRoot::Root,
        excludes: sys_data_no_home_excludes,
    },
];

/// Lookup table from identifiers to targets.
#[derive(Debug, Clone)]
pub struct TargetRegistry {
    specs: &'static [TargetSpec],
    home_dir: PathBuf,
}

impl TargetRegistry {
    /// Registry over the built-in table with an explicit home directory.
    pub fn new(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            specs: BUILTIN_TARGETS,
            home_dir: home_dir.into(),
        }
    }

    /// Registry using the current user's home directory.
    pub fn for_current_user() -> Result<Self> {
        let home = dirs::home_dir().context("Could not determine the home directory")?;
        Ok(Self::new(home))
    }

    pub fn lookup(&self, name: &str) -> Option<&TargetSpec> {
        self.specs.iter().find(|spec| spec.matches(name))
    }

    /// Resolve an identifier to a target.
    ///
    /// Identifiers containing `/` are literal paths. Anything else must be
    /// a registered name or alias, otherwise `TargetNotFound` is raised.
    pub fn resolve(&self, identifier: &str) -> Result<BackupTarget> {
        if identifier.contains('/') {
            return Ok(BackupTarget::literal(identifier));
        }

        let spec = self
            .lookup(identifier)
            .ok_or_else(|| BackupError::TargetNotFound(identifier.to_string()))?;

        let source_path = match spec.source {
            SourceRoot::Home => self.home_dir.clone(),
            SourceRoot::Root => PathBuf::from("/"),
        };

        Ok(BackupTarget {
            name: spec.name.to_string(),
            source_path,
            exclude_patterns: (spec.excludes)(),
            label_prefix: spec.name.to_string(),
        })
    }
}
