//! Host tool checks run before a real backup.
//!
//! Dry runs skip these, since nothing external is executed.

use anyhow::{bail, Result};

use crate::process;

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    /// Check failed - the backup cannot run.
    Fail,
}

impl CheckResult {
    pub fn pass_with(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: Some(details.to_string()),
        }
    }

    pub fn fail(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Fail,
            details: Some(details.to_string()),
        }
    }
}

/// Results of all preflight checks.
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    pub fn all_passed(&self) -> bool {
        !self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    pub fn fail_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
            .count()
    }

    pub fn print(&self) {
        for check in &self.checks {
            let (icon, status_str) = match check.status {
                CheckStatus::Pass => ("✓", "PASS"),
                CheckStatus::Fail => ("✗", "FAIL"),
            };

            print!("  {} [{}] {}", icon, status_str, check.name);
            if let Some(details) = &check.details {
                println!(": {}", details);
            } else {
                println!();
            }
        }
        println!();
    }
}

/// Where root's PATH finds mount and mksquashfs on most distributions.
/// Often missing from a regular user's PATH.
pub const SBIN_DIRS: &[&str] = &["/usr/local/sbin", "/usr/sbin", "/sbin"];

/// Tools needed for archiving and verification, with package hints.
pub fn required_tools(
    archiver: &str,
    use_sudo: bool,
    verify: bool,
) -> Vec<(String, &'static str)> {
    let mut tools = vec![(archiver.to_string(), "squashfs-tools")];
    if verify {
        tools.push(("mount".to_string(), "util-linux"));
        tools.push(("umount".to_string(), "util-linux"));
    }
    if use_sudo {
        tools.push(("sudo".to_string(), "sudo"));
    }
    tools
}

/// Find `tool` in PATH, then in `extra_dirs`.
pub fn locate_tool(tool: &str, extra_dirs: &[&str]) -> Option<String> {
    process::which(tool).or_else(|| process::which_in(tool, extra_dirs))
}

/// Check host tools are installed.
///
/// With sudo, tools are also looked up in the sbin directories, since
/// sudo's secure path includes them.
pub fn check_host_tools(archiver: &str, use_sudo: bool, verify: bool) -> PreflightReport {
    let extra_dirs: &[&str] = if use_sudo { SBIN_DIRS } else { &[] };
    let checks = required_tools(archiver, use_sudo, verify)
        .into_iter()
        .map(|(tool, package)| match locate_tool(&tool, extra_dirs) {
            Some(path) => CheckResult::pass_with(&tool, &path),
            None => CheckResult::fail(
                &tool,
                &format!("Not found. Install the '{}' package.", package),
            ),
        })
        .collect();

    PreflightReport { checks }
}

/// Run preflight and bail if any check fails.
pub fn run_preflight_or_fail(archiver: &str, use_sudo: bool, verify: bool) -> Result<()> {
    println!("Checking host tools...");
    let report = check_host_tools(archiver, use_sudo, verify);
    report.print();

    if !report.all_passed() {
        bail!(
            "Preflight failed: {} required tool(s) missing",
            report.fail_count()
        );
    }
    Ok(())
}
