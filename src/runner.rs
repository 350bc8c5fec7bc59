//! Executes (or only prints) a built archive command.

use anyhow::Result;
use std::path::PathBuf;

use crate::command::BuiltCommand;
use crate::error::BackupError;
use crate::process::Cmd;

/// Audit text: one token per line, then the shell-quoted single line.
pub fn format_audit(cmd: &Cmd) -> String {
    let mut out = String::from("Command:\n");
    for token in cmd.argv() {
        out.push_str(&token);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&cmd.display());
    out.push('\n');
    out
}

/// Run the archiver for `built`.
///
/// In dry-run mode only the audit output is printed and `None` is returned.
/// Otherwise mksquashfs runs with inherited stdio and a non-zero exit is
/// reported as `ArchiverFailed`. Returns the image path on success.
pub fn run_archiver(built: &BuiltCommand, dry_run: bool) -> Result<Option<PathBuf>> {
    let cmd = built.to_cmd()?;
    println!("{}", format_audit(&cmd));

    if dry_run {
        println!("Dry run: not executing.");
        return Ok(None);
    }

    let status = cmd.allow_fail().run_interactive()?;
    if !status.success() {
        return Err(BackupError::ArchiverFailed {
            code: status.code().unwrap_or(-1),
        }
        .into());
    }

    Ok(Some(built.image_path.clone()))
}
