// src/shell.rs

//! Subprocess execution helpers
//!
//! All external work (git, gpg, tar, unzip, recipe commands) runs through
//! here: stdin nullified, stdout/stderr captured, optional deadline via
//! `wait-timeout`. Failures carry the command line and the captured
//! standard error so they can be surfaced verbatim.

use crate::error::{Error, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::debug;
use wait_timeout::ChildExt;

/// Captured output of a successful subprocess
#[derive(Debug)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run an external tool to completion. Non-zero exit or a blown deadline
/// is `Error::Subprocess` with the captured stderr.
pub fn run_tool(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    env: &[(&str, &str)],
    timeout: Option<Duration>,
) -> Result<ToolOutput> {
    let cmd_display = format!("{program} {}", args.join(" "));
    debug!("running: {cmd_display}");

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    for (key, value) in env {
        command.env(key, value);
    }

    let mut child = command.spawn().map_err(|e| Error::Subprocess {
        command: cmd_display.clone(),
        stderr: e.to_string(),
    })?;

    let status = match timeout {
        Some(deadline) => match child.wait_timeout(deadline)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Subprocess {
                    command: cmd_display,
                    stderr: format!("timed out after {} seconds", deadline.as_secs()),
                });
            }
        },
        None => child.wait()?,
    };

    let output = child.wait_with_output()?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !status.success() {
        return Err(Error::Subprocess {
            command: cmd_display,
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(ToolOutput { stdout, stderr })
}

/// Run one recipe command through the shell in the current working
/// directory, inheriting the process environment. A non-zero exit is
/// `BuildStepFailed` with the command and its stderr.
pub fn run_recipe_command(command: &str) -> Result<()> {
    debug!("recipe command: {command}");

    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| Error::BuildStepFailed {
            command: command.to_string(),
            stderr: e.to_string(),
        })?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        debug!("[build] {line}");
    }

    if !output.status.success() {
        return Err(Error::BuildStepFailed {
            command: command.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}
