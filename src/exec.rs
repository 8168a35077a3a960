//! Narrow command-execution seam.
//!
//! Every external tool invocation (adb, envman) goes through
//! [`CommandExecutor`], so the line parsers built on top can be exercised
//! against captured sample output without spawning real processes.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

/// Captured result of one external command invocation.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs an external command to completion and captures its output.
///
/// No per-call timeout: callers bound latency with their enclosing deadline.
pub trait CommandExecutor {
    fn run(&self, program: &Path, args: &[&str]) -> Result<CmdOutput>;
}

/// Executor backed by `std::process::Command`.
pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    fn run(&self, program: &Path, args: &[&str]) -> Result<CmdOutput> {
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("failed to run {} {}", program.display(), args.join(" ")))?;

        Ok(CmdOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}
