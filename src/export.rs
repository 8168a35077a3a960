//! Result publication into the pipeline's persistent key/value store.
//!
//! Later pipeline steps pick the serial up via `$BITRISE_EMULATOR_SERIAL`.
//! Publication is best-effort; the caller downgrades a failure to a warning
//! because the device itself is already usable at that point.

use anyhow::{bail, Result};
use std::path::Path;

use crate::exec::CommandExecutor;

pub const SERIAL_ENV_KEY: &str = "BITRISE_EMULATOR_SERIAL";

/// Publish the resolved serial for later pipeline steps.
pub fn publish_serial(exec: &dyn CommandExecutor, serial: &str) -> Result<()> {
    let out = exec.run(
        Path::new("envman"),
        &["add", "--key", SERIAL_ENV_KEY, "--value", serial],
    )?;
    if !out.success() {
        bail!(
            "envman add exited with {}: {}",
            out.exit_code,
            out.stderr.trim()
        );
    }
    Ok(())
}
