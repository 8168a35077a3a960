//! Fatal error kinds for a launch run.
//!
//! Only these four terminate the run (exit code 1, distinct message each).
//! Everything else (malformed registry lines, momentarily empty snapshots,
//! ambiguous diffs) is absorbed by continued polling.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Required input missing, or the named AVD image is not discoverable.
    /// Raised before any process is launched.
    #[error("configuration error: {0}")]
    Config(String),

    /// The operating system refused to start the emulator process.
    #[error("failed to start emulator process: {0}")]
    Launch(std::io::Error),

    /// No unambiguous new serial appeared within the resolution deadline.
    /// The launched emulator is left running; its fate is untracked.
    #[error("no new device serial appeared within {}s", .0.as_secs())]
    ResolutionTimeout(Duration),

    /// The resolved device never reported all three boot signals in time.
    #[error("device {serial} did not finish booting within {}s", .timeout.as_secs())]
    BootTimeout { serial: String, timeout: Duration },
}
