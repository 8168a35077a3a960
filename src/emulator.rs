//! Emulator launch: detached process with a log-file sink.
//!
//! The emulator's lifetime is intentionally decoupled from the
//! orchestrator's: we spawn it in its own process group, keep only its pid,
//! and never wait on or signal it. The orchestrator exiting (success or
//! failure) must not take the device down.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[cfg(unix)]
use std::os::unix::process::CommandExt;

use crate::error::Error;

/// Identity of the detached emulator process.
///
/// Deliberately holds no `Child`: ownership of the process transferred to
/// the operating system at spawn. Nothing in this crate joins this pid.
#[derive(Debug, Clone)]
pub struct LaunchHandle {
    pub pid: u32,
    pub log_path: PathBuf,
}

/// Locator and invocation builder for the emulator binary.
pub struct Emulator {
    path: PathBuf,
}

impl Emulator {
    /// Probe the known emulator locations under `android_home`.
    pub fn new(android_home: &Path) -> Result<Self, Error> {
        // Newer SDKs ship emulator/emulator; older ones tools/emulator
        // (emulator64-arm on Linux)
        let candidates = [
            "emulator/emulator",
            "tools/emulator",
            "tools/emulator64-arm",
        ];

        for relative in candidates {
            let path = android_home.join(relative);
            if path.exists() {
                return Ok(Self { path });
            }
        }
        Err(Error::Config(format!(
            "emulator binary not found under {}",
            android_home.display()
        )))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build the launch invocation with deterministic flag order: image
    /// name, skin flag (`-noskin` when absent), then caller options
    /// appended verbatim last so they can override anything earlier.
    pub fn start_command(&self, image: &str, skin: Option<&str>, extra_options: &[String]) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.arg("-avd").arg(image);
        match skin {
            Some(skin) => {
                cmd.arg("-skin").arg(skin);
            }
            None => {
                cmd.arg("-noskin");
            }
        }
        cmd.args(extra_options);
        cmd
    }

    /// Spawn the emulator detached, with combined stdout+stderr redirected
    /// to `log_path`.
    ///
    /// Fails only if the operating system refuses to create the process;
    /// anything the emulator does after that is observed through the device
    /// registry, not through this handle.
    pub fn launch(
        &self,
        image: &str,
        skin: Option<&str>,
        extra_options: &[String],
        log_path: &Path,
    ) -> Result<LaunchHandle, Error> {
        let log = File::create(log_path).map_err(Error::Launch)?;
        let err_log = log.try_clone().map_err(Error::Launch)?;

        let mut cmd = self.start_command(image, skin, extra_options);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(err_log));

        // Own process group: the emulator must survive this run's exit and
        // any signals delivered to our group
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(Error::Launch)?;
        let pid = child.id();
        // Dropping the Child without waiting is the point: fire-and-forget
        drop(child);

        Ok(LaunchHandle {
            pid,
            log_path: log_path.to_path_buf(),
        })
    }
}

/// Split free-form launch options the way a shell would.
pub fn split_options(raw: &str) -> Result<Vec<String>, Error> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    shlex::split(raw).ok_or_else(|| Error::Config(format!("unparseable emulator options: {}", raw)))
}
