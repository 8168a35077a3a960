//! End-to-end launch lifecycle.
//!
//! Drives one run through its stages: pre-launch snapshot, detached launch,
//! snapshot-diff serial resolution, optional boot wait, lock-screen
//! dismissal. Ready and the timeout failures are the only terminal
//! outcomes; the emulator process is never touched after launch either way.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::adb::Adb;
use crate::boot::BootMonitor;
use crate::emulator::Emulator;
use crate::resolve::SerialResolver;

/// Lifecycle stages of one launch run.
///
/// `Ready` and `Failed` are the only terminal stages. `SerialPending` and
/// `BootPending` are where deadline expiry can strike; a launch refusal
/// fails out of `Launching`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    NotStarted,
    Launching,
    SerialPending,
    SerialResolved,
    BootPending,
    Ready,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::NotStarted => "not started",
            Stage::Launching => "launching",
            Stage::SerialPending => "waiting for serial",
            Stage::SerialResolved => "serial resolved",
            Stage::BootPending => "waiting for boot",
            Stage::Ready => "ready",
            Stage::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Tunables for one run.
pub struct SessionConfig {
    pub image: String,
    pub skin: Option<String>,
    pub options: Vec<String>,
    pub wait_for_boot: bool,
    pub serial_timeout: Duration,
    pub boot_timeout: Duration,
    pub poll_interval: Duration,
    pub log_path: PathBuf,
}

/// One launch run: fresh process, terminal outcome, no state carried over.
pub struct Session<'a> {
    adb: &'a Adb,
    emulator: &'a Emulator,
    config: SessionConfig,
    stage: Stage,
}

impl<'a> Session<'a> {
    pub fn new(adb: &'a Adb, emulator: &'a Emulator, config: SessionConfig) -> Self {
        Self {
            adb,
            emulator,
            config,
            stage: Stage::NotStarted,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Run the lifecycle to a terminal stage and return the resolved serial.
    ///
    /// Every error exit lands in `Stage::Failed`; the detached emulator is
    /// left running either way.
    pub fn run(&mut self) -> Result<String> {
        match self.advance_to_ready() {
            Ok(serial) => Ok(serial),
            Err(err) => {
                self.stage = Stage::Failed;
                Err(err)
            }
        }
    }

    fn advance_to_ready(&mut self) -> Result<String> {
        let pre = self
            .adb
            .snapshot()
            .context("failed to query device registry before launch")?;

        if !pre.is_empty() {
            println!();
            println!("{}", "Running devices:".blue().bold());
            for (serial, state) in pre.iter() {
                println!("  * {} ({})", serial, state);
            }
        }

        self.stage = Stage::Launching;
        println!();
        println!("{}", "Start AVD image".blue().bold());
        let handle = self.emulator.launch(
            &self.config.image,
            self.config.skin.as_deref(),
            &self.config.options,
            &self.config.log_path,
        )?;
        println!(
            "  emulator started (pid {}), log: {}",
            handle.pid,
            handle.log_path.display()
        );

        self.stage = Stage::SerialPending;
        println!();
        println!("{}", "Looking for started device serial".blue().bold());
        let serial = SerialResolver::new(self.adb)
            .poll_interval(self.config.poll_interval)
            .resolve(&pre, self.config.serial_timeout)?;
        self.stage = Stage::SerialResolved;
        println!("  {} {}", "started device serial:".green(), serial);

        if self.config.wait_for_boot {
            self.stage = Stage::BootPending;
            println!();
            println!("{}", "Waiting for device boot".blue().bold());
            BootMonitor::new(self.adb)
                .poll_interval(self.config.poll_interval)
                .wait_until_booted(&serial, self.config.boot_timeout)?;

            // Advisory: a failure to clear the lock screen must not fail
            // an otherwise completed boot wait
            if let Err(err) = self.adb.dismiss_lock_screen(&serial) {
                println!(
                    "  {} failed to dismiss lock screen: {:#}",
                    "WARN:".yellow(),
                    err
                );
            }
        }

        self.stage = Stage::Ready;
        Ok(serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::FakeExecutor;
    use std::fs;
    use std::rc::Rc;

    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    fn fake_sdk() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("emulator").join("emulator");
        fs::create_dir_all(bin.parent().unwrap()).unwrap();
        fs::write(&bin, "#!/bin/sh\nexit 0\n").unwrap();
        #[cfg(unix)]
        fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();
        dir
    }

    fn config(log_path: PathBuf, wait_for_boot: bool) -> SessionConfig {
        SessionConfig {
            image: "Pixel_4_API_29".into(),
            skin: None,
            options: Vec::new(),
            wait_for_boot,
            serial_timeout: Duration::from_millis(500),
            boot_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(1),
            log_path,
        }
    }

    #[cfg(unix)]
    #[test]
    fn full_lifecycle_reaches_ready() {
        let sdk = fake_sdk();
        let emulator = Emulator::new(sdk.path()).unwrap();

        let fake = Rc::new(FakeExecutor::new());
        fake.enqueue("adb devices", "List of devices attached\n");
        fake.enqueue(
            "adb devices",
            "List of devices attached\nemulator-5554\tdevice\n",
        );
        fake.enqueue("adb -s emulator-5554 shell getprop dev.bootcomplete", "1\n");
        fake.enqueue("adb -s emulator-5554 shell getprop sys.boot_completed", "1\n");
        fake.enqueue("adb -s emulator-5554 shell getprop init.svc.bootanim", "stopped\n");
        fake.enqueue("adb -s emulator-5554 shell input keyevent 82", "");
        fake.enqueue("adb -s emulator-5554 shell input keyevent 1", "");
        let adb = Adb::with_executor(PathBuf::from("adb"), Box::new(fake.clone()));

        let log_path = sdk.path().join("emulator.log");
        let mut session = Session::new(&adb, &emulator, config(log_path, true));
        assert_eq!(session.stage(), Stage::NotStarted);

        let serial = session.run().unwrap();
        assert_eq!(serial, "emulator-5554");
        assert_eq!(session.stage(), Stage::Ready);
    }

    #[cfg(unix)]
    #[test]
    fn wait_for_boot_false_skips_boot_polling() {
        let sdk = fake_sdk();
        let emulator = Emulator::new(sdk.path()).unwrap();

        let fake = Rc::new(FakeExecutor::new());
        fake.enqueue("adb devices", "List of devices attached\n");
        fake.enqueue(
            "adb devices",
            "List of devices attached\nemulator-5554\tdevice\n",
        );
        let adb = Adb::with_executor(PathBuf::from("adb"), Box::new(fake.clone()));

        let log_path = sdk.path().join("emulator.log");
        let mut session = Session::new(&adb, &emulator, config(log_path, false));
        let serial = session.run().unwrap();
        assert_eq!(serial, "emulator-5554");

        // No getprop or input calls were ever made
        assert!(fake.calls().iter().all(|c| !c.contains("getprop")));
        assert!(fake.calls().iter().all(|c| !c.contains("input")));
    }

    #[cfg(unix)]
    #[test]
    fn resolution_timeout_ends_in_terminal_failed_stage() {
        let sdk = fake_sdk();
        let emulator = Emulator::new(sdk.path()).unwrap();

        let fake = FakeExecutor::new();
        fake.enqueue("adb devices", "List of devices attached\n");
        let adb = Adb::with_executor(PathBuf::from("adb"), Box::new(fake));

        let log_path = sdk.path().join("emulator.log");
        let mut cfg = config(log_path, true);
        cfg.serial_timeout = Duration::from_millis(20);
        let mut session = Session::new(&adb, &emulator, cfg);

        let err = session.run().unwrap_err();
        assert!(err.to_string().contains("no new device serial"));
        assert_eq!(session.stage(), Stage::Failed);
    }

    #[cfg(unix)]
    #[test]
    fn boot_timeout_ends_in_terminal_failed_stage() {
        let sdk = fake_sdk();
        let emulator = Emulator::new(sdk.path()).unwrap();

        let fake = FakeExecutor::new();
        fake.enqueue("adb devices", "List of devices attached\n");
        fake.enqueue(
            "adb devices",
            "List of devices attached\nemulator-5554\tdevice\n",
        );
        // Boot animation never stops
        fake.enqueue("adb -s emulator-5554 shell getprop dev.bootcomplete", "1\n");
        fake.enqueue("adb -s emulator-5554 shell getprop sys.boot_completed", "1\n");
        fake.enqueue("adb -s emulator-5554 shell getprop init.svc.bootanim", "running\n");
        let adb = Adb::with_executor(PathBuf::from("adb"), Box::new(fake));

        let log_path = sdk.path().join("emulator.log");
        let mut cfg = config(log_path, true);
        cfg.boot_timeout = Duration::from_millis(20);
        let mut session = Session::new(&adb, &emulator, cfg);

        let err = session.run().unwrap_err();
        assert!(err.to_string().contains("did not finish booting"));
        assert_eq!(session.stage(), Stage::Failed);
    }
}
