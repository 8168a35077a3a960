//! Device registry and per-serial queries over adb.
//!
//! `Adb` is a pure query layer: it lists visible devices and reads
//! properties, but never retries and never mutates device state (the one
//! exception, lock-screen dismissal, is an advisory input injection).
//! Retry and deadline policy belong to the callers.

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::exec::{CommandExecutor, SystemExecutor};

/// Registry state of one visible device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Fully enumerated and usable. Only this state counts for resolution.
    Device,
    Offline,
    Unauthorized,
    Unknown,
}

impl DeviceState {
    fn from_token(token: &str) -> Self {
        match token {
            "device" => DeviceState::Device,
            "offline" => DeviceState::Offline,
            "unauthorized" => DeviceState::Unauthorized,
            _ => DeviceState::Unknown,
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceState::Device => "device",
            DeviceState::Offline => "offline",
            DeviceState::Unauthorized => "unauthorized",
            DeviceState::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Point-in-time view of the visible devices: serial to state.
///
/// Two snapshots are comparable only by the serials they contain; state
/// changes between snapshots are expected and normal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSnapshot {
    devices: HashMap<String, DeviceState>,
}

impl DeviceSnapshot {
    /// Parse `adb devices` output.
    ///
    /// Expected per-device grammar: `<serial> <whitespace> <state-token>`.
    /// Lines that don't match (the "List of devices attached" header, daemon
    /// startup banners, blank lines) are skipped, never an error.
    pub fn parse(output: &str) -> Self {
        let mut devices = HashMap::new();
        for line in output.lines() {
            if let Some((serial, state)) = parse_device_line(line) {
                devices.insert(serial, state);
            }
        }
        Self { devices }
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn state_of(&self, serial: &str) -> Option<DeviceState> {
        self.devices.get(serial).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DeviceState)> {
        self.devices.iter()
    }

    /// Serials present here but absent from `earlier`, sorted for
    /// deterministic reporting. The only sanctioned way to attribute a
    /// serial to a launch.
    pub fn new_serials(&self, earlier: &DeviceSnapshot) -> Vec<String> {
        let mut new: Vec<String> = self
            .devices
            .keys()
            .filter(|serial| !earlier.devices.contains_key(*serial))
            .cloned()
            .collect();
        new.sort();
        new
    }
}

/// One line of `adb devices` output, or None if it isn't a device line.
fn parse_device_line(line: &str) -> Option<(String, DeviceState)> {
    let mut fields = line.split_whitespace();
    let serial = fields.next()?;
    let state = fields.next()?;
    // Header and banner lines have more than two fields
    if fields.next().is_some() {
        return None;
    }
    Some((serial.to_string(), DeviceState::from_token(state)))
}

/// The three independently queried boot-readiness properties.
///
/// Values are raw property strings; `booted()` is the only interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootSignals {
    pub dev_boot_complete: String,
    pub sys_boot_complete: String,
    pub boot_anim: String,
}

impl BootSignals {
    /// Booted iff all three signals hold at once. Conjunctive on purpose:
    /// a regressed signal makes the device not-booted again.
    pub fn booted(&self) -> bool {
        self.dev_boot_complete == "1"
            && self.sys_boot_complete == "1"
            && self.boot_anim == "stopped"
    }
}

const DEV_BOOT_COMPLETE_PROP: &str = "dev.bootcomplete";
const SYS_BOOT_COMPLETE_PROP: &str = "sys.boot_completed";
const BOOT_ANIM_PROP: &str = "init.svc.bootanim";

/// Query layer over the adb binary at an explicit location.
pub struct Adb {
    path: PathBuf,
    exec: Box<dyn CommandExecutor>,
}

impl Adb {
    /// Locate adb under `android_home` (platform-tools/adb must exist).
    pub fn new(android_home: &Path) -> Result<Self, Error> {
        let path = android_home.join("platform-tools").join("adb");
        if !path.exists() {
            return Err(Error::Config(format!("adb not found at {}", path.display())));
        }
        Ok(Self::with_executor(path, Box::new(SystemExecutor)))
    }

    /// Build over a specific executor (tests script adb output through this).
    pub fn with_executor(path: PathBuf, exec: Box<dyn CommandExecutor>) -> Self {
        Self { path, exec }
    }

    /// List currently visible devices. An empty device list is an empty
    /// snapshot, not a failure; a failing adb invocation is an error the
    /// caller's polling loop absorbs.
    pub fn snapshot(&self) -> Result<DeviceSnapshot> {
        let out = self.exec.run(&self.path, &["devices"])?;
        if !out.success() {
            bail!("adb devices exited with {}: {}", out.exit_code, out.stderr.trim());
        }
        Ok(DeviceSnapshot::parse(&out.stdout))
    }

    /// Read one property from a device, trimmed.
    pub fn getprop(&self, serial: &str, prop: &str) -> Result<String> {
        let out = self
            .exec
            .run(&self.path, &["-s", serial, "shell", "getprop", prop])?;
        if !out.success() {
            bail!(
                "adb getprop {} exited with {}: {}",
                prop,
                out.exit_code,
                out.stderr.trim()
            );
        }
        Ok(out.stdout.trim().to_string())
    }

    /// Read all three boot signals, fresh. Each is a separate query, so the
    /// values may reflect slightly different instants; poll granularity
    /// makes that acceptable slop.
    pub fn boot_signals(&self, serial: &str) -> Result<BootSignals> {
        Ok(BootSignals {
            dev_boot_complete: self.getprop(serial, DEV_BOOT_COMPLETE_PROP)?,
            sys_boot_complete: self.getprop(serial, SYS_BOOT_COMPLETE_PROP)?,
            boot_anim: self.getprop(serial, BOOT_ANIM_PROP)?,
        })
    }

    /// Send the wake + menu key events that clear the lock screen.
    /// Advisory: callers treat a failure here as a warning, not an error.
    pub fn dismiss_lock_screen(&self, serial: &str) -> Result<()> {
        self.exec
            .run(&self.path, &["-s", serial, "shell", "input", "keyevent", "82"])?;
        self.exec
            .run(&self.path, &["-s", serial, "shell", "input", "keyevent", "1"])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::FakeExecutor;

    const SAMPLE_DEVICES: &str = "\
List of devices attached
emulator-5554\tdevice
emulator-5556\toffline
0a388e93\tunauthorized
";

    fn adb_with(fake: FakeExecutor) -> Adb {
        Adb::with_executor(PathBuf::from("adb"), Box::new(fake))
    }

    #[test]
    fn parses_sample_output_and_skips_header() {
        let snap = DeviceSnapshot::parse(SAMPLE_DEVICES);
        assert_eq!(snap.len(), 3);
        assert_eq!(snap.state_of("emulator-5554"), Some(DeviceState::Device));
        assert_eq!(snap.state_of("emulator-5556"), Some(DeviceState::Offline));
        assert_eq!(snap.state_of("0a388e93"), Some(DeviceState::Unauthorized));
    }

    #[test]
    fn skips_daemon_banner_and_blank_lines() {
        let output = "\
* daemon not running; starting now at tcp:5037
* daemon started successfully

List of devices attached
emulator-5554\tdevice

";
        let snap = DeviceSnapshot::parse(output);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.state_of("emulator-5554"), Some(DeviceState::Device));
    }

    #[test]
    fn unknown_state_token_maps_to_unknown() {
        let snap = DeviceSnapshot::parse("emulator-5554\tbootloader\n");
        assert_eq!(snap.state_of("emulator-5554"), Some(DeviceState::Unknown));
    }

    #[test]
    fn empty_output_is_empty_snapshot_not_error() {
        let snap = DeviceSnapshot::parse("List of devices attached\n\n");
        assert!(snap.is_empty());
    }

    #[test]
    fn new_serials_is_a_pure_membership_diff() {
        let pre = DeviceSnapshot::parse("emulator-5554\tdevice\n");
        let current = DeviceSnapshot::parse(
            "emulator-5554\toffline\nemulator-5556\tdevice\nemulator-5558\toffline\n",
        );
        // State change of a pre-existing serial is not a new device
        assert_eq!(current.new_serials(&pre), vec!["emulator-5556", "emulator-5558"]);
        assert!(pre.new_serials(&current).is_empty());
    }

    #[test]
    fn snapshot_is_idempotent_without_device_changes() {
        let fake = FakeExecutor::new();
        fake.enqueue("adb devices", SAMPLE_DEVICES);
        let adb = adb_with(fake);

        let first = adb.snapshot().unwrap();
        let second = adb.snapshot().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn boot_signals_issues_three_separate_queries() {
        let fake = FakeExecutor::new();
        fake.enqueue("adb -s emulator-5554 shell getprop dev.bootcomplete", "1\n");
        fake.enqueue("adb -s emulator-5554 shell getprop sys.boot_completed", "1\n");
        fake.enqueue("adb -s emulator-5554 shell getprop init.svc.bootanim", "stopped\n");
        let adb = adb_with(fake);

        let signals = adb.boot_signals("emulator-5554").unwrap();
        assert!(signals.booted());
    }

    #[test]
    fn booted_is_conjunctive() {
        let cases = [
            ("0", "1", "stopped"),
            ("1", "0", "stopped"),
            ("1", "1", "running"),
        ];
        for (dev, sys, anim) in cases {
            let signals = BootSignals {
                dev_boot_complete: dev.into(),
                sys_boot_complete: sys.into(),
                boot_anim: anim.into(),
            };
            assert!(!signals.booted(), "{:?} must not count as booted", signals);
        }
    }
}
