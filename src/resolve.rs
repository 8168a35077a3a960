//! Snapshot-diff serial resolution.
//!
//! The registry offers no launch-to-serial mapping, so the freshly started
//! instance is identified by diffing device-set membership before and after
//! the launch. Attribution requires the diff to contain exactly one serial
//! and that serial to be fully enumerated (`device` state) in the same
//! round.

use std::time::Duration;

use crate::adb::{Adb, DeviceSnapshot, DeviceState};
use crate::deadline::{run_until, Deadline};
use crate::error::Error;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polls the registry until the launched device's serial is attributable.
pub struct SerialResolver<'a> {
    adb: &'a Adb,
    poll_interval: Duration,
}

impl<'a> SerialResolver<'a> {
    pub fn new(adb: &'a Adb) -> Self {
        Self {
            adb,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Resolve the serial of the device launched after `pre` was taken.
    ///
    /// Zero new serials, several new serials (a concurrent launch raced this
    /// one) and transient registry failures all mean "not yet"; only
    /// deadline expiry ends the wait. A multi-serial diff cannot become
    /// unambiguous by waiting, so a persistent race degrades to timeout
    /// rather than a guess.
    pub fn resolve(&self, pre: &DeviceSnapshot, timeout: Duration) -> Result<String, Error> {
        let deadline = Deadline::new(timeout);
        run_until(&deadline, self.poll_interval, || {
            println!("  > checking for started device serial...");
            let current = self.adb.snapshot().ok()?;
            attribute_new_serial(pre, &current)
        })
        .map_err(|_| Error::ResolutionTimeout(timeout))
    }
}

/// Diff-based attribution: exactly one new serial, already in `device` state.
fn attribute_new_serial(pre: &DeviceSnapshot, current: &DeviceSnapshot) -> Option<String> {
    match current.new_serials(pre).as_slice() {
        [serial] if current.state_of(serial) == Some(DeviceState::Device) => {
            Some(serial.clone())
        }
        _ => None,
    }
}
