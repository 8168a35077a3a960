//! Boot-readiness monitoring for a resolved serial.
//!
//! A device counts as booted only when the kernel, the system server and
//! the boot animation all report done in the same poll round. Nothing is
//! memoized between rounds: every round re-reads all three signals, so a
//! signal that regresses makes the device not-booted again.

use std::time::Duration;

use crate::adb::Adb;
use crate::deadline::{run_until, Deadline};
use crate::error::Error;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polls the three boot signals until all hold at once.
pub struct BootMonitor<'a> {
    adb: &'a Adb,
    poll_interval: Duration,
}

impl<'a> BootMonitor<'a> {
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

    /// Block until `serial` reports fully booted or the deadline passes.
    ///
    /// Transient query failures mean "not booted this round" and are
    /// retried; only deadline expiry is fatal.
    pub fn wait_until_booted(&self, serial: &str, timeout: Duration) -> Result<(), Error> {
        let deadline = Deadline::new(timeout);
        run_until(&deadline, self.poll_interval, || {
            println!("  > checking if device booted...");
            match self.adb.boot_signals(serial) {
                Ok(signals) if signals.booted() => Some(()),
                _ => None,
            }
        })
        .map_err(|_| Error::BootTimeout {
            serial: serial.to_string(),
            timeout,
        })
    }
}
