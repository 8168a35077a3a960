//! Headless Android emulator launch orchestration for CI.
//!
//! One-shot flow: snapshot the adb device registry, start the emulator
//! detached, resolve the new instance's serial by snapshot diff, wait until
//! all three boot signals hold, then publish the serial for later pipeline
//! steps. Each run is a fresh, terminating process; the emulator it started
//! is deliberately left running.

pub mod adb;
pub mod avd;
pub mod boot;
pub mod deadline;
pub mod emulator;
pub mod error;
pub mod exec;
pub mod export;
pub mod resolve;
pub mod session;

// Re-export commonly used items
pub use adb::{Adb, BootSignals, DeviceSnapshot, DeviceState};
pub use deadline::{run_until, Deadline, DeadlineExpired};
pub use emulator::{Emulator, LaunchHandle};
pub use error::Error;
pub use exec::{CmdOutput, CommandExecutor, SystemExecutor};
pub use session::{Session, SessionConfig, Stage};
