//! Bounded retry: sleep, test, repeat until success or deadline.
//!
//! Serial resolution and boot waiting are both thin specializations of
//! [`run_until`] with different condition predicates.

use std::thread;
use std::time::{Duration, Instant};

/// Wall-clock budget for one polling phase.
///
/// Expiry is recomputed from `Instant::now()` at each check, never cached.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started_at: Instant,
    timeout: Duration,
}

impl Deadline {
    pub fn new(timeout: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn expired(&self) -> bool {
        self.started_at.elapsed() > self.timeout
    }
}

/// The condition never held before the deadline passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExpired {
    pub elapsed: Duration,
    pub timeout: Duration,
}

/// Sleep `poll_interval`, then test `condition`; repeat until it yields a
/// value or the deadline expires.
///
/// Expiry is checked before committing to each round, so a slow condition
/// call can consume budget but never extend the effective deadline.
pub fn run_until<T>(
    deadline: &Deadline,
    poll_interval: Duration,
    mut condition: impl FnMut() -> Option<T>,
) -> Result<T, DeadlineExpired> {
    loop {
        if deadline.expired() {
            return Err(DeadlineExpired {
                elapsed: deadline.elapsed(),
                timeout: deadline.timeout,
            });
        }
        thread::sleep(poll_interval);
        if let Some(value) = condition() {
            return Ok(value);
        }
    }
}
