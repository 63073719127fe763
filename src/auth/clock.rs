//! Injectable time source.
//!
//! The lockout and rate-limit windows are all comparisons against "now", so
//! the services take a clock handle instead of reading the system time
//! directly. Tests drive the window boundaries with [`ManualClock`].

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time; the only implementation used outside tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
