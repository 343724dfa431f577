//! Wall clock used for `Expires` computation.

use std::fmt;
use std::time::{Duration, SystemTime};

/// Source of "now".
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> SystemTime;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock frozen at one instant, for deterministic header values.
///
/// # Example
///
/// ```
/// use cachet_core::clock::{Clock, FixedClock};
/// use std::time::{Duration, SystemTime};
///
/// let clock = FixedClock::from_unix_secs(1_700_000_000);
/// assert_eq!(clock.now(), SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(SystemTime);

impl FixedClock {
    pub fn new(at: SystemTime) -> Self {
        Self(at)
    }

    pub fn from_unix_secs(secs: u64) -> Self {
        Self(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}
