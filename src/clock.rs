//! Wall clocks

use std::{
    fmt::Debug,
    sync::{PoisonError, RwLock},
};

use jiff::{SignedDuration, Timestamp};

/// Source of the current time for creation stamps, expiry checks and sweep
/// cutoffs.
pub trait Clock: Debug + Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> Timestamp;
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<Timestamp>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Jump to an absolute point in time.
    pub fn set(&self, now: Timestamp) {
        *self.now.write().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Move the clock by `delta`, which may be negative.
    ///
    /// # Errors
    ///
    /// Returns an error if the result falls outside the supported timestamp range;
    /// the clock is left unchanged.
    pub fn advance(&self, delta: SignedDuration) -> Result<Timestamp, jiff::Error> {
        let mut now = self.now.write().unwrap_or_else(PoisonError::into_inner);

        *now = now.checked_add(delta)?;

        Ok(*now)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }
}
