//! Injectable clock so deadline behavior is deterministically testable.
//!
//! The initialization state machine busy-polls with a sleep backoff under a
//! wall-clock deadline. Routing both `now` and `sleep` through a trait lets
//! tests drive the deadline with a manual clock instead of real time.

use std::time::{Duration, Instant};

/// Time source and sleep used by the device state machine.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Block for (at least) `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// Real wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only advances when slept on. Test-only.
#[cfg(test)]
pub(crate) struct ManualClock {
    base: Instant,
    elapsed: Duration,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new() -> Self {
        Self {
            base: Instant::now(),
            elapsed: Duration::ZERO,
        }
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed
    }

    fn sleep(&mut self, duration: Duration) {
        self.elapsed += duration;
    }
}
