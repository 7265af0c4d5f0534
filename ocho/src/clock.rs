//! Frame clock.
use std::{
    thread,
    time::{Duration, Instant},
};

/// Timer to synchronize the driver loop with the frame cadence of the
/// virtual machine.
///
/// It is designed to work with the yielding cooperative pattern of the
/// interpreter loop. Time spent executing instructions or servicing
/// devices between frames is taken into account when waiting for the
/// next frame boundary.
pub(crate) struct Clock {
    last: Instant,
    period: Duration,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    pub(crate) fn from_nanos(nanos: u64) -> Self {
        Self {
            last: Instant::now(),
            period: Duration::from_nanos(nanos),
        }
    }

    /// Set the clock state back to zero.
    pub(crate) fn reset(&mut self) {
        self.last = Instant::now()
    }

    /// Block the current thread until the next frame boundary.
    pub(crate) fn wait(&mut self) {
        loop {
            if self.last.elapsed() < self.period {
                // Sleep does not have enough resolution to hold 60 Hz,
                // and spinning causes high CPU usage and fan madness.
                //
                // Yielding in a loop is the best alternative.
                thread::yield_now();
            } else {
                // Reset back to zero, rather than trying to catch up.
                //
                // If the machine was paused for debugging, and a large
                // amount of time has elapsed until it is resumed, it
                // should simply continue at its usual pace.
                self.reset();
                return;
            }
        }
    }
}
