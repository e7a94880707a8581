//! Simulated time in whole seconds.

use crate::SimulationError;

/// Discrete clock for the time-stepped driver.
///
/// Time starts at second zero and only moves forward, one second per tick.
/// It is independent of wall-clock time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimClock {
    next_tick: u64,
}

impl SimClock {
    /// Creates a clock whose first tick is second zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last processed second, or zero before the first tick.
    pub fn now(&self) -> u64 {
        self.next_tick.saturating_sub(1)
    }

    /// Second the next tick will process.
    pub fn next_tick(&self) -> u64 {
        self.next_tick
    }

    /// Whether any second has been processed.
    pub fn has_started(&self) -> bool {
        self.next_tick > 0
    }

    /// Number of seconds processed so far.
    pub fn elapsed_secs(&self) -> u64 {
        self.next_tick
    }

    /// Advances by one second and returns the second to process.
    pub fn tick(&mut self) -> u64 {
        let current = self.next_tick;
        self.next_tick += 1;
        current
    }

    /// Number of ticks needed to have processed `target`.
    ///
    /// # Errors
    ///
    /// - `SimulationError::TimeRegression` - If `target` was already processed
    pub fn ticks_until(&self, target: u64) -> Result<u64, SimulationError> {
        if target < self.next_tick {
            return Err(SimulationError::TimeRegression {
                requested: target,
                next: self.next_tick,
            });
        }
        Ok(target - self.next_tick + 1)
    }
}
