//! Fixed-frequency loop pacing.

use std::time::{Duration, Instant};

/// Keeps a loop at a constant frequency by sleeping away the rest of each cycle.
///
/// If an iteration overruns its cycle, `sleep` returns immediately. If it falls more
/// than a whole cycle behind, the schedule restarts from "now" instead of bursting
/// through the missed cycles.
#[derive(Debug, Clone)]
pub struct Rate {
    expected_cycle_time: Duration,
    actual_cycle_time: Duration,
    start_time: Instant,
}

impl Rate {
    /// Slowest supported loop: one cycle every 1000 s.
    pub const MIN_FREQUENCY: f64 = 1e-3;
    pub const MAX_FREQUENCY: f64 = 1e6;

    /// Whether `frequency` (Hz) is within the range config validators accept.
    pub fn is_valid_frequency(frequency: f64) -> bool {
        frequency.is_finite() && (Self::MIN_FREQUENCY..=Self::MAX_FREQUENCY).contains(&frequency)
    }

    /// `frequency` is in Hz. Non-positive or non-finite values yield a zero cycle
    /// (never sleeps); positive values below [`Rate::MIN_FREQUENCY`] are clamped to it.
    pub fn new(frequency: f64) -> Self {
        let expected_cycle_time = if frequency.is_finite() && frequency > 0.0 {
            Duration::try_from_secs_f64(1.0 / frequency.max(Self::MIN_FREQUENCY))
                .unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        };
        Self {
            expected_cycle_time,
            actual_cycle_time: Duration::ZERO,
            start_time: Instant::now(),
        }
    }

    pub fn expected_cycle_time(&self) -> Duration {
        self.expected_cycle_time
    }

    /// Time between the previous cycle start and the last `sleep` call.
    pub fn actual_cycle_time(&self) -> Duration {
        self.actual_cycle_time
    }

    /// Block until the end of the current cycle. Returns whether it slept.
    pub fn sleep(&mut self) -> bool {
        let now = Instant::now();
        match self.advance(now) {
            Some(remaining) => {
                std::thread::sleep(remaining);
                true
            }
            None => false,
        }
    }

    /// Move the schedule forward as if `sleep` were called at `now` and return how
    /// long to sleep, or `None` when the cycle is already over.
    fn advance(&mut self, now: Instant) -> Option<Duration> {
        let expected_end = self.start_time + self.expected_cycle_time;
        self.actual_cycle_time = now.saturating_duration_since(self.start_time);
        self.start_time = expected_end;

        if now > expected_end {
            if now > expected_end + self.expected_cycle_time {
                self.start_time = now;
            }
            return None;
        }
        Some(expected_end - now)
    }
}
