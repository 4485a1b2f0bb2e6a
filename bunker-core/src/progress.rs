use std::time::{Duration, Instant};

/// Rate limiter for progress reporting: `due` returns true at most once per
/// `interval` of wall-clock time. The clock is injectable so the copy loop's
/// reporting cadence can be tested without real sleeps.
#[derive(Debug)]
pub(crate) struct ProgressReporter<C = fn() -> Instant> {
    interval: Duration,
    last: Instant,
    clock: C,
}

impl ProgressReporter {
    pub(crate) fn new(interval: Duration) -> Self {
        Self::with_clock(interval, Instant::now)
    }
}

impl<C: Fn() -> Instant> ProgressReporter<C> {
    pub(crate) fn with_clock(interval: Duration, clock: C) -> Self {
        let last = clock();
        ProgressReporter {
            interval,
            last,
            clock,
        }
    }

    pub(crate) fn due(&mut self) -> bool {
        let now = (self.clock)();
        if now.duration_since(self.last) >= self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }
}
