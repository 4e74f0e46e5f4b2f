//! Timer sources for fetch timing.
//!
//! A timer source hands out a start mark together with a [`Stopwatch`]; stopping
//! the stopwatch yields the end mark and the elapsed time. Marks are offsets
//! from the source's own epoch, so they are only comparable within one source.

use std::fmt;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A point in time, relative to the timer source's epoch.
pub type Mark = Duration;

/// Completion half of a timing measurement.
pub struct Stopwatch {
    stop: Box<dyn FnOnce() -> (Mark, Duration) + Send>,
}

impl Stopwatch {
    pub fn new<F>(stop: F) -> Self
    where
        F: FnOnce() -> (Mark, Duration) + Send + 'static,
    {
        Self {
            stop: Box::new(stop),
        }
    }

    /// Take the end mark and elapsed time.
    pub fn stop(self) -> (Mark, Duration) {
        (self.stop)()
    }
}

impl fmt::Debug for Stopwatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stopwatch").finish_non_exhaustive()
    }
}

/// Source of start marks and stopwatches.
pub trait TimerSource: Send + Sync + 'static {
    fn start(&self) -> (Mark, Stopwatch);
}

impl<F> TimerSource for F
where
    F: Fn() -> (Mark, Stopwatch) + Send + Sync + 'static,
{
    fn start(&self) -> (Mark, Stopwatch) {
        self()
    }
}

/// Wall-clock time in whole milliseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    fn now() -> Mark {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Duration::from_millis(since_epoch.as_millis() as u64)
    }
}

impl TimerSource for SystemClock {
    fn start(&self) -> (Mark, Stopwatch) {
        let start = Self::now();
        let stopwatch = Stopwatch::new(move || {
            let end = Self::now();
            // The wall clock may step backwards.
            (end, end.saturating_sub(start))
        });
        (start, stopwatch)
    }
}

/// Monotonic, high-resolution time since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerSource for MonotonicClock {
    fn start(&self) -> (Mark, Stopwatch) {
        let origin = self.origin;
        let start = origin.elapsed();
        let stopwatch = Stopwatch::new(move || {
            let end = origin.elapsed();
            (end, end.saturating_sub(start))
        });
        (start, stopwatch)
    }
}
