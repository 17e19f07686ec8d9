//! # Timestamp Tracking
//!
//! Wall-clock marks with microsecond resolution and the elapsed-time
//! arithmetic behind `<timestamp name=.. delta=.. total=../>`.
//!
//! Elapsed values are computed component-wise: seconds are subtracted
//! directly and, when the later microsecond component is smaller than the
//! earlier one, one second is borrowed. They render as `S.UUUUUU`.

use std::fmt::{self, Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const MICROS_PER_SEC: u32 = 1_000_000;

/// A wall-clock instant as `(seconds, microseconds)` since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mark {
    pub secs: i64,
    pub micros: u32,
}

impl Mark {
    pub const fn new(secs: i64, micros: u32) -> Self {
        Self { secs, micros }
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(since) => Self::new(
                i64::try_from(since.as_secs()).unwrap_or(i64::MAX),
                since.subsec_micros(),
            ),
            // clock set before 1970; keep the ordering consistent
            Err(before) => {
                let before = before.duration();
                let secs = -i64::try_from(before.as_secs()).unwrap_or(i64::MAX);
                match before.subsec_micros() {
                    0 => Self::new(secs, 0),
                    micros => Self::new(secs - 1, MICROS_PER_SEC - micros),
                }
            }
        }
    }

    /// Time elapsed from `earlier` to `self`, borrowing a second if needed.
    pub fn elapsed_since(self, earlier: Mark) -> Elapsed {
        let mut secs = self.secs - earlier.secs;
        let micros = if self.micros >= earlier.micros {
            self.micros - earlier.micros
        } else {
            secs -= 1;
            self.micros + MICROS_PER_SEC - earlier.micros
        };
        Elapsed { secs, micros }
    }
}

/// An elapsed interval rendered as `seconds.microseconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Elapsed {
    pub secs: i64,
    pub micros: u32,
}

impl From<Duration> for Elapsed {
    fn from(value: Duration) -> Self {
        Self {
            secs: i64::try_from(value.as_secs()).unwrap_or(i64::MAX),
            micros: value.subsec_micros(),
        }
    }
}

impl Display for Elapsed {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.secs, self.micros)
    }
}

/// Source of wall-clock marks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Mark;
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Mark {
        Mark::from_system_time(SystemTime::now())
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<Mark>>,
}

impl ManualClock {
    pub fn new(start: Mark) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, mark: Mark) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = mark;
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let micros = current.micros + by.subsec_micros();
        let whole = i64::try_from(by.as_secs()).unwrap_or(i64::MAX);
        current.secs += whole + i64::from(micros / MICROS_PER_SEC);
        current.micros = micros % MICROS_PER_SEC;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Mark {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Elapsed times reported by one timestamp request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampDeltas {
    /// Since the previous timestamp (or since creation for the first one).
    pub delta: Elapsed,
    /// Since the tracker was created.
    pub total: Elapsed,
}

/// Creation epoch plus the last mark handed out.
pub struct TimeTracker {
    clock: Box<dyn Clock>,
    epoch0: Mark,
    last_mark: Mark,
}

impl TimeTracker {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        let epoch0 = clock.now();
        Self {
            clock,
            epoch0,
            last_mark: epoch0,
        }
    }

    pub fn epoch(&self) -> Mark {
        self.epoch0
    }

    /// Sample the clock once, report both intervals and advance the last mark.
    pub fn mark(&mut self) -> TimestampDeltas {
        let now = self.clock.now();
        let delta = now.elapsed_since(self.last_mark);
        let total = now.elapsed_since(self.epoch0);
        if now > self.last_mark {
            self.last_mark = now;
        }
        TimestampDeltas { delta, total }
    }

    /// Time since creation, without moving the last mark.
    pub fn since_start(&self) -> Elapsed {
        self.clock.now().elapsed_since(self.epoch0)
    }
}

impl Default for TimeTracker {
    fn default() -> Self {
        Self::new(Box::new(SystemClock))
    }
}

impl fmt::Debug for TimeTracker {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeTracker")
            .field("epoch0", &self.epoch0)
            .field("last_mark", &self.last_mark)
            .finish_non_exhaustive()
    }
}
