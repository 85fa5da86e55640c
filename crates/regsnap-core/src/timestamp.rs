//! Timestamp generation and run file naming.
//!
//! Stamps are filename-safe `DDD-HH-MM-SS` strings (zero-padded day-of-year,
//! hour, minute, second) read from the local wall clock. A run generates two
//! stamps independently — one when naming the capture file and one when
//! naming the archive directory — so the two may differ when a run straddles
//! a second boundary. That is preserved behavior, not a bug to fix.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{Datelike, Local, NaiveDateTime, TimeDelta, Timelike};

/// Prefix of the decode stage's output file.
pub const DESCRIPTION_PREFIX: &str = "description_";

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of local wall-clock readings.
///
/// The pipeline takes a boxed `Clock` so tests can inject fixed or ticking
/// clocks instead of the system time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// The real local system clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock pinned to one instant. Every call returns the same time.
pub struct FixedClock {
    at: NaiveDateTime,
}

impl FixedClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self { at }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.at
    }
}

/// A clock that advances by a fixed number of seconds on every call.
///
/// With a one-second step, the two stamp generations of a single run land on
/// different seconds — the straddling-a-second case.
pub struct TickingClock {
    start: NaiveDateTime,
    step_secs: i64,
    calls: AtomicI64,
}

impl TickingClock {
    pub fn new(start: NaiveDateTime, step_secs: i64) -> Self {
        Self {
            start,
            step_secs,
            calls: AtomicI64::new(0),
        }
    }
}

impl Clock for TickingClock {
    fn now(&self) -> NaiveDateTime {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.start + TimeDelta::seconds(n * self.step_secs)
    }
}

// ---------------------------------------------------------------------------
// Stamp rendering and file naming
// ---------------------------------------------------------------------------

/// Render a `DDD-HH-MM-SS` stamp: zero-padded day-of-year, hour, minute,
/// second. January 1st is day `001`.
pub fn day_stamp(at: NaiveDateTime) -> String {
    format!(
        "{:03}-{:02}-{:02}-{:02}",
        at.ordinal(),
        at.hour(),
        at.minute(),
        at.second()
    )
}

/// Capture file name for a stamp: `<stamp>.txt`.
pub fn capture_file_name(stamp: &str) -> String {
    format!("{stamp}.txt")
}

/// Description file name for a capture file: `description_<capture-name>`.
pub fn description_file_name(capture_name: &str) -> String {
    format!("{DESCRIPTION_PREFIX}{capture_name}")
}
