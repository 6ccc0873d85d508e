// Wall-clock source. The scheduler reads one snapshot per tick and derives
// every boundary crossing from it, so an NTP update landing between ticks
// can never split a tick's view of time.

use chrono::{DateTime, Datelike, Timelike, Utc};
use std::time::Instant;

/// One coherent read of the wall clock.
#[derive(Debug, Clone, Copy)]
pub struct ClockSnapshot {
    pub epoch: u64,
    pub year: i32,
    pub month: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl ClockSnapshot {
    /// A year before 2000 means time sync has not happened yet; all
    /// calendar bookkeeping stays suspended until this turns true.
    pub fn is_synchronized(&self) -> bool {
        self.year >= 2000
    }
}

pub trait Clock {
    fn now(&self) -> ClockSnapshot;

    /// Monotonic milliseconds since an arbitrary origin. Unlike `now()`
    /// this never jumps when the wall clock syncs; it paces the sub-second
    /// sampling cadence.
    fn monotonic_ms(&self) -> u64;
}

fn snapshot_from(time: DateTime<Utc>) -> ClockSnapshot {
    ClockSnapshot {
        epoch: time.timestamp().max(0) as u64,
        year: time.year(),
        month: time.month(),
        hour: time.hour(),
        minute: time.minute(),
        second: time.second(),
    }
}

/// Host clock backed by `chrono::Utc`.
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> ClockSnapshot {
        snapshot_from(Utc::now())
    }

    fn monotonic_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Manually advanced clock for tests and the simulation harness.
///
/// `advance` moves both the monotonic and the wall clock; `set_epoch` jumps
/// only the wall clock, which is exactly what an NTP sync does.
pub struct ManualClock {
    epoch_ms: u64,
    mono_ms: u64,
}

impl ManualClock {
    pub fn new(epoch_secs: u64) -> Self {
        Self {
            epoch_ms: epoch_secs * 1000,
            mono_ms: 0,
        }
    }

    pub fn advance(&mut self, ms: u64) {
        self.epoch_ms += ms;
        self.mono_ms += ms;
    }

    pub fn set_epoch(&mut self, epoch_secs: u64) {
        self.epoch_ms = epoch_secs * 1000;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> ClockSnapshot {
        let time = DateTime::<Utc>::from_timestamp((self.epoch_ms / 1000) as i64, 0)
            .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap());
        snapshot_from(time)
    }

    fn monotonic_ms(&self) -> u64 {
        self.mono_ms
    }
}
