//! Wall-clock access.
//!
//! The backend speaks in absolute timestamps ("results ready at 10:00:02Z")
//! while waiting happens on tokio timers. Going through [`Clock`] lets tests
//! pause tokio time and still get consistent wall-clock readings.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;

    /// How long until `at`. Zero if `at` has already passed.
    fn until(&self, at: DateTime<Utc>) -> Duration {
        (at - self.now()).to_std().unwrap_or(Duration::ZERO)
    }
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A wall clock that advances with tokio's time driver.
///
/// Reads an anchor time once, then adds however much tokio time has elapsed.
/// Under `tokio::time::pause` it only moves when the runtime advances time.
#[derive(Debug, Clone, Copy)]
pub struct InstantClock {
    anchor: DateTime<Utc>,
    started: tokio::time::Instant,
}

impl InstantClock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Default for InstantClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for InstantClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.started.elapsed()).unwrap_or(TimeDelta::MAX);
        self.anchor
            .checked_add_signed(elapsed)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
