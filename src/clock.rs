//! Injectable "now" hint so timestamp reconstruction is deterministic in tests.

use chrono::{DateTime, Utc};

/// Source of the current wall-clock time.
///
/// The parser never calls `Utc::now()` directly; every entry point that
/// reconstructs a sent-time from a partial APRS timestamp takes a `&dyn
/// Clock` so tests can pin the hint.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
