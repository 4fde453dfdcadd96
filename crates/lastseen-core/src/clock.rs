//! Wall-clock abstraction.
//!
//! The daily clear fires at a local wall-clock time, so the scheduler needs
//! "what time is it now" rather than a monotonic instant. Tokio timers still
//! do the actual waiting; the clock only decides how long to wait.
//!
//! Wall-clock readings are resolved to absolute instants before they are
//! subtracted, so a daylight-saving shift between now and the next clear
//! time is accounted for.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// Source of the current local date and time.
pub trait Clock: Send + Sync {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;

    /// Resolve a local wall-clock reading to an absolute instant.
    ///
    /// A reading that occurs twice (clocks going back) resolves to the
    /// earlier instant. A reading skipped by clocks going forward has no
    /// instant and yields `None`.
    fn resolve(&self, local: NaiveDateTime) -> Option<DateTime<Utc>>;
}

/// The host's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn resolve(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        Local
            .from_local_datetime(&local)
            .earliest()
            .map(|at| at.with_timezone(&Utc))
    }
}

/// A clock frozen at a fixed instant, with no offset transitions.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }

    fn resolve(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        Some(Utc.from_utc_datetime(&local))
    }
}
