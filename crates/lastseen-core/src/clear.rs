//! Daily cache-clear timer.
//!
//! The timer first fires at the next local occurrence of the configured
//! time of day (later today, or tomorrow if that time has already passed)
//! and then every 24 hours. Whether a fire actually empties the cache is
//! decided at fire time by the shared auto-clear flag, so flipping the flag
//! on a running processor changes the effect without re-arming the timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::MostRecentCache;
use crate::clock::Clock;
use crate::task::TaskHandle;

/// Period between daily fires.
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Fires once a day and empties the cache when the auto-clear flag is set.
pub struct ClearScheduler {
    cache: Arc<MostRecentCache>,
    clock: Arc<dyn Clock>,
    at: NaiveTime,
    auto_clear: Arc<AtomicBool>,
}

impl ClearScheduler {
    /// Create a scheduler clearing `cache` daily at local time `at`.
    pub fn new(
        cache: Arc<MostRecentCache>,
        clock: Arc<dyn Clock>,
        at: NaiveTime,
        auto_clear: Arc<AtomicBool>,
    ) -> Self {
        Self {
            cache,
            clock,
            at,
            auto_clear,
        }
    }

    /// Time remaining until the next fire.
    ///
    /// Both ends are resolved through the clock's time zone, so a
    /// daylight-saving shift in between lengthens or shortens the wait. If
    /// the clear time falls in a skipped hour, the naive wall-clock
    /// difference is used instead.
    pub fn delay_until_next(&self) -> Duration {
        let now = self.clock.now();
        let next = next_occurrence(now, self.at);
        let span = match (self.clock.resolve(now), self.clock.resolve(next)) {
            (Some(now_at), Some(next_at)) => next_at.signed_duration_since(now_at),
            _ => next.signed_duration_since(now),
        };
        span.to_std().unwrap_or(Duration::ZERO)
    }

    /// Run the fire action. Returns whether the cache was cleared.
    pub fn fire(&self) -> bool {
        if !self.auto_clear.load(Ordering::Acquire) {
            debug!("daily clear fired with auto clear disabled, cache kept");
            return false;
        }
        let evicted = self.cache.len();
        self.cache.clear();
        info!(evicted, "daily cache clear");
        true
    }

    /// Arm the timer on the current Tokio runtime.
    pub fn spawn(self, cancel: CancellationToken) -> TaskHandle {
        let token = cancel.clone();
        let join = tokio::spawn(async move { self.run(token).await });
        TaskHandle::new("clear-scheduler", cancel, join)
    }

    async fn run(self, cancel: CancellationToken) {
        let delay = self.delay_until_next();
        info!(
            clear_cache_time = %self.at,
            first_fire_in_secs = delay.as_secs(),
            "daily clear timer armed"
        );

        let start = Instant::now().checked_add(delay).unwrap_or_else(Instant::now);
        let mut ticker = tokio::time::interval_at(start, DAY);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if cancel.is_cancelled() {
                break;
            }
            self.fire();
        }

        debug!("daily clear timer cancelled");
    }
}

/// Next wall-clock occurrence of `at` at or after `now`.
pub fn next_occurrence(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today >= now {
        return today;
    }
    today
        .checked_add_signed(TimeDelta::days(1))
        .unwrap_or(today)
}
