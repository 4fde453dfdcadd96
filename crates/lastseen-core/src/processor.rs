//! The processor orchestrator.
//!
//! [`Processor`] owns the cache and the two background tasks. Ingress goes
//! through [`Processor::process`], which only writes the cache and never
//! forwards anything synchronously; all downstream delivery happens on the
//! replay worker.
//!
//! # Lifecycle
//!
//! 1. [`start`](Processor::start) resolves and validates the schedule,
//!    refusing to start on any violation.
//! 2. If `clear_cache_on_start` is set, the cache is emptied before either
//!    task exists.
//! 3. The daily clear timer is armed, then the replay worker is spawned.
//! 4. [`stop`](Processor::stop) cancels both tasks and returns without
//!    waiting; [`shutdown`](Processor::shutdown) also waits for them to
//!    exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use lastseen_types::Event;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::MostRecentCache;
use crate::clear::ClearScheduler;
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, ConfigViolation, ScheduleConfig};
use crate::identity::ProcessorIdentity;
use crate::replay::ReplayWorker;
use crate::sink::EventSink;
use crate::task::TaskHandle;

/// Errors that can occur when starting a processor.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// The schedule configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `start` was called on a processor that is already running.
    #[error("processor {id} is already running")]
    AlreadyRunning {
        /// Identifier of the processor.
        id: String,
    },
}

/// Handles of the tasks owned by a started processor.
struct Running {
    clear_timer: TaskHandle,
    replay_worker: TaskHandle,
}

/// Keeps the latest event per key and replays the cache downstream.
pub struct Processor<S> {
    identity: Arc<ProcessorIdentity>,
    config: ScheduleConfig,
    cache: Arc<MostRecentCache>,
    sink: Arc<S>,
    clock: Arc<dyn Clock>,
    auto_clear: Arc<AtomicBool>,
    running: Mutex<Option<Running>>,
}

impl<S: EventSink> Processor<S> {
    /// Create a processor using the system clock.
    pub fn new(identity: ProcessorIdentity, config: ScheduleConfig, sink: S) -> Self {
        Self::with_clock(identity, config, sink, Arc::new(SystemClock))
    }

    /// Create a processor with an explicit wall clock.
    pub fn with_clock(
        identity: ProcessorIdentity,
        config: ScheduleConfig,
        sink: S,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let auto_clear = Arc::new(AtomicBool::new(config.auto_clear_cache));
        Self {
            identity: Arc::new(identity),
            config,
            cache: Arc::new(MostRecentCache::new()),
            sink: Arc::new(sink),
            clock,
            auto_clear,
            running: Mutex::new(None),
        }
    }

    /// The processor's identity.
    pub fn identity(&self) -> &ProcessorIdentity {
        &self.identity
    }

    /// The cache written by [`process`](Self::process).
    pub const fn cache(&self) -> &Arc<MostRecentCache> {
        &self.cache
    }

    /// The sink derived events are delivered to.
    pub const fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    /// List every violated schedule constraint. Empty means valid.
    pub fn validate(&self) -> Vec<ConfigViolation> {
        self.config.validate()
    }

    /// Accept an inbound event.
    ///
    /// Replaces the cache entry for the event's key and always returns
    /// `None`: nothing is forwarded on the ingress path.
    pub fn process(&self, event: Event) -> Option<Event> {
        self.cache.put(event.track_id.clone(), event);
        None
    }

    /// Enable or disable the effect of the daily clear.
    ///
    /// Takes effect at the next fire; the timer itself is not re-armed.
    pub fn set_auto_clear_cache(&self, enabled: bool) {
        self.auto_clear.store(enabled, Ordering::Release);
        info!(processor = %self.identity.id, enabled, "auto clear cache updated");
    }

    /// Whether the daily clear currently empties the cache.
    pub fn auto_clear_cache(&self) -> bool {
        self.auto_clear.load(Ordering::Acquire)
    }

    /// Whether the background tasks are running.
    pub fn is_running(&self) -> bool {
        self.lock_running().is_some()
    }

    /// Validate the schedule and start the background tasks.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError::Config`] listing every schedule violation,
    /// or [`ProcessorError::AlreadyRunning`] if already started.
    pub fn start(&self) -> Result<(), ProcessorError> {
        let schedule = self.config.resolve()?;

        let mut running = self.lock_running();
        if running.is_some() {
            return Err(ProcessorError::AlreadyRunning {
                id: self.identity.id.clone(),
            });
        }

        if schedule.clear_cache_on_start {
            let evicted = self.cache.len();
            self.cache.clear();
            info!(processor = %self.identity.id, evicted, "cache cleared on start");
        }

        let clear_timer = ClearScheduler::new(
            Arc::clone(&self.cache),
            Arc::clone(&self.clock),
            schedule.clear_cache_time,
            Arc::clone(&self.auto_clear),
        )
        .spawn(CancellationToken::new());

        let replay_worker = ReplayWorker::new(
            Arc::clone(&self.cache),
            Arc::clone(&self.sink),
            Arc::clone(&self.identity),
            schedule.cycle_interval,
            schedule.message_interval,
        )
        .spawn(CancellationToken::new());

        *running = Some(Running {
            clear_timer,
            replay_worker,
        });

        info!(
            processor = %self.identity.id,
            cycle_interval_ms = schedule.cycle_interval.as_millis(),
            message_interval_ms = schedule.message_interval.as_millis(),
            clear_cache_time = %schedule.clear_cache_time,
            auto_clear_cache = self.auto_clear_cache(),
            "processor started"
        );
        Ok(())
    }

    /// Cancel both background tasks without waiting for them.
    ///
    /// No daily clear starts after this returns. Calling `stop` on a
    /// processor that is not running is a no-op.
    pub fn stop(&self) {
        if let Some(running) = self.take_running() {
            running.clear_timer.cancel();
            running.replay_worker.cancel();
            info!(processor = %self.identity.id, "processor stopped");
        } else {
            debug!(processor = %self.identity.id, "stop called on idle processor");
        }
    }

    /// Cancel both background tasks and wait for them to exit.
    pub async fn shutdown(&self) {
        let Some(running) = self.take_running() else {
            return;
        };
        running.clear_timer.cancel();
        running.replay_worker.cancel();
        debug!(
            processor = %self.identity.id,
            tasks = ?[running.clear_timer.name(), running.replay_worker.name()],
            "waiting for tasks to exit"
        );
        running.clear_timer.join().await;
        running.replay_worker.join().await;
        info!(processor = %self.identity.id, "processor shut down");
    }

    fn take_running(&self) -> Option<Running> {
        self.lock_running().take()
    }

    fn lock_running(&self) -> std::sync::MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(|poisoned| {
            warn!("processor state lock was poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }
}

impl<S> Drop for Processor<S> {
    fn drop(&mut self) {
        let running = self
            .running
            .get_mut()
            .map_or_else(|poisoned| poisoned.into_inner().take(), Option::take);
        if let Some(running) = running {
            running.clear_timer.cancel();
            running.replay_worker.cancel();
        }
    }
}
