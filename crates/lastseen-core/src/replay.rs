//! The replay worker.
//!
//! While running, the worker repeats: wait one cycle interval, then walk the
//! cache and send a derived copy of every entry to the sink, pausing one
//! message interval after each send. The cancellation token is observed
//! during both waits, before every send, and while a send is pending, so a
//! stop request takes effect at the next boundary without finishing the
//! pass.
//!
//! A failed send is logged and the pass moves on to the next key. A key that
//! disappears between enumeration and lookup (for example because the cache
//! was cleared) is skipped silently.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::MostRecentCache;
use crate::derive::derive_event;
use crate::identity::ProcessorIdentity;
use crate::sink::EventSink;
use crate::task::TaskHandle;

/// Counters for a single replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Derived events accepted by the sink.
    pub sent: u64,
    /// Derived events the sink rejected.
    pub failed: u64,
    /// Enumerated keys that were gone by lookup time.
    pub skipped: u64,
    /// Whether the pass was cut short by cancellation.
    pub interrupted: bool,
}

/// Periodically re-emits the cache contents.
pub struct ReplayWorker<S> {
    cache: Arc<MostRecentCache>,
    sink: Arc<S>,
    identity: Arc<ProcessorIdentity>,
    cycle_interval: Duration,
    message_interval: Duration,
}

impl<S: EventSink> ReplayWorker<S> {
    /// Create a worker over the given cache and sink.
    pub const fn new(
        cache: Arc<MostRecentCache>,
        sink: Arc<S>,
        identity: Arc<ProcessorIdentity>,
        cycle_interval: Duration,
        message_interval: Duration,
    ) -> Self {
        Self {
            cache,
            sink,
            identity,
            cycle_interval,
            message_interval,
        }
    }

    /// Spawn the worker loop on the current Tokio runtime.
    pub fn spawn(self, cancel: CancellationToken) -> TaskHandle {
        let token = cancel.clone();
        let join = tokio::spawn(async move { self.run(token).await });
        TaskHandle::new("replay-worker", cancel, join)
    }

    /// Run passes until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            cycle_interval_ms = self.cycle_interval.as_millis(),
            message_interval_ms = self.message_interval.as_millis(),
            "replay worker started"
        );

        let mut passes: u64 = 0;
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.cycle_interval) => {}
            }

            let summary = self.run_pass(&cancel).await;
            passes = passes.saturating_add(1);
            debug!(
                pass = passes,
                sent = summary.sent,
                failed = summary.failed,
                skipped = summary.skipped,
                cache_size = self.cache.len(),
                "replay pass complete"
            );

            if summary.interrupted {
                break;
            }
        }

        info!(passes, "replay worker stopped");
    }

    /// Walk the cache once, sending a derived event per present key.
    pub async fn run_pass(&self, cancel: &CancellationToken) -> PassSummary {
        let mut summary = PassSummary::default();

        for key in self.cache.snapshot_keys() {
            if cancel.is_cancelled() {
                summary.interrupted = true;
                return summary;
            }

            let Some(cached) = self.cache.get(&key) else {
                summary.skipped = summary.skipped.saturating_add(1);
                continue;
            };

            let derived = derive_event(&cached, &self.identity);
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    summary.interrupted = true;
                    return summary;
                }
                result = self.sink.send(derived) => result,
            };
            match result {
                Ok(()) => summary.sent = summary.sent.saturating_add(1),
                Err(e) => {
                    summary.failed = summary.failed.saturating_add(1);
                    warn!(track_id = %key, error = %e, "failed to send derived event");
                }
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    summary.interrupted = true;
                    return summary;
                }
                () = tokio::time::sleep(self.message_interval) => {}
            }
        }

        summary
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use lastseen_types::{Event, TrackKey, property};
    use serde_json::Value;

    use super::*;
    use crate::derive::DERIVED_EVENT_TYPE;
    use crate::sink::DeliveryError;

    /// Records every event and fails sends for one configured key.
    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<Event>>,
        fail_for: Option<TrackKey>,
    }

    impl EventSink for RecordingSink {
        async fn send(&self, event: Event) -> Result<(), DeliveryError> {
            if self.fail_for.as_ref() == Some(&event.track_id) {
                return Err(DeliveryError::Transport(String::from("link down")));
            }
            self.sent.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn key(raw: &str) -> TrackKey {
        TrackKey::new(raw).unwrap()
    }

    fn worker(cache: &Arc<MostRecentCache>, sink: &Arc<RecordingSink>) -> ReplayWorker<RecordingSink> {
        ReplayWorker::new(
            Arc::clone(cache),
            Arc::clone(sink),
            Arc::new(ProcessorIdentity::new("proc-1", "lastseen://processor/test")),
            Duration::from_millis(100),
            Duration::from_millis(10),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn pass_sends_one_derived_event_per_key() {
        let cache = Arc::new(MostRecentCache::new());
        cache.put(key("t1"), Event::new(key("t1"), "vehicles"));
        cache.put(key("t2"), Event::new(key("t2"), "vehicles"));
        let sink = Arc::new(RecordingSink::default());

        let summary = worker(&cache, &sink).run_pass(&CancellationToken::new()).await;

        assert_eq!(summary.sent, 2);
        assert_eq!(summary.failed, 0);
        assert!(!summary.interrupted);

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        for event in sent.iter() {
            assert_eq!(
                event.properties.get(property::TYPE),
                Some(&Value::from(DERIVED_EVENT_TYPE))
            );
            assert_eq!(
                event.properties.get(property::OWNER_ID),
                Some(&Value::from("proc-1"))
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_send_does_not_stop_the_pass() {
        let cache = Arc::new(MostRecentCache::new());
        for name in ["a", "b", "c"] {
            cache.put(key(name), Event::new(key(name), "vehicles"));
        }
        let sink = Arc::new(RecordingSink {
            sent: Mutex::new(Vec::new()),
            fail_for: Some(key("b")),
        });

        let summary = worker(&cache, &sink).run_pass(&CancellationToken::new()).await;

        assert_eq!(summary.sent, 2);
        assert_eq!(summary.failed, 1);
        assert!(cache.contains(&key("b")));
    }

    /// Empties the cache during the first send it sees.
    struct ClearingSink {
        cache: Arc<MostRecentCache>,
        sent: Mutex<Vec<Event>>,
    }

    impl EventSink for ClearingSink {
        async fn send(&self, event: Event) -> Result<(), DeliveryError> {
            self.cache.clear();
            self.sent.lock().unwrap().push(event);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn keys_removed_mid_pass_are_skipped() {
        let cache = Arc::new(MostRecentCache::new());
        for name in ["a", "b", "c"] {
            cache.put(key(name), Event::new(key(name), "vehicles"));
        }
        let sink = Arc::new(ClearingSink {
            cache: Arc::clone(&cache),
            sent: Mutex::new(Vec::new()),
        });
        let worker = ReplayWorker::new(
            Arc::clone(&cache),
            Arc::clone(&sink),
            Arc::new(ProcessorIdentity::new("proc-1", "lastseen://processor/test")),
            Duration::from_millis(100),
            Duration::from_millis(10),
        );

        let summary = worker.run_pass(&CancellationToken::new()).await;

        assert_eq!(summary.sent, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.failed, 0);
        assert!(!summary.interrupted);
        assert_eq!(sink.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_pass_sends_nothing() {
        let cache = Arc::new(MostRecentCache::new());
        cache.put(key("t1"), Event::new(key("t1"), "vehicles"));
        let sink = Arc::new(RecordingSink::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = worker(&cache, &sink).run_pass(&cancel).await;

        assert!(summary.interrupted);
        assert_eq!(summary.sent, 0);
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_cache_pass_is_a_no_op() {
        let cache = Arc::new(MostRecentCache::new());
        let sink = Arc::new(RecordingSink::default());

        let summary = worker(&cache, &sink).run_pass(&CancellationToken::new()).await;

        assert_eq!(summary, PassSummary::default());
    }

    #[tokio::test(start_paused = true)]
    async fn loop_exits_promptly_on_cancel() {
        let cache = Arc::new(MostRecentCache::new());
        cache.put(key("t1"), Event::new(key("t1"), "vehicles"));
        let sink = Arc::new(RecordingSink::default());
        let cancel = CancellationToken::new();

        let handle = worker(&cache, &sink).spawn(cancel);
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
        handle.join().await;

        assert!(sink.sent.lock().unwrap().is_empty());
    }
}
