//! NATS-backed event sink.
//!
//! Derived events are published as JSON on a single outbound subject. A
//! publish failure surfaces as [`DeliveryError::Transport`]; the replay
//! worker logs it and moves on to the next key.

use lastseen_core::sink::{DeliveryError, EventSink};
use lastseen_types::Event;
use tracing::debug;

/// Publishes derived events to a NATS subject.
pub struct NatsEventSink {
    client: async_nats::Client,
    subject: String,
}

impl NatsEventSink {
    /// Create a sink publishing on `subject` through an existing client.
    pub const fn new(client: async_nats::Client, subject: String) -> Self {
        Self { client, subject }
    }

    /// The subject derived events are published on.
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl EventSink for NatsEventSink {
    async fn send(&self, event: Event) -> Result<(), DeliveryError> {
        let payload = serde_json::to_vec(&event)?;
        debug!(
            subject = %self.subject,
            track_id = %event.track_id,
            "publishing derived event"
        );
        self.client
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(|e| {
                DeliveryError::Transport(format!("failed to publish to {}: {e}", self.subject))
            })
    }
}

impl std::fmt::Debug for NatsEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsEventSink")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}
