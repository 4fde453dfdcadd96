//! Inbound event intake.
//!
//! Consumes JSON events from the inbound NATS subscription and feeds them to
//! [`Processor::process`]. Payloads that do not decode (including events
//! with an empty `track_id`) are logged and dropped; they never reach the
//! cache.

use futures::StreamExt as _;
use lastseen_core::processor::Processor;
use lastseen_core::sink::EventSink;
use lastseen_types::Event;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

/// Decode one inbound payload.
pub fn decode_event(payload: &[u8]) -> Result<Event, serde_json::Error> {
    serde_json::from_slice(payload)
}

/// Feed inbound messages to the processor until `cancel` fires or the
/// subscription ends. Returns the number of events accepted.
pub async fn run_intake<S: EventSink>(
    mut subscriber: async_nats::Subscriber,
    processor: &Processor<S>,
    cancel: CancellationToken,
) -> u64 {
    let mut accepted: u64 = 0;
    let mut rejected: u64 = 0;

    loop {
        let message = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            message = subscriber.next() => message,
        };
        let Some(message) = message else {
            warn!("inbound subscription closed");
            break;
        };

        match decode_event(&message.payload) {
            Ok(event) => {
                trace!(track_id = %event.track_id, "inbound event");
                processor.process(event);
                accepted = accepted.saturating_add(1);
            }
            Err(e) => {
                rejected = rejected.saturating_add(1);
                warn!(
                    subject = %message.subject,
                    error = %e,
                    "dropping undecodable inbound event"
                );
            }
        }
    }

    info!(accepted, rejected, "intake stopped");
    accepted
}
