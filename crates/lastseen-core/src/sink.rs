//! Downstream delivery contract.
//!
//! The replay worker hands each derived event to an [`EventSink`]. A failed
//! send is reported and skipped; it never stops the pass or touches the
//! cache. Transports live outside this crate (the engine provides a NATS
//! sink); [`ChannelSink`] covers in-process consumers.

use std::future::Future;

use lastseen_types::Event;
use tokio::sync::mpsc;

/// Errors raised while delivering one derived event.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The transport rejected the event or is unavailable.
    #[error("transport error: {0}")]
    Transport(String),

    /// The event could not be encoded for the transport.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The receiving side has gone away.
    #[error("sink closed")]
    Closed,
}

/// Destination for derived events.
pub trait EventSink: Send + Sync + 'static {
    /// Deliver one event downstream.
    fn send(&self, event: Event) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Sink that forwards events into a Tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Event>,
}

impl ChannelSink {
    /// Create a sink and the receiver its events arrive on.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    async fn send(&self, event: Event) -> Result<(), DeliveryError> {
        self.tx.send(event).await.map_err(|_closed| DeliveryError::Closed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lastseen_types::TrackKey;

    use super::*;

    #[tokio::test]
    async fn channel_sink_forwards_events() {
        let (sink, mut rx) = ChannelSink::new(4);
        let event = Event::new(TrackKey::new("t1").unwrap(), "vehicles");
        sink.send(event.clone()).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn channel_sink_reports_closed_receiver() {
        let (sink, rx) = ChannelSink::new(1);
        drop(rx);

        let event = Event::new(TrackKey::new("t1").unwrap(), "vehicles");
        let result = sink.send(event).await;
        assert!(matches!(result, Err(DeliveryError::Closed)));
    }
}
