//! Best-effort event egress.
//!
//! Publishing never blocks a committing transaction and never fails the
//! caller: sinks swallow their own delivery errors and log them. Callers
//! collect events while a transaction is open and publish after commit.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::events::SystemEvent;

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: SystemEvent);
}

/// Publish a batch in order, e.g. everything collected during one cycle.
pub async fn publish_all(sink: &dyn EventSink, events: Vec<SystemEvent>) {
    for event in events {
        sink.publish(event).await;
    }
}

/// Sink that writes events to the tracing pipeline. Useful as a default in
/// deployments without an external bus attached.
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn publish(&self, event: SystemEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => {
                tracing::info!(target: "events", topic = event.topic(), payload = %payload)
            }
            Err(e) => tracing::warn!(target: "events", error = %e, "unserializable event"),
        }
    }
}

/// Sink backed by a tokio broadcast channel; in-process subscribers are the
/// bus boundary, the external transport subscribes on the receiving side.
pub struct BroadcastSink {
    tx: broadcast::Sender<SystemEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<SystemEvent>) {
        let (tx, rx) = broadcast::channel(capacity);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventSink for BroadcastSink {
    async fn publish(&self, event: SystemEvent) {
        // A send error only means there is no live receiver right now.
        if self.tx.send(event).is_err() {
            tracing::debug!(target: "events", "no subscribers; event dropped");
        }
    }
}

/// Sink that drops everything.
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn publish(&self, _event: SystemEvent) {}
}
