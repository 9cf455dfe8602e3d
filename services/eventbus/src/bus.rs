//! Named queues and the bus abstraction that routes events across them.

use std::collections::HashMap;

use async_trait::async_trait;
use carbonledger_core::error::{AppError, AppResult};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::events::{Event, EventEnvelope};

/// The named queues of spec §4.B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueName {
    Ingestion,
    InvalidData,
    Reports,
    Analytics,
    DeadLetter,
}

impl QueueName {
    pub fn as_str(self) -> &'static str {
        match self {
            QueueName::Ingestion => "q_ingestion",
            QueueName::InvalidData => "q_invalid_data",
            QueueName::Reports => "q_reports",
            QueueName::Analytics => "q_analytics",
            QueueName::DeadLetter => "q_dead_letter",
        }
    }

    /// The default routing for a given event, absent an explicit override.
    pub fn for_event(event: &Event) -> Self {
        match event {
            Event::ActivityValidated { .. } => QueueName::Ingestion,
            Event::ActivityInvalid { .. } => QueueName::InvalidData,
            Event::InvoiceVerified { .. } => QueueName::Ingestion,
            Event::ReportRequested { .. } => QueueName::Reports,
            Event::HealthCheck => QueueName::Ingestion,
            Event::DeadLetter { .. } => QueueName::DeadLetter,
        }
    }
}

/// A bus that routes envelopes to named queues. Implementations MUST be
/// at-least-once: a consumer crash after publish but before ack may
/// redeliver, and callers are expected to be idempotent.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, queue: QueueName, envelope: EventEnvelope) -> AppResult<String>;
}

/// An in-process bus backed by per-queue unbounded channels. Used in tests
/// and single-node deployments without a broker configured.
pub struct InMemoryEventBus {
    senders: HashMap<QueueName, mpsc::UnboundedSender<EventEnvelope>>,
    receivers: Mutex<HashMap<QueueName, mpsc::UnboundedReceiver<EventEnvelope>>>,
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        let queues = [
            QueueName::Ingestion,
            QueueName::InvalidData,
            QueueName::Reports,
            QueueName::Analytics,
            QueueName::DeadLetter,
        ];

        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();

        for queue in queues {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(queue, tx);
            receivers.insert(queue, rx);
        }

        Self {
            senders,
            receivers: Mutex::new(receivers),
        }
    }

    /// Hand ownership of a queue's receiving end to its single consumer.
    /// Panics (at startup, not at runtime) if called twice for the same
    /// queue — a workers plane has exactly one consumer loop per queue.
    pub fn take_receiver(&self, queue: QueueName) -> mpsc::UnboundedReceiver<EventEnvelope> {
        self.receivers
            .lock()
            .remove(&queue)
            .unwrap_or_else(|| panic!("receiver for {:?} already taken", queue.as_str()))
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, queue: QueueName, envelope: EventEnvelope) -> AppResult<String> {
        let task_id = envelope.event_id.to_string();
        self.senders
            .get(&queue)
            .ok_or_else(|| AppError::Internal(format!("unknown queue {:?}", queue)))?
            .send(envelope)
            .map_err(|e| AppError::Transient(format!("queue send failed: {e}")))?;
        Ok(task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;

    #[tokio::test]
    async fn publish_routes_to_expected_queue() {
        let bus = InMemoryEventBus::new();
        let mut rx = bus.take_receiver(QueueName::Ingestion);

        let envelope = EventEnvelope::new(Event::HealthCheck);
        bus.publish(QueueName::Ingestion, envelope.clone())
            .await
            .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_id, envelope.event_id);
    }
}
