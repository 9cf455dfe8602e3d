//! Retry and dead-letter policy shared by every consumer (spec §4.B).

use std::time::Duration;

use serde_json::Value;

use crate::bus::{EventBus, QueueName};
use crate::events::{Event, EventEnvelope};

/// Linear backoff retry policy. Default: 3 attempts, 60s apart.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self { max_retries, backoff }
    }

    /// The wait-before-attempt duration for a given zero-indexed attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff * attempt.max(0)
    }
}

/// Republish a permanently-failed event to `q_dead_letter` for operator
/// inspection. Per spec: this MUST NOT itself fail the outer task, so any
/// error here is logged and swallowed.
pub async fn dead_letter(
    bus: &dyn EventBus,
    failed_task_name: &str,
    original_event: &EventEnvelope,
    error_message: &str,
) {
    let original_event_id = original_event.event_id;
    let envelope = EventEnvelope::new(Event::DeadLetter {
        failed_task_name: failed_task_name.to_string(),
        original_event: serde_json::to_value(original_event).unwrap_or(Value::Null),
        error_message: error_message.to_string(),
    });

    match bus.publish(QueueName::DeadLetter, envelope).await {
        Ok(_) => tracing::warn!(
            task = failed_task_name,
            event_id = %original_event_id,
            "event dead-lettered"
        ),
        Err(err) => tracing::error!(
            task = failed_task_name,
            event_id = %original_event_id,
            error = %err,
            "failed to publish to dead-letter queue; dropping silently"
        ),
    }
}
