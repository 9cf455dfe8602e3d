//! The event-driven ingestion backbone (spec §4.B).
//!
//! Delivery is at-least-once; consumers are responsible for idempotency via
//! [`idempotency::IdempotencyStore`]. No ordering is guaranteed across
//! events, nor within a queue.

pub mod bus;
pub mod events;
pub mod idempotency;
pub mod retry;

pub use bus::{EventBus, InMemoryEventBus, QueueName};
pub use events::{Event, EventEnvelope};
pub use idempotency::{IdempotencyStore, InMemoryIdempotencyStore};
pub use retry::{dead_letter, RetryPolicy};
