//! Typed event payloads and the envelope that carries them across queues.

use carbonledger_core::entities::ActivityKind;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context carried alongside every event: which facility/user it concerns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventContext {
    pub facility_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

/// A validated, ready-to-persist activity row, produced by the API layer
/// or CSV ingestion after [`carbonledger_validation`] accepts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedActivityPayload {
    pub activity_kind: ActivityKind,
    pub quantity: Decimal,
    pub unit: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cost: Option<Decimal>,
}

/// A row that failed validation; carried for `DataQualityIssue` recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidActivityPayload {
    pub raw_row: serde_json::Value,
    pub code: String,
    pub field: String,
    pub message: String,
}

/// Emitted once a user confirms OCR-extracted invoice fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceVerifiedPayload {
    pub invoice_id: Uuid,
    pub activity_kind: ActivityKind,
    pub quantity: Decimal,
    pub unit: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cost_tl: Option<Decimal>,
}

/// A report generation job, queued by the API handler behind
/// `POST /companies/{id}/reports/request` and drained by the reporting
/// worker (spec §4.G). Stands in for the original's Celery task dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequestedPayload {
    pub report_id: Uuid,
    pub company_id: Uuid,
    pub report_type: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub notify_user_when_ready: bool,
    pub requested_by_user_id: Uuid,
}

/// The typed event variants routed across named queues.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum Event {
    #[serde(rename = "activity.validated")]
    ActivityValidated {
        payload: ValidatedActivityPayload,
        context: EventContext,
    },
    #[serde(rename = "activity.invalid")]
    ActivityInvalid {
        payload: InvalidActivityPayload,
        context: EventContext,
    },
    #[serde(rename = "invoice.verified")]
    InvoiceVerified {
        payload: InvoiceVerifiedPayload,
        context: EventContext,
    },
    #[serde(rename = "report.requested")]
    ReportRequested {
        payload: ReportRequestedPayload,
        context: EventContext,
    },
    HealthCheck,
    /// An operator-inspectable record of a permanently-failed task,
    /// republished to `q_dead_letter` (spec §4.B).
    DeadLetter {
        failed_task_name: String,
        original_event: serde_json::Value,
        error_message: String,
    },
}

impl Event {
    pub fn event_type_name(&self) -> &'static str {
        match self {
            Event::ActivityValidated { .. } => "activity.validated",
            Event::ActivityInvalid { .. } => "activity.invalid",
            Event::InvoiceVerified { .. } => "invoice.verified",
            Event::ReportRequested { .. } => "report.requested",
            Event::HealthCheck => "health_check",
            Event::DeadLetter { .. } => "dead_letter",
        }
    }
}

/// The envelope every event travels in: identity, timestamp, and an
/// optional idempotency key supplied by the producer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub idempotency_key: Option<String>,
    pub event: Event,
}

impl EventEnvelope {
    pub fn new(event: Event) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            idempotency_key: None,
            event,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// The key used to guard against double-processing: the caller-supplied
    /// idempotency key if present, else the event id itself.
    pub fn dedupe_key(&self) -> String {
        format!(
            "processed_event:{}",
            self.idempotency_key.clone().unwrap_or(self.event_id.to_string())
        )
    }
}
