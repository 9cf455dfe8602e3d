//! Ingestion consumer (spec §4.E): drains `q_ingestion`/`q_invalid_data`,
//! materialising `ActivityData` rows from validated events, recording
//! `DataQualityIssue`s for rejected ones, and calculating CO2e as each
//! activity lands.

use std::sync::Arc;
use std::time::Duration;

use carbonledger_calculation::{ActivityQuantity, CalculationProvider};
use carbonledger_core::entities::{
    ActivityData, ActivityKind, CompanyFinancials, DataQualityIssue, EventLogEntry, Scope,
};
use carbonledger_core::error::AppResult;
use carbonledger_eventbus::{dead_letter, Event, EventBus, EventEnvelope, IdempotencyStore, RetryPolicy};
use carbonledger_storage::repositories::activity::{ActivityDataRepository, CompanyFinancialsRepository};
use carbonledger_storage::repositories::core::FacilityRepository;
use carbonledger_storage::repositories::invoices::InvoiceRepository;
use carbonledger_storage::repositories::quality::{DataQualityIssueRepository, EventLogRepository};
use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Idempotency lock TTL for `processed_event:<event_id>` (spec §4.B).
const IDEMPOTENCY_TTL: Duration = Duration::from_secs(3600);

/// Scope is derived from activity kind (spec §4.C): electricity is
/// purchased energy (Scope 2); combustion fuels are owned-source (Scope 1).
pub fn derive_scope(kind: ActivityKind) -> Scope {
    match kind {
        ActivityKind::Electricity => Scope::Scope2,
        ActivityKind::NaturalGas | ActivityKind::DieselFuel => Scope::Scope1,
    }
}

pub struct IngestionWorker {
    bus: Arc<dyn EventBus>,
    idempotency: Arc<dyn IdempotencyStore>,
    activity_data: ActivityDataRepository,
    quality_issues: DataQualityIssueRepository,
    event_log: EventLogRepository,
    invoices: InvoiceRepository,
    facilities: FacilityRepository,
    financials: CompanyFinancialsRepository,
    calculation: Arc<dyn CalculationProvider>,
    retry: RetryPolicy,
}

impl IngestionWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bus: Arc<dyn EventBus>,
        idempotency: Arc<dyn IdempotencyStore>,
        activity_data: ActivityDataRepository,
        quality_issues: DataQualityIssueRepository,
        event_log: EventLogRepository,
        invoices: InvoiceRepository,
        facilities: FacilityRepository,
        financials: CompanyFinancialsRepository,
        calculation: Arc<dyn CalculationProvider>,
    ) -> Self {
        Self {
            bus,
            idempotency,
            activity_data,
            quality_issues,
            event_log,
            invoices,
            facilities,
            financials,
            calculation,
            retry: RetryPolicy::default(),
        }
    }

    /// Drive a single queue's receiver until the channel closes. Callers
    /// spawn one of these per queue.
    pub async fn run(&self, mut receiver: mpsc::UnboundedReceiver<EventEnvelope>) {
        while let Some(envelope) = receiver.recv().await {
            self.handle_with_retry(envelope).await;
        }
    }

    async fn handle_with_retry(&self, envelope: EventEnvelope) {
        let dedupe_key = envelope.dedupe_key();
        match self.idempotency.acquire_once(&dedupe_key, IDEMPOTENCY_TTL).await {
            Ok(false) => {
                tracing::debug!(event_id = %envelope.event_id, "duplicate event, skipping");
                return;
            }
            Err(err) => {
                tracing::error!(error = %err, "idempotency store unavailable, processing anyway");
            }
            Ok(true) => {}
        }

        let mut attempt = 0;
        loop {
            match self.handle_event(&envelope).await {
                Ok(()) => {
                    self.record_processed(&envelope, "processed").await;
                    return;
                }
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    tracing::warn!(event_id = %envelope.event_id, attempt, error = %err, "retrying ingestion event");
                    tokio::time::sleep(self.retry.delay_for_attempt(attempt)).await;
                }
                Err(err) => {
                    let _ = self.idempotency.release(&dedupe_key).await;
                    dead_letter(self.bus.as_ref(), "ingestion_worker", &envelope, &err.to_string()).await;
                    self.record_processed(&envelope, "dead_lettered").await;
                    return;
                }
            }
        }
    }

    async fn record_processed(&self, envelope: &EventEnvelope, status: &str) {
        let entry = EventLogEntry {
            event_id: envelope.event_id,
            event_type: envelope.event.event_type_name().to_string(),
            processed_at: Utc::now(),
            status: status.to_string(),
        };
        if let Err(err) = self.event_log.record(&entry).await {
            tracing::error!(error = %err, "failed to record event log entry");
        }
    }

    async fn handle_event(&self, envelope: &EventEnvelope) -> AppResult<()> {
        match &envelope.event {
            Event::ActivityValidated { payload, context } => {
                let facility_id = context.facility_id.ok_or_else(|| {
                    carbonledger_core::error::AppError::Internal(
                        "activity.validated missing facility_id".into(),
                    )
                })?;
                self.materialize_activity(
                    facility_id,
                    payload.activity_kind,
                    payload.quantity,
                    &payload.unit,
                    payload.start_date,
                    payload.end_date,
                )
                .await
                .map(|_| ())
            }
            Event::ActivityInvalid { payload, context } => {
                let issue = DataQualityIssue {
                    id: Uuid::new_v4(),
                    facility_id: context.facility_id,
                    code: payload.code.clone(),
                    field: payload.field.clone(),
                    message: payload.message.clone(),
                    severity: carbonledger_core::entities::IssueSeverity::Error,
                    created_at: Utc::now(),
                };
                self.quality_issues.create(&issue).await?;
                Ok(())
            }
            Event::InvoiceVerified { payload, context } => {
                let facility_id = context.facility_id.ok_or_else(|| {
                    carbonledger_core::error::AppError::Internal(
                        "invoice.verified missing facility_id".into(),
                    )
                })?;
                let activity_id = self
                    .materialize_activity(
                        facility_id,
                        payload.activity_kind,
                        payload.quantity,
                        &payload.unit,
                        payload.start_date,
                        payload.end_date,
                    )
                    .await?;
                self.invoices.mark_verified(payload.invoice_id, activity_id).await?;

                if let Some(cost_tl) = payload.cost_tl {
                    let facility = self.facilities.find_by_id(facility_id).await?;
                    self.apply_cost_to_financials(facility.company_id, payload.activity_kind, payload.quantity, cost_tl)
                        .await?;
                }
                Ok(())
            }
            Event::HealthCheck | Event::DeadLetter { .. } => Ok(()),
        }
    }

    /// Shared by `activity.validated` and `invoice.verified`: both land the
    /// same way once an activity kind/quantity/unit/date-range is in hand.
    #[allow(clippy::too_many_arguments)]
    async fn materialize_activity(
        &self,
        facility_id: Uuid,
        activity_kind: ActivityKind,
        quantity: rust_decimal::Decimal,
        unit: &str,
        start_date: chrono::NaiveDate,
        end_date: chrono::NaiveDate,
    ) -> AppResult<Uuid> {
        let activity = ActivityData {
            id: Uuid::new_v4(),
            facility_id,
            activity_kind,
            quantity,
            unit: unit.to_string(),
            start_date,
            end_date,
            scope: derive_scope(activity_kind),
            calculated_co2e_kg: None,
            is_fallback_calculation: false,
            is_simulation: false,
            created_at: Utc::now(),
        };
        self.activity_data.create(&activity).await?;

        let result = self
            .calculation
            .calculate_for_activity(&ActivityQuantity {
                activity_kind,
                quantity,
                unit: unit.to_string(),
                region: None,
                year: Some(start_date.format("%Y").to_string().parse().unwrap_or(0)),
            })
            .await?;

        self.activity_data
            .update_calculation(activity.id, result.total_co2e_kg, result.is_fallback)
            .await?;

        Ok(activity.id)
    }

    /// Rolls a verified invoice's cost into the company's average unit
    /// cost, used by the ROI simulator's payback estimates. Diesel has no
    /// averaged field in `company_financials`, so its cost is dropped here.
    async fn apply_cost_to_financials(
        &self,
        company_id: Uuid,
        activity_kind: ActivityKind,
        quantity: rust_decimal::Decimal,
        cost_tl: rust_decimal::Decimal,
    ) -> AppResult<()> {
        if quantity.is_zero() {
            return Ok(());
        }
        let unit_cost = cost_tl / quantity;
        let existing = self.financials.find(company_id).await?;
        let mut financials = existing.unwrap_or(CompanyFinancials {
            company_id,
            avg_electricity_cost_kwh: None,
            avg_gas_cost_m3: None,
            updated_at: Utc::now(),
        });
        match activity_kind {
            ActivityKind::Electricity => financials.avg_electricity_cost_kwh = Some(unit_cost),
            ActivityKind::NaturalGas => financials.avg_gas_cost_m3 = Some(unit_cost),
            ActivityKind::DieselFuel => return Ok(()),
        }
        financials.updated_at = Utc::now();
        self.financials.upsert(&financials).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn electricity_is_scope_2_and_combustion_fuels_are_scope_1() {
        assert_eq!(derive_scope(ActivityKind::Electricity), Scope::Scope2);
        assert_eq!(derive_scope(ActivityKind::NaturalGas), Scope::Scope1);
        assert_eq!(derive_scope(ActivityKind::DieselFuel), Scope::Scope1);
    }
}
