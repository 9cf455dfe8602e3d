//! Dispatches `report.requested` events to the CBAM/ROI synthesizers,
//! persists the artifact to disk, and drives the `Report` state machine
//! (spec §4.G).

use std::path::PathBuf;
use std::sync::Arc;

use carbonledger_core::entities::{ActivityData, NotificationKind};
use carbonledger_core::error::{AppError, AppResult};
use carbonledger_eventbus::events::{EventContext, ReportRequestedPayload};
use carbonledger_eventbus::{dead_letter, Event, EventBus, EventEnvelope};
use carbonledger_notifications::NotificationService;
use carbonledger_storage::repositories::activity::{ActivityDataRepository, CompanyFinancialsRepository};
use carbonledger_storage::repositories::core::{CompanyRepository, FacilityRepository, UserRepository};
use carbonledger_storage::repositories::reports::ReportRepository;
use chrono::{Duration, Utc};
use serde_json::json;
use tokio::sync::mpsc;

use super::cbam;
use super::roi;

/// Up to 3 retries; CBAM backs off 300s, ROI 600s (spec §4.G).
const MAX_RETRIES: i32 = 3;
const CBAM_BACKOFF_SECS: u64 = 300;
const ROI_BACKOFF_SECS: u64 = 600;

pub struct ReportingWorker {
    bus: Arc<dyn EventBus>,
    reports: ReportRepository,
    companies: CompanyRepository,
    users: UserRepository,
    facilities: FacilityRepository,
    activity: ActivityDataRepository,
    financials: CompanyFinancialsRepository,
    notifications: NotificationService,
    artifact_dir: PathBuf,
}

impl ReportingWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bus: Arc<dyn EventBus>,
        reports: ReportRepository,
        companies: CompanyRepository,
        users: UserRepository,
        facilities: FacilityRepository,
        activity: ActivityDataRepository,
        financials: CompanyFinancialsRepository,
        notifications: NotificationService,
        artifact_dir: PathBuf,
    ) -> Self {
        Self {
            bus,
            reports,
            companies,
            users,
            facilities,
            activity,
            financials,
            notifications,
            artifact_dir,
        }
    }

    /// Drive `q_reports` until the channel closes. Callers spawn one of
    /// these per process.
    pub async fn run(&self, mut receiver: mpsc::UnboundedReceiver<EventEnvelope>) {
        while let Some(envelope) = receiver.recv().await {
            self.handle_with_retry(envelope).await;
        }
    }

    async fn handle_with_retry(&self, envelope: EventEnvelope) {
        let Event::ReportRequested { payload, context } = &envelope.event else {
            return;
        };

        let backoff = match payload.report_type.as_str() {
            "cbam_xml" => CBAM_BACKOFF_SECS,
            _ => ROI_BACKOFF_SECS,
        };

        let mut attempt = 0;
        loop {
            match self.run_report(payload, context).await {
                Ok(()) => return,
                Err(err) if err.is_retryable() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    tracing::warn!(
                        report_id = %payload.report_id,
                        attempt,
                        error = %err,
                        "retrying report generation"
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(backoff)).await;
                }
                Err(err) => {
                    let _ = self
                        .reports
                        .fail(payload.report_id, &err.to_string(), attempt)
                        .await;
                    dead_letter(self.bus.as_ref(), "reporting_worker", &envelope, &err.to_string()).await;
                    return;
                }
            }
        }
    }

    async fn run_report(
        &self,
        payload: &ReportRequestedPayload,
        context: &EventContext,
    ) -> AppResult<()> {
        let company = self.companies.find_by_id(payload.company_id).await?;

        let (file_name, bytes, summary) = match payload.report_type.as_str() {
            "cbam_xml" => self.build_cbam(&company, payload).await?,
            "roi_analysis" => self.build_roi(&company, payload).await?,
            other => {
                return Err(AppError::FatalTask(format!("unknown report type {other}")));
            }
        };

        let path = self.artifact_dir.join(format!("{}-{file_name}", payload.report_id));
        tokio::fs::create_dir_all(&self.artifact_dir)
            .await
            .map_err(|e| AppError::Transient(format!("failed to create artifact dir: {e}")))?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| AppError::Transient(format!("failed to write report artifact: {e}")))?;

        let expires_at = Utc::now() + Duration::days(7);
        self.reports
            .complete(
                payload.report_id,
                path.to_string_lossy().as_ref(),
                bytes.len() as i64,
                summary,
                expires_at,
            )
            .await?;

        if payload.notify_user_when_ready {
            let user_id = context.user_id.unwrap_or(payload.requested_by_user_id);
            let _ = self
                .notifications
                .notify(
                    user_id,
                    NotificationKind::ReportReady,
                    "Your report is ready",
                    &format!("{} for {} is ready to download.", payload.report_type, company.name),
                    Some(&format!("/reports/{}/download", payload.report_id)),
                    true,
                )
                .await;
        }

        Ok(())
    }

    async fn build_cbam(
        &self,
        company: &carbonledger_core::entities::Company,
        payload: &ReportRequestedPayload,
    ) -> AppResult<(String, Vec<u8>, serde_json::Value)> {
        let owner = self.users.find_by_id(company.owner_user_id).await?;
        let facilities = self.facilities.list_by_company(company.id).await?;

        let mut activity_by_facility = std::collections::HashMap::new();
        for facility in &facilities {
            let rows: Vec<ActivityData> = self
                .activity
                .list_for_facility_in_range(facility.id, payload.period_start, payload.period_end)
                .await?;
            activity_by_facility.insert(facility.id, rows);
        }

        let report = cbam::build_report(
            company,
            &owner,
            &facilities,
            &activity_by_facility,
            payload.period_start,
            payload.period_end,
            payload.report_id,
            Utc::now(),
        );
        let xml = cbam::serialize(&report)
            .map_err(|e| AppError::Internal(format!("cbam serialization failed: {e}")))?;

        let summary = json!({
            "total_emissions_tco2e": report.summary.total_emissions_tco2e,
            "scope1_tco2e": report.summary.scope1_tco2e,
            "scope2_tco2e": report.summary.scope2_tco2e,
            "installations": facilities.len(),
        });

        Ok(("cbam.xml".to_string(), xml.into_bytes(), summary))
    }

    async fn build_roi(
        &self,
        company: &carbonledger_core::entities::Company,
        payload: &ReportRequestedPayload,
    ) -> AppResult<(String, Vec<u8>, serde_json::Value)> {
        let activity = self
            .activity
            .list_for_company_in_range(company.id, payload.period_start, payload.period_end)
            .await?;
        let financials = self.financials.find(company.id).await?;

        let baseline = roi::ConsumptionBaseline::from_activity(&activity, financials.as_ref());
        let report = roi::analyze(&baseline);

        let body = serde_json::to_vec_pretty(&report)
            .map_err(|e| AppError::Internal(format!("roi serialization failed: {e}")))?;

        let summary = json!({
            "portfolio_investment_tl": report.portfolio_investment_tl,
            "portfolio_annual_savings_tl": report.portfolio_annual_savings_tl,
            "average_payback_months": report.average_payback_months,
            "measure_count": report.top_measures.len(),
        });

        Ok(("roi.json".to_string(), body, summary))
    }
}
