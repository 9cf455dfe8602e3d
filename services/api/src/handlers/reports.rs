//! Report generation requests and their async status/download (spec §4.G).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use carbonledger_access::{AccessControl, Claims};
use carbonledger_core::entities::{Report, ReportStatus, ReportType};
use carbonledger_eventbus::events::{Event, EventContext, ReportRequestedPayload};
use carbonledger_eventbus::EventEnvelope;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RequestReportBody {
    pub report_type: ReportType,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(default)]
    pub notify_when_ready: bool,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub id: Uuid,
    pub status: ReportStatus,
}

/// `POST /companies/{id}/reports/request`: queues report generation.
pub async fn request(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(company_id): Path<Uuid>,
    Json(body): Json<RequestReportBody>,
) -> Result<(StatusCode, Json<ReportResponse>), ApiError> {
    let member = state.access.resolve_member(claims.user_id, company_id).await?;
    AccessControl::require_admin(&member)?;

    let now = Utc::now();
    let report = Report {
        id: Uuid::new_v4(),
        company_id,
        report_type: body.report_type,
        period_start: body.period_start,
        period_end: body.period_end,
        status: ReportStatus::Pending,
        worker_task_id: None,
        file_path: None,
        file_size_bytes: None,
        download_count: 0,
        summary: None,
        error_message: None,
        retry_count: 0,
        requested_at: now,
        completed_at: None,
        expires_at: None,
    };
    state.reports.create(&report).await?;

    let report_type_name = match body.report_type {
        ReportType::CbamXml => "cbam_xml",
        ReportType::RoiAnalysis => "roi_analysis",
        ReportType::Combined => "combined",
    };
    let envelope = EventEnvelope::new(Event::ReportRequested {
        payload: ReportRequestedPayload {
            report_id: report.id,
            company_id,
            report_type: report_type_name.to_string(),
            period_start: body.period_start,
            period_end: body.period_end,
            notify_user_when_ready: body.notify_when_ready,
            requested_by_user_id: claims.user_id,
        },
        context: EventContext {
            facility_id: None,
            user_id: Some(claims.user_id),
        },
    });
    state
        .bus
        .publish(carbonledger_eventbus::QueueName::Reports, envelope)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ReportResponse {
            id: report.id,
            status: ReportStatus::Pending,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct ReportStatusResponse {
    pub id: Uuid,
    pub status: ReportStatus,
    pub summary: Option<serde_json::Value>,
    pub error_message: Option<String>,
}

/// `GET /reports/{id}/status`.
pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ReportStatusResponse>, ApiError> {
    let report = state.reports.find_by_id(report_id).await?;
    Ok(Json(ReportStatusResponse {
        id: report.id,
        status: report.status,
        summary: report.summary,
        error_message: report.error_message,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    pub company_id: Option<Uuid>,
}

/// `GET /reports/{id}/download`: streams the completed artifact and bumps
/// its download counter.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<Uuid>,
    Query(_query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let report = state.reports.find_by_id(report_id).await?;
    if report.status != ReportStatus::Completed {
        return Err(carbonledger_core::error::AppError::Conflict(
            "report is not completed yet".into(),
        )
        .into());
    }
    let file_path = report
        .file_path
        .as_ref()
        .ok_or_else(|| carbonledger_core::error::AppError::Internal("completed report has no file_path".into()))?;

    let bytes = tokio::fs::read(file_path)
        .await
        .map_err(|e| carbonledger_core::error::AppError::Internal(format!("could not read report file: {e}")))?;

    state.reports.increment_download_count(report_id).await?;

    let content_type = if file_path.ends_with(".xml") {
        "application/xml"
    } else {
        "application/octet-stream"
    };

    Ok((StatusCode::OK, [("content-type", content_type)], bytes).into_response())
}
