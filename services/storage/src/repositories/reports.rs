//! Generated report artifacts (CBAM XML, ROI analysis).

use carbonledger_core::entities::{Report, ReportStatus, ReportType};
use carbonledger_core::error::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow)]
struct ReportRow {
    id: Uuid,
    company_id: Uuid,
    report_type: String,
    period_start: NaiveDate,
    period_end: NaiveDate,
    status: String,
    worker_task_id: Option<String>,
    file_path: Option<String>,
    file_size_bytes: Option<i64>,
    download_count: i64,
    summary: Option<serde_json::Value>,
    error_message: Option<String>,
    retry_count: i32,
    requested_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReportRow> for Report {
    type Error = AppError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        Ok(Report {
            id: row.id,
            company_id: row.company_id,
            report_type: parse_report_type(&row.report_type)?,
            period_start: row.period_start,
            period_end: row.period_end,
            status: parse_status(&row.status)?,
            worker_task_id: row.worker_task_id,
            file_path: row.file_path,
            file_size_bytes: row.file_size_bytes,
            download_count: row.download_count,
            summary: row.summary,
            error_message: row.error_message,
            retry_count: row.retry_count,
            requested_at: row.requested_at,
            completed_at: row.completed_at,
            expires_at: row.expires_at,
        })
    }
}

fn parse_report_type(raw: &str) -> AppResult<ReportType> {
    match raw {
        "cbam_xml" => Ok(ReportType::CbamXml),
        "roi_analysis" => Ok(ReportType::RoiAnalysis),
        "combined" => Ok(ReportType::Combined),
        other => Err(AppError::Internal(format!("unknown report_type {other}"))),
    }
}

pub fn report_type_str(kind: ReportType) -> &'static str {
    match kind {
        ReportType::CbamXml => "cbam_xml",
        ReportType::RoiAnalysis => "roi_analysis",
        ReportType::Combined => "combined",
    }
}

fn parse_status(raw: &str) -> AppResult<ReportStatus> {
    match raw {
        "pending" => Ok(ReportStatus::Pending),
        "processing" => Ok(ReportStatus::Processing),
        "completed" => Ok(ReportStatus::Completed),
        "failed" => Ok(ReportStatus::Failed),
        "expired" => Ok(ReportStatus::Expired),
        other => Err(AppError::Internal(format!("unknown report status {other}"))),
    }
}

pub fn status_str(status: ReportStatus) -> &'static str {
    match status {
        ReportStatus::Pending => "pending",
        ReportStatus::Processing => "processing",
        ReportStatus::Completed => "completed",
        ReportStatus::Failed => "failed",
        ReportStatus::Expired => "expired",
    }
}

const SELECT_REPORT_COLUMNS: &str = "SELECT id, company_id, report_type, period_start, period_end, status,
           worker_task_id, file_path, file_size_bytes, download_count, summary, error_message,
           retry_count, requested_at, completed_at, expires_at
    FROM reports";

#[derive(Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, report: &Report) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO reports (id, company_id, report_type, period_start, period_end, status,
             retry_count, download_count, requested_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(report.id)
        .bind(report.company_id)
        .bind(report_type_str(report.report_type))
        .bind(report.period_start)
        .bind(report.period_end)
        .bind(status_str(report.status))
        .bind(report.retry_count)
        .bind(report.download_count)
        .bind(report.requested_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Report> {
        let row = sqlx::query_as::<_, ReportRow>(&format!("{SELECT_REPORT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    pub async fn assign_worker_task(&self, id: Uuid, worker_task_id: &str) -> AppResult<()> {
        sqlx::query("UPDATE reports SET status = 'processing', worker_task_id = $2 WHERE id = $1")
            .bind(id)
            .bind(worker_task_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn complete(
        &self,
        id: Uuid,
        file_path: &str,
        file_size_bytes: i64,
        summary: serde_json::Value,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE reports SET status = 'completed', file_path = $2, file_size_bytes = $3,
             summary = $4, completed_at = now(), expires_at = $5 WHERE id = $1",
        )
        .bind(id)
        .bind(file_path)
        .bind(file_size_bytes)
        .bind(summary)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fail(&self, id: Uuid, error_message: &str, retry_count: i32) -> AppResult<()> {
        sqlx::query(
            "UPDATE reports SET status = 'failed', error_message = $2, retry_count = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(error_message)
        .bind(retry_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn increment_download_count(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE reports SET download_count = download_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Reports whose `expires_at` has passed and are still marked completed.
    pub async fn list_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<Report>> {
        let rows = sqlx::query_as::<_, ReportRow>(&format!(
            "{SELECT_REPORT_COLUMNS} WHERE status = 'completed' AND expires_at IS NOT NULL AND expires_at < $1"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Report::try_from).collect()
    }

    pub async fn mark_expired(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE reports SET status = 'expired' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_by_company(&self, company_id: Uuid) -> AppResult<Vec<Report>> {
        let rows = sqlx::query_as::<_, ReportRow>(&format!(
            "{SELECT_REPORT_COLUMNS} WHERE company_id = $1 ORDER BY requested_at DESC"
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Report::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_type_round_trips_through_its_column_encoding() {
        for kind in [ReportType::CbamXml, ReportType::RoiAnalysis, ReportType::Combined] {
            assert_eq!(parse_report_type(report_type_str(kind)).unwrap(), kind);
        }
    }

    #[test]
    fn report_status_round_trips_through_its_column_encoding() {
        for status in [
            ReportStatus::Pending,
            ReportStatus::Processing,
            ReportStatus::Completed,
            ReportStatus::Failed,
            ReportStatus::Expired,
        ] {
            assert_eq!(parse_status(status_str(status)).unwrap(), status);
        }
    }
}
