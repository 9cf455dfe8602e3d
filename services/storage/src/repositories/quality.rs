//! Event idempotency audit trail and validation-rejection records.

use carbonledger_core::entities::{DataQualityIssue, EventLogEntry, IssueSeverity};
use carbonledger_core::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow)]
struct DataQualityIssueRow {
    id: Uuid,
    facility_id: Option<Uuid>,
    code: String,
    field: String,
    message: String,
    severity: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<DataQualityIssueRow> for DataQualityIssue {
    type Error = AppError;

    fn try_from(row: DataQualityIssueRow) -> Result<Self, Self::Error> {
        Ok(DataQualityIssue {
            id: row.id,
            facility_id: row.facility_id,
            code: row.code,
            field: row.field,
            message: row.message,
            severity: match row.severity.as_str() {
                "warning" => IssueSeverity::Warning,
                "error" => IssueSeverity::Error,
                other => return Err(AppError::Internal(format!("unknown severity {other}"))),
            },
            created_at: row.created_at,
        })
    }
}

fn severity_str(severity: IssueSeverity) -> &'static str {
    match severity {
        IssueSeverity::Warning => "warning",
        IssueSeverity::Error => "error",
    }
}

#[derive(Clone)]
pub struct EventLogRepository {
    pool: PgPool,
}

impl EventLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, entry: &EventLogEntry) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO event_log (event_id, event_type, processed_at, status)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(entry.event_id)
        .bind(&entry.event_type)
        .bind(entry.processed_at)
        .bind(&entry.status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn was_processed(&self, event_id: Uuid) -> AppResult<bool> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT event_id FROM event_log WHERE event_id = $1")
                .bind(event_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }
}

#[derive(Clone)]
pub struct DataQualityIssueRepository {
    pool: PgPool,
}

impl DataQualityIssueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, issue: &DataQualityIssue) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO data_quality_issues (id, facility_id, code, field, message, severity, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(issue.id)
        .bind(issue.facility_id)
        .bind(&issue.code)
        .bind(&issue.field)
        .bind(&issue.message)
        .bind(severity_str(issue.severity))
        .bind(issue.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_by_facility(&self, facility_id: Uuid) -> AppResult<Vec<DataQualityIssue>> {
        let rows = sqlx::query_as::<_, DataQualityIssueRow>(
            "SELECT id, facility_id, code, field, message, severity, created_at
             FROM data_quality_issues WHERE facility_id = $1 ORDER BY created_at DESC",
        )
        .bind(facility_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(DataQualityIssue::try_from).collect()
    }
}
