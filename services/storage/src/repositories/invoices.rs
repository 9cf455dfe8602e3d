//! Uploaded invoices and their OCR extraction state machine.

use carbonledger_core::entities::{Invoice, InvoiceMime, InvoiceStatus};
use carbonledger_core::error::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::activity::parse_activity_kind;

#[derive(FromRow)]
struct InvoiceRow {
    id: Uuid,
    facility_id: Uuid,
    uploaded_by_user_id: Uuid,
    file_path: String,
    mime: String,
    status: String,
    extracted_activity_kind: Option<String>,
    extracted_quantity: Option<Decimal>,
    extracted_cost_tl: Option<Decimal>,
    extracted_start_date: Option<NaiveDate>,
    extracted_end_date: Option<NaiveDate>,
    extracted_text: Option<String>,
    confidence: Option<f64>,
    retry_count: i32,
    error_message: Option<String>,
    produced_activity_data_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = AppError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Invoice {
            id: row.id,
            facility_id: row.facility_id,
            uploaded_by_user_id: row.uploaded_by_user_id,
            file_path: row.file_path,
            mime: parse_mime(&row.mime)?,
            status: parse_status(&row.status)?,
            extracted_activity_kind: row
                .extracted_activity_kind
                .as_deref()
                .map(parse_activity_kind)
                .transpose()?,
            extracted_quantity: row.extracted_quantity,
            extracted_cost_tl: row.extracted_cost_tl,
            extracted_start_date: row.extracted_start_date,
            extracted_end_date: row.extracted_end_date,
            extracted_text: row.extracted_text,
            confidence: row.confidence,
            retry_count: row.retry_count,
            error_message: row.error_message,
            produced_activity_data_id: row.produced_activity_data_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_mime(raw: &str) -> AppResult<InvoiceMime> {
    match raw {
        "pdf" => Ok(InvoiceMime::Pdf),
        "jpeg" => Ok(InvoiceMime::Jpeg),
        "png" => Ok(InvoiceMime::Png),
        other => Err(AppError::Internal(format!("unknown invoice mime {other}"))),
    }
}

pub fn mime_str(mime: InvoiceMime) -> &'static str {
    match mime {
        InvoiceMime::Pdf => "pdf",
        InvoiceMime::Jpeg => "jpeg",
        InvoiceMime::Png => "png",
    }
}

fn parse_status(raw: &str) -> AppResult<InvoiceStatus> {
    match raw {
        "pending" => Ok(InvoiceStatus::Pending),
        "processing" => Ok(InvoiceStatus::Processing),
        "completed" => Ok(InvoiceStatus::Completed),
        "failed" => Ok(InvoiceStatus::Failed),
        "verified" => Ok(InvoiceStatus::Verified),
        other => Err(AppError::Internal(format!("unknown invoice status {other}"))),
    }
}

pub fn status_str(status: InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Pending => "pending",
        InvoiceStatus::Processing => "processing",
        InvoiceStatus::Completed => "completed",
        InvoiceStatus::Failed => "failed",
        InvoiceStatus::Verified => "verified",
    }
}

#[derive(Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, invoice: &Invoice) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO invoices
             (id, facility_id, uploaded_by_user_id, file_path, mime, status, retry_count,
              created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(invoice.id)
        .bind(invoice.facility_id)
        .bind(invoice.uploaded_by_user_id)
        .bind(&invoice.file_path)
        .bind(mime_str(invoice.mime))
        .bind(status_str(invoice.status))
        .bind(invoice.retry_count)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Invoice> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!("{SELECT_INVOICE_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    pub async fn mark_processing(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE invoices SET status = 'processing', updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record_extraction(
        &self,
        id: Uuid,
        activity_kind: Option<&str>,
        quantity: Option<Decimal>,
        cost_tl: Option<Decimal>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        text: Option<&str>,
        confidence: f64,
        status: InvoiceStatus,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE invoices SET
                extracted_activity_kind = $2, extracted_quantity = $3, extracted_cost_tl = $4,
                extracted_start_date = $5, extracted_end_date = $6, extracted_text = $7,
                confidence = $8, status = $9, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(activity_kind)
        .bind(quantity)
        .bind(cost_tl)
        .bind(start_date)
        .bind(end_date)
        .bind(text)
        .bind(confidence)
        .bind(status_str(status))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: Uuid, error_message: &str, retry_count: i32) -> AppResult<()> {
        sqlx::query(
            "UPDATE invoices SET status = 'failed', error_message = $2, retry_count = $3,
             updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(error_message)
        .bind(retry_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_verified(&self, id: Uuid, produced_activity_data_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE invoices SET status = 'verified', produced_activity_data_id = $2,
             updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(produced_activity_data_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_by_facility(&self, facility_id: Uuid) -> AppResult<Vec<Invoice>> {
        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            "{SELECT_INVOICE_COLUMNS} WHERE facility_id = $1 ORDER BY created_at DESC"
        ))
        .bind(facility_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Invoice::try_from).collect()
    }
}

const SELECT_INVOICE_COLUMNS: &str = "SELECT id, facility_id, uploaded_by_user_id, file_path, mime, status,
           extracted_activity_kind, extracted_quantity, extracted_cost_tl, extracted_start_date,
           extracted_end_date, extracted_text, confidence, retry_count, error_message,
           produced_activity_data_id, created_at, updated_at
    FROM invoices";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_round_trips_through_its_column_encoding() {
        for mime in [InvoiceMime::Pdf, InvoiceMime::Jpeg, InvoiceMime::Png] {
            assert_eq!(parse_mime(mime_str(mime)).unwrap(), mime);
        }
    }

    #[test]
    fn status_round_trips_through_its_column_encoding() {
        for status in [
            InvoiceStatus::Pending,
            InvoiceStatus::Processing,
            InvoiceStatus::Completed,
            InvoiceStatus::Failed,
            InvoiceStatus::Verified,
        ] {
            assert_eq!(parse_status(status_str(status)).unwrap(), status);
        }
    }
}
