//! Invoice upload and human verification of its OCR extraction (spec §4.F).

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use carbonledger_access::{AccessControl, Claims};
use carbonledger_core::entities::{Invoice, InvoiceMime, InvoiceStatus};
use carbonledger_core::error::AppError;
use carbonledger_eventbus::events::{Event, EventContext, InvoiceVerifiedPayload};
use carbonledger_eventbus::EventEnvelope;
use carbonledger_workers::OcrWorker;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, PayloadTooLarge};
use crate::state::AppState;

const MAX_INVOICE_SIZE_BYTES: usize = 10 * 1024 * 1024;

pub enum UploadError {
    TooLarge(PayloadTooLarge),
    Api(ApiError),
}

impl From<ApiError> for UploadError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

impl From<AppError> for UploadError {
    fn from(err: AppError) -> Self {
        Self::Api(err.into())
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        match self {
            Self::TooLarge(err) => err.into_response(),
            Self::Api(err) => err.into_response(),
        }
    }
}

fn mime_from_content_type(content_type: Option<&str>) -> Option<InvoiceMime> {
    match content_type {
        Some("application/pdf") => Some(InvoiceMime::Pdf),
        Some("image/jpeg") => Some(InvoiceMime::Jpeg),
        Some("image/png") => Some(InvoiceMime::Png),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub status: InvoiceStatus,
}

/// `POST /facilities/{id}/invoices/upload`: persists the file, creates the
/// invoice row and kicks off OCR extraction in the background. The request
/// returns as soon as the bytes are on disk; extraction is asynchronous.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(facility_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<InvoiceResponse>), UploadError> {
    let facility = state.facilities.find_by_id(facility_id).await?;
    let member = state.access.resolve_member(claims.user_id, facility.company_id).await?;
    AccessControl::require_data_entry(&member)?;
    state.access.check_facility_access(facility_id, &member).await?;

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut mime: Option<InvoiceMime> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| UploadError::TooLarge(PayloadTooLarge("malformed multipart body")))?
    {
        if field.name() == Some("file") {
            mime = mime_from_content_type(field.content_type());
            let bytes = field
                .bytes()
                .await
                .map_err(|_| UploadError::TooLarge(PayloadTooLarge("malformed multipart body")))?;
            if bytes.len() > MAX_INVOICE_SIZE_BYTES {
                return Err(UploadError::TooLarge(PayloadTooLarge("invoice file exceeds 10 MiB")));
            }
            file_bytes = Some(bytes.to_vec());
        }
    }
    let file_bytes = file_bytes
        .ok_or_else(|| UploadError::Api(AppError::validation("file", "no file field in upload").into()))?;
    let mime = mime.ok_or_else(|| {
        UploadError::Api(AppError::validation("file", "unsupported content type, expected pdf/jpeg/png").into())
    })?;

    let invoice_id = Uuid::new_v4();
    let extension = match mime {
        InvoiceMime::Pdf => "pdf",
        InvoiceMime::Jpeg => "jpg",
        InvoiceMime::Png => "png",
    };
    let file_path = state.artifact_dir.join(format!("{invoice_id}.{extension}"));
    tokio::fs::create_dir_all(&state.artifact_dir)
        .await
        .map_err(|e| AppError::Internal(format!("could not create artifact directory: {e}")))?;
    tokio::fs::write(&file_path, &file_bytes)
        .await
        .map_err(|e| AppError::Internal(format!("could not persist invoice file: {e}")))?;

    let now = Utc::now();
    let invoice = Invoice {
        id: invoice_id,
        facility_id,
        uploaded_by_user_id: claims.user_id,
        file_path: file_path.to_string_lossy().into_owned(),
        mime,
        status: InvoiceStatus::Pending,
        extracted_activity_kind: None,
        extracted_quantity: None,
        extracted_cost_tl: None,
        extracted_start_date: None,
        extracted_end_date: None,
        extracted_text: None,
        confidence: None,
        retry_count: 0,
        error_message: None,
        produced_activity_data_id: None,
        created_at: now,
        updated_at: now,
    };
    state.invoices.create(&invoice).await?;

    let worker = OcrWorker::new(
        state.vision_base_url.clone(),
        state.invoices.clone(),
        state.notifications.clone(),
    );
    tokio::spawn(async move {
        if let Err(err) = worker.process(&invoice, &file_bytes).await {
            tracing::error!(error = %err, invoice_id = %invoice.id, "invoice OCR extraction failed");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(InvoiceResponse {
            id: invoice_id,
            status: InvoiceStatus::Pending,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct VerifyInvoiceRequest {
    pub activity_kind: carbonledger_core::entities::ActivityKind,
    pub quantity: Decimal,
    pub unit: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cost_tl: Option<Decimal>,
}

/// `POST /invoices/{id}/verify`: a human confirms (and may correct) the
/// OCR-extracted fields. Publishes the event that the ingestion worker
/// consumes to create activity data and link it back to this invoice.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(invoice_id): Path<Uuid>,
    Json(body): Json<VerifyInvoiceRequest>,
) -> Result<StatusCode, ApiError> {
    let invoice = state.invoices.find_by_id(invoice_id).await?;
    let facility = state.facilities.find_by_id(invoice.facility_id).await?;
    let member = state.access.resolve_member(claims.user_id, facility.company_id).await?;
    AccessControl::require_data_entry(&member)?;
    state.access.check_facility_access(facility.id, &member).await?;

    let envelope = EventEnvelope::new(Event::InvoiceVerified {
        payload: InvoiceVerifiedPayload {
            invoice_id,
            activity_kind: body.activity_kind,
            quantity: body.quantity,
            unit: body.unit,
            start_date: body.start_date,
            end_date: body.end_date,
            cost_tl: body.cost_tl,
        },
        context: EventContext {
            facility_id: Some(facility.id),
            user_id: Some(claims.user_id),
        },
    });
    state
        .bus
        .publish(carbonledger_eventbus::QueueName::Ingestion, envelope)
        .await?;

    Ok(StatusCode::ACCEPTED)
}
