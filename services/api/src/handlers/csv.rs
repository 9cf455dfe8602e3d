//! Bulk activity-data ingestion via CSV upload (spec §4.B, §4.C).

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use carbonledger_access::{AccessControl, Claims};
use carbonledger_eventbus::events::{Event, EventContext, ValidatedActivityPayload};
use carbonledger_eventbus::EventEnvelope;
use carbonledger_workers::csv::{parse_and_validate, template_csv, CsvUploadOutcome, MAX_FILE_SIZE_BYTES};
use chrono::Utc;
use uuid::Uuid;

use crate::error::{ApiError, PayloadTooLarge};
use crate::state::AppState;

pub enum UploadError {
    TooLarge(PayloadTooLarge),
    Api(ApiError),
}

impl From<ApiError> for UploadError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

impl From<carbonledger_core::error::AppError> for UploadError {
    fn from(err: carbonledger_core::error::AppError) -> Self {
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

/// `POST /facilities/{id}/upload-csv`: parses and validates every row
/// synchronously, publishing one `ActivityValidated` event per valid row so
/// ingestion (and its downstream calculation) happens off the request path.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(facility_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<CsvUploadOutcome>, UploadError> {
    let facility = state.facilities.find_by_id(facility_id).await?;
    let member = state.access.resolve_member(claims.user_id, facility.company_id).await?;
    AccessControl::require_data_entry(&member)?;
    state.access.check_facility_access(facility_id, &member).await?;

    let mut raw: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| UploadError::TooLarge(PayloadTooLarge("malformed multipart body")))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|_| UploadError::TooLarge(PayloadTooLarge("malformed multipart body")))?;
            if bytes.len() > MAX_FILE_SIZE_BYTES {
                return Err(UploadError::TooLarge(PayloadTooLarge("csv file exceeds 5 MiB")));
            }
            raw = Some(bytes.to_vec());
        }
    }
    let raw = raw.ok_or_else(|| {
        UploadError::Api(carbonledger_core::error::AppError::validation("file", "no file field in upload").into())
    })?;

    let today = Utc::now().date_naive();
    let outcome = parse_and_validate(&raw, today)
        .map_err(|issue| carbonledger_core::error::AppError::validation(issue.field, issue.message))?;

    for row in outcome.results.iter().filter(|r| r.success) {
        let (Some(kind), Some(quantity), Some(unit), Some(start_date), Some(end_date)) = (
            row.activity_kind,
            row.quantity,
            row.unit.clone(),
            row.start_date,
            row.end_date,
        ) else {
            continue;
        };
        let envelope = EventEnvelope::new(Event::ActivityValidated {
            payload: ValidatedActivityPayload {
                activity_kind: kind,
                quantity,
                unit,
                start_date,
                end_date,
                cost: None,
            },
            context: EventContext {
                facility_id: Some(facility_id),
                user_id: Some(claims.user_id),
            },
        });
        state
            .bus
            .publish(carbonledger_eventbus::QueueName::Ingestion, envelope)
            .await?;
    }

    Ok(Json(outcome))
}

/// `GET /csv-template/activity-data`: public, unauthenticated template download.
pub async fn template() -> Response {
    (
        StatusCode::OK,
        [("content-type", "text/csv")],
        template_csv(),
    )
        .into_response()
}
