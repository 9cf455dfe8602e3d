//! Peer benchmarking and ROI simulation (spec §4.I, §4.J).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::{Extension, Json};
use carbonledger_access::{AccessControl, Claims};
use carbonledger_benchmarking::BenchmarkReport;
use carbonledger_workers::reporting::roi::{analyze, ConsumptionBaseline, RoiReport};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /companies/{id}/benchmark-report`: peer comparison gated by a
/// k-anonymity floor (spec §4.I).
pub async fn benchmark_report(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<BenchmarkReport>, ApiError> {
    let member = state.access.resolve_member(claims.user_id, company_id).await?;
    AccessControl::require_data_entry(&member)?;

    let report = state.benchmarking.benchmark_company(company_id).await?;
    Ok(Json(report))
}

/// `GET /companies/{id}/roi-simulator`: ranks candidate efficiency measures
/// by payback using the company's own trailing twelve months of activity.
/// There is no hypothetical-input override (e.g. a proposed solar array
/// size) yet; the simulator only ever projects off real reported data.
pub async fn roi_simulator(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<RoiReport>, ApiError> {
    let member = state.access.resolve_member(claims.user_id, company_id).await?;
    AccessControl::require_data_entry(&member)?;

    let today = Utc::now().date_naive();
    let window_start = today - Duration::days(365);
    let activity = state
        .activity
        .list_for_company_in_range(company_id, window_start, today)
        .await?;
    let financials = state.financials.find(company_id).await?;

    let baseline = ConsumptionBaseline::from_activity(&activity, financials.as_ref());
    Ok(Json(analyze(&baseline)))
}
