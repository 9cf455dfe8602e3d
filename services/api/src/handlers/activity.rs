//! Activity data submission and correction (spec §4.C, §4.D, §8).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use carbonledger_access::{AccessControl, Claims};
use carbonledger_calculation::ActivityQuantity;
use carbonledger_core::entities::{ActivityData, ActivityKind, Scope};
use carbonledger_core::error::AppError;
use carbonledger_validation::{validate_activity, ActivityInput};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ActivityDataRequest {
    pub activity_kind: ActivityKind,
    pub quantity: Decimal,
    pub unit: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cost: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct ActivityDataResponse {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub activity_kind: ActivityKind,
    pub quantity: Decimal,
    pub scope: Scope,
    pub calculated_co2e_kg: Option<Decimal>,
    pub is_fallback_calculation: bool,
}

impl From<ActivityData> for ActivityDataResponse {
    fn from(row: ActivityData) -> Self {
        Self {
            id: row.id,
            facility_id: row.facility_id,
            activity_kind: row.activity_kind,
            quantity: row.quantity,
            scope: row.scope,
            calculated_co2e_kg: row.calculated_co2e_kg,
            is_fallback_calculation: row.is_fallback_calculation,
        }
    }
}

fn first_issue(issues: Vec<carbonledger_validation::ValidationIssue>) -> Result<(), ApiError> {
    match issues.into_iter().next() {
        Some(issue) => Err(AppError::validation(issue.field, issue.message).into()),
        None => Ok(()),
    }
}

/// `POST /facilities/{id}/activity-data/`: the hot calculation path (spec
/// §8's worked example — 1500 kWh electricity calculates to 712.5 kg CO2e).
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(facility_id): Path<Uuid>,
    Json(body): Json<ActivityDataRequest>,
) -> Result<(StatusCode, Json<ActivityDataResponse>), ApiError> {
    let facility = state.facilities.find_by_id(facility_id).await?;
    let member = state.access.resolve_member(claims.user_id, facility.company_id).await?;
    AccessControl::require_data_entry(&member)?;
    state.access.check_facility_access(facility_id, &member).await?;

    let today = Utc::now().date_naive();
    first_issue(validate_activity(
        &ActivityInput {
            activity_kind: body.activity_kind,
            quantity: body.quantity,
            unit: body.unit.clone(),
            start_date: body.start_date,
            end_date: body.end_date,
            cost: body.cost,
        },
        today,
    ))?;

    let activity = ActivityData {
        id: Uuid::new_v4(),
        facility_id,
        activity_kind: body.activity_kind,
        quantity: body.quantity,
        unit: body.unit.clone(),
        start_date: body.start_date,
        end_date: body.end_date,
        scope: body.activity_kind.derived_scope(),
        calculated_co2e_kg: None,
        is_fallback_calculation: false,
        is_simulation: false,
        created_at: Utc::now(),
    };
    state.activity.create(&activity).await?;

    let result = state
        .calculation
        .calculate_for_activity(&ActivityQuantity {
            activity_kind: body.activity_kind,
            quantity: body.quantity,
            unit: body.unit,
            region: Some(facility.city.clone()),
            year: Some(body.start_date.format("%Y").to_string().parse().unwrap_or(0)),
        })
        .await?;

    state
        .activity
        .update_calculation(activity.id, result.total_co2e_kg, result.is_fallback)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ActivityDataResponse {
            id: activity.id,
            facility_id: activity.facility_id,
            activity_kind: activity.activity_kind,
            quantity: activity.quantity,
            scope: activity.scope,
            calculated_co2e_kg: Some(result.total_co2e_kg),
            is_fallback_calculation: result.is_fallback,
        }),
    ))
}

/// `PUT /activity-data/{id}`: correct a previously reported row and
/// recalculate its CO2e from the corrected quantity/unit/dates.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(activity_id): Path<Uuid>,
    Json(body): Json<ActivityDataRequest>,
) -> Result<Json<ActivityDataResponse>, ApiError> {
    let existing = state.activity.find_by_id(activity_id).await?;
    let facility = state.facilities.find_by_id(existing.facility_id).await?;
    let member = state.access.resolve_member(claims.user_id, facility.company_id).await?;
    AccessControl::require_data_entry(&member)?;
    state.access.check_facility_access(facility.id, &member).await?;

    let today = Utc::now().date_naive();
    first_issue(validate_activity(
        &ActivityInput {
            activity_kind: existing.activity_kind,
            quantity: body.quantity,
            unit: body.unit.clone(),
            start_date: body.start_date,
            end_date: body.end_date,
            cost: body.cost,
        },
        today,
    ))?;

    state
        .activity
        .update_fields(activity_id, body.quantity, &body.unit, body.start_date, body.end_date)
        .await?;

    let result = state
        .calculation
        .calculate_for_activity(&ActivityQuantity {
            activity_kind: existing.activity_kind,
            quantity: body.quantity,
            unit: body.unit.clone(),
            region: Some(facility.city),
            year: Some(body.start_date.format("%Y").to_string().parse().unwrap_or(0)),
        })
        .await?;

    state
        .activity
        .update_calculation(activity_id, result.total_co2e_kg, result.is_fallback)
        .await?;

    Ok(Json(ActivityDataResponse {
        id: activity_id,
        facility_id: existing.facility_id,
        activity_kind: existing.activity_kind,
        quantity: body.quantity,
        scope: existing.scope,
        calculated_co2e_kg: Some(result.total_co2e_kg),
        is_fallback_calculation: result.is_fallback,
    }))
}
