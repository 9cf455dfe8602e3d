//! Facility creation within a company (spec §4.A, §4.K: admin and above).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use carbonledger_access::{AccessControl, Claims};
use carbonledger_core::entities::{Facility, FacilityType};
use carbonledger_core::error::AppError;
use carbonledger_validation::validate_surface_area;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateFacilityRequest {
    pub name: String,
    pub city: String,
    pub address: Option<String>,
    pub facility_type: FacilityType,
    pub surface_area_m2: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct FacilityResponse {
    pub id: Uuid,
    pub name: String,
    pub city: String,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(company_id): Path<Uuid>,
    Json(body): Json<CreateFacilityRequest>,
) -> Result<(StatusCode, Json<FacilityResponse>), ApiError> {
    let member = state.access.resolve_member(claims.user_id, company_id).await?;
    AccessControl::require_admin(&member)?;

    if let Some(issue) = validate_surface_area(body.surface_area_m2).into_iter().next() {
        return Err(AppError::validation(issue.field, issue.message).into());
    }

    let facility = Facility {
        id: Uuid::new_v4(),
        company_id,
        name: body.name,
        city: body.city,
        address: body.address,
        facility_type: body.facility_type,
        surface_area_m2: body.surface_area_m2,
        created_at: Utc::now(),
    };
    state.facilities.create(&facility).await?;

    Ok((
        StatusCode::CREATED,
        Json(FacilityResponse {
            id: facility.id,
            name: facility.name,
            city: facility.city,
        }),
    ))
}
