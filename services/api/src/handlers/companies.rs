//! Company creation (spec §4.A, §4.K): the creating user becomes owner.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use carbonledger_access::Claims;
use carbonledger_core::entities::{Company, Member, Role};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub tax_number: Option<String>,
    pub industry_type: String,
}

#[derive(Debug, Serialize)]
pub struct CompanyResponse {
    pub id: Uuid,
    pub name: String,
    pub industry_type: String,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<CompanyResponse>), ApiError> {
    let company = Company {
        id: Uuid::new_v4(),
        name: body.name,
        tax_number: body.tax_number,
        industry_type: body.industry_type,
        owner_user_id: claims.user_id,
        created_at: Utc::now(),
    };
    state.companies.create(&company).await?;

    let member = Member {
        id: Uuid::new_v4(),
        user_id: claims.user_id,
        company_id: company.id,
        role: Role::Owner,
        facility_id: None,
        created_at: Utc::now(),
    };
    state.members.create(&member).await?;

    Ok((
        StatusCode::CREATED,
        Json(CompanyResponse {
            id: company.id,
            name: company.name,
            industry_type: company.industry_type,
        }),
    ))
}
