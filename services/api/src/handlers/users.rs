//! Registration and login (spec §4.D, §6).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use carbonledger_core::entities::User;
use carbonledger_core::error::AppError;
use carbonledger_validation::{validate_email, validate_password};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::password::{hash_password, verify_password};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let mut issues = validate_email(&body.email);
    issues.extend(validate_password(&body.password));
    if let Some(issue) = issues.into_iter().next() {
        return Err(AppError::validation(issue.field, issue.message).into());
    }

    if state.users.find_by_email(&body.email).await?.is_some() {
        return Err(AppError::Conflict("an account with this email already exists".into()).into());
    }

    let user = User {
        id: Uuid::new_v4(),
        email: body.email,
        hashed_password: hash_password(&body.password),
        is_active: true,
        is_superuser: false,
        created_at: Utc::now(),
    };
    state.users.create(&user).await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            email: user.email,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .users
        .find_by_email(&body.email)
        .await?
        .ok_or(AppError::Auth)?;

    if !user.is_active || !verify_password(&body.password, &user.hashed_password) {
        return Err(AppError::Auth.into());
    }

    let access_token = state.auth.issue_token(user.id, &user.email)?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}
