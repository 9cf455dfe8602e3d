//! Supplier invitations feeding the Scope 3 network (spec §4.K, §5's
//! single-use token requirement).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use carbonledger_access::{generate_invite_token, AccessControl, Claims};
use carbonledger_core::entities::{InvitationStatus, NotificationKind, SupplierInvitation};
use carbonledger_core::error::AppError;
use carbonledger_validation::validate_email;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

const INVITE_VALIDITY_DAYS: i64 = 14;

#[derive(Debug, Deserialize)]
pub struct InviteSupplierRequest {
    pub company_id: Uuid,
    pub contact_email: String,
}

#[derive(Debug, Serialize)]
pub struct InviteSupplierResponse {
    pub invitation_id: Uuid,
    pub invite_token: String,
}

/// `POST /suppliers/invite`.
pub async fn invite(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<InviteSupplierRequest>,
) -> Result<(StatusCode, Json<InviteSupplierResponse>), ApiError> {
    let member = state.access.resolve_member(claims.user_id, body.company_id).await?;
    AccessControl::require_admin(&member)?;

    if let Some(issue) = validate_email(&body.contact_email).into_iter().next() {
        return Err(AppError::validation(issue.field, issue.message).into());
    }

    let supplier = state.suppliers.find_or_create_by_email(&body.contact_email).await?;

    let invite_token = generate_invite_token();
    let now = Utc::now();
    let invitation = SupplierInvitation {
        id: Uuid::new_v4(),
        company_id: body.company_id,
        supplier_id: supplier.id,
        invite_token: invite_token.clone(),
        status: InvitationStatus::Pending,
        expires_at: now + Duration::days(INVITE_VALIDITY_DAYS),
        created_at: now,
    };
    state.invitations.create(&invitation).await?;

    if let Ok(Some(user)) = state.users.find_by_email(&body.contact_email).await {
        let accept_url = format!("/suppliers/accept/{invite_token}");
        let _ = state
            .notifications
            .notify(
                user.id,
                NotificationKind::SupplierInvite,
                "You've been invited to report Scope 3 data",
                "A company has invited you to declare product carbon footprints.",
                Some(&accept_url),
                true,
            )
            .await;
    }

    Ok((
        StatusCode::CREATED,
        Json(InviteSupplierResponse {
            invitation_id: invitation.id,
            invite_token,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct AcceptInvitationResponse {
    pub status: InvitationStatus,
}

/// `POST /suppliers/accept/{token}`: single-use, unauthenticated acceptance.
pub async fn accept(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<AcceptInvitationResponse>, ApiError> {
    let invitation = state.invitations.find_by_token(&token).await?;

    if invitation.status != InvitationStatus::Pending {
        return Err(AppError::Conflict("invitation is no longer pending".into()).into());
    }
    if invitation.expires_at < Utc::now() {
        state.invitations.set_status(invitation.id, InvitationStatus::Expired).await?;
        return Err(AppError::Conflict("invitation has expired".into()).into());
    }

    state.invitations.set_status(invitation.id, InvitationStatus::Accepted).await?;

    Ok(Json(AcceptInvitationResponse {
        status: InvitationStatus::Accepted,
    }))
}
