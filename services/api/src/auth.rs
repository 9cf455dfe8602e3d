//! Bearer JWT authentication middleware (spec §4.K). A handful of routes
//! (registration, login, the CSV template, and accepting a supplier
//! invite) are reachable without a token; everything else requires one.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use carbonledger_access::Claims;

use crate::state::AppState;

fn is_public(path: &str) -> bool {
    path == "/token"
        || path == "/users/"
        || path == "/csv-template/activity-data"
        || path.starts_with("/suppliers/accept/")
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if is_public(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(token) = token else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    let claims: Claims = state
        .auth
        .verify_token(token)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
