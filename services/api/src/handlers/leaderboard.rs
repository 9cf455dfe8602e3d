//! Industry/region efficiency leaderboard (spec §4.H).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use carbonledger_core::entities::LeaderboardEntry;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub industry_type: String,
    pub region: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// `GET /leaderboard?industry_type=...&region=...&limit=...`.
pub async fn top(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let entries = state
        .leaderboard
        .list_top(&query.industry_type, &query.region, query.limit)
        .await?;
    Ok(Json(entries))
}
