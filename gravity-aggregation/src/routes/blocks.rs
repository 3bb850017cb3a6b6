use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use gravity_shared::errors::AppResult;
use gravity_shared::types::auth::AuthUser;
use gravity_shared::types::ApiResponse;

use crate::models::BlockedProfile;
use crate::services::{moderation, profile_id_for_session};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBlockRequest {
    pub blocked_id: i64,
}

pub async fn create_block(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateBlockRequest>,
) -> AppResult<Json<ApiResponse<BlockedProfile>>> {
    let now = Utc::now();

    let block = super::run_blocking(&state, "submit_block", move |repo| {
        let blocker_id = profile_id_for_session(repo, &auth.session_id)?;
        moderation::submit_block(repo, blocker_id, body.blocked_id, now)
    })
    .await?;

    Ok(Json(ApiResponse::ok(block)))
}

/// DELETE /blocks/:blocked_id
pub async fn lift_block(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(blocked_id): Path<i64>,
) -> AppResult<Json<ApiResponse<BlockedProfile>>> {
    let now = Utc::now();

    let block = super::run_blocking(&state, "lift_block", move |repo| {
        let blocker_id = profile_id_for_session(repo, &auth.session_id)?;
        moderation::lift_block(repo, blocker_id, blocked_id, now)
    })
    .await?;

    Ok(Json(ApiResponse::ok_with_message(block, "block lifted")))
}
