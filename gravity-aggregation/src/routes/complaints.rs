use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use gravity_shared::errors::AppResult;
use gravity_shared::types::auth::AuthUser;
use gravity_shared::types::ApiResponse;

use crate::services::moderation::{self, ComplaintOutcome};
use crate::services::profile_id_for_session;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateComplaintRequest {
    pub accused_id: i64,
    pub reason: String,
}

pub async fn create_complaint(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateComplaintRequest>,
) -> AppResult<Json<ApiResponse<ComplaintOutcome>>> {
    let now = Utc::now();

    let outcome = super::run_blocking(&state, "submit_complaint", move |repo| {
        let complainant_id = profile_id_for_session(repo, &auth.session_id)?;
        moderation::submit_complaint(repo, complainant_id, body.accused_id, &body.reason, now)
    })
    .await?;

    Ok(Json(ApiResponse::ok(outcome)))
}
