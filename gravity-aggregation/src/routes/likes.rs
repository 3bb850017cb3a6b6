use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use gravity_shared::errors::AppResult;
use gravity_shared::types::auth::AuthUser;
use gravity_shared::types::ApiResponse;

use crate::models::LikeProfile;
use crate::services::{moderation, notify, profile_id_for_session};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SendLikeRequest {
    pub liked_id: i64,
    pub message: Option<String>,
}

pub async fn send_like(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<SendLikeRequest>,
) -> AppResult<Json<ApiResponse<LikeProfile>>> {
    let now = Utc::now();

    let (like, notification) = super::run_blocking(&state, "submit_like", move |repo| {
        let liker_id = profile_id_for_session(repo, &auth.session_id)?;
        let outcome = moderation::submit_like(repo, liker_id, body.liked_id, now)?;
        if !outcome.newly_liked {
            return Ok((outcome.like, None));
        }

        // the like stands even if the notification cannot be prepared
        let notification = notify::like_notification(repo, liker_id, body.liked_id, body.message.as_deref())
            .unwrap_or_else(|e| {
                tracing::warn!(liker_id, liked_id = body.liked_id, error = %e, "failed to prepare like notification");
                None
            });
        Ok((outcome.like, notification))
    })
    .await?;

    if let Some(content) = notification {
        state.hub.publish(content).await;
    }

    Ok(Json(ApiResponse::ok(like)))
}

/// DELETE /likes/:liked_id
pub async fn cancel_like(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(liked_id): Path<i64>,
) -> AppResult<Json<ApiResponse<LikeProfile>>> {
    let now = Utc::now();

    let like = super::run_blocking(&state, "cancel_like", move |repo| {
        let liker_id = profile_id_for_session(repo, &auth.session_id)?;
        moderation::cancel_like(repo, liker_id, liked_id, now)
    })
    .await?;

    Ok(Json(ApiResponse::ok(like)))
}
