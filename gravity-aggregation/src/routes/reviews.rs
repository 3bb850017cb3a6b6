use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use gravity_shared::errors::{AppError, AppResult};
use gravity_shared::types::auth::AuthUser;
use gravity_shared::types::pagination::PageRequest;
use gravity_shared::types::ApiResponse;

use crate::models::ReviewProfile;
use crate::services::discovery::parse_count;
use crate::services::reviews::{self, ReviewPage};
use crate::services::profile_id_for_session;
use crate::store::ReviewRow;
use crate::AppState;

const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub message: String,
    pub rating: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewListParams {
    pub page: Option<String>,
    pub size: Option<String>,
}

impl ReviewListParams {
    fn page_request(&self) -> AppResult<PageRequest> {
        let page = parse_count("page", &self.page)?.unwrap_or(1);
        let size = parse_count("size", &self.size)?.unwrap_or(DEFAULT_PAGE_SIZE);
        if page == 0 {
            return Err(AppError::invalid_field("page", "page must be at least 1"));
        }
        if size == 0 {
            return Err(AppError::invalid_field("size", "size must be at least 1"));
        }
        Ok(PageRequest::new(page, size))
    }
}

/// POST /reviews
pub async fn add_review(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<ReviewRequest>,
) -> AppResult<Json<ApiResponse<ReviewProfile>>> {
    let now = Utc::now();

    let review = super::run_blocking(&state, "add_review", move |repo| {
        let author_id = profile_id_for_session(repo, &auth.session_id)?;
        reviews::add_review(repo, author_id, &body.message, body.rating, now)
    })
    .await?;

    Ok(Json(ApiResponse::ok(review)))
}

/// GET /reviews?page=&size=
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(params): Query<ReviewListParams>,
) -> AppResult<Json<ApiResponse<ReviewPage>>> {
    let request = params.page_request()?;
    let now = Utc::now();

    let page = super::run_blocking(&state, "list_reviews", move |repo| {
        let viewer_id = profile_id_for_session(repo, &auth.session_id)?;
        reviews::list_reviews(repo, viewer_id, request, now)
    })
    .await?;

    Ok(Json(ApiResponse::ok(page)))
}

/// GET /reviews/:id
pub async fn get_review(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(review_id): Path<i64>,
) -> AppResult<Json<ApiResponse<ReviewRow>>> {
    let review = super::run_blocking(&state, "review_detail", move |repo| reviews::review_detail(repo, review_id)).await?;

    Ok(Json(ApiResponse::ok(review)))
}

/// PUT /reviews/:id
pub async fn edit_review(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(review_id): Path<i64>,
    Json(body): Json<ReviewRequest>,
) -> AppResult<Json<ApiResponse<ReviewProfile>>> {
    let now = Utc::now();

    let review = super::run_blocking(&state, "edit_review", move |repo| {
        let author_id = profile_id_for_session(repo, &auth.session_id)?;
        reviews::edit_review(repo, author_id, review_id, &body.message, body.rating, now)
    })
    .await?;

    Ok(Json(ApiResponse::ok(review)))
}

/// DELETE /reviews/:id
pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(review_id): Path<i64>,
) -> AppResult<Json<ApiResponse<ReviewProfile>>> {
    let now = Utc::now();

    let review = super::run_blocking(&state, "delete_review", move |repo| {
        let author_id = profile_id_for_session(repo, &auth.session_id)?;
        reviews::delete_review(repo, author_id, review_id, now)
    })
    .await?;

    Ok(Json(ApiResponse::ok_with_message(review, "review deleted")))
}
