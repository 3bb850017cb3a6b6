use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use validator::Validate;

use gravity_shared::errors::{AppError, AppResult, ErrorCode};
use gravity_shared::types::pagination::{PageRequest, Paginated};

use crate::models::{NewReview, ReviewProfile};
use crate::services::presence;
use crate::store::{ProfileRepository, ReviewRow};

pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 5.0;

#[derive(Debug, Validate)]
struct ReviewBody {
    #[validate(length(min = 1, max = 1000))]
    message: String,
}

fn check_review(message: &str, rating: f64) -> AppResult<String> {
    let message = message.trim().to_string();
    let body = ReviewBody { message };
    body.validate()?;
    if !(rating.is_finite() && (MIN_RATING..=MAX_RATING).contains(&rating)) {
        return Err(AppError::invalid_field("rating", "rating must be between 1 and 5"));
    }
    Ok(body.message)
}

/// Nearest half star: 3.74 shows as 3.5, 3.75 as 4.0.
pub fn round_to_half(value: f64) -> f64 {
    (value * 2.0).round() / 2.0
}

/// `[midnight, next midnight)` in UTC around `now`.
pub fn day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

/// Loads a review the caller is allowed to change.
fn owned_review(repo: &dyn ProfileRepository, author_id: i64, review_id: i64) -> AppResult<ReviewRow> {
    let row = repo
        .find_review(review_id)?
        .filter(|r| !r.review.has_deleted)
        .ok_or_else(|| AppError::new(ErrorCode::ReviewNotFound, "review not found"))?;
    if row.review.profile_id != author_id {
        return Err(AppError::new(ErrorCode::ReviewNotOwned, "review belongs to another profile"));
    }
    Ok(row)
}

pub fn add_review(
    repo: &dyn ProfileRepository,
    author_id: i64,
    message: &str,
    rating: f64,
    now: DateTime<Utc>,
) -> AppResult<ReviewProfile> {
    let message = check_review(message, rating)?;
    let author = super::require_active(repo, author_id)?;
    presence::check_in(repo, author.id, None, now)?;

    let review = repo.insert_review(&NewReview {
        profile_id: author.id,
        message,
        rating,
        created_at: now,
        updated_at: now,
    })?;
    tracing::info!(author_id, review_id = review.id, "review added");
    Ok(review)
}

pub fn edit_review(
    repo: &dyn ProfileRepository,
    author_id: i64,
    review_id: i64,
    message: &str,
    rating: f64,
    now: DateTime<Utc>,
) -> AppResult<ReviewProfile> {
    let message = check_review(message, rating)?;
    super::require_active(repo, author_id)?;
    owned_review(repo, author_id, review_id)?;
    presence::check_in(repo, author_id, None, now)?;

    let review = repo
        .edit_review(review_id, &message, rating, now)?
        .ok_or_else(|| AppError::new(ErrorCode::ReviewNotFound, "review not found"))?;
    tracing::info!(author_id, review_id, "review edited");
    Ok(review)
}

pub fn delete_review(
    repo: &dyn ProfileRepository,
    author_id: i64,
    review_id: i64,
    now: DateTime<Utc>,
) -> AppResult<ReviewProfile> {
    super::require_active(repo, author_id)?;
    owned_review(repo, author_id, review_id)?;

    let review = repo
        .soft_delete_review(review_id, now)?
        .ok_or_else(|| AppError::new(ErrorCode::ReviewNotFound, "review not found"))?;
    tracing::info!(author_id, review_id, "review deleted");
    Ok(review)
}

/// A live review with its author's display name. Deleted reviews are not found.
pub fn review_detail(repo: &dyn ProfileRepository, review_id: i64) -> AppResult<ReviewRow> {
    repo.find_review(review_id)?
        .filter(|r| !r.review.has_deleted)
        .ok_or_else(|| AppError::new(ErrorCode::ReviewNotFound, "review not found"))
}

#[derive(Debug, Serialize)]
pub struct ReviewPage {
    #[serde(flatten)]
    pub page: Paginated<ReviewRow>,
    /// Mean rating of all live reviews to the nearest 0.5, or 0 when there are none.
    pub rating_average: f64,
    /// Reviews the caller wrote during the current UTC day, deleted ones included.
    pub reviewed_today: u64,
}

pub fn list_reviews(
    repo: &dyn ProfileRepository,
    viewer_id: i64,
    request: PageRequest,
    now: DateTime<Utc>,
) -> AppResult<ReviewPage> {
    let viewer = super::require_active(repo, viewer_id)?;
    presence::check_in(repo, viewer.id, None, now)?;

    let items = repo.list_reviews(request.offset(), request.limit())?;
    let (day_start, day_end) = day_bounds(now);
    let stats = repo.review_stats(viewer.id, day_start, day_end)?;

    Ok(ReviewPage {
        page: Paginated::new(items, stats.total, &request),
        rating_average: stats.average_rating.map(round_to_half).unwrap_or(0.0),
        reviewed_today: stats.authored_in_window,
    })
}

// ─── Tests ───
