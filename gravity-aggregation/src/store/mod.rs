use chrono::{DateTime, Utc};
use serde::Serialize;

use gravity_shared::errors::AppResult;

use crate::geo::GeoPoint;
use crate::models::{
    BlockedProfile, ComplaintProfile, FilterProfile, ImageProfile, LikeProfile, NavigatorProfile,
    NewComplaint, NewReview, Profile, ReviewProfile, TelegramProfile,
};
use crate::services::discovery::DiscoveryQuery;

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgProfileRepository;

/// A profile matched by a discovery query together with its distance to the viewer.
#[derive(Debug, Clone)]
pub struct CandidateRow {
    pub profile: Profile,
    pub distance_m: f64,
}

/// A live review joined with its author's display name.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewRow {
    #[serde(flatten)]
    pub review: ReviewProfile,
    pub author_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewStats {
    /// Live reviews.
    pub total: u64,
    /// Mean rating of live reviews, `None` when there are none.
    pub average_rating: Option<f64>,
    /// Reviews the author created in the window, deleted ones included.
    pub authored_in_window: u64,
}

/// Storage seam for everything the discovery and moderation engine reads or writes.
///
/// Every method is a single unit of work: implementations either apply it fully or
/// return an error.
pub trait ProfileRepository: Send + Sync {
    fn find_profile(&self, id: i64) -> AppResult<Option<Profile>>;
    fn find_profile_by_session(&self, session_id: &str) -> AppResult<Option<Profile>>;
    fn touch_last_active(&self, profile_id: i64, at: DateTime<Utc>) -> AppResult<()>;
    /// Sets the platform-wide `is_blocked` flag. Setting it twice is a no-op.
    fn suspend_profile(&self, profile_id: i64, at: DateTime<Utc>) -> AppResult<()>;

    fn find_navigator(&self, profile_id: i64) -> AppResult<Option<NavigatorProfile>>;
    fn upsert_navigator(&self, profile_id: i64, point: GeoPoint, at: DateTime<Utc>) -> AppResult<NavigatorProfile>;

    fn find_filter(&self, profile_id: i64) -> AppResult<Option<FilterProfile>>;
    fn save_filter(&self, filter: &FilterProfile) -> AppResult<FilterProfile>;

    /// One page of candidates, ordered by distance then most recent activity.
    fn find_candidates(&self, query: &DiscoveryQuery) -> AppResult<Vec<CandidateRow>>;
    /// Size of the full candidate set, ignoring the page window.
    fn count_candidates(&self, query: &DiscoveryQuery) -> AppResult<u64>;
    /// Public, non-deleted, non-blocked images in insertion order.
    fn public_images(&self, profile_id: i64) -> AppResult<Vec<ImageProfile>>;

    fn find_like(&self, liker_id: i64, liked_id: i64) -> AppResult<Option<LikeProfile>>;
    fn set_like(&self, liker_id: i64, liked_id: i64, is_liked: bool, at: DateTime<Utc>) -> AppResult<LikeProfile>;

    fn find_block(&self, blocker_id: i64, blocked_id: i64) -> AppResult<Option<BlockedProfile>>;
    /// Writes both directed edges in one transaction and returns `blocker → blocked`.
    fn set_mutual_block(&self, blocker_id: i64, blocked_id: i64, is_blocked: bool, at: DateTime<Utc>) -> AppResult<BlockedProfile>;

    fn insert_complaint(&self, complaint: &NewComplaint) -> AppResult<ComplaintProfile>;
    /// Complaints against `accused_id` created in `[from, until)`.
    fn count_complaints_against(&self, accused_id: i64, from: DateTime<Utc>, until: DateTime<Utc>) -> AppResult<u64>;

    fn find_telegram(&self, profile_id: i64) -> AppResult<Option<TelegramProfile>>;

    fn insert_review(&self, review: &NewReview) -> AppResult<ReviewProfile>;
    fn find_review(&self, review_id: i64) -> AppResult<Option<ReviewRow>>;
    /// Rewrites a live review and marks it edited. `None` if it is missing or deleted.
    fn edit_review(&self, review_id: i64, message: &str, rating: f64, at: DateTime<Utc>) -> AppResult<Option<ReviewProfile>>;
    /// `None` if it is missing or already deleted.
    fn soft_delete_review(&self, review_id: i64, at: DateTime<Utc>) -> AppResult<Option<ReviewProfile>>;
    /// Live reviews, newest first.
    fn list_reviews(&self, offset: u64, limit: u32) -> AppResult<Vec<ReviewRow>>;
    /// Service-wide totals plus `author_id`'s reviews created in `[from, until)`.
    fn review_stats(&self, author_id: i64, from: DateTime<Utc>, until: DateTime<Utc>) -> AppResult<ReviewStats>;

    fn ping(&self) -> AppResult<()>;
}
