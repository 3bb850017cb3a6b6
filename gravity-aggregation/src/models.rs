use chrono::{DateTime, Datelike, NaiveDate, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::geo::GeoPoint;
use crate::schema::{
    profile_blocks, profile_complaints, profile_filters, profile_images, profile_likes,
    profile_navigators, profile_reviews, profile_telegram, profiles,
};

// --- Profile ---

#[derive(Debug, Queryable, QueryableByName, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: i64,
    #[serde(skip_serializing)]
    pub session_id: String,
    pub display_name: String,
    pub birthday: NaiveDate,
    pub gender: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub height: Option<i32>,
    pub weight: Option<i32>,
    pub is_deleted: bool,
    pub is_blocked: bool,
    pub is_premium: bool,
    pub is_show_distance: bool,
    pub is_invisible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Profile {
    /// Whole years lived as of `today`.
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        let mut years = today.year() - self.birthday.year();
        if (today.month(), today.day()) < (self.birthday.month(), self.birthday.day()) {
            years -= 1;
        }
        years.max(0) as u32
    }
}

// --- Navigator ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profile_navigators)]
pub struct NavigatorProfile {
    pub id: i64,
    pub profile_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub updated_at: DateTime<Utc>,
}

impl NavigatorProfile {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::from_stored(self.latitude, self.longitude)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profile_navigators)]
pub struct NewNavigator {
    pub profile_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub updated_at: DateTime<Utc>,
}

// --- Filter ---

#[derive(Debug, Queryable, Selectable, Identifiable, AsChangeset, Serialize, Clone, PartialEq)]
#[diesel(table_name = profile_filters)]
pub struct FilterProfile {
    pub id: i64,
    pub profile_id: i64,
    pub search_gender: String,
    pub looking_for: Option<String>,
    pub age_from: i32,
    pub age_to: i32,
    pub distance: f64,
    pub page: i32,
    pub size: i32,
}

// --- Image ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profile_images)]
pub struct ImageProfile {
    pub id: i64,
    pub profile_id: i64,
    pub url: String,
    pub is_private: bool,
    pub is_deleted: bool,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
}

impl ImageProfile {
    pub fn is_public(&self) -> bool {
        !self.is_private && !self.is_deleted && !self.is_blocked
    }
}

// --- Block ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profile_blocks)]
pub struct BlockedProfile {
    pub id: i64,
    pub profile_id: i64,
    pub blocked_user_id: i64,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profile_blocks)]
pub struct NewBlock {
    pub profile_id: i64,
    pub blocked_user_id: i64,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Complaint ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profile_complaints)]
pub struct ComplaintProfile {
    pub id: i64,
    pub profile_id: i64,
    pub complaint_user_id: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = profile_complaints)]
pub struct NewComplaint {
    pub profile_id: i64,
    pub complaint_user_id: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

// --- Like ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profile_likes)]
pub struct LikeProfile {
    pub id: i64,
    pub profile_id: i64,
    pub liked_user_id: i64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profile_likes)]
pub struct NewLike {
    pub profile_id: i64,
    pub liked_user_id: i64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Telegram ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profile_telegram)]
pub struct TelegramProfile {
    pub id: i64,
    pub profile_id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub chat_id: i64,
}

// --- Review ---

/// A review a profile leaves about the service. Deletion is a soft flag.
#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profile_reviews)]
pub struct ReviewProfile {
    pub id: i64,
    pub profile_id: i64,
    pub message: String,
    pub rating: f64,
    pub has_deleted: bool,
    pub has_edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = profile_reviews)]
pub struct NewReview {
    pub profile_id: i64,
    pub message: String,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
