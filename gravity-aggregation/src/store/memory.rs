use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};

use gravity_shared::errors::{AppError, AppResult};

use crate::geo::{distance_m, GeoPoint};
use crate::models::{
    BlockedProfile, ComplaintProfile, FilterProfile, ImageProfile, LikeProfile, NavigatorProfile,
    NewComplaint, NewReview, Profile, ReviewProfile, TelegramProfile,
};
use crate::services::discovery::{DiscoveryQuery, SearchGender};

use super::{CandidateRow, ProfileRepository, ReviewRow, ReviewStats};

#[derive(Default)]
struct Tables {
    next_id: i64,
    profiles: HashMap<i64, Profile>,
    navigators: HashMap<i64, NavigatorProfile>,
    filters: HashMap<i64, FilterProfile>,
    images: Vec<ImageProfile>,
    blocks: Vec<BlockedProfile>,
    complaints: Vec<ComplaintProfile>,
    likes: Vec<LikeProfile>,
    telegram: HashMap<i64, TelegramProfile>,
    reviews: Vec<ReviewProfile>,
    failing: Option<&'static str>,
}

impl Tables {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&mut self, op: &'static str) -> AppResult<()> {
        if self.failing == Some(op) {
            self.failing = None;
            return Err(AppError::Internal(anyhow::anyhow!("injected failure in {op}")));
        }
        Ok(())
    }

    fn review_row(&self, review: &ReviewProfile) -> Option<ReviewRow> {
        let author = self.profiles.get(&review.profile_id)?;
        Some(ReviewRow { review: review.clone(), author_name: author.display_name.clone() })
    }

    fn live_review_mut(&mut self, review_id: i64) -> Option<&mut ReviewProfile> {
        self.reviews.iter_mut().find(|r| r.id == review_id && !r.has_deleted)
    }

    fn matches(&self, query: &DiscoveryQuery, profile: &Profile) -> Option<f64> {
        if profile.is_deleted || profile.is_blocked || profile.id == query.viewer_id {
            return None;
        }
        if profile.birthday < query.birth_from || profile.birthday > query.birth_to {
            return None;
        }
        if query.gender != SearchGender::All && profile.gender != query.gender.as_str() {
            return None;
        }
        let blocked = self.blocks.iter().any(|b| {
            b.profile_id == query.viewer_id && b.blocked_user_id == profile.id && b.is_blocked
        });
        if blocked {
            return None;
        }
        let navigator = self.navigators.get(&profile.id)?;
        let distance = distance_m(query.origin, navigator.point());
        (distance <= query.radius_m).then_some(distance)
    }
}

/// Process-local repository for tests. `fail_next` makes the next call to the named
/// method return an internal error.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub fn fail_next(&self, op: &'static str) {
        self.lock().failing = Some(op);
    }

    pub fn add_profile(&self, name: &str, gender: &str, birthday: NaiveDate, last_active: DateTime<Utc>) -> i64 {
        let mut t = self.lock();
        let id = t.id();
        t.profiles.insert(id, Profile {
            id,
            session_id: format!("session-{id}"),
            display_name: name.to_string(),
            birthday,
            gender: gender.to_string(),
            location: None,
            description: None,
            height: None,
            weight: None,
            is_deleted: false,
            is_blocked: false,
            is_premium: false,
            is_show_distance: true,
            is_invisible: false,
            created_at: last_active,
            updated_at: last_active,
            last_active,
        });
        id
    }

    pub fn update_profile(&self, id: i64, f: impl FnOnce(&mut Profile)) {
        if let Some(p) = self.lock().profiles.get_mut(&id) {
            f(p);
        }
    }

    pub fn profile(&self, id: i64) -> Profile {
        self.lock().profiles[&id].clone()
    }

    pub fn place(&self, profile_id: i64, latitude: f64, longitude: f64) {
        let mut t = self.lock();
        let id = t.id();
        t.navigators.insert(profile_id, NavigatorProfile {
            id,
            profile_id,
            latitude,
            longitude,
            updated_at: Utc::now(),
        });
    }

    pub fn add_filter(&self, profile_id: i64, search_gender: &str, age_from: i32, age_to: i32, distance_km: f64) {
        let mut t = self.lock();
        let id = t.id();
        t.filters.insert(profile_id, FilterProfile {
            id,
            profile_id,
            search_gender: search_gender.to_string(),
            looking_for: None,
            age_from,
            age_to,
            distance: distance_km,
            page: 1,
            size: 10,
        });
    }

    pub fn add_image(&self, profile_id: i64, url: &str, is_private: bool) -> i64 {
        let mut t = self.lock();
        let id = t.id();
        t.images.push(ImageProfile {
            id,
            profile_id,
            url: url.to_string(),
            is_private,
            is_deleted: false,
            is_blocked: false,
            created_at: Utc::now(),
        });
        id
    }

    pub fn link_telegram(&self, profile_id: i64, chat_id: i64, username: &str) {
        let mut t = self.lock();
        let id = t.id();
        t.telegram.insert(profile_id, TelegramProfile {
            id,
            profile_id,
            telegram_id: chat_id,
            username: Some(username.to_string()),
            chat_id,
        });
    }

    pub fn complaints(&self) -> Vec<ComplaintProfile> {
        self.lock().complaints.clone()
    }
}

impl ProfileRepository for MemoryRepository {
    fn find_profile(&self, id: i64) -> AppResult<Option<Profile>> {
        let mut t = self.lock();
        t.check("find_profile")?;
        Ok(t.profiles.get(&id).cloned())
    }

    fn find_profile_by_session(&self, session_id: &str) -> AppResult<Option<Profile>> {
        let mut t = self.lock();
        t.check("find_profile_by_session")?;
        Ok(t.profiles.values().find(|p| p.session_id == session_id).cloned())
    }

    fn touch_last_active(&self, profile_id: i64, at: DateTime<Utc>) -> AppResult<()> {
        let mut t = self.lock();
        t.check("touch_last_active")?;
        if let Some(p) = t.profiles.get_mut(&profile_id) {
            p.last_active = at;
        }
        Ok(())
    }

    fn suspend_profile(&self, profile_id: i64, at: DateTime<Utc>) -> AppResult<()> {
        let mut t = self.lock();
        t.check("suspend_profile")?;
        if let Some(p) = t.profiles.get_mut(&profile_id) {
            if !p.is_blocked {
                p.is_blocked = true;
                p.updated_at = at;
            }
        }
        Ok(())
    }

    fn find_navigator(&self, profile_id: i64) -> AppResult<Option<NavigatorProfile>> {
        let mut t = self.lock();
        t.check("find_navigator")?;
        Ok(t.navigators.get(&profile_id).cloned())
    }

    fn upsert_navigator(&self, profile_id: i64, point: GeoPoint, at: DateTime<Utc>) -> AppResult<NavigatorProfile> {
        let mut t = self.lock();
        t.check("upsert_navigator")?;
        let existing = t.navigators.get(&profile_id).map(|n| n.id);
        let id = match existing {
            Some(id) => id,
            None => t.id(),
        };
        let navigator = NavigatorProfile {
            id,
            profile_id,
            latitude: point.latitude(),
            longitude: point.longitude(),
            updated_at: at,
        };
        t.navigators.insert(profile_id, navigator.clone());
        Ok(navigator)
    }

    fn find_filter(&self, profile_id: i64) -> AppResult<Option<FilterProfile>> {
        let mut t = self.lock();
        t.check("find_filter")?;
        Ok(t.filters.get(&profile_id).cloned())
    }

    fn save_filter(&self, filter: &FilterProfile) -> AppResult<FilterProfile> {
        let mut t = self.lock();
        t.check("save_filter")?;
        t.filters.insert(filter.profile_id, filter.clone());
        Ok(filter.clone())
    }

    fn find_candidates(&self, query: &DiscoveryQuery) -> AppResult<Vec<CandidateRow>> {
        let mut t = self.lock();
        t.check("find_candidates")?;
        let mut rows: Vec<CandidateRow> = t
            .profiles
            .values()
            .filter_map(|p| {
                t.matches(query, p)
                    .map(|distance_m| CandidateRow { profile: p.clone(), distance_m })
            })
            .collect();

        rows.sort_by(|a, b| {
            a.distance_m
                .total_cmp(&b.distance_m)
                .then_with(|| b.profile.last_active.cmp(&a.profile.last_active))
                .then_with(|| a.profile.id.cmp(&b.profile.id))
        });

        Ok(rows
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }

    fn count_candidates(&self, query: &DiscoveryQuery) -> AppResult<u64> {
        let mut t = self.lock();
        t.check("count_candidates")?;
        Ok(t.profiles.values().filter(|p| t.matches(query, p).is_some()).count() as u64)
    }

    fn public_images(&self, profile_id: i64) -> AppResult<Vec<ImageProfile>> {
        let mut t = self.lock();
        t.check("public_images")?;
        let mut images: Vec<ImageProfile> = t
            .images
            .iter()
            .filter(|i| i.profile_id == profile_id && i.is_public())
            .cloned()
            .collect();
        images.sort_by_key(|i| i.id);
        Ok(images)
    }

    fn find_like(&self, liker_id: i64, liked_id: i64) -> AppResult<Option<LikeProfile>> {
        let mut t = self.lock();
        t.check("find_like")?;
        Ok(t.likes
            .iter()
            .find(|l| l.profile_id == liker_id && l.liked_user_id == liked_id)
            .cloned())
    }

    fn set_like(&self, liker_id: i64, liked_id: i64, is_liked: bool, at: DateTime<Utc>) -> AppResult<LikeProfile> {
        let mut t = self.lock();
        t.check("set_like")?;
        if let Some(like) = t
            .likes
            .iter_mut()
            .find(|l| l.profile_id == liker_id && l.liked_user_id == liked_id)
        {
            like.is_liked = is_liked;
            like.updated_at = at;
            return Ok(like.clone());
        }
        let id = t.id();
        let like = LikeProfile {
            id,
            profile_id: liker_id,
            liked_user_id: liked_id,
            is_liked,
            created_at: at,
            updated_at: at,
        };
        t.likes.push(like.clone());
        Ok(like)
    }

    fn find_block(&self, blocker_id: i64, blocked_id: i64) -> AppResult<Option<BlockedProfile>> {
        let mut t = self.lock();
        t.check("find_block")?;
        Ok(t.blocks
            .iter()
            .find(|b| b.profile_id == blocker_id && b.blocked_user_id == blocked_id)
            .cloned())
    }

    fn set_mutual_block(&self, blocker_id: i64, blocked_id: i64, is_blocked: bool, at: DateTime<Utc>) -> AppResult<BlockedProfile> {
        let mut t = self.lock();
        t.check("set_mutual_block")?;
        let mut forward = None;
        for (from, to) in [(blocker_id, blocked_id), (blocked_id, blocker_id)] {
            let existing = t
                .blocks
                .iter()
                .position(|b| b.profile_id == from && b.blocked_user_id == to);
            let edge = match existing {
                Some(idx) => {
                    let block = &mut t.blocks[idx];
                    block.is_blocked = is_blocked;
                    block.updated_at = at;
                    block.clone()
                }
                None => {
                    let id = t.id();
                    let block = BlockedProfile {
                        id,
                        profile_id: from,
                        blocked_user_id: to,
                        is_blocked,
                        created_at: at,
                        updated_at: at,
                    };
                    t.blocks.push(block.clone());
                    block
                }
            };
            forward.get_or_insert(edge);
        }
        forward.ok_or_else(|| AppError::internal("block edge missing after write"))
    }

    fn insert_complaint(&self, complaint: &NewComplaint) -> AppResult<ComplaintProfile> {
        let mut t = self.lock();
        t.check("insert_complaint")?;
        let id = t.id();
        let row = ComplaintProfile {
            id,
            profile_id: complaint.profile_id,
            complaint_user_id: complaint.complaint_user_id,
            reason: complaint.reason.clone(),
            created_at: complaint.created_at,
        };
        t.complaints.push(row.clone());
        Ok(row)
    }

    fn count_complaints_against(&self, accused_id: i64, from: DateTime<Utc>, until: DateTime<Utc>) -> AppResult<u64> {
        let mut t = self.lock();
        t.check("count_complaints_against")?;
        Ok(t.complaints
            .iter()
            .filter(|c| c.complaint_user_id == accused_id && c.created_at >= from && c.created_at < until)
            .count() as u64)
    }

    fn find_telegram(&self, profile_id: i64) -> AppResult<Option<TelegramProfile>> {
        let mut t = self.lock();
        t.check("find_telegram")?;
        Ok(t.telegram.get(&profile_id).cloned())
    }

    fn insert_review(&self, review: &NewReview) -> AppResult<ReviewProfile> {
        let mut t = self.lock();
        t.check("insert_review")?;
        let id = t.id();
        let row = ReviewProfile {
            id,
            profile_id: review.profile_id,
            message: review.message.clone(),
            rating: review.rating,
            has_deleted: false,
            has_edited: false,
            created_at: review.created_at,
            updated_at: review.updated_at,
        };
        t.reviews.push(row.clone());
        Ok(row)
    }

    fn find_review(&self, review_id: i64) -> AppResult<Option<ReviewRow>> {
        let mut t = self.lock();
        t.check("find_review")?;
        Ok(t.reviews.iter().find(|r| r.id == review_id).and_then(|r| t.review_row(r)))
    }

    fn edit_review(&self, review_id: i64, message: &str, rating: f64, at: DateTime<Utc>) -> AppResult<Option<ReviewProfile>> {
        let mut t = self.lock();
        t.check("edit_review")?;
        Ok(t.live_review_mut(review_id).map(|r| {
            r.message = message.to_string();
            r.rating = rating;
            r.has_edited = true;
            r.updated_at = at;
            r.clone()
        }))
    }

    fn soft_delete_review(&self, review_id: i64, at: DateTime<Utc>) -> AppResult<Option<ReviewProfile>> {
        let mut t = self.lock();
        t.check("soft_delete_review")?;
        Ok(t.live_review_mut(review_id).map(|r| {
            r.has_deleted = true;
            r.updated_at = at;
            r.clone()
        }))
    }

    fn list_reviews(&self, offset: u64, limit: u32) -> AppResult<Vec<ReviewRow>> {
        let mut t = self.lock();
        t.check("list_reviews")?;
        let mut live: Vec<&ReviewProfile> = t.reviews.iter().filter(|r| !r.has_deleted).collect();
        live.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(live
            .into_iter()
            .filter_map(|r| t.review_row(r))
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    fn review_stats(&self, author_id: i64, from: DateTime<Utc>, until: DateTime<Utc>) -> AppResult<ReviewStats> {
        let mut t = self.lock();
        t.check("review_stats")?;
        let ratings: Vec<f64> = t.reviews.iter().filter(|r| !r.has_deleted).map(|r| r.rating).collect();
        let average_rating = (!ratings.is_empty()).then(|| ratings.iter().sum::<f64>() / ratings.len() as f64);
        let authored_in_window = t
            .reviews
            .iter()
            .filter(|r| r.profile_id == author_id && r.created_at >= from && r.created_at < until)
            .count() as u64;
        Ok(ReviewStats { total: ratings.len() as u64, average_rating, authored_in_window })
    }

    fn ping(&self) -> AppResult<()> {
        self.lock().check("ping")
    }
}
