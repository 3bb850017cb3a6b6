use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Date, Double, Text};

use gravity_shared::clients::db::{checkout, DbPool};
use gravity_shared::errors::AppResult;

use crate::geo::{GeoPoint, EARTH_RADIUS_M};
use crate::models::{
    BlockedProfile, ComplaintProfile, FilterProfile, ImageProfile, LikeProfile, NavigatorProfile,
    NewBlock, NewComplaint, NewLike, NewNavigator, NewReview, Profile, ReviewProfile, TelegramProfile,
};
use crate::schema::{
    profile_blocks, profile_complaints, profile_filters, profile_images, profile_likes,
    profile_navigators, profile_reviews, profile_telegram, profiles,
};
use crate::services::discovery::DiscoveryQuery;

use super::{CandidateRow, ProfileRepository, ReviewRow, ReviewStats};

pub struct PgProfileRepository {
    pool: DbPool,
}

impl PgProfileRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(QueryableByName)]
struct CandidateRecord {
    #[diesel(embed)]
    profile: Profile,
    #[diesel(sql_type = Double)]
    distance: f64,
}

#[derive(QueryableByName)]
struct CountRecord {
    #[diesel(sql_type = BigInt)]
    total: i64,
}

/// Haversine over the navigator row against the viewer point bound as `$2, $3`.
fn distance_sql() -> String {
    format!(
        "(2 * {EARTH_RADIUS_M} * asin(least(1, sqrt(\
            power(sin(radians(n.latitude - $2) / 2), 2) + \
            cos(radians($2)) * cos(radians(n.latitude)) * \
            power(sin(radians(n.longitude - $3) / 2), 2)))))"
    )
}

/// Shared predicate for the page and the count so both see the same candidate set.
fn candidate_from_where() -> String {
    format!(
        "FROM profiles p \
         JOIN profile_navigators n ON n.profile_id = p.id \
         WHERE p.is_deleted = false \
           AND p.is_blocked = false \
           AND p.birthday BETWEEN $4 AND $5 \
           AND ($6 = 'all' OR p.gender = $6) \
           AND p.id <> $1 \
           AND NOT EXISTS (\
               SELECT 1 FROM profile_blocks b \
               WHERE b.profile_id = $1 AND b.blocked_user_id = p.id AND b.is_blocked = true) \
           AND {} <= $7",
        distance_sql()
    )
}

impl ProfileRepository for PgProfileRepository {
    fn find_profile(&self, id: i64) -> AppResult<Option<Profile>> {
        let mut conn = checkout(&self.pool)?;
        Ok(profiles::table.find(id).first::<Profile>(&mut conn).optional()?)
    }

    fn find_profile_by_session(&self, session_id: &str) -> AppResult<Option<Profile>> {
        let mut conn = checkout(&self.pool)?;
        Ok(profiles::table
            .filter(profiles::session_id.eq(session_id))
            .first::<Profile>(&mut conn)
            .optional()?)
    }

    fn touch_last_active(&self, profile_id: i64, at: DateTime<Utc>) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        diesel::update(profiles::table.find(profile_id))
            .set(profiles::last_active.eq(at))
            .execute(&mut conn)?;
        Ok(())
    }

    fn suspend_profile(&self, profile_id: i64, at: DateTime<Utc>) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        diesel::update(profiles::table.find(profile_id).filter(profiles::is_blocked.eq(false)))
            .set((profiles::is_blocked.eq(true), profiles::updated_at.eq(at)))
            .execute(&mut conn)?;
        Ok(())
    }

    fn find_navigator(&self, profile_id: i64) -> AppResult<Option<NavigatorProfile>> {
        let mut conn = checkout(&self.pool)?;
        Ok(profile_navigators::table
            .filter(profile_navigators::profile_id.eq(profile_id))
            .first::<NavigatorProfile>(&mut conn)
            .optional()?)
    }

    fn upsert_navigator(&self, profile_id: i64, point: GeoPoint, at: DateTime<Utc>) -> AppResult<NavigatorProfile> {
        let mut conn = checkout(&self.pool)?;
        let new_navigator = NewNavigator {
            profile_id,
            latitude: point.latitude(),
            longitude: point.longitude(),
            updated_at: at,
        };

        let navigator = diesel::insert_into(profile_navigators::table)
            .values(&new_navigator)
            .on_conflict(profile_navigators::profile_id)
            .do_update()
            .set((
                profile_navigators::latitude.eq(point.latitude()),
                profile_navigators::longitude.eq(point.longitude()),
                profile_navigators::updated_at.eq(at),
            ))
            .get_result::<NavigatorProfile>(&mut conn)?;
        Ok(navigator)
    }

    fn find_filter(&self, profile_id: i64) -> AppResult<Option<FilterProfile>> {
        let mut conn = checkout(&self.pool)?;
        Ok(profile_filters::table
            .filter(profile_filters::profile_id.eq(profile_id))
            .first::<FilterProfile>(&mut conn)
            .optional()?)
    }

    fn save_filter(&self, filter: &FilterProfile) -> AppResult<FilterProfile> {
        let mut conn = checkout(&self.pool)?;
        let saved = diesel::update(profile_filters::table.find(filter.id))
            .set(filter)
            .get_result::<FilterProfile>(&mut conn)?;
        Ok(saved)
    }

    fn find_candidates(&self, query: &DiscoveryQuery) -> AppResult<Vec<CandidateRow>> {
        let mut conn = checkout(&self.pool)?;
        let sql = format!(
            "SELECT p.*, {} AS distance {} \
             ORDER BY distance ASC, p.last_active DESC, p.id ASC \
             LIMIT $8 OFFSET $9",
            distance_sql(),
            candidate_from_where(),
        );

        let records = diesel::sql_query(sql)
            .bind::<BigInt, _>(query.viewer_id)
            .bind::<Double, _>(query.origin.latitude())
            .bind::<Double, _>(query.origin.longitude())
            .bind::<Date, _>(query.birth_from)
            .bind::<Date, _>(query.birth_to)
            .bind::<Text, _>(query.gender.as_str())
            .bind::<Double, _>(query.radius_m)
            .bind::<BigInt, _>(i64::from(query.limit))
            .bind::<BigInt, _>(query.offset as i64)
            .load::<CandidateRecord>(&mut conn)?;

        Ok(records
            .into_iter()
            .map(|r| CandidateRow { profile: r.profile, distance_m: r.distance })
            .collect())
    }

    fn count_candidates(&self, query: &DiscoveryQuery) -> AppResult<u64> {
        let mut conn = checkout(&self.pool)?;
        let sql = format!("SELECT COUNT(*) AS total {}", candidate_from_where());

        let record = diesel::sql_query(sql)
            .bind::<BigInt, _>(query.viewer_id)
            .bind::<Double, _>(query.origin.latitude())
            .bind::<Double, _>(query.origin.longitude())
            .bind::<Date, _>(query.birth_from)
            .bind::<Date, _>(query.birth_to)
            .bind::<Text, _>(query.gender.as_str())
            .bind::<Double, _>(query.radius_m)
            .get_result::<CountRecord>(&mut conn)?;

        Ok(record.total.max(0) as u64)
    }

    fn public_images(&self, profile_id: i64) -> AppResult<Vec<ImageProfile>> {
        let mut conn = checkout(&self.pool)?;
        Ok(profile_images::table
            .filter(profile_images::profile_id.eq(profile_id))
            .filter(profile_images::is_private.eq(false))
            .filter(profile_images::is_deleted.eq(false))
            .filter(profile_images::is_blocked.eq(false))
            .order(profile_images::id.asc())
            .load::<ImageProfile>(&mut conn)?)
    }

    fn find_like(&self, liker_id: i64, liked_id: i64) -> AppResult<Option<LikeProfile>> {
        let mut conn = checkout(&self.pool)?;
        Ok(profile_likes::table
            .filter(profile_likes::profile_id.eq(liker_id))
            .filter(profile_likes::liked_user_id.eq(liked_id))
            .first::<LikeProfile>(&mut conn)
            .optional()?)
    }

    fn set_like(&self, liker_id: i64, liked_id: i64, is_liked: bool, at: DateTime<Utc>) -> AppResult<LikeProfile> {
        let mut conn = checkout(&self.pool)?;
        let new_like = NewLike {
            profile_id: liker_id,
            liked_user_id: liked_id,
            is_liked,
            created_at: at,
            updated_at: at,
        };

        let like = diesel::insert_into(profile_likes::table)
            .values(&new_like)
            .on_conflict((profile_likes::profile_id, profile_likes::liked_user_id))
            .do_update()
            .set((profile_likes::is_liked.eq(is_liked), profile_likes::updated_at.eq(at)))
            .get_result::<LikeProfile>(&mut conn)?;
        Ok(like)
    }

    fn find_block(&self, blocker_id: i64, blocked_id: i64) -> AppResult<Option<BlockedProfile>> {
        let mut conn = checkout(&self.pool)?;
        Ok(profile_blocks::table
            .filter(profile_blocks::profile_id.eq(blocker_id))
            .filter(profile_blocks::blocked_user_id.eq(blocked_id))
            .first::<BlockedProfile>(&mut conn)
            .optional()?)
    }

    fn set_mutual_block(&self, blocker_id: i64, blocked_id: i64, is_blocked: bool, at: DateTime<Utc>) -> AppResult<BlockedProfile> {
        let mut conn = checkout(&self.pool)?;
        let edge = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let mut forward = None;
            for (from, to) in [(blocker_id, blocked_id), (blocked_id, blocker_id)] {
                let new_block = NewBlock {
                    profile_id: from,
                    blocked_user_id: to,
                    is_blocked,
                    created_at: at,
                    updated_at: at,
                };
                let block = diesel::insert_into(profile_blocks::table)
                    .values(&new_block)
                    .on_conflict((profile_blocks::profile_id, profile_blocks::blocked_user_id))
                    .do_update()
                    .set((profile_blocks::is_blocked.eq(is_blocked), profile_blocks::updated_at.eq(at)))
                    .get_result::<BlockedProfile>(conn)?;
                forward.get_or_insert(block);
            }
            forward.ok_or(diesel::result::Error::NotFound)
        })?;
        Ok(edge)
    }

    fn insert_complaint(&self, complaint: &NewComplaint) -> AppResult<ComplaintProfile> {
        let mut conn = checkout(&self.pool)?;
        Ok(diesel::insert_into(profile_complaints::table)
            .values(complaint)
            .get_result::<ComplaintProfile>(&mut conn)?)
    }

    fn count_complaints_against(&self, accused_id: i64, from: DateTime<Utc>, until: DateTime<Utc>) -> AppResult<u64> {
        let mut conn = checkout(&self.pool)?;
        let total: i64 = profile_complaints::table
            .filter(profile_complaints::complaint_user_id.eq(accused_id))
            .filter(profile_complaints::created_at.ge(from))
            .filter(profile_complaints::created_at.lt(until))
            .count()
            .get_result(&mut conn)?;
        Ok(total.max(0) as u64)
    }

    fn find_telegram(&self, profile_id: i64) -> AppResult<Option<TelegramProfile>> {
        let mut conn = checkout(&self.pool)?;
        Ok(profile_telegram::table
            .filter(profile_telegram::profile_id.eq(profile_id))
            .first::<TelegramProfile>(&mut conn)
            .optional()?)
    }

    fn insert_review(&self, review: &NewReview) -> AppResult<ReviewProfile> {
        let mut conn = checkout(&self.pool)?;
        Ok(diesel::insert_into(profile_reviews::table)
            .values(review)
            .get_result::<ReviewProfile>(&mut conn)?)
    }

    fn find_review(&self, review_id: i64) -> AppResult<Option<ReviewRow>> {
        let mut conn = checkout(&self.pool)?;
        let row = profile_reviews::table
            .inner_join(profiles::table)
            .filter(profile_reviews::id.eq(review_id))
            .select((ReviewProfile::as_select(), profiles::display_name))
            .first::<(ReviewProfile, String)>(&mut conn)
            .optional()?;
        Ok(row.map(|(review, author_name)| ReviewRow { review, author_name }))
    }

    fn edit_review(&self, review_id: i64, message: &str, rating: f64, at: DateTime<Utc>) -> AppResult<Option<ReviewProfile>> {
        let mut conn = checkout(&self.pool)?;
        let live = profile_reviews::table
            .find(review_id)
            .filter(profile_reviews::has_deleted.eq(false));
        Ok(diesel::update(live)
            .set((
                profile_reviews::message.eq(message),
                profile_reviews::rating.eq(rating),
                profile_reviews::has_edited.eq(true),
                profile_reviews::updated_at.eq(at),
            ))
            .get_result::<ReviewProfile>(&mut conn)
            .optional()?)
    }

    fn soft_delete_review(&self, review_id: i64, at: DateTime<Utc>) -> AppResult<Option<ReviewProfile>> {
        let mut conn = checkout(&self.pool)?;
        let live = profile_reviews::table
            .find(review_id)
            .filter(profile_reviews::has_deleted.eq(false));
        Ok(diesel::update(live)
            .set((profile_reviews::has_deleted.eq(true), profile_reviews::updated_at.eq(at)))
            .get_result::<ReviewProfile>(&mut conn)
            .optional()?)
    }

    fn list_reviews(&self, offset: u64, limit: u32) -> AppResult<Vec<ReviewRow>> {
        let mut conn = checkout(&self.pool)?;
        let rows = profile_reviews::table
            .inner_join(profiles::table)
            .filter(profile_reviews::has_deleted.eq(false))
            .order((profile_reviews::created_at.desc(), profile_reviews::id.desc()))
            .limit(i64::from(limit))
            .offset(offset as i64)
            .select((ReviewProfile::as_select(), profiles::display_name))
            .load::<(ReviewProfile, String)>(&mut conn)?;
        Ok(rows
            .into_iter()
            .map(|(review, author_name)| ReviewRow { review, author_name })
            .collect())
    }

    fn review_stats(&self, author_id: i64, from: DateTime<Utc>, until: DateTime<Utc>) -> AppResult<ReviewStats> {
        let mut conn = checkout(&self.pool)?;
        let total: i64 = profile_reviews::table
            .filter(profile_reviews::has_deleted.eq(false))
            .count()
            .get_result(&mut conn)?;
        let average_rating: Option<f64> = profile_reviews::table
            .filter(profile_reviews::has_deleted.eq(false))
            .select(diesel::dsl::avg(profile_reviews::rating))
            .get_result(&mut conn)?;
        let authored: i64 = profile_reviews::table
            .filter(profile_reviews::profile_id.eq(author_id))
            .filter(profile_reviews::created_at.ge(from))
            .filter(profile_reviews::created_at.lt(until))
            .count()
            .get_result(&mut conn)?;

        Ok(ReviewStats {
            total: total.max(0) as u64,
            average_rating,
            authored_in_window: authored.max(0) as u64,
        })
    }

    fn ping(&self) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }
}
