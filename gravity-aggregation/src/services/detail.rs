use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use gravity_shared::errors::{AppError, AppResult, ErrorCode};

use crate::geo::{distance_m, GeoPoint};
use crate::services::presence;
use crate::store::ProfileRepository;

#[derive(Debug, Clone, Serialize)]
pub struct ProfileDetail {
    pub id: i64,
    pub display_name: String,
    pub birthday: NaiveDate,
    pub age: u32,
    pub gender: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub height: Option<i32>,
    pub weight: Option<i32>,
    pub is_premium: bool,
    pub is_online: bool,
    pub last_active: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    pub images: Vec<String>,
    pub is_liked: bool,
}

fn hidden() -> AppError {
    AppError::new(ErrorCode::ProfileNotFound, "profile not found")
}

/// One profile as seen by `viewer_id`, checking the viewer in on the way.
///
/// Deleted, suspended and blocked profiles are reported as missing.
pub fn profile_detail(
    repo: &dyn ProfileRepository,
    viewer_id: i64,
    target_id: i64,
    position: Option<GeoPoint>,
    now: DateTime<Utc>,
) -> AppResult<ProfileDetail> {
    let viewer = super::require_active(repo, viewer_id)?;
    presence::check_in(repo, viewer.id, position, now)?;

    let target = repo.find_profile(target_id)?.ok_or_else(hidden)?;
    if target.is_deleted || target.is_blocked {
        return Err(hidden());
    }

    let own = target.id == viewer.id;
    if !own && repo.find_block(viewer.id, target.id)?.is_some_and(|b| b.is_blocked) {
        return Err(hidden());
    }

    let distance_m = if own || !target.is_show_distance {
        None
    } else {
        let origin = match position {
            Some(point) => Some(point),
            None => repo.find_navigator(viewer.id)?.map(|n| n.point()),
        };
        let destination = repo.find_navigator(target.id)?.map(|n| n.point());
        origin.zip(destination).map(|(a, b)| distance_m(a, b))
    };

    let images = repo.public_images(target.id)?.into_iter().map(|i| i.url).collect();
    let is_liked = !own
        && repo
            .find_like(viewer.id, target.id)?
            .is_some_and(|l| l.is_liked);

    Ok(ProfileDetail {
        id: target.id,
        age: target.age_on(now.date_naive()),
        is_online: presence::is_online(target.last_active, now),
        display_name: target.display_name,
        birthday: target.birthday,
        gender: target.gender,
        location: target.location,
        description: target.description,
        height: target.height,
        weight: target.weight,
        is_premium: target.is_premium,
        last_active: target.last_active,
        distance_m,
        images,
        is_liked,
    })
}

// ─── Tests ───
