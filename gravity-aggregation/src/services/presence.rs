use chrono::{DateTime, Duration, Utc};

use gravity_shared::errors::AppResult;

use crate::geo::GeoPoint;
use crate::store::ProfileRepository;

/// A profile counts as online while its last activity is younger than this.
pub const ONLINE_WINDOW_SECS: i64 = 5 * 60;

pub fn is_online(last_active: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(last_active) < Duration::seconds(ONLINE_WINDOW_SECS)
}

/// Records activity for `profile_id` and, when supplied, its current position.
pub fn check_in(
    repo: &dyn ProfileRepository,
    profile_id: i64,
    position: Option<GeoPoint>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    repo.touch_last_active(profile_id, now)?;
    if let Some(point) = position {
        repo.upsert_navigator(profile_id, point, now)?;
        tracing::debug!(profile_id, "navigator updated");
    }
    Ok(())
}

// ─── Tests ───
