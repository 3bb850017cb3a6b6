pub mod detail;
pub mod discovery;
pub mod moderation;
pub mod notify;
pub mod presence;
pub mod reviews;

use gravity_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::Profile;
use crate::store::ProfileRepository;

/// Maps an authenticated session to the profile id it owns.
pub fn profile_id_for_session(repo: &dyn ProfileRepository, session_id: &str) -> AppResult<i64> {
    repo.find_profile_by_session(session_id)?
        .map(|p| p.id)
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
}

/// Loads the acting profile. Deleted or suspended profiles cannot act.
pub(crate) fn require_active(repo: &dyn ProfileRepository, profile_id: i64) -> AppResult<Profile> {
    let profile = repo
        .find_profile(profile_id)?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    if profile.is_deleted {
        return Err(AppError::new(ErrorCode::ProfileDeleted, "profile has been deleted"));
    }
    if profile.is_blocked {
        return Err(AppError::new(ErrorCode::ProfileSuspended, "profile is suspended"));
    }
    Ok(profile)
}
