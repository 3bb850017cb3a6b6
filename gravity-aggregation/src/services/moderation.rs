use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;
use validator::Validate;

use gravity_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{BlockedProfile, ComplaintProfile, LikeProfile, NewComplaint, Profile};
use crate::services::presence;
use crate::store::ProfileRepository;

/// Monthly complaints above this count suspend the accused profile.
pub const COMPLAINT_THRESHOLD: u64 = 1;

/// Actor and target of a pairwise moderation action, both loaded and checked.
struct Pair {
    actor: Profile,
    target: Profile,
}

fn load_pair(repo: &dyn ProfileRepository, actor_id: i64, target_id: i64, now: DateTime<Utc>) -> AppResult<Pair> {
    if actor_id == target_id {
        return Err(AppError::new(ErrorCode::CannotTargetSelf, "cannot target your own profile"));
    }

    let actor = super::require_active(repo, actor_id)?;
    let target = repo
        .find_profile(target_id)?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "target profile not found"))?;
    if target.is_deleted {
        return Err(AppError::new(ErrorCode::ProfileDeleted, "target profile has been deleted"));
    }

    presence::check_in(repo, actor.id, None, now)?;
    Ok(Pair { actor, target })
}

// --- Likes ---

#[derive(Debug, Clone)]
pub struct LikeOutcome {
    pub like: LikeProfile,
    /// The edge went from not liked (or absent) to liked on this call.
    pub newly_liked: bool,
}

pub fn submit_like(repo: &dyn ProfileRepository, liker_id: i64, liked_id: i64, now: DateTime<Utc>) -> AppResult<LikeOutcome> {
    let pair = load_pair(repo, liker_id, liked_id, now)?;

    if pair.target.is_blocked {
        return Err(AppError::new(ErrorCode::ProfileSuspended, "target profile is suspended"));
    }
    let blocked = repo
        .find_block(pair.actor.id, pair.target.id)?
        .is_some_and(|b| b.is_blocked);
    if blocked {
        return Err(AppError::new(ErrorCode::ProfileBlocked, "profiles are blocked"));
    }

    let was_liked = repo
        .find_like(pair.actor.id, pair.target.id)?
        .is_some_and(|l| l.is_liked);
    let like = repo.set_like(pair.actor.id, pair.target.id, true, now)?;
    tracing::info!(liker_id, liked_id, newly_liked = !was_liked, "like recorded");
    Ok(LikeOutcome { like, newly_liked: !was_liked })
}

pub fn cancel_like(repo: &dyn ProfileRepository, liker_id: i64, liked_id: i64, now: DateTime<Utc>) -> AppResult<LikeProfile> {
    let pair = load_pair(repo, liker_id, liked_id, now)?;

    let existing = repo
        .find_like(pair.actor.id, pair.target.id)?
        .ok_or_else(|| AppError::new(ErrorCode::LikeNotFound, "like not found"))?;
    if !existing.is_liked {
        return Ok(existing);
    }

    let like = repo.set_like(pair.actor.id, pair.target.id, false, now)?;
    tracing::info!(liker_id, liked_id, "like cancelled");
    Ok(like)
}

// --- Blocks ---

/// Blocks the pair in both directions. Repeating it leaves the same edges.
pub fn submit_block(repo: &dyn ProfileRepository, blocker_id: i64, blocked_id: i64, now: DateTime<Utc>) -> AppResult<BlockedProfile> {
    let pair = load_pair(repo, blocker_id, blocked_id, now)?;
    let edge = repo.set_mutual_block(pair.actor.id, pair.target.id, true, now)?;
    tracing::info!(blocker_id, blocked_id, "mutual block recorded");
    Ok(edge)
}

pub fn lift_block(repo: &dyn ProfileRepository, blocker_id: i64, blocked_id: i64, now: DateTime<Utc>) -> AppResult<BlockedProfile> {
    let pair = load_pair(repo, blocker_id, blocked_id, now)?;

    let active = repo
        .find_block(pair.actor.id, pair.target.id)?
        .is_some_and(|b| b.is_blocked);
    if !active {
        return Err(AppError::new(ErrorCode::BlockNotFound, "block not found"));
    }

    let edge = repo.set_mutual_block(pair.actor.id, pair.target.id, false, now)?;
    tracing::info!(blocker_id, blocked_id, "mutual block lifted");
    Ok(edge)
}

// --- Complaints ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStep {
    RecordComplaint,
    MutualBlock,
    CountMonthly,
    SuspendAccused,
}

impl ComplaintStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecordComplaint => "record_complaint",
            Self::MutualBlock => "mutual_block",
            Self::CountMonthly => "count_monthly",
            Self::SuspendAccused => "suspend_accused",
        }
    }
}

impl std::fmt::Display for ComplaintStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs complaint steps in order and tags a failure with the failing and completed steps.
struct StepRunner {
    accused_id: i64,
    completed: Vec<ComplaintStep>,
}

impl StepRunner {
    fn run<T>(&mut self, step: ComplaintStep, f: impl FnOnce() -> AppResult<T>) -> AppResult<T> {
        match f() {
            Ok(value) => {
                self.completed.push(step);
                Ok(value)
            }
            Err(err) => {
                tracing::error!(
                    step = step.as_str(),
                    accused_id = self.accused_id,
                    completed = ?self.completed,
                    error = %err,
                    "complaint step failed"
                );
                Err(AppError::with_details(
                    ErrorCode::ModerationStepFailed,
                    format!("complaint step {step} failed: {err}"),
                    serde_json::json!({ "step": step, "completed": self.completed }),
                ))
            }
        }
    }
}

#[derive(Debug, Validate)]
struct ComplaintReason {
    #[validate(length(min = 1, max = 500))]
    reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplaintOutcome {
    pub complaint: ComplaintProfile,
    pub complaints_this_month: u64,
    pub accused_suspended: bool,
}

/// `[start of month, start of next month)` in UTC.
pub fn month_bounds(now: DateTime<Utc>) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let (year, month) = (now.year(), now.month());
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };

    let start = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single();
    let end = Utc.with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0).single();
    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(AppError::internal(format!("cannot compute month bounds for {now}"))),
    }
}

/// Files a complaint, mutually blocks the pair and suspends the accused once the
/// current month's complaints pass [`COMPLAINT_THRESHOLD`].
///
/// The four steps are separate units of work. A failed step reports itself and every
/// step already applied. Retrying converges: the block and suspension are idempotent,
/// and the count only ever grows within a month.
pub fn submit_complaint(
    repo: &dyn ProfileRepository,
    complainant_id: i64,
    accused_id: i64,
    reason: &str,
    now: DateTime<Utc>,
) -> AppResult<ComplaintOutcome> {
    let reason = reason.trim();
    ComplaintReason { reason: reason.to_string() }.validate()?;

    let pair = load_pair(repo, complainant_id, accused_id, now)?;
    let mut steps = StepRunner { accused_id, completed: Vec::with_capacity(4) };

    let complaint = steps.run(ComplaintStep::RecordComplaint, || {
        repo.insert_complaint(&NewComplaint {
            profile_id: pair.actor.id,
            complaint_user_id: pair.target.id,
            reason: reason.to_string(),
            created_at: now,
        })
    })?;

    steps.run(ComplaintStep::MutualBlock, || {
        repo.set_mutual_block(pair.actor.id, pair.target.id, true, now)
    })?;

    let (month_start, month_end) = month_bounds(now)?;
    let complaints_this_month = steps.run(ComplaintStep::CountMonthly, || {
        repo.count_complaints_against(pair.target.id, month_start, month_end)
    })?;

    let accused_suspended = if complaints_this_month > COMPLAINT_THRESHOLD {
        steps.run(ComplaintStep::SuspendAccused, || repo.suspend_profile(pair.target.id, now))?;
        if !pair.target.is_blocked {
            tracing::warn!(accused_id, complaints_this_month, "profile suspended after complaints");
        }
        true
    } else {
        pair.target.is_blocked
    };

    tracing::info!(complainant_id, accused_id, complaints_this_month, "complaint recorded");

    Ok(ComplaintOutcome {
        complaint,
        complaints_this_month,
        accused_suspended,
    })
}

// ─── Tests ───
