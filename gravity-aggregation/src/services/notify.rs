use gravity_shared::errors::AppResult;
use gravity_shared::types::event::Content;

use crate::store::ProfileRepository;

/// Builds the chat notification for a like, if the liked profile has a linked chat.
pub fn like_notification(
    repo: &dyn ProfileRepository,
    liker_id: i64,
    liked_id: i64,
    message: Option<&str>,
) -> AppResult<Option<Content>> {
    let Some(chat) = repo.find_telegram(liked_id)? else {
        return Ok(None);
    };
    let Some(liker) = repo.find_profile(liker_id)? else {
        return Ok(None);
    };

    let username = repo
        .find_telegram(liker_id)?
        .and_then(|t| t.username)
        .map(|u| format!("@{u}"))
        .unwrap_or(liker.display_name);

    Ok(Some(Content::like(chat.chat_id, username, message.unwrap_or_default())))
}

// ─── Tests ───
