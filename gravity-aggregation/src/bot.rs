use std::time::Duration;

use tokio_util::sync::CancellationToken;

use gravity_shared::clients::telegram::{TelegramClient, Update};
use gravity_shared::types::event::Content;

use crate::hub::{HubHandle, PublishOutcome};

const POLL_TIMEOUT_SECS: u64 = 30;
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

const INTRO: &str = "Hi! I'm the Gravity bot. I'll let you know here when someone likes your profile.";

/// Reply for an inbound message, if it warrants one.
fn reply_for(update: &Update) -> Option<Content> {
    let message = update.message.as_ref()?;
    let command = message.text.as_deref()?.split_whitespace().next()?;
    let username = message
        .from
        .as_ref()
        .and_then(|u| u.username.as_deref())
        .unwrap_or("unknown");
    // commands may carry a bot mention: /start@gravity_bot
    match command.split('@').next() {
        Some("/start") => Some(Content::text(message.chat.id, username, INTRO)),
        _ => None,
    }
}

/// Long-polls the bot for updates until `cancel` fires. Replies to `/start` go out
/// through the hub like every other chat message.
pub async fn run_updates(bot: TelegramClient, hub: HubHandle, cancel: CancellationToken) {
    let mut offset = 0i64;
    tracing::info!("bot update loop started");

    loop {
        let updates = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            polled = bot.get_updates(offset, POLL_TIMEOUT_SECS) => polled,
        };

        let updates = match updates {
            Ok(updates) => updates,
            Err(e) => {
                tracing::error!(error = %e, "failed to poll bot updates");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(ERROR_BACKOFF) => continue,
                }
            }
        };

        for update in &updates {
            offset = offset.max(update.update_id + 1);

            let Some(reply) = reply_for(update) else {
                continue;
            };
            let chat_id = reply.chat_id;
            tracing::info!(chat_id, username = %reply.username, "bot /start received");

            if hub.publish(reply).await == PublishOutcome::Closed {
                break;
            }
        }
    }

    tracing::info!("bot update loop stopped");
}

// ─── Tests ───
