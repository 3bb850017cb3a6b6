use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult, ErrorCode};

/// Outbound side of a chat channel.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    api_url: String,
    token: String,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
    allowed_updates: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct BotApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    pub text: Option<String>,
    pub from: Option<ChatUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatUser {
    pub id: i64,
    pub username: Option<String>,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_url, self.token)
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> AppResult<()> {
        let _: serde_json::Value = self
            .call("sendMessage", &SendMessageRequest { chat_id, text }, None)
            .await?;

        tracing::debug!(chat_id, "telegram message sent");
        Ok(())
    }

    /// Long-polls for updates after `offset`. Resolves empty when the poll window elapses.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> AppResult<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: vec!["message"],
        };
        // leave headroom over the server-side poll window
        let http_timeout = Duration::from_secs(timeout_secs + 10);
        self.call("getUpdates", &request, Some(http_timeout)).await
    }

    async fn call<B, T>(&self, method: &str, body: &B, timeout: Option<Duration>) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let mut request = self.client.post(self.method_url(method)).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| delivery_error(method, format!("request failed: {e}")))?;

        let status = response.status();
        let payload: BotApiResponse<T> = response
            .json()
            .await
            .map_err(|e| delivery_error(method, format!("invalid response ({status}): {e}")))?;

        if !payload.ok {
            let reason = payload.description.unwrap_or_else(|| status.to_string());
            return Err(delivery_error(method, reason));
        }

        payload
            .result
            .ok_or_else(|| delivery_error(method, "response carried no result"))
    }
}

fn delivery_error(method: &str, reason: impl std::fmt::Display) -> AppError {
    AppError::with_details(
        ErrorCode::ChatDeliveryFailed,
        format!("telegram {method}: {reason}"),
        serde_json::json!({ "method": method }),
    )
}

#[async_trait::async_trait]
impl ChatTransport for TelegramClient {
    async fn send(&self, chat_id: i64, text: &str) -> AppResult<()> {
        self.send_message(chat_id, text).await
    }
}

/// Stand-in used when no bot token is configured. Messages are logged and discarded.
pub struct LogTransport;

#[async_trait::async_trait]
impl ChatTransport for LogTransport {
    async fn send(&self, chat_id: i64, text: &str) -> AppResult<()> {
        tracing::info!(chat_id, text, "chat transport disabled, message discarded");
        Ok(())
    }
}

// ─── Tests ───
