use serde::{Deserialize, Serialize};

/// Kind of a notification relayed to a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Like,
    Text,
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::Like => write!(f, "like"),
            ContentKind::Text => write!(f, "text"),
        }
    }
}

/// Transient notification payload. Lives only on the hub channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub chat_id: i64,
    pub kind: ContentKind,
    pub message: String,
    pub username: String,
}

impl Content {
    pub fn like(chat_id: i64, username: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            chat_id,
            kind: ContentKind::Like,
            message: message.into(),
            username: username.into(),
        }
    }

    /// Plain reply addressed to `username`'s chat, sent verbatim.
    pub fn text(chat_id: i64, username: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            chat_id,
            kind: ContentKind::Text,
            message: message.into(),
            username: username.into(),
        }
    }

    /// Text sent to the chat. An empty like message falls back to a default line.
    pub fn render(&self) -> String {
        let message = self.message.trim();
        match self.kind {
            ContentKind::Like if message.is_empty() => {
                format!("{} liked your profile", self.username)
            }
            ContentKind::Like => format!("{} liked your profile: {message}", self.username),
            ContentKind::Text => message.to_string(),
        }
    }
}

// ─── Tests ───
