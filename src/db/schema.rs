use crate::types::TelegramId;
use chrono::NaiveDateTime;
use sqlx::FromRow;

/// One row per Telegram chat that ever sent `/start`.
#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)]
pub struct BotUser {
    /// Private chat id, equal to the user's Telegram id.
    pub chat_id: TelegramId,
    /// Telegram username at the last `/start`.
    pub username: Option<String>,
    /// Wrong passwords since the last `/start`.
    pub password_attempt_count: i64,
    /// Set after too many wrong passwords; never cleared.
    pub is_blocked: bool,
    /// Entered the right password since the last `/start`.
    pub is_authenticated: bool,
    /// Bot message to delete before the next reply.
    pub last_bot_message_id: Option<i32>,
    /// First `/start`.
    pub created_at: NaiveDateTime,
    /// Last change of any column.
    pub updated_at: NaiveDateTime,
}

impl BotUser {
    /// Authenticated and not blocked.
    pub const fn is_admin(&self) -> bool {
        self.is_authenticated && !self.is_blocked
    }
}

/// Stored contact form submission.
#[derive(Debug, Clone, FromRow)]
pub struct ContactMessage {
    /// Row id.
    pub id: i64,
    /// Sender name, trimmed.
    pub full_name: String,
    /// Normalized phone number.
    pub phone: String,
    /// Telegram handle without `@`.
    pub telegram: Option<String>,
    /// Message body.
    pub message: String,
    /// Time the submission was stored, UTC.
    pub created_at: NaiveDateTime,
}
