use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use teloxide::types::ChatId;
use unic_langid::LanguageIdentifier;

/// Telegram chat identifier wrapper, the key of a session row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct TelegramId(i64);

impl TelegramId {
    /// Create a new `TelegramId`.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Chat to address when talking to this user.
    pub const fn chat(self) -> ChatId {
        ChatId(self.0)
    }
}

impl fmt::Display for TelegramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Language code wrapper (BCP-47/Fluent).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Parse a language code, returning `None` if empty or invalid.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            let langid = LanguageIdentifier::from_str(trimmed).ok()?;
            Some(Self(langid.to_string()))
        }
    }

    /// Return the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LanguageCode {
    fn default() -> Self {
        Self("uz".to_string())
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LanguageCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| serde::de::Error::custom("invalid language code"))
    }
}

/// Inline button actions understood by the admin panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// List blocked chats.
    ViewBlocked,
    /// Show the latest contact message.
    ViewMessages,
    /// Back to the menu.
    MainMenu,
}

impl CallbackAction {
    /// Convert the action to its callback payload.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ViewBlocked => "view_blocked",
            Self::ViewMessages => "view_messages",
            Self::MainMenu => "main_menu",
        }
    }
}

impl TryFrom<&str> for CallbackAction {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "view_blocked" => Ok(Self::ViewBlocked),
            "view_messages" => Ok(Self::ViewMessages),
            "main_menu" => Ok(Self::MainMenu),
            _ => Err(()),
        }
    }
}
