use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// Upper bound for the free-text body of a contact submission.
pub const MAX_MESSAGE_CHARS: usize = 10_000;

static UZ_MOBILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+?998)?(6[125-79]|7[1-69]|88|9\d)\d{7}$").expect("phone pattern compiles")
});

/// A single rejected field of an inbound payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{field}: {rule}")]
pub struct ValidationError {
    /// Wire name of the field.
    pub field: &'static str,
    /// Rule the field broke.
    pub rule: &'static str,
}

impl ValidationError {
    const fn new(field: &'static str, rule: &'static str) -> Self {
        Self { field, rule }
    }

    /// The request body could not be decoded at all.
    pub const fn malformed_body() -> Self {
        Self::new("body", "json")
    }
}

/// All field errors found in one payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid contact form ({} errors)", .0.len())]
pub struct ContactFormError(pub Vec<ValidationError>);

/// Non-blank sender name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FullName(String);

/// Uzbek mobile number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Phone(String);

/// Optional Telegram contact left by the sender.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TelegramHandle(String);

/// Free-text body of a submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageBody(String);

impl FullName {
    /// Trimmed name; blank input is rejected.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Name as stored.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Phone {
    /// Accepts Uzbek mobile numbers, ignoring common separators.
    pub fn parse(input: &str) -> Option<Self> {
        let compact: String = input
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
            .collect();
        UZ_MOBILE.is_match(&compact).then_some(Self(compact))
    }

    /// Number without separators.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TelegramHandle {
    /// Empty input means the sender left no handle. Any other text is kept as given.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim().trim_start_matches('@').trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Handle without the leading `@`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl MessageBody {
    /// Any text up to the length limit, kept verbatim.
    pub fn parse(input: &str) -> Option<Self> {
        if input.chars().count() > MAX_MESSAGE_CHARS {
            None
        } else {
            Some(Self(input.to_string()))
        }
    }

    /// Body as submitted.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Raw contact payload as it arrives on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPayload {
    /// `fullName`.
    #[serde(default)]
    pub full_name: Option<String>,
    /// `phone`.
    #[serde(default)]
    pub phone: Option<String>,
    /// `telegram`, optional.
    #[serde(default)]
    pub telegram: Option<String>,
    /// `message`.
    #[serde(default)]
    pub message: Option<String>,
}

/// A contact submission that passed boundary validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactForm {
    /// Sender name.
    pub full_name: FullName,
    /// Sender phone.
    pub phone: Phone,
    /// Sender handle, when one was given.
    pub telegram: Option<TelegramHandle>,
    /// Message body.
    pub message: MessageBody,
}

impl TryFrom<ContactPayload> for ContactForm {
    type Error = ContactFormError;

    fn try_from(payload: ContactPayload) -> Result<Self, Self::Error> {
        let mut errors = Vec::new();

        let full_name = match payload.full_name.as_deref() {
            None => {
                errors.push(ValidationError::new("fullName", "required"));
                None
            }
            Some(raw) => {
                let parsed = FullName::parse(raw);
                if parsed.is_none() {
                    errors.push(ValidationError::new("fullName", "not_empty"));
                }
                parsed
            }
        };

        let phone = match payload.phone.as_deref() {
            None => {
                errors.push(ValidationError::new("phone", "required"));
                None
            }
            Some(raw) => {
                let parsed = Phone::parse(raw);
                if parsed.is_none() {
                    errors.push(ValidationError::new("phone", "mobile_phone"));
                }
                parsed
            }
        };

        let telegram = payload.telegram.as_deref().and_then(TelegramHandle::parse);

        let message = match payload.message.as_deref() {
            None => {
                errors.push(ValidationError::new("message", "required"));
                None
            }
            Some(raw) => {
                let parsed = MessageBody::parse(raw);
                if parsed.is_none() {
                    errors.push(ValidationError::new("message", "max_length"));
                }
                parsed
            }
        };

        match (full_name, phone, message) {
            (Some(full_name), Some(phone), Some(message)) if errors.is_empty() => Ok(Self {
                full_name,
                phone,
                telegram,
                message,
            }),
            _ => Err(ContactFormError(errors)),
        }
    }
}
