//! Text of every bot reply. Markdown views escape all dynamic fragments.

use super::keyboards::{admin_menu_keyboard, admin_view_keyboard};
use super::transport::OutgoingMessage;
use crate::db::schema::{BotUser, ContactMessage};
use crate::i18n::{t, t_args};
use std::collections::HashMap;
use std::fmt::Write as _;
use teloxide::utils::markdown::{bold, escape, link};

/// Longest message body rendered into a chat; Telegram caps a message at 4096 characters.
pub const MAX_RENDERED_BODY_CHARS: usize = 3000;
/// Longest name, phone or handle rendered into a chat.
pub const MAX_RENDERED_FIELD_CHARS: usize = 200;
/// Blocked users listed by name; the rest are only counted.
pub const MAX_LISTED_BLOCKED_USERS: usize = 50;

/// Reply to `/start`.
pub fn password_prompt(lang: &str) -> OutgoingMessage {
    OutgoingMessage::plain(t(lang, "start-password-prompt"))
}

/// Text from a chat that never sent `/start`.
pub fn start_required(lang: &str) -> OutgoingMessage {
    OutgoingMessage::plain(t(lang, "start-required"))
}

/// Button press without an admin session.
pub fn auth_required(lang: &str) -> OutgoingMessage {
    OutgoingMessage::plain(t(lang, "auth-required"))
}

/// Any text from a blocked chat.
pub fn blocked_notice(lang: &str) -> OutgoingMessage {
    OutgoingMessage::plain(t(lang, "user-blocked"))
}

/// The wrong password that blocked the chat.
pub fn attempts_exhausted(lang: &str) -> OutgoingMessage {
    OutgoingMessage::plain(t(lang, "attempts-exhausted"))
}

/// Wrong password with attempts left.
pub fn wrong_password(lang: &str, attempt: i64, max: i64) -> OutgoingMessage {
    let args = HashMap::from([
        ("attempt".to_string(), attempt.to_string()),
        ("max".to_string(), max.to_string()),
    ]);
    OutgoingMessage::plain(t_args(lang, "wrong-password", &args))
}

/// Main admin menu with its buttons.
pub fn admin_menu(lang: &str) -> OutgoingMessage {
    OutgoingMessage::plain(t(lang, "admin-welcome")).with_keyboard(admin_menu_keyboard(lang))
}

fn display_user(lang: &str, user: &BotUser) -> String {
    match user.username.as_deref().filter(|u| !u.is_empty()) {
        Some(username) => escape(&format!(
            "@{}",
            truncate_chars(username, MAX_RENDERED_FIELD_CHARS)
        )),
        None => link(
            &format!("tg://user?id={}", user.chat_id),
            &escape(&t(lang, "blocked-user-fallback")),
        ),
    }
}

/// Numbered list of blocked chats. Users without a username get a profile link.
pub fn blocked_users(lang: &str, users: &[BotUser]) -> OutgoingMessage {
    if users.is_empty() {
        return OutgoingMessage::markdown(escape(&t(lang, "blocked-empty")))
            .with_keyboard(admin_view_keyboard(lang));
    }

    let mut text = bold(&escape(&t(lang, "blocked-title")));
    text.push_str("\n\n");
    let mut lines: Vec<String> = users
        .iter()
        .take(MAX_LISTED_BLOCKED_USERS)
        .enumerate()
        .map(|(i, user)| {
            format!(
                "{}{}",
                escape(&format!("{}) 👤 ", i + 1)),
                display_user(lang, user)
            )
        })
        .collect();
    let hidden = users.len().saturating_sub(MAX_LISTED_BLOCKED_USERS);
    if hidden > 0 {
        let args = HashMap::from([("count".to_string(), hidden.to_string())]);
        lines.push(escape(&t_args(lang, "blocked-more", &args)));
    }
    text.push_str(&lines.join("\n"));
    OutgoingMessage::markdown(text).with_keyboard(admin_view_keyboard(lang))
}

fn truncate_chars(input: &str, max: usize) -> String {
    if input.chars().count() > max {
        let mut short: String = input.chars().take(max.saturating_sub(1)).collect();
        short.push('…');
        short
    } else {
        input.to_string()
    }
}

fn field_line(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(
        out,
        "{} {}",
        bold(&escape(&format!("{label}:"))),
        escape(&truncate_chars(value, MAX_RENDERED_FIELD_CHARS))
    );
}

fn contact_details(lang: &str, message: &ContactMessage) -> String {
    let mut out = String::new();
    field_line(&mut out, &t(lang, "contact-name"), &message.full_name);
    field_line(&mut out, &t(lang, "contact-phone"), &message.phone);
    if let Some(handle) = message.telegram.as_deref().filter(|h| !h.is_empty()) {
        field_line(&mut out, &t(lang, "contact-telegram"), &format!("@{handle}"));
    }
    field_line(
        &mut out,
        &t(lang, "contact-received"),
        &message.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    );
    let _ = write!(
        out,
        "\n{}\n{}",
        bold(&escape(&format!("{}:", t(lang, "contact-message")))),
        escape(&truncate_chars(&message.message, MAX_RENDERED_BODY_CHARS))
    );
    out
}

/// Newest contact submission and the total count.
pub fn latest_message(lang: &str, message: Option<&ContactMessage>, total: i64) -> OutgoingMessage {
    let Some(message) = message else {
        return OutgoingMessage::markdown(escape(&t(lang, "messages-empty")))
            .with_keyboard(admin_view_keyboard(lang));
    };
    let args = HashMap::from([("total".to_string(), total.to_string())]);
    let text = format!(
        "{}\n\n{}",
        bold(&escape(&t_args(lang, "messages-title", &args))),
        contact_details(lang, message)
    );
    OutgoingMessage::markdown(text).with_keyboard(admin_view_keyboard(lang))
}

/// Fan-out notice for a freshly stored contact submission.
pub fn contact_notification(lang: &str, message: &ContactMessage) -> OutgoingMessage {
    let text = format!(
        "{}\n\n{}",
        bold(&escape(&t(lang, "contact-new"))),
        contact_details(lang, message)
    );
    OutgoingMessage::markdown(text).with_keyboard(admin_menu_keyboard(lang))
}
