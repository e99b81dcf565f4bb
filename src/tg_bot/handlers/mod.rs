use super::HandlerResult;
use crate::services::{AdminGate, CallbackEvent, ChatUser, TextEvent};
use crate::types::{CallbackAction, TelegramId};
use teloxide::prelude::*;
use teloxide::types::User;
use tracing::debug;

fn chat_user(chat_id: ChatId, from: Option<&User>) -> ChatUser {
    ChatUser {
        chat_id: TelegramId::new(chat_id.0),
        username: from.and_then(|u| u.username.clone()),
    }
}

/// `/start`, with or without a payload.
pub async fn start(msg: Message, gate: AdminGate) -> HandlerResult {
    gate.on_start(&chat_user(msg.chat.id, msg.from.as_ref()), msg.id)
        .await?;
    Ok(())
}

/// Any non-command text. Other message kinds are ignored.
pub async fn text(msg: Message, gate: AdminGate) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let event = TextEvent {
        user: chat_user(msg.chat.id, msg.from.as_ref()),
        message_id: msg.id,
        text: text.to_string(),
    };
    gate.on_text(&event).await?;
    Ok(())
}

/// Inline button press. Unknown callback data is ignored.
pub async fn callback(bot: Bot, q: CallbackQuery, gate: AdminGate) -> HandlerResult {
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        debug!(error = %e, "Failed to answer callback query");
    }

    let Some(action) = q
        .data
        .as_deref()
        .and_then(|data| CallbackAction::try_from(data).ok())
    else {
        debug!(data = ?q.data, "Ignoring unknown callback data");
        return Ok(());
    };

    let (chat_id, message_id) = match &q.message {
        Some(message) => (message.chat().id, Some(message.id())),
        None => (ChatId::from(q.from.id), None),
    };

    let event = CallbackEvent {
        user: chat_user(chat_id, Some(&q.from)),
        action,
        message_id,
    };
    gate.on_callback(&event).await?;
    Ok(())
}
