use crate::db::Database;
use crate::db::schema::BotUser;
use crate::tg_bot::transport::{ChatTransport, OutgoingMessage};
use crate::tg_bot::views;
use crate::types::{CallbackAction, LanguageCode, TelegramId};
use anyhow::Result;
use std::sync::Arc;
use teloxide::types::MessageId;
use tracing::{debug, info, instrument, warn};

/// Wrong passwords tolerated before a chat is blocked for good.
pub const MAX_PASSWORD_ATTEMPTS: i64 = 3;

/// The chat an update came from.
#[derive(Debug, Clone)]
pub struct ChatUser {
    /// Private chat id.
    pub chat_id: TelegramId,
    /// Sender's username, if any.
    pub username: Option<String>,
}

/// Plain text message that is not a command.
#[derive(Debug, Clone)]
pub struct TextEvent {
    /// Sender.
    pub user: ChatUser,
    /// The user's message, deleted after reading.
    pub message_id: MessageId,
    /// Raw text, compared verbatim with the password.
    pub text: String,
}

/// Inline button press.
#[derive(Debug, Clone)]
pub struct CallbackEvent {
    /// Who pressed the button.
    pub user: ChatUser,
    /// Decoded callback data.
    pub action: CallbackAction,
    /// Message carrying the pressed button, when Telegram still exposes it.
    pub message_id: Option<MessageId>,
}

/// Password gate in front of the admin panel.
///
/// Holds no per-chat state: every update reloads the chat's row.
#[derive(Clone)]
pub struct AdminGate {
    transport: Arc<dyn ChatTransport>,
    db: Database,
    password: Arc<str>,
    lang: LanguageCode,
}

impl AdminGate {
    /// `password` is compared verbatim with every password attempt.
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        db: Database,
        password: &str,
        lang: LanguageCode,
    ) -> Self {
        Self {
            transport,
            db,
            password: Arc::from(password),
            lang,
        }
    }

    fn lang(&self) -> &str {
        self.lang.as_str()
    }

    /// `/start`: re-arm the password prompt. A block is never lifted here.
    #[instrument(skip(self, user), fields(chat_id = %user.chat_id))]
    pub async fn on_start(&self, user: &ChatUser, message_id: MessageId) -> Result<()> {
        let chat_id = user.chat_id;
        self.discard(chat_id, message_id).await;

        let previous = self
            .db
            .find_user(chat_id)
            .await?
            .and_then(|u| u.last_bot_message_id);
        self.db
            .start_session(chat_id, user.username.as_deref())
            .await?;
        self.discard_recorded(chat_id, previous).await;

        if let Some(sent) = self
            .reply(chat_id, &views::password_prompt(self.lang()))
            .await
        {
            self.db.set_last_bot_message(chat_id, sent.0).await?;
        }
        info!("Password prompt issued");
        Ok(())
    }

    #[instrument(skip(self, event), fields(chat_id = %event.user.chat_id))]
    pub async fn on_text(&self, event: &TextEvent) -> Result<()> {
        let chat_id = event.user.chat_id;
        let username = event.user.username.as_deref();
        self.discard(chat_id, event.message_id).await;

        let Some(user) = self.db.find_user(chat_id).await? else {
            self.reply(chat_id, &views::start_required(self.lang()))
                .await;
            return Ok(());
        };

        if user.is_blocked {
            debug!("Text from blocked chat");
            self.reply(chat_id, &views::blocked_notice(self.lang()))
                .await;
            return Ok(());
        }

        self.discard_recorded(chat_id, user.last_bot_message_id)
            .await;

        if user.is_authenticated {
            let sent = self.reply(chat_id, &views::admin_menu(self.lang())).await;
            self.db
                .touch_session(chat_id, username, sent.map(|id| id.0))
                .await?;
            return Ok(());
        }

        if event.text == *self.password {
            return self.accept_password(chat_id, username).await;
        }

        let attempts = user.password_attempt_count + 1;
        let blocked = attempts >= MAX_PASSWORD_ATTEMPTS;
        let reply = if blocked {
            views::attempts_exhausted(self.lang())
        } else {
            views::wrong_password(self.lang(), attempts, MAX_PASSWORD_ATTEMPTS)
        };
        let sent = self.reply(chat_id, &reply).await;
        self.db
            .record_failed_attempt(chat_id, username, attempts, blocked, sent.map(|id| id.0))
            .await?;

        if blocked {
            warn!(attempts, "Chat blocked after too many wrong passwords");
        } else {
            info!(attempts, "Wrong password");
        }
        Ok(())
    }

    async fn accept_password(&self, chat_id: TelegramId, username: Option<&str>) -> Result<()> {
        if !self
            .db
            .mark_authenticated(chat_id, username, None)
            .await?
        {
            self.reply(chat_id, &views::blocked_notice(self.lang()))
                .await;
            return Ok(());
        }
        info!("Admin authenticated");
        if let Some(sent) = self.reply(chat_id, &views::admin_menu(self.lang())).await {
            self.db.set_last_bot_message(chat_id, sent.0).await?;
        }
        Ok(())
    }

    #[instrument(skip(self, event), fields(chat_id = %event.user.chat_id, action = event.action.as_str()))]
    pub async fn on_callback(&self, event: &CallbackEvent) -> Result<()> {
        let chat_id = event.user.chat_id;
        let Some(user) = self
            .db
            .find_user(chat_id)
            .await?
            .filter(BotUser::is_admin)
        else {
            debug!("Callback from chat without an admin session");
            self.reply(chat_id, &views::auth_required(self.lang()))
                .await;
            return Ok(());
        };

        let lang = self.lang();
        let view = match event.action {
            CallbackAction::ViewBlocked => {
                views::blocked_users(lang, &self.db.list_blocked_users().await?)
            }
            CallbackAction::ViewMessages => {
                let latest = self.db.latest_contact_message().await?;
                let total = self.db.count_contact_messages().await?;
                views::latest_message(lang, latest.as_ref(), total)
            }
            CallbackAction::MainMenu => views::admin_menu(lang),
        };

        self.edit_or_send(chat_id, event.message_id, user.last_bot_message_id, &view)
            .await
    }

    /// Replace the panel message that carried the button; fall back to a fresh message.
    /// Buttons under any other message (a contact notification) leave that message intact.
    async fn edit_or_send(
        &self,
        chat_id: TelegramId,
        trigger: Option<MessageId>,
        recorded: Option<i32>,
        view: &OutgoingMessage,
    ) -> Result<()> {
        if let Some(message_id) = trigger.filter(|id| Some(id.0) == recorded) {
            match self
                .transport
                .edit_text(chat_id.chat(), message_id, view)
                .await
            {
                Ok(()) => {
                    self.db.set_last_bot_message(chat_id, message_id.0).await?;
                    return Ok(());
                }
                Err(e) => debug!(error = %e, "Edit failed, sending a new message"),
            }
        }

        self.discard_recorded(chat_id, recorded).await;
        if let Some(sent) = self.reply(chat_id, view).await {
            self.db.set_last_bot_message(chat_id, sent.0).await?;
        }
        Ok(())
    }

    async fn reply(&self, chat_id: TelegramId, message: &OutgoingMessage) -> Option<MessageId> {
        match self.transport.send_text(chat_id.chat(), message).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "Failed to send message");
                None
            }
        }
    }

    async fn discard(&self, chat_id: TelegramId, message_id: MessageId) {
        if let Err(e) = self
            .transport
            .remove_message(chat_id.chat(), message_id)
            .await
        {
            debug!(chat_id = %chat_id, message_id = message_id.0, error = %e, "Could not delete message");
        }
    }

    async fn discard_recorded(&self, chat_id: TelegramId, recorded: Option<i32>) {
        if let Some(id) = recorded {
            self.discard(chat_id, MessageId(id)).await;
        }
    }
}
