use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, ParseMode};
use thiserror::Error;

/// Failure reported by the chat backend.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Telegram rejected the request or could not be reached.
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),
}

/// Text plus presentation options for one outbound bot message.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    /// Message body as it is sent.
    pub text: String,
    /// Text is already escaped MarkdownV2.
    pub markdown: bool,
    /// Inline buttons under the message.
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl OutgoingMessage {
    /// Text sent without a parse mode.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: false,
            keyboard: None,
        }
    }

    /// Pre-escaped MarkdownV2 text.
    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: true,
            keyboard: None,
        }
    }

    /// Attach inline buttons.
    #[must_use]
    pub fn with_keyboard(mut self, keyboard: InlineKeyboardMarkup) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Outbound side of the bot. Every operation may fail; callers decide whether to care.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a new message and return its id.
    async fn send_text(
        &self,
        chat_id: ChatId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, TransportError>;

    /// Replace the text and buttons of an existing message.
    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError>;

    /// Delete a message from the chat.
    async fn remove_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), TransportError>;
}

#[async_trait]
impl ChatTransport for Bot {
    async fn send_text(
        &self,
        chat_id: ChatId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, TransportError> {
        let mut request = self.send_message(chat_id, message.text.clone());
        if message.markdown {
            request = request.parse_mode(ParseMode::MarkdownV2);
        }
        if let Some(keyboard) = &message.keyboard {
            request = request.reply_markup(keyboard.clone());
        }
        let sent = request.await?;
        Ok(sent.id)
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        let mut request = self.edit_message_text(chat_id, message_id, message.text.clone());
        if message.markdown {
            request = request.parse_mode(ParseMode::MarkdownV2);
        }
        if let Some(keyboard) = &message.keyboard {
            request = request.reply_markup(keyboard.clone());
        }
        request.await?;
        Ok(())
    }

    async fn remove_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), TransportError> {
        Requester::delete_message(self, chat_id, message_id).await?;
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use super::{ChatTransport, OutgoingMessage, TransportError};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
    use std::sync::{Arc, Mutex};
    use teloxide::types::{ChatId, InlineKeyboardButtonKind, InlineKeyboardMarkup, MessageId};
    use teloxide::{ApiError, RequestError};

    /// What the fake transport was asked to do.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Send {
            chat_id: ChatId,
            message_id: MessageId,
            text: String,
            markdown: bool,
            buttons: Vec<String>,
        },
        Edit {
            chat_id: ChatId,
            message_id: MessageId,
            text: String,
            buttons: Vec<String>,
        },
        Remove {
            chat_id: ChatId,
            message_id: MessageId,
        },
    }

    pub fn callback_data(keyboard: Option<&InlineKeyboardMarkup>) -> Vec<String> {
        keyboard
            .map(|k| {
                k.inline_keyboard
                    .iter()
                    .flatten()
                    .filter_map(|button| match &button.kind {
                        InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// In-memory transport that records calls and hands out increasing message ids.
    pub struct RecordingTransport {
        calls: Mutex<Vec<Call>>,
        next_id: AtomicI32,
        failing_chats: Mutex<HashSet<ChatId>>,
        reject_edits: AtomicBool,
    }

    impl RecordingTransport {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                next_id: AtomicI32::new(100),
                failing_chats: Mutex::new(HashSet::new()),
                reject_edits: AtomicBool::new(false),
            })
        }

        /// Every send to `chat_id` fails from now on.
        pub fn fail_chat(&self, chat_id: ChatId) {
            self.failing_chats.lock().expect("lock").insert(chat_id);
        }

        pub fn reject_edits(&self) {
            self.reject_edits.store(true, Ordering::SeqCst);
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().expect("lock").clone()
        }

        pub fn clear(&self) {
            self.calls.lock().expect("lock").clear();
        }

        /// `(chat, text, buttons)` of every successful send, in order.
        pub fn sent(&self) -> Vec<(ChatId, String, Vec<String>)> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    Call::Send {
                        chat_id,
                        text,
                        buttons,
                        ..
                    } => Some((chat_id, text, buttons)),
                    _ => None,
                })
                .collect()
        }

        pub fn last_sent_text(&self) -> Option<String> {
            self.sent().pop().map(|(_, text, _)| text)
        }

        pub fn removed(&self) -> Vec<MessageId> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    Call::Remove { message_id, .. } => Some(message_id),
                    _ => None,
                })
                .collect()
        }

        fn push(&self, call: Call) {
            self.calls.lock().expect("lock").push(call);
        }
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        async fn send_text(
            &self,
            chat_id: ChatId,
            message: &OutgoingMessage,
        ) -> Result<MessageId, TransportError> {
            if self.failing_chats.lock().expect("lock").contains(&chat_id) {
                return Err(RequestError::Api(ApiError::BotBlocked).into());
            }
            let message_id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
            self.push(Call::Send {
                chat_id,
                message_id,
                text: message.text.clone(),
                markdown: message.markdown,
                buttons: callback_data(message.keyboard.as_ref()),
            });
            Ok(message_id)
        }

        async fn edit_text(
            &self,
            chat_id: ChatId,
            message_id: MessageId,
            message: &OutgoingMessage,
        ) -> Result<(), TransportError> {
            if self.reject_edits.load(Ordering::SeqCst) {
                return Err(RequestError::Api(ApiError::MessageNotModified).into());
            }
            self.push(Call::Edit {
                chat_id,
                message_id,
                text: message.text.clone(),
                buttons: callback_data(message.keyboard.as_ref()),
            });
            Ok(())
        }

        async fn remove_message(
            &self,
            chat_id: ChatId,
            message_id: MessageId,
        ) -> Result<(), TransportError> {
            self.push(Call::Remove {
                chat_id,
                message_id,
            });
            Ok(())
        }
    }
}
