use crate::db::Database;
use crate::db::schema::ContactMessage;
use crate::domain::ContactForm;
use crate::tg_bot::transport::ChatTransport;
use crate::tg_bot::views;
use crate::types::LanguageCode;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of notifying admins about one submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Admins the notification reached.
    pub delivered: usize,
    /// Admins whose send failed.
    pub failed: usize,
}

/// Stores contact submissions and forwards them to every logged-in admin.
#[derive(Clone)]
pub struct ContactService {
    db: Database,
    transport: Arc<dyn ChatTransport>,
    lang: LanguageCode,
}

impl ContactService {
    /// Notifications are rendered in `lang`.
    pub fn new(db: Database, transport: Arc<dyn ChatTransport>, lang: LanguageCode) -> Self {
        Self {
            db,
            transport,
            lang,
        }
    }

    /// Persist the submission, then fan it out. Only persistence can fail.
    #[instrument(skip(self, form))]
    pub async fn submit(&self, form: &ContactForm) -> Result<(ContactMessage, FanOutReport)> {
        let stored = self.db.create_contact_message(form).await?;
        info!(message_id = stored.id, "Contact message stored");
        let report = self.notify_admins(&stored).await;
        Ok((stored, report))
    }

    /// Sequential delivery; a failing chat never stops the loop.
    pub async fn notify_admins(&self, message: &ContactMessage) -> FanOutReport {
        let recipients = match self.db.list_admin_recipients().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Failed to list admin recipients");
                Vec::new()
            }
        };

        let notification = views::contact_notification(self.lang.as_str(), message);
        let mut report = FanOutReport::default();
        for chat_id in recipients {
            match self.transport.send_text(chat_id.chat(), &notification).await {
                Ok(_) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(chat_id = %chat_id, error = %e, "Failed to notify admin");
                }
            }
        }

        info!(
            message_id = message.id,
            delivered = report.delivered,
            failed = report.failed,
            "Contact message fan-out finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContactPayload;
    use crate::tg_bot::transport::testing::RecordingTransport;
    use crate::types::TelegramId;
    use teloxide::types::ChatId;

    fn ali() -> ContactForm {
        ContactForm::try_from(ContactPayload {
            full_name: Some("Ali".to_string()),
            phone: Some("+998 90 123-45-67".to_string()),
            telegram: Some("@ali".to_string()),
            message: Some("Salom".to_string()),
        })
        .expect("valid form")
    }

    async fn admins(db: &Database, ids: &[i64]) {
        for raw in ids {
            let id = TelegramId::new(*raw);
            db.start_session(id, None).await.expect("start");
            db.mark_authenticated(id, None, None).await.expect("auth");
        }
    }

    #[tokio::test]
    async fn submission_without_admins_is_still_stored() {
        let db = Database::in_memory().await.expect("db");
        let transport = RecordingTransport::new();
        let service = ContactService::new(db.clone(), transport.clone(), LanguageCode::default());

        let (stored, report) = service.submit(&ali()).await.expect("submit");

        assert_eq!(report, FanOutReport::default());
        assert!(transport.calls().is_empty());
        assert_eq!(stored.phone, "+998901234567");
        assert_eq!(stored.telegram.as_deref(), Some("ali"));
        assert_eq!(db.count_contact_messages().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn failing_admins_do_not_stop_fan_out() {
        let db = Database::in_memory().await.expect("db");
        admins(&db, &[1, 2, 3, 4]).await;
        db.start_session(TelegramId::new(5), None).await.expect("start");
        let transport = RecordingTransport::new();
        transport.fail_chat(ChatId(2));
        transport.fail_chat(ChatId(3));
        let service = ContactService::new(
            db.clone(),
            transport.clone(),
            LanguageCode::parse("en").expect("lang"),
        );

        let (_, report) = service.submit(&ali()).await.expect("submit");

        assert_eq!(
            report,
            FanOutReport {
                delivered: 2,
                failed: 2
            }
        );
        let sent = transport.sent();
        let chats: Vec<ChatId> = sent.iter().map(|(chat, _, _)| *chat).collect();
        assert_eq!(chats, vec![ChatId(1), ChatId(4)]);
        let (_, text, buttons) = &sent[0];
        assert!(text.starts_with("*📩 New contact message*"));
        assert!(text.contains("*Telegram:* @ali"));
        assert_eq!(buttons, &vec!["view_blocked", "view_messages"]);
    }

    #[tokio::test]
    async fn fan_out_does_not_move_the_recorded_bot_message() {
        let db = Database::in_memory().await.expect("db");
        admins(&db, &[1]).await;
        db.set_last_bot_message(TelegramId::new(1), 42)
            .await
            .expect("record");
        let service = ContactService::new(db.clone(), RecordingTransport::new(), LanguageCode::default());

        service.submit(&ali()).await.expect("submit");

        let row = db
            .find_user(TelegramId::new(1))
            .await
            .expect("find")
            .expect("row");
        assert_eq!(row.last_bot_message_id, Some(42));
    }
}
