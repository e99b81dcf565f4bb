use crate::domain::ContactForm;
use crate::types::TelegramId;
use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info, trace};

/// Database schema row types.
pub mod schema;
use schema::{BotUser, ContactMessage};

/// Database access layer.
#[derive(Clone)]
pub struct Database {
    /// Shared SQLite pool.
    pub pool: Pool<Sqlite>,
}

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const USER_COLUMNS: &str = "chat_id, username, password_attempt_count, is_blocked, is_authenticated, last_bot_message_id, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, full_name, phone, telegram, message, created_at";

impl Database {
    /// Open (creating if needed) the SQLite file and bring the schema up to date.
    pub async fn new(db_filename: &str) -> Result<Self> {
        let db_url = format!("sqlite://{db_filename}");

        if let Some(parent) = Path::new(db_filename).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let connect_options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA synchronous = NORMAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA temp_store = MEMORY;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect_with(connect_options)
            .await?;

        Self::prepare(pool).await
    }

    /// Private in-memory database; a single connection keeps every query on the same store.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
            .await?;
        Self::prepare(pool).await
    }

    async fn prepare(pool: Pool<Sqlite>) -> Result<Self> {
        MIGRATOR.run(&pool).await?;
        integrity_check(&pool).await?;
        validate_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// `find_user` database operation.
    pub async fn find_user(&self, chat_id: TelegramId) -> Result<Option<BotUser>> {
        let user = sqlx::query_as::<_, BotUser>(&format!(
            "SELECT {USER_COLUMNS} FROM bot_users WHERE chat_id = ?"
        ))
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Create the row on first `/start`, otherwise re-arm the password gate.
    /// `is_blocked` and `last_bot_message_id` are left as they are.
    pub async fn start_session(&self, chat_id: TelegramId, username: Option<&str>) -> Result<()> {
        trace!(chat_id = %chat_id, "Starting session");
        sqlx::query(
            "INSERT INTO bot_users (chat_id, username) VALUES (?, ?)
             ON CONFLICT(chat_id) DO UPDATE SET
                username = excluded.username,
                password_attempt_count = 0,
                is_authenticated = 0,
                updated_at = datetime('now')",
        )
        .bind(chat_id)
        .bind(username)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// `set_last_bot_message` database operation.
    pub async fn set_last_bot_message(&self, chat_id: TelegramId, message_id: i32) -> Result<()> {
        sqlx::query(
            "UPDATE bot_users SET last_bot_message_id = ?, updated_at = datetime('now') WHERE chat_id = ?",
        )
        .bind(message_id)
        .bind(chat_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Refresh the username of an already authenticated chat.
    pub async fn touch_session(
        &self,
        chat_id: TelegramId,
        username: Option<&str>,
        message_id: Option<i32>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE bot_users SET
                username = ?,
                last_bot_message_id = COALESCE(?, last_bot_message_id),
                updated_at = datetime('now')
             WHERE chat_id = ?",
        )
        .bind(username)
        .bind(message_id)
        .bind(chat_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Store a wrong-password outcome. The block flag can only be raised here, never cleared.
    pub async fn record_failed_attempt(
        &self,
        chat_id: TelegramId,
        username: Option<&str>,
        attempts: i64,
        blocked: bool,
        message_id: Option<i32>,
    ) -> Result<()> {
        trace!(chat_id = %chat_id, attempts, blocked, "Recording failed password attempt");
        sqlx::query(
            "UPDATE bot_users SET
                username = ?,
                password_attempt_count = ?,
                is_blocked = MAX(is_blocked, ?),
                last_bot_message_id = COALESCE(?, last_bot_message_id),
                updated_at = datetime('now')
             WHERE chat_id = ?",
        )
        .bind(username)
        .bind(attempts)
        .bind(blocked)
        .bind(message_id)
        .bind(chat_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns `false` when the row is missing or blocked.
    pub async fn mark_authenticated(
        &self,
        chat_id: TelegramId,
        username: Option<&str>,
        message_id: Option<i32>,
    ) -> Result<bool> {
        let res = sqlx::query(
            "UPDATE bot_users SET
                username = ?,
                is_authenticated = 1,
                password_attempt_count = 0,
                last_bot_message_id = COALESCE(?, last_bot_message_id),
                updated_at = datetime('now')
             WHERE chat_id = ? AND is_blocked = 0",
        )
        .bind(username)
        .bind(message_id)
        .bind(chat_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// `list_blocked_users` database operation.
    pub async fn list_blocked_users(&self) -> Result<Vec<BotUser>> {
        let users = sqlx::query_as::<_, BotUser>(&format!(
            "SELECT {USER_COLUMNS} FROM bot_users WHERE is_blocked = 1 ORDER BY updated_at, chat_id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Chats that receive contact notifications.
    pub async fn list_admin_recipients(&self) -> Result<Vec<TelegramId>> {
        let ids = sqlx::query_scalar::<_, TelegramId>(
            "SELECT chat_id FROM bot_users WHERE is_authenticated = 1 AND is_blocked = 0 ORDER BY chat_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// `create_contact_message` database operation.
    pub async fn create_contact_message(&self, form: &ContactForm) -> Result<ContactMessage> {
        let stored = sqlx::query_as::<_, ContactMessage>(&format!(
            "INSERT INTO contact_messages (full_name, phone, telegram, message) VALUES (?, ?, ?, ?) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(form.full_name.as_str())
        .bind(form.phone.as_str())
        .bind(form.telegram.as_ref().map(|t| t.as_str()))
        .bind(form.message.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    /// `latest_contact_message` database operation.
    pub async fn latest_contact_message(&self) -> Result<Option<ContactMessage>> {
        let message = sqlx::query_as::<_, ContactMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM contact_messages ORDER BY id DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(message)
    }

    /// `count_contact_messages` database operation.
    pub async fn count_contact_messages(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM contact_messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// `close` database operation.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn integrity_check(pool: &Pool<Sqlite>) -> Result<()> {
    let result: String = sqlx::query_scalar("PRAGMA integrity_check;")
        .fetch_one(pool)
        .await?;
    if result.trim() == "ok" {
        info!("Database integrity check: ok");
        Ok(())
    } else {
        error!(result = %result, "Database integrity check failed");
        anyhow::bail!("Database integrity check failed: {result}");
    }
}

async fn validate_schema(pool: &Pool<Sqlite>) -> Result<()> {
    let tables: Vec<String> = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table'")
        .map(|row: sqlx::sqlite::SqliteRow| row.get::<String, _>("name"))
        .fetch_all(pool)
        .await?;
    let present: HashSet<String> = tables.into_iter().collect();
    let required_tables = ["bot_users", "contact_messages", "_sqlx_migrations"];
    for table in &required_tables {
        if !present.contains(*table) {
            anyhow::bail!("Database schema missing table: {table}");
        }
    }

    ensure_columns(
        pool,
        "bot_users",
        &[
            "chat_id",
            "username",
            "password_attempt_count",
            "is_blocked",
            "is_authenticated",
            "last_bot_message_id",
            "created_at",
            "updated_at",
        ],
    )
    .await?;

    ensure_columns(
        pool,
        "contact_messages",
        &["id", "full_name", "phone", "telegram", "message", "created_at"],
    )
    .await?;

    Ok(())
}

async fn ensure_columns(pool: &Pool<Sqlite>, table: &str, expected: &[&str]) -> Result<()> {
    let rows = sqlx::query(&format!("PRAGMA table_info({table})"))
        .fetch_all(pool)
        .await?;
    let mut present = HashSet::new();
    for row in rows {
        let name: String = row.get("name");
        present.insert(name);
    }
    for col in expected {
        if !present.contains(*col) {
            anyhow::bail!("Table {table} missing column: {col}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContactForm, ContactPayload};

    fn form(name: &str, telegram: &str) -> ContactForm {
        ContactForm::try_from(ContactPayload {
            full_name: Some(name.to_string()),
            phone: Some("+998901234567".to_string()),
            telegram: Some(telegram.to_string()),
            message: Some(format!("hello from {name}")),
        })
        .expect("valid form")
    }

    #[tokio::test]
    async fn start_session_creates_then_resets() {
        let db = Database::in_memory().await.expect("db");
        let id = TelegramId::new(1);
        assert!(db.find_user(id).await.expect("find").is_none());

        db.start_session(id, Some("ali")).await.expect("start");
        let user = db.find_user(id).await.expect("find").expect("row");
        assert_eq!(user.username.as_deref(), Some("ali"));
        assert_eq!(user.password_attempt_count, 0);
        assert!(!user.is_authenticated && !user.is_blocked);
        assert!(user.last_bot_message_id.is_none());

        db.set_last_bot_message(id, 40).await.expect("msg");
        assert!(db.mark_authenticated(id, Some("ali"), Some(41)).await.expect("auth"));
        db.start_session(id, None).await.expect("restart");
        let user = db.find_user(id).await.expect("find").expect("row");
        assert!(!user.is_authenticated);
        assert_eq!(user.username, None);
        assert_eq!(user.last_bot_message_id, Some(41));
    }

    #[tokio::test]
    async fn block_flag_is_sticky() {
        let db = Database::in_memory().await.expect("db");
        let id = TelegramId::new(7);
        db.start_session(id, None).await.expect("start");
        db.record_failed_attempt(id, None, 3, true, Some(5)).await.expect("fail");
        db.record_failed_attempt(id, None, 0, false, None).await.expect("fail");
        db.start_session(id, None).await.expect("restart");

        let user = db.find_user(id).await.expect("find").expect("row");
        assert!(user.is_blocked);
        assert_eq!(user.password_attempt_count, 0);
        assert_eq!(user.last_bot_message_id, Some(5));
        assert!(!db.mark_authenticated(id, None, Some(6)).await.expect("auth"));
        assert!(!db.find_user(id).await.expect("find").expect("row").is_authenticated);
    }

    #[tokio::test]
    async fn recipients_are_authenticated_and_unblocked() {
        let db = Database::in_memory().await.expect("db");
        for raw in 1..=3 {
            db.start_session(TelegramId::new(raw), None).await.expect("start");
        }
        db.mark_authenticated(TelegramId::new(1), None, None).await.expect("auth");
        db.mark_authenticated(TelegramId::new(3), None, None).await.expect("auth");
        db.record_failed_attempt(TelegramId::new(2), Some("bad"), 3, true, None)
            .await
            .expect("block");

        let recipients = db.list_admin_recipients().await.expect("list");
        assert_eq!(recipients, vec![TelegramId::new(1), TelegramId::new(3)]);

        let blocked = db.list_blocked_users().await.expect("blocked");
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].chat_id, TelegramId::new(2));
        assert_eq!(blocked[0].username.as_deref(), Some("bad"));
    }

    #[tokio::test]
    async fn latest_contact_message_follows_insertion_order() {
        let db = Database::in_memory().await.expect("db");
        assert!(db.latest_contact_message().await.expect("latest").is_none());
        assert_eq!(db.count_contact_messages().await.expect("count"), 0);

        let first = db.create_contact_message(&form("Ali", "")).await.expect("insert");
        assert!(first.telegram.is_none());
        db.create_contact_message(&form("Vali", "@vali")).await.expect("insert");

        let latest = db.latest_contact_message().await.expect("latest").expect("row");
        assert_eq!(latest.full_name, "Vali");
        assert_eq!(latest.telegram.as_deref(), Some("vali"));
        assert!(latest.id > first.id);
        assert_eq!(db.count_contact_messages().await.expect("count"), 2);
    }
}
