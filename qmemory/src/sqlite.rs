//! SQLite-backed conversation store.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use qchat::{ChatError, ChatFuture, ConversationStore};
use qcommon::{ChatId, MessageId};
use qprovider::{Message, Role};
use rusqlite::{Connection, OptionalExtension, params};

#[derive(Debug)]
pub struct SqliteConversationStore {
    connection: Mutex<Connection>,
}

impl SqliteConversationStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ChatError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|error| {
                ChatError::store(format!("failed to create sqlite parent directory: {error}"))
            })?;
        }

        let connection = Connection::open(path).map_err(|error| {
            ChatError::store(format!("failed to open sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    pub fn new_in_memory() -> Result<Self, ChatError> {
        let connection = Connection::open_in_memory().map_err(|error| {
            ChatError::store(format!("failed to open in-memory sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self, ChatError> {
        connection
            .busy_timeout(Duration::from_secs(5))
            .map_err(|error| {
                ChatError::store(format!("failed to configure sqlite busy timeout: {error}"))
            })?;
        let store = Self {
            connection: Mutex::new(connection),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, ChatError> {
        self.connection
            .lock()
            .map_err(|_| ChatError::store("sqlite store lock poisoned"))
    }

    fn initialize_schema(&self) -> Result<(), ChatError> {
        let conn = self.connection()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS chats (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL DEFAULT 'New Chat',
                created_at_secs INTEGER NOT NULL,
                updated_at_secs INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                created_at_secs INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_chat_id
            ON messages(chat_id, id);
            ",
        )
        .map_err(|error| {
            ChatError::store(format!("failed to initialize sqlite schema: {error}"))
        })?;

        Ok(())
    }

    /// The conversation's last-activity marker, bumped by every append and
    /// every flush.
    pub fn chat_activity(&self, chat_id: &ChatId) -> Result<Option<i64>, ChatError> {
        let conn = self.connection()?;
        conn.query_row(
            "SELECT updated_at_secs FROM chats WHERE id = ?1",
            params![chat_id.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .optional()
        .map_err(|error| ChatError::store(format!("failed to read chat activity: {error}")))
    }
}

impl ConversationStore for SqliteConversationStore {
    fn load_messages<'a>(
        &'a self,
        chat_id: &'a ChatId,
    ) -> ChatFuture<'a, Result<Vec<Message>, ChatError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let mut stmt = conn
                .prepare(
                    "
                    SELECT role, content
                    FROM messages
                    WHERE chat_id = ?1
                    ORDER BY id ASC
                    ",
                )
                .map_err(|error| {
                    ChatError::store(format!("failed to prepare transcript query: {error}"))
                })?;
            let rows = stmt
                .query_map(params![chat_id.as_str()], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(|error| {
                    ChatError::store(format!("failed to query transcript rows: {error}"))
                })?;

            let mut messages = Vec::new();
            for row in rows {
                let (role, content) = row.map_err(|error| {
                    ChatError::store(format!("failed to read transcript row: {error}"))
                })?;
                messages.push(Message {
                    role: role_from_str(&role)?,
                    content,
                });
            }
            Ok(messages)
        })
    }

    fn append_message<'a>(
        &'a self,
        chat_id: &'a ChatId,
        message: Message,
    ) -> ChatFuture<'a, Result<MessageId, ChatError>> {
        Box::pin(async move {
            let mut conn = self.connection()?;
            let now = now_secs()?;
            let tx = conn.transaction().map_err(|error| {
                ChatError::store(format!("failed to begin append transaction: {error}"))
            })?;

            tx.execute(
                "
                INSERT OR IGNORE INTO chats (id, created_at_secs, updated_at_secs)
                VALUES (?1, ?2, ?2)
                ",
                params![chat_id.as_str(), now],
            )
            .map_err(|error| ChatError::store(format!("failed to upsert chat row: {error}")))?;

            tx.execute(
                "
                INSERT INTO messages (chat_id, role, content, created_at_secs)
                VALUES (?1, ?2, ?3, ?4)
                ",
                params![
                    chat_id.as_str(),
                    role_to_str(message.role),
                    message.content,
                    now
                ],
            )
            .map_err(|error| ChatError::store(format!("failed to append message: {error}")))?;

            let message_id = tx.last_insert_rowid();

            tx.execute(
                "UPDATE chats SET updated_at_secs = ?1 WHERE id = ?2",
                params![now, chat_id.as_str()],
            )
            .map_err(|error| {
                ChatError::store(format!("failed to bump chat activity: {error}"))
            })?;

            tx.commit().map_err(|error| {
                ChatError::store(format!("failed to commit append transaction: {error}"))
            })?;

            Ok(MessageId::new(message_id))
        })
    }

    fn append_content<'a>(
        &'a self,
        chat_id: &'a ChatId,
        message_id: MessageId,
        appended: &'a str,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut conn = self.connection()?;
            let now = now_secs()?;
            let tx = conn.transaction().map_err(|error| {
                ChatError::store(format!("failed to begin flush transaction: {error}"))
            })?;

            let updated = tx
                .execute(
                    "
                    UPDATE messages
                    SET content = content || ?1
                    WHERE id = ?2 AND chat_id = ?3
                    ",
                    params![appended, message_id.value(), chat_id.as_str()],
                )
                .map_err(|error| {
                    ChatError::store(format!("failed to append message content: {error}"))
                })?;

            if updated == 0 {
                return Err(ChatError::store(format!(
                    "message {message_id} not found in chat '{chat_id}'"
                )));
            }

            tx.execute(
                "UPDATE chats SET updated_at_secs = ?1 WHERE id = ?2",
                params![now, chat_id.as_str()],
            )
            .map_err(|error| {
                ChatError::store(format!("failed to bump chat activity: {error}"))
            })?;

            tx.commit().map_err(|error| {
                ChatError::store(format!("failed to commit flush transaction: {error}"))
            })
        })
    }
}

fn now_secs() -> Result<i64, ChatError> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|error| ChatError::store(format!("system clock predates unix epoch: {error}")))?;
    Ok(duration.as_secs() as i64)
}

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

fn role_from_str(value: &str) -> Result<Role, ChatError> {
    match value {
        "system" => Ok(Role::System),
        "user" => Ok(Role::User),
        "assistant" => Ok(Role::Assistant),
        _ => Err(ChatError::store(format!(
            "unknown transcript role value '{value}'"
        ))),
    }
}

pub fn default_sqlite_path() -> PathBuf {
    if let Some(explicit) = std::env::var_os("QUILL_SQLITE_PATH") {
        return PathBuf::from(explicit);
    }

    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        return PathBuf::from(home).join(".quill").join("qmemory.sqlite3");
    }

    PathBuf::from("qmemory.sqlite3")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_and_load_round_trip_in_order() {
        let store = SqliteConversationStore::new_in_memory().expect("open");
        let chat_id = ChatId::from("c1");

        store
            .append_message(&chat_id, Message::new(Role::User, "hi"))
            .await
            .expect("append");
        store
            .append_message(&chat_id, Message::new(Role::Assistant, "hello"))
            .await
            .expect("append");

        let messages = store.load_messages(&chat_id).await.expect("load");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Message::new(Role::User, "hi"));
        assert_eq!(messages[1], Message::new(Role::Assistant, "hello"));

        let other = store
            .load_messages(&ChatId::from("other"))
            .await
            .expect("load");
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn append_content_extends_the_row_and_bumps_activity() {
        let store = SqliteConversationStore::new_in_memory().expect("open");
        let chat_id = ChatId::from("c1");

        let message_id = store
            .append_message(&chat_id, Message::new(Role::Assistant, ""))
            .await
            .expect("pending record");

        store
            .append_content(&chat_id, message_id, "Hello")
            .await
            .expect("first flush");
        store
            .append_content(&chat_id, message_id, " world")
            .await
            .expect("second flush");

        let messages = store.load_messages(&chat_id).await.expect("load");
        assert_eq!(messages[0], Message::new(Role::Assistant, "Hello world"));

        assert!(store.chat_activity(&chat_id).expect("activity").is_some());
        assert!(store.chat_activity(&ChatId::from("none")).expect("activity").is_none());
    }

    #[tokio::test]
    async fn append_content_to_a_missing_row_fails() {
        let store = SqliteConversationStore::new_in_memory().expect("open");
        let chat_id = ChatId::from("c1");

        let err = store
            .append_content(&chat_id, MessageId::new(404), "text")
            .await
            .expect_err("missing row must fail");
        assert!(err.message.contains("not found"));
    }

    #[tokio::test]
    async fn message_ids_are_monotonic_per_store() {
        let store = SqliteConversationStore::new_in_memory().expect("open");
        let chat_id = ChatId::from("c1");

        let first = store
            .append_message(&chat_id, Message::new(Role::User, "a"))
            .await
            .expect("append");
        let second = store
            .append_message(&chat_id, Message::new(Role::User, "b"))
            .await
            .expect("append");
        assert!(second.value() > first.value());
    }
}
