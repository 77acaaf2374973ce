//! Postgres-backed conversation store.

use std::time::{SystemTime, UNIX_EPOCH};

use qchat::{ChatError, ChatFuture, ConversationStore};
use qcommon::{ChatId, MessageId};
use qprovider::{Message, Role};
use tokio_postgres::NoTls;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresStoreConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl PostgresStoreConfig {
    pub fn validate(&self) -> Result<(), ChatError> {
        if self.host.trim().is_empty() {
            return Err(ChatError::invalid_request("postgres host cannot be empty"));
        }
        if self.database.trim().is_empty() {
            return Err(ChatError::invalid_request(
                "postgres database cannot be empty",
            ));
        }
        if self.username.trim().is_empty() {
            return Err(ChatError::invalid_request(
                "postgres username cannot be empty",
            ));
        }
        Ok(())
    }
}

/// Holds one connected client. Each flush is its own short transaction, so
/// sessions never hold locks across suspension points.
pub struct PostgresConversationStore {
    client: tokio::sync::Mutex<tokio_postgres::Client>,
}

impl PostgresConversationStore {
    pub async fn connect(config: PostgresStoreConfig) -> Result<Self, ChatError> {
        config.validate()?;

        let mut pg_config = tokio_postgres::Config::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.dbname(&config.database);
        pg_config.user(&config.username);
        pg_config.password(&config.password);

        let (client, connection) = pg_config.connect(NoTls).await.map_err(|error| {
            ChatError::store(format!("failed to connect to postgres: {error}"))
        })?;

        tokio::spawn(async move {
            if let Err(error) = connection.await {
                eprintln!("qmemory postgres connection error: {error}");
            }
        });

        client
            .batch_execute(
                "
                CREATE TABLE IF NOT EXISTS chats (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL DEFAULT 'New Chat',
                    created_at_secs BIGINT NOT NULL,
                    updated_at_secs BIGINT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS messages (
                    id BIGSERIAL PRIMARY KEY,
                    chat_id TEXT NOT NULL,
                    role TEXT NOT NULL,
                    content TEXT NOT NULL DEFAULT '',
                    created_at_secs BIGINT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_messages_chat_id
                ON messages(chat_id, id);
                ",
            )
            .await
            .map_err(|error| {
                ChatError::store(format!("failed to initialize postgres schema: {error}"))
            })?;

        Ok(Self {
            client: tokio::sync::Mutex::new(client),
        })
    }
}

impl ConversationStore for PostgresConversationStore {
    fn load_messages<'a>(
        &'a self,
        chat_id: &'a ChatId,
    ) -> ChatFuture<'a, Result<Vec<Message>, ChatError>> {
        Box::pin(async move {
            let client = self.client.lock().await;
            let rows = client
                .query(
                    "
                    SELECT role, content
                    FROM messages
                    WHERE chat_id = $1
                    ORDER BY id ASC
                    ",
                    &[&chat_id.as_str()],
                )
                .await
                .map_err(|error| {
                    ChatError::store(format!("failed to query transcript rows: {error}"))
                })?;

            let mut messages = Vec::new();
            for row in rows {
                let role: String = row.get(0);
                let content: String = row.get(1);
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
            let mut client = self.client.lock().await;
            let now = now_secs()?;
            let tx = client.transaction().await.map_err(|error| {
                ChatError::store(format!("failed to begin append transaction: {error}"))
            })?;

            tx.execute(
                "
                INSERT INTO chats (id, created_at_secs, updated_at_secs)
                VALUES ($1, $2, $2)
                ON CONFLICT (id) DO NOTHING
                ",
                &[&chat_id.as_str(), &now],
            )
            .await
            .map_err(|error| ChatError::store(format!("failed to upsert chat row: {error}")))?;

            let row = tx
                .query_one(
                    "
                    INSERT INTO messages (chat_id, role, content, created_at_secs)
                    VALUES ($1, $2, $3, $4)
                    RETURNING id
                    ",
                    &[
                        &chat_id.as_str(),
                        &role_to_str(message.role),
                        &message.content,
                        &now,
                    ],
                )
                .await
                .map_err(|error| ChatError::store(format!("failed to append message: {error}")))?;

            tx.execute(
                "UPDATE chats SET updated_at_secs = $1 WHERE id = $2",
                &[&now, &chat_id.as_str()],
            )
            .await
            .map_err(|error| {
                ChatError::store(format!("failed to bump chat activity: {error}"))
            })?;

            tx.commit().await.map_err(|error| {
                ChatError::store(format!("failed to commit append transaction: {error}"))
            })?;

            Ok(MessageId::new(row.get::<_, i64>(0)))
        })
    }

    fn append_content<'a>(
        &'a self,
        chat_id: &'a ChatId,
        message_id: MessageId,
        appended: &'a str,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut client = self.client.lock().await;
            let now = now_secs()?;
            let tx = client.transaction().await.map_err(|error| {
                ChatError::store(format!("failed to begin flush transaction: {error}"))
            })?;

            let updated = tx
                .execute(
                    "
                    UPDATE messages
                    SET content = content || $1
                    WHERE id = $2 AND chat_id = $3
                    ",
                    &[&appended, &message_id.value(), &chat_id.as_str()],
                )
                .await
                .map_err(|error| {
                    ChatError::store(format!("failed to append message content: {error}"))
                })?;

            if updated == 0 {
                return Err(ChatError::store(format!(
                    "message {message_id} not found in chat '{chat_id}'"
                )));
            }

            tx.execute(
                "UPDATE chats SET updated_at_secs = $1 WHERE id = $2",
                &[&now, &chat_id.as_str()],
            )
            .await
            .map_err(|error| {
                ChatError::store(format!("failed to bump chat activity: {error}"))
            })?;

            tx.commit().await.map_err(|error| {
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
