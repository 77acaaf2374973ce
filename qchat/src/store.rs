//! Conversation storage contract and a basic in-memory implementation.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use qcommon::{ChatId, MessageId};
use qprovider::Message;

use crate::ChatError;

pub type ChatFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Durable conversation storage. `append_content` is the flush primitive:
/// one short read-modify-write that appends text to an existing message row
/// and bumps the parent conversation's last-activity marker.
pub trait ConversationStore: Send + Sync {
    fn load_messages<'a>(
        &'a self,
        chat_id: &'a ChatId,
    ) -> ChatFuture<'a, Result<Vec<Message>, ChatError>>;

    fn append_message<'a>(
        &'a self,
        chat_id: &'a ChatId,
        message: Message,
    ) -> ChatFuture<'a, Result<MessageId, ChatError>>;

    fn append_content<'a>(
        &'a self,
        chat_id: &'a ChatId,
        message_id: MessageId,
        appended: &'a str,
    ) -> ChatFuture<'a, Result<(), ChatError>>;
}

#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    inner: Mutex<InMemoryState>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    next_id: i64,
    chats: HashMap<ChatId, Vec<(MessageId, Message)>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test convenience: the current content of a single message row.
    pub fn message_content(&self, message_id: MessageId) -> Option<String> {
        let state = self.inner.lock().ok()?;
        state
            .chats
            .values()
            .flatten()
            .find(|(id, _)| *id == message_id)
            .map(|(_, message)| message.content.clone())
    }

    /// Test convenience: how many message rows a conversation holds.
    pub fn message_count(&self, chat_id: &ChatId) -> usize {
        self.inner
            .lock()
            .map(|state| state.chats.get(chat_id).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }

    fn state(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, ChatError> {
        self.inner
            .lock()
            .map_err(|_| ChatError::store("conversation store lock poisoned"))
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn load_messages<'a>(
        &'a self,
        chat_id: &'a ChatId,
    ) -> ChatFuture<'a, Result<Vec<Message>, ChatError>> {
        Box::pin(async move {
            let state = self.state()?;
            Ok(state
                .chats
                .get(chat_id)
                .map(|rows| rows.iter().map(|(_, message)| message.clone()).collect())
                .unwrap_or_default())
        })
    }

    fn append_message<'a>(
        &'a self,
        chat_id: &'a ChatId,
        message: Message,
    ) -> ChatFuture<'a, Result<MessageId, ChatError>> {
        Box::pin(async move {
            let mut state = self.state()?;
            state.next_id += 1;
            let message_id = MessageId::new(state.next_id);
            state
                .chats
                .entry(chat_id.clone())
                .or_default()
                .push((message_id, message));
            Ok(message_id)
        })
    }

    fn append_content<'a>(
        &'a self,
        chat_id: &'a ChatId,
        message_id: MessageId,
        appended: &'a str,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut state = self.state()?;
            let rows = state
                .chats
                .get_mut(chat_id)
                .ok_or_else(|| ChatError::store(format!("chat '{chat_id}' not found")))?;
            let row = rows
                .iter_mut()
                .find(|(id, _)| *id == message_id)
                .ok_or_else(|| ChatError::store(format!("message {message_id} not found")))?;
            row.1.content.push_str(appended);
            Ok(())
        })
    }
}
