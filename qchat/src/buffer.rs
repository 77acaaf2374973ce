//! Debounced persistence of partial assistant output.

use std::sync::Arc;
use std::time::{Duration, Instant};

use qcommon::{ChatId, MessageId};

use crate::{ChatError, ConversationStore};

/// A flush fires only when both thresholds are met; terminal events and
/// session aborts flush unconditionally through `finish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    pub min_chars: usize,
    pub min_interval: Duration,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self {
            min_chars: 40,
            min_interval: Duration::from_millis(250),
        }
    }
}

impl FlushPolicy {
    pub fn new(min_chars: usize, min_interval: Duration) -> Self {
        Self {
            min_chars,
            min_interval,
        }
    }
}

/// Accumulates deltas for one pending assistant record and writes them out
/// in order. The buffer is the record's only writer for the session. Text is
/// cleared only after a write is acknowledged; a failed write keeps the text
/// for the next trigger, including the forced final flush.
pub struct PersistenceBuffer {
    store: Arc<dyn ConversationStore>,
    chat_id: ChatId,
    message_id: MessageId,
    policy: FlushPolicy,
    pending: String,
    last_flush: Instant,
}

impl PersistenceBuffer {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        chat_id: ChatId,
        message_id: MessageId,
        policy: FlushPolicy,
    ) -> Self {
        Self {
            store,
            chat_id,
            message_id,
            policy,
            pending: String::new(),
            last_flush: Instant::now(),
        }
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Appends a delta and flushes if both thresholds are met. Returns the
    /// number of characters written when a flush happened.
    pub async fn push(&mut self, delta: &str) -> Result<Option<usize>, ChatError> {
        self.pending.push_str(delta);

        if !self.should_flush() {
            return Ok(None);
        }

        self.flush().await.map(Some)
    }

    /// Unconditional forced flush for Done, Error, and session abort.
    pub async fn finish(&mut self) -> Result<usize, ChatError> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        self.flush().await
    }

    fn should_flush(&self) -> bool {
        self.pending.chars().count() >= self.policy.min_chars
            && self.last_flush.elapsed() >= self.policy.min_interval
    }

    async fn flush(&mut self) -> Result<usize, ChatError> {
        self.store
            .append_content(&self.chat_id, self.message_id, &self.pending)
            .await?;

        let flushed = self.pending.chars().count();
        self.pending.clear();
        self.last_flush = Instant::now();
        Ok(flushed)
    }
}
