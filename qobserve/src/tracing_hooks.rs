//! Tracing-based observability hooks for streaming sessions.
//!
//! ```rust
//! use qchat::StreamSessionHooks;
//! use qobserve::TracingStreamHooks;
//!
//! fn accepts_session_hooks(_hooks: &dyn StreamSessionHooks) {}
//!
//! let hooks = TracingStreamHooks;
//! accepts_session_hooks(&hooks);
//! ```

use qchat::{ChatError, SessionOutcome, StreamSessionHooks};
use qcommon::ChatId;
use qprovider::{ProviderError, ProviderId};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStreamHooks;

impl StreamSessionHooks for TracingStreamHooks {
    fn on_session_start(&self, chat_id: &ChatId, provider: ProviderId, model: &str) {
        tracing::info!(
            phase = "session",
            event = "start",
            chat_id = %chat_id,
            provider = %provider,
            model
        );
    }

    fn on_flush(&self, chat_id: &ChatId, flushed_chars: usize) {
        tracing::debug!(
            phase = "session",
            event = "flush",
            chat_id = %chat_id,
            flushed_chars
        );
    }

    fn on_flush_error(&self, chat_id: &ChatId, error: &ChatError, will_retry: bool) {
        tracing::warn!(
            phase = "session",
            event = "flush_error",
            chat_id = %chat_id,
            will_retry,
            error_kind = ?error.kind,
            error = %error
        );
    }

    fn on_provider_error(&self, chat_id: &ChatId, error: &ProviderError) {
        tracing::error!(
            phase = "session",
            event = "provider_error",
            chat_id = %chat_id,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }

    fn on_session_end(&self, chat_id: &ChatId, outcome: SessionOutcome) {
        tracing::info!(
            phase = "session",
            event = "end",
            chat_id = %chat_id,
            outcome = ?outcome
        );
    }
}
