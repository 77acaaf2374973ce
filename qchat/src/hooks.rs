//! Observability hooks for the streaming session lifecycle.
//!
//! ```rust
//! use qchat::{NoopStreamSessionHooks, StreamSessionHooks};
//!
//! fn assert_hooks_trait(_hooks: &dyn StreamSessionHooks) {}
//!
//! let hooks = NoopStreamSessionHooks;
//! assert_hooks_trait(&hooks);
//! ```

use qcommon::ChatId;
use qprovider::{ProviderError, ProviderId};

use crate::{ChatError, SessionOutcome};

pub trait StreamSessionHooks: Send + Sync {
    fn on_session_start(&self, _chat_id: &ChatId, _provider: ProviderId, _model: &str) {}

    fn on_flush(&self, _chat_id: &ChatId, _flushed_chars: usize) {}

    /// `will_retry` is false only for the forced final flush, after which
    /// nothing retries the write.
    fn on_flush_error(&self, _chat_id: &ChatId, _error: &ChatError, _will_retry: bool) {}

    fn on_provider_error(&self, _chat_id: &ChatId, _error: &ProviderError) {}

    fn on_session_end(&self, _chat_id: &ChatId, _outcome: SessionOutcome) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStreamSessionHooks;

impl StreamSessionHooks for NoopStreamSessionHooks {}
