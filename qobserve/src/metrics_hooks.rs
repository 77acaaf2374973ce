//! Metrics-based observability hooks for streaming sessions.
//!
//! ```rust
//! use qchat::StreamSessionHooks;
//! use qobserve::MetricsStreamHooks;
//!
//! fn accepts_session_hooks(_hooks: &dyn StreamSessionHooks) {}
//!
//! let hooks = MetricsStreamHooks;
//! accepts_session_hooks(&hooks);
//! ```

use qchat::{ChatError, SessionOutcome, StreamSessionHooks};
use qcommon::ChatId;
use qprovider::{ProviderError, ProviderId};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsStreamHooks;

impl StreamSessionHooks for MetricsStreamHooks {
    fn on_session_start(&self, _chat_id: &ChatId, provider: ProviderId, model: &str) {
        metrics::counter!(
            "quill_sessions_started_total",
            "provider" => provider.to_string(),
            "model" => model.to_string()
        )
        .increment(1);
    }

    fn on_flush(&self, _chat_id: &ChatId, flushed_chars: usize) {
        metrics::counter!("quill_flushes_total").increment(1);
        metrics::histogram!("quill_flush_chars").record(flushed_chars as f64);
    }

    fn on_flush_error(&self, _chat_id: &ChatId, error: &ChatError, will_retry: bool) {
        metrics::counter!(
            "quill_flush_errors_total",
            "error_kind" => format!("{:?}", error.kind),
            "will_retry" => will_retry.to_string()
        )
        .increment(1);
    }

    fn on_provider_error(&self, _chat_id: &ChatId, error: &ProviderError) {
        metrics::counter!(
            "quill_provider_errors_total",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
    }

    fn on_session_end(&self, _chat_id: &ChatId, outcome: SessionOutcome) {
        metrics::counter!(
            "quill_sessions_ended_total",
            "outcome" => format!("{outcome:?}")
        )
        .increment(1);
    }
}
