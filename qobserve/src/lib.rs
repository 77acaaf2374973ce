//! Production-friendly observability hooks for streaming sessions.
//!
//! ```rust
//! use qobserve::{MetricsStreamHooks, TracingStreamHooks};
//!
//! let _tracing = TracingStreamHooks;
//! let _metrics = MetricsStreamHooks;
//! ```

mod metrics_hooks;
mod tracing_hooks;

pub use metrics_hooks::MetricsStreamHooks;
pub use tracing_hooks::TracingStreamHooks;

pub mod prelude {
    pub use crate::{MetricsStreamHooks, TracingStreamHooks};
}
