//! Uniform streaming event contract and in-memory iterator utilities.
//!
//! ```rust
//! use qprovider::{BoxedEventIterator, StreamEvent, VecEventIterator};
//!
//! let events = VecEventIterator::new(vec![
//!     StreamEvent::TextDelta("hello".into()),
//!     StreamEvent::Done,
//! ]);
//! let _boxed: BoxedEventIterator = Box::new(events);
//! ```

use std::collections::VecDeque;

use crate::ProviderError;

/// The sole output contract of every provider adapter, vendor-independent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    TextDelta(String),
    Done,
    Error(ProviderError),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

/// Adapter stream contract.
///
/// Invariants for consumers:
/// - Events are emitted in source order and the sequence is not restartable.
/// - `TextDelta` may appear zero or more times.
/// - Exactly one `Done` or `Error` terminates the sequence; no event follows it.
/// - Pulling the next event may block on network I/O; consume through the
///   bridge when running inside an async context.
pub type BoxedEventIterator = Box<dyn Iterator<Item = StreamEvent> + Send>;

#[derive(Debug)]
pub struct VecEventIterator {
    events: VecDeque<StreamEvent>,
}

impl VecEventIterator {
    pub fn new(events: Vec<StreamEvent>) -> Self {
        Self {
            events: events.into(),
        }
    }
}

impl Iterator for VecEventIterator {
    type Item = StreamEvent;

    fn next(&mut self) -> Option<StreamEvent> {
        self.events.pop_front()
    }
}

/// A one-event sequence carrying a single terminal error.
pub fn error_events(error: ProviderError) -> BoxedEventIterator {
    Box::new(VecEventIterator::new(vec![StreamEvent::Error(error)]))
}
