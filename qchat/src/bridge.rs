//! Bridges a blocking adapter sequence into the async serving loop.
//!
//! Provider adapters block on vendor network I/O. A dedicated worker thread
//! pulls the blocking sequence and republishes each element into a bounded
//! channel; the serving loop awaits the channel cooperatively. Granularity is
//! one thread-hop per produced event. Only values cross the thread boundary —
//! never panics or results.

use std::sync::Arc;

use qprovider::{ProviderAdapter, ProviderRequest, StreamEvent};
use tokio::sync::mpsc::{Receiver, channel};

pub const DEFAULT_EVENT_CAPACITY: usize = 32;

/// Async consumer side of a bridged adapter stream. Yields `None` once the
/// worker finishes, which consumers treat as a clean end-of-sequence.
pub struct EventReceiver {
    receiver: Receiver<StreamEvent>,
}

impl EventReceiver {
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }
}

/// Starts the worker thread for one session. The worker runs the vendor call
/// to its own completion or timeout; dropping the receiver stops it at its
/// next send, which is the closest observable point to a client disconnect.
pub fn spawn_event_bridge(
    adapter: Arc<dyn ProviderAdapter>,
    request: ProviderRequest,
    capacity: usize,
) -> EventReceiver {
    let (sender, receiver) = channel(capacity.max(1));

    let builder = std::thread::Builder::new().name(format!("quill-stream-{}", adapter.id()));
    let _ = builder.spawn(move || {
        for event in adapter.stream(request) {
            let terminal = event.is_terminal();
            if sender.blocking_send(event).is_err() {
                break;
            }
            if terminal {
                break;
            }
        }
    });

    EventReceiver { receiver }
}
