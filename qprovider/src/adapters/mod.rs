mod anthropic;
mod gemini;
mod openai;

pub use anthropic::{ANTHROPIC_BASE_URL, AnthropicAdapter};
pub use gemini::{GEMINI_BASE_URL, GeminiAdapter};
pub use openai::{
    GROQ_BASE_URL, NEBIUS_BASE_URL, OPENAI_BASE_URL, OPENROUTER_BASE_URL, OpenAiCompatAdapter,
};

use crate::{BoxedPayloadIterator, ProviderError, StreamEvent};

/// What a vendor payload meant once interpreted.
pub(crate) enum PayloadOutcome {
    Delta(String),
    Skip,
    Finished,
}

/// Drives the shared payload-to-event state machine so each adapter only
/// supplies a payload interpreter. Guarantees exactly one terminal event:
/// `Done` on the vendor's own end-of-sequence signal or on transport
/// exhaustion, `Error` on the first failure, and nothing after either.
pub(crate) struct PayloadEventIterator<F> {
    payloads: BoxedPayloadIterator,
    interpret: F,
    finished: bool,
}

impl<F> PayloadEventIterator<F>
where
    F: FnMut(&str) -> Result<PayloadOutcome, ProviderError>,
{
    pub(crate) fn new(payloads: BoxedPayloadIterator, interpret: F) -> Self {
        Self {
            payloads,
            interpret,
            finished: false,
        }
    }
}

impl<F> Iterator for PayloadEventIterator<F>
where
    F: FnMut(&str) -> Result<PayloadOutcome, ProviderError>,
{
    type Item = StreamEvent;

    fn next(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }

        loop {
            match self.payloads.next() {
                Some(Ok(payload)) => match (self.interpret)(&payload) {
                    Ok(PayloadOutcome::Delta(text)) => {
                        return Some(StreamEvent::TextDelta(text));
                    }
                    Ok(PayloadOutcome::Skip) => continue,
                    Ok(PayloadOutcome::Finished) => {
                        self.finished = true;
                        return Some(StreamEvent::Done);
                    }
                    Err(error) => {
                        self.finished = true;
                        return Some(StreamEvent::Error(error));
                    }
                },
                Some(Err(error)) => {
                    self.finished = true;
                    return Some(StreamEvent::Error(error));
                }
                None => {
                    self.finished = true;
                    return Some(StreamEvent::Done);
                }
            }
        }
    }
}
