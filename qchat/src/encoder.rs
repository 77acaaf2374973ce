//! Maps uniform events to wire frames.
//!
//! The wire protocol is a text event stream of `data: <json>\n\n` frames:
//! any number of `{"t": ...}` content frames, at most one
//! `{"error": ..., "error_short": ...}` frame, and exactly one final
//! `{"done": true}` frame.
//!
//! ```rust
//! use qchat::encoder;
//!
//! assert_eq!(encoder::delta_frame("hi"), "data: {\"t\":\"hi\"}\n\n");
//! assert_eq!(encoder::done_frame(), "data: {\"done\":true}\n\n");
//! ```

use serde_json::{Value, json};

pub const SHORT_MESSAGE_LIMIT: usize = 140;

pub fn delta_frame(text: &str) -> String {
    frame(&json!({"t": text}))
}

pub fn error_frame(message: &str) -> String {
    frame(&json!({"error": message, "error_short": short_message(message)}))
}

pub fn done_frame() -> String {
    frame(&json!({"done": true}))
}

fn frame(payload: &Value) -> String {
    format!("data: {payload}\n\n")
}

/// A client-presentable variant of a failure message: known vendor failure
/// markers are rewritten to guidance text, everything else is capped at
/// [`SHORT_MESSAGE_LIMIT`] characters.
pub fn short_message(message: &str) -> String {
    let lowered = message.to_lowercase();

    if lowered.contains("rate limit")
        || lowered.contains("rate_limit")
        || lowered.contains("too many requests")
        || lowered.contains("429")
    {
        return "The model is handling too many requests right now. Please try again in a moment."
            .to_string();
    }

    if lowered.contains("overloaded") {
        return "The model is temporarily overloaded. Please try again shortly.".to_string();
    }

    truncate(message, SHORT_MESSAGE_LIMIT)
}

fn truncate(input: &str, max: usize) -> String {
    if input.chars().count() <= max {
        return input.to_string();
    }

    let mut output: String = input.chars().take(max.saturating_sub(3)).collect();
    output.push_str("...");
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_frame_carries_text_under_the_fixed_key() {
        assert_eq!(delta_frame("Hel"), "data: {\"t\":\"Hel\"}\n\n");
        // JSON escaping is preserved for control characters.
        assert_eq!(delta_frame("a\nb"), "data: {\"t\":\"a\\nb\"}\n\n");
    }

    #[test]
    fn done_frame_is_the_fixed_sentinel() {
        assert_eq!(done_frame(), "data: {\"done\":true}\n\n");
    }

    #[test]
    fn error_frame_carries_full_and_short_variants() {
        let frame = error_frame("Transport: connection reset");
        let payload: serde_json::Value =
            serde_json::from_str(frame.trim_start_matches("data: ").trim()).expect("json");

        assert_eq!(payload["error"], "Transport: connection reset");
        assert_eq!(payload["error_short"], "Transport: connection reset");
    }

    #[test]
    fn rate_limit_markers_are_rewritten_to_guidance() {
        for message in [
            "RateLimited: rate limit exceeded",
            "Transport: http 429 from upstream",
            "Too Many Requests",
        ] {
            let short = short_message(message);
            assert!(short.starts_with("The model is handling too many requests"));
            assert!(short.chars().count() <= SHORT_MESSAGE_LIMIT);
        }
    }

    #[test]
    fn long_messages_are_capped_for_the_short_variant() {
        let long = "x".repeat(400);
        let short = short_message(&long);
        assert_eq!(short.chars().count(), SHORT_MESSAGE_LIMIT);
        assert!(short.ends_with("..."));
    }
}
