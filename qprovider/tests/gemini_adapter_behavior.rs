use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use qprovider::adapters::GeminiAdapter;
use qprovider::{
    Attachment, BoxedPayloadIterator, CredentialManager, Message, ModelCatalog, ProviderAdapter,
    ProviderError, ProviderId, ProviderRequest, Role, StreamEvent, StreamTransport, WireRequest,
};

type CannedResponse = Result<Vec<Result<String, ProviderError>>, ProviderError>;

#[derive(Default)]
struct FakeTransport {
    requests: Mutex<Vec<WireRequest>>,
    responses: Mutex<VecDeque<CannedResponse>>,
}

impl FakeTransport {
    fn new(responses: Vec<CannedResponse>) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            responses: Mutex::new(responses.into()),
        }
    }

    fn captured(&self) -> Vec<WireRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl StreamTransport for FakeTransport {
    fn open(&self, request: WireRequest) -> Result<BoxedPayloadIterator, ProviderError> {
        self.requests.lock().expect("requests lock").push(request);
        match self.responses.lock().expect("responses lock").pop_front() {
            Some(Ok(payloads)) => Ok(Box::new(payloads.into_iter())),
            Some(Err(error)) => Err(error),
            None => Ok(Box::new(Vec::new().into_iter())),
        }
    }
}

fn adapter(transport: Arc<FakeTransport>) -> GeminiAdapter {
    let credentials = Arc::new(CredentialManager::new());
    credentials
        .set_api_key(ProviderId::Gemini, "gm-test")
        .expect("key should set");
    GeminiAdapter::new(
        credentials,
        Arc::new(ModelCatalog::with_default_models()),
        transport,
    )
}

fn candidate_chunk(text: &str) -> Result<String, ProviderError> {
    Ok(format!(
        r#"{{"candidates":[{{"content":{{"parts":[{{"text":"{text}"}}],"role":"model"}}}}]}}"#
    ))
}

#[test]
fn stream_translates_generation_chunks_until_exhaustion() {
    let transport = Arc::new(FakeTransport::new(vec![Ok(vec![
        candidate_chunk("Hel"),
        candidate_chunk("lo"),
        Ok(r#"{"candidates":[{"finishReason":"STOP"}]}"#.to_string()),
    ])]));
    let adapter = adapter(transport.clone());

    let request = ProviderRequest::new(
        "models/gemini-2.5-flash",
        vec![
            Message::new(Role::System, "be brief"),
            Message::new(Role::User, "hi"),
            Message::new(Role::Assistant, "hello"),
            Message::new(Role::User, "continue"),
        ],
    );
    let events: Vec<StreamEvent> = adapter.stream(request).collect();

    // The vendor has no explicit done marker; exhaustion terminates cleanly.
    assert_eq!(
        events,
        vec![
            StreamEvent::TextDelta("Hel".into()),
            StreamEvent::TextDelta("lo".into()),
            StreamEvent::Done,
        ]
    );

    let wire = &transport.captured()[0];
    assert!(
        wire.url
            .ends_with("/models/gemini-2.5-flash:streamGenerateContent?alt=sse")
    );
    assert!(
        wire.headers
            .iter()
            .any(|(name, value)| name == "x-goog-api-key" && value == "gm-test")
    );

    let prompt = wire.body["contents"][0]["parts"][0]["text"]
        .as_str()
        .expect("flat prompt");
    assert_eq!(
        prompt,
        "System: be brief\nUser: hi\nAssistant: hello\nUser: continue\nAssistant:"
    );
    assert_eq!(wire.body["generationConfig"]["maxOutputTokens"], 2048);
    assert!(
        (wire.body["generationConfig"]["temperature"]
            .as_f64()
            .expect("temperature")
            - 0.7)
            .abs()
            < 1e-6
    );
}

#[test]
fn bare_model_names_gain_the_models_prefix() {
    let transport = Arc::new(FakeTransport::new(vec![Ok(Vec::new())]));
    let adapter = adapter(transport.clone());

    let request = ProviderRequest::new("gemini-2.5-flash", vec![Message::new(Role::User, "hi")]);
    let _: Vec<StreamEvent> = adapter.stream(request).collect();

    let wire = &transport.captured()[0];
    assert!(wire.url.contains("/models/gemini-2.5-flash:streamGenerateContent"));
}

#[test]
fn image_attachments_become_inline_data_parts() {
    let transport = Arc::new(FakeTransport::new(vec![Ok(Vec::new())]));
    let adapter = adapter(transport.clone());

    let request = ProviderRequest::new(
        "models/gemini-2.5-flash",
        vec![Message::new(Role::User, "what is this?")],
    )
    .with_attachments(vec![Attachment::new("image/jpeg", vec![7, 7, 7])]);
    let _: Vec<StreamEvent> = adapter.stream(request).collect();

    let wire = &transport.captured()[0];
    let parts = wire.body["contents"][0]["parts"].as_array().expect("parts");
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
    assert!(parts[1]["inline_data"]["data"].as_str().is_some());
}

#[test]
fn chunk_level_text_field_is_the_extraction_fallback() {
    let transport = Arc::new(FakeTransport::new(vec![Ok(vec![Ok(
        r#"{"text":"fallback"}"#.to_string(),
    )])]));
    let adapter = adapter(transport);

    let request = ProviderRequest::new(
        "models/gemini-2.5-flash",
        vec![Message::new(Role::User, "hi")],
    );
    let events: Vec<StreamEvent> = adapter.stream(request).collect();

    assert_eq!(
        events,
        vec![StreamEvent::TextDelta("fallback".into()), StreamEvent::Done]
    );
}

#[test]
fn error_payloads_terminate_the_stream() {
    let transport = Arc::new(FakeTransport::new(vec![Ok(vec![
        candidate_chunk("par"),
        Ok(r#"{"error":{"code":500,"message":"internal"}}"#.to_string()),
    ])]));
    let adapter = adapter(transport);

    let request = ProviderRequest::new(
        "models/gemini-2.5-flash",
        vec![Message::new(Role::User, "hi")],
    );
    let events: Vec<StreamEvent> = adapter.stream(request).collect();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], StreamEvent::TextDelta("par".into()));
    assert!(matches!(events[1], StreamEvent::Error(_)));
}
