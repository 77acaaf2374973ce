use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use qprovider::adapters::OpenAiCompatAdapter;
use qprovider::{
    Attachment, BoxedPayloadIterator, CredentialManager, Message, ModelCatalog, ModelSpec,
    ProviderAdapter, ProviderError, ProviderErrorKind, ProviderId, ProviderRequest, Role,
    StreamEvent, StreamTransport, WireRequest,
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

fn adapter_with(
    provider: ProviderId,
    catalog: ModelCatalog,
    transport: Arc<FakeTransport>,
) -> OpenAiCompatAdapter {
    let credentials = Arc::new(CredentialManager::new());
    credentials
        .set_api_key(provider, "sk-test-123")
        .expect("key should set");
    OpenAiCompatAdapter::new(provider, credentials, Arc::new(catalog), transport)
}

fn delta_chunk(text: &str) -> Result<String, ProviderError> {
    Ok(format!(
        r#"{{"choices":[{{"delta":{{"content":"{text}"}}}}]}}"#
    ))
}

#[test]
fn stream_translates_chat_completions_chunks() {
    let transport = Arc::new(FakeTransport::new(vec![Ok(vec![
        delta_chunk("Hel"),
        delta_chunk("lo"),
        Ok(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#.to_string()),
        Ok("[DONE]".to_string()),
    ])]));
    let adapter = adapter_with(
        ProviderId::OpenAi,
        ModelCatalog::with_default_models(),
        transport.clone(),
    );

    let request = ProviderRequest::new("gpt-5-mini", vec![Message::new(Role::User, "hi")]);
    let events: Vec<StreamEvent> = adapter.stream(request).collect();

    assert_eq!(
        events,
        vec![
            StreamEvent::TextDelta("Hel".into()),
            StreamEvent::TextDelta("lo".into()),
            StreamEvent::Done,
        ]
    );

    let captured = transport.captured();
    assert_eq!(captured.len(), 1);
    let wire = &captured[0];
    assert!(wire.url.ends_with("/chat/completions"));
    assert!(
        wire.headers
            .iter()
            .any(|(name, value)| name == "authorization" && value == "Bearer sk-test-123")
    );
    assert_eq!(wire.body["model"], "gpt-5-mini");
    assert_eq!(wire.body["stream"], true);
    assert_eq!(wire.body["max_completion_tokens"], 2048);
}

#[test]
fn unsupported_temperature_never_reaches_the_wire() {
    let transport = Arc::new(FakeTransport::new(vec![Ok(vec![Ok(
        "[DONE]".to_string()
    )])]));
    let adapter = adapter_with(
        ProviderId::OpenAi,
        ModelCatalog::with_default_models(),
        transport.clone(),
    );

    let request = ProviderRequest::new("gpt-5", vec![Message::new(Role::User, "hi")])
        .with_temperature(0.9);
    let _: Vec<StreamEvent> = adapter.stream(request).collect();

    let wire = &transport.captured()[0];
    assert!(wire.body.get("temperature").is_none());
}

#[test]
fn model_temperature_override_wins_over_caller_value() {
    let mut catalog = ModelCatalog::new();
    catalog.register(ModelSpec::new("openrouter:mistralai/mistral-large-2512")
        .with_temperature_override(0.6));

    let transport = Arc::new(FakeTransport::new(vec![Ok(vec![Ok(
        "[DONE]".to_string()
    )])]));
    let adapter = adapter_with(ProviderId::OpenRouter, catalog, transport.clone());

    let request = ProviderRequest::new(
        "mistralai/mistral-large-2512",
        vec![Message::new(Role::User, "hi")],
    )
    .with_temperature(1.4);
    let _: Vec<StreamEvent> = adapter.stream(request).collect();

    let wire = &transport.captured()[0];
    assert!((wire.body["temperature"].as_f64().expect("temperature") - 0.6).abs() < 1e-6);
}

#[test]
fn rejected_size_param_retries_once_with_alternate_name() {
    let transport = Arc::new(FakeTransport::new(vec![
        Err(ProviderError::invalid_request(
            "Unsupported parameter: 'max_completion_tokens' is not supported with this model.",
        )),
        Ok(vec![delta_chunk("ok"), Ok("[DONE]".to_string())]),
    ]));
    let adapter = adapter_with(
        ProviderId::Groq,
        ModelCatalog::with_default_models(),
        transport.clone(),
    );

    let request = ProviderRequest::new(
        "llama-3.1-8b-instant",
        vec![Message::new(Role::User, "hi")],
    );
    let events: Vec<StreamEvent> = adapter.stream(request).collect();

    assert_eq!(
        events,
        vec![StreamEvent::TextDelta("ok".into()), StreamEvent::Done]
    );

    let captured = transport.captured();
    assert_eq!(captured.len(), 2);
    assert!(captured[0].body.get("max_completion_tokens").is_some());
    assert!(captured[1].body.get("max_completion_tokens").is_none());
    assert_eq!(captured[1].body["max_tokens"], 2048);
}

#[test]
fn second_rejection_becomes_a_single_error_event() {
    let transport = Arc::new(FakeTransport::new(vec![
        Err(ProviderError::invalid_request(
            "Unsupported parameter: 'max_completion_tokens'",
        )),
        Err(ProviderError::invalid_request("max_tokens is too large")),
    ]));
    let adapter = adapter_with(
        ProviderId::OpenAi,
        ModelCatalog::with_default_models(),
        transport.clone(),
    );

    let request = ProviderRequest::new("gpt-5", vec![Message::new(Role::User, "hi")]);
    let events: Vec<StreamEvent> = adapter.stream(request).collect();

    assert_eq!(events.len(), 1);
    let StreamEvent::Error(error) = &events[0] else {
        panic!("expected a terminal error");
    };
    assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
    // Exactly two opens: the primary attempt and the one retry.
    assert_eq!(transport.captured().len(), 2);
}

#[test]
fn unrelated_rejection_is_not_retried() {
    let transport = Arc::new(FakeTransport::new(vec![Err(
        ProviderError::invalid_request("model is not available"),
    )]));
    let adapter = adapter_with(
        ProviderId::OpenAi,
        ModelCatalog::with_default_models(),
        transport.clone(),
    );

    let request = ProviderRequest::new("gpt-5", vec![Message::new(Role::User, "hi")]);
    let events: Vec<StreamEvent> = adapter.stream(request).collect();

    assert!(matches!(events.as_slice(), [StreamEvent::Error(_)]));
    assert_eq!(transport.captured().len(), 1);
}

#[test]
fn missing_credentials_fail_before_any_vendor_call() {
    let transport = Arc::new(FakeTransport::default());
    let adapter = OpenAiCompatAdapter::new(
        ProviderId::OpenAi,
        Arc::new(CredentialManager::new()),
        Arc::new(ModelCatalog::with_default_models()),
        transport.clone(),
    );

    let request = ProviderRequest::new("gpt-5", vec![Message::new(Role::User, "hi")]);
    let events: Vec<StreamEvent> = adapter.stream(request).collect();

    assert_eq!(events.len(), 1);
    let StreamEvent::Error(error) = &events[0] else {
        panic!("expected a terminal error");
    };
    assert_eq!(error.kind, ProviderErrorKind::Authentication);
    assert_eq!(error.message, "Missing OPENAI_API_KEY");
    assert!(transport.captured().is_empty());
}

#[test]
fn mid_stream_failure_emits_error_and_stops() {
    let transport = Arc::new(FakeTransport::new(vec![Ok(vec![
        delta_chunk("partial"),
        Err(ProviderError::transport("connection reset")),
    ])]));
    let adapter = adapter_with(
        ProviderId::OpenAi,
        ModelCatalog::with_default_models(),
        transport,
    );

    let request = ProviderRequest::new("gpt-5", vec![Message::new(Role::User, "hi")]);
    let events: Vec<StreamEvent> = adapter.stream(request).collect();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], StreamEvent::TextDelta("partial".into()));
    assert!(matches!(events[1], StreamEvent::Error(_)));
}

#[test]
fn image_attachments_become_data_url_parts() {
    let transport = Arc::new(FakeTransport::new(vec![Ok(vec![Ok(
        "[DONE]".to_string()
    )])]));
    let adapter = adapter_with(
        ProviderId::OpenAi,
        ModelCatalog::with_default_models(),
        transport.clone(),
    )
    .with_extra_header("HTTP-Referer", "https://quill.test");

    let request = ProviderRequest::new("gpt-5-mini", vec![Message::new(Role::User, "see")])
        .with_attachments(vec![Attachment::new("image/png", vec![1, 2, 3])]);
    let _: Vec<StreamEvent> = adapter.stream(request).collect();

    let wire = &transport.captured()[0];
    assert!(
        wire.headers
            .iter()
            .any(|(name, value)| name == "HTTP-Referer" && value == "https://quill.test")
    );

    let content = &wire.body["messages"][0]["content"];
    assert_eq!(content[0]["type"], "text");
    assert_eq!(content[1]["type"], "image_url");
    let url = content[1]["image_url"]["url"].as_str().expect("data url");
    assert!(url.starts_with("data:image/png;base64,"));
}

#[test]
fn unsupported_attachment_is_rejected_before_the_vendor_call() {
    let transport = Arc::new(FakeTransport::default());
    let adapter = adapter_with(
        ProviderId::OpenAi,
        ModelCatalog::with_default_models(),
        transport.clone(),
    );

    let request = ProviderRequest::new("gpt-5-mini", vec![Message::new(Role::User, "see")])
        .with_attachments(vec![Attachment::new("application/zip", vec![1])]);
    let events: Vec<StreamEvent> = adapter.stream(request).collect();

    assert_eq!(events.len(), 1);
    let StreamEvent::Error(error) = &events[0] else {
        panic!("expected a terminal error");
    };
    assert_eq!(error.kind, ProviderErrorKind::UnsupportedCapability);
    assert!(transport.captured().is_empty());
}
