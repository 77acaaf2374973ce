//! Streaming turn orchestration: Validate, LoadHistory, BuildRequest,
//! Stream, Finalize.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use qcommon::ChatId;
use qprovider::{
    AdapterRegistry, CredentialManager, ImageMime, Message, ModelCatalog, ProviderAdapter,
    ProviderError, ProviderModel, ProviderRequest, Role, StreamEvent,
};
use tokio::sync::mpsc::{Receiver, Sender, channel};

use crate::bridge::{DEFAULT_EVENT_CAPACITY, EventReceiver, spawn_event_bridge};
use crate::buffer::{FlushPolicy, PersistenceBuffer};
use crate::{
    ChatError, ConversationStore, NoopStreamSessionHooks, SessionOutcome, StreamSessionHooks,
    TurnRequest, encoder,
};

const DEFAULT_FRAME_CAPACITY: usize = 32;

/// Drives one chat turn end to end. Pre-flight failures become an immediate
/// Error+Done frame pair with no persistence side effect; once the user
/// message is persisted, every path reaches Finalize and its forced flush.
#[derive(Clone)]
pub struct ChatService {
    registry: Arc<AdapterRegistry>,
    store: Arc<dyn ConversationStore>,
    catalog: Arc<ModelCatalog>,
    credentials: Arc<CredentialManager>,
    hooks: Arc<dyn StreamSessionHooks>,
    flush_policy: FlushPolicy,
}

impl ChatService {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        store: Arc<dyn ConversationStore>,
        catalog: Arc<ModelCatalog>,
        credentials: Arc<CredentialManager>,
    ) -> Self {
        Self {
            registry,
            store,
            catalog,
            credentials,
            hooks: Arc::new(NoopStreamSessionHooks),
            flush_policy: FlushPolicy::default(),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn StreamSessionHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.flush_policy = policy;
        self
    }

    /// Never fails at the call site: any failure is rendered into the frame
    /// stream itself so the client always receives Error then Done.
    pub async fn stream_turn(&self, request: TurnRequest) -> FrameStream {
        match self.begin_session(request).await {
            Ok(stream) => stream,
            Err(error) => FrameStream::buffered(vec![
                encoder::error_frame(&error.to_string()),
                encoder::done_frame(),
            ]),
        }
    }

    async fn begin_session(&self, request: TurnRequest) -> Result<FrameStream, ChatError> {
        let prepared = self.prepare_turn(&request)?;

        // Durable storage is the sole source of truth for context; only the
        // caller's newest user message joins it.
        let prior = self.store.load_messages(&request.chat_id).await?;
        let user_message = Message::new(Role::User, request.user_text.clone());
        self.store
            .append_message(&request.chat_id, user_message.clone())
            .await?;
        let pending_id = self
            .store
            .append_message(&request.chat_id, Message::new(Role::Assistant, ""))
            .await?;

        let mut messages = prior;
        messages.push(user_message);

        let mut provider_request =
            ProviderRequest::new(prepared.model.model_name.clone(), messages)
                .with_attachments(request.attachments);
        provider_request.temperature = request.temperature;

        self.hooks.on_session_start(
            &request.chat_id,
            prepared.model.provider,
            &prepared.model.model_name,
        );

        let events = spawn_event_bridge(prepared.adapter, provider_request, DEFAULT_EVENT_CAPACITY);
        let (frame_tx, frame_rx) = channel(DEFAULT_FRAME_CAPACITY);

        let driver = SessionDriver {
            chat_id: request.chat_id.clone(),
            events,
            frame_tx,
            buffer: PersistenceBuffer::new(
                self.store.clone(),
                request.chat_id,
                pending_id,
                self.flush_policy,
            ),
            hooks: self.hooks.clone(),
        };
        tokio::spawn(driver.run());

        Ok(FrameStream::live(frame_rx))
    }

    fn prepare_turn(&self, request: &TurnRequest) -> Result<PreparedTurn, ChatError> {
        let model = ProviderModel::parse(&request.model).map_err(ChatError::from)?;

        if !self.catalog.is_allowed(&model.qualified()) {
            return Err(ChatError::invalid_request(format!(
                "Unsupported model: {}",
                request.model
            )));
        }

        if request.user_text.trim().is_empty() && request.attachments.is_empty() {
            return Err(ChatError::invalid_request(
                "user message must not be empty",
            ));
        }

        if let Some(temperature) = request.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(ChatError::invalid_request(
                "temperature must be in the inclusive range 0.0..=2.0",
            ));
        }

        self.check_attachments(request, &model)?;

        let adapter = self.registry.get(model.provider).ok_or_else(|| {
            ChatError::invalid_request(format!(
                "no adapter registered for provider '{}'",
                model.provider
            ))
        })?;

        self.credentials
            .require_api_key(model.provider)
            .map_err(ChatError::from)?;

        Ok(PreparedTurn { model, adapter })
    }

    fn check_attachments(
        &self,
        request: &TurnRequest,
        model: &ProviderModel,
    ) -> Result<(), ChatError> {
        let mut has_image = false;

        for attachment in &request.attachments {
            if ImageMime::from_mime(&attachment.mime).is_some() {
                has_image = true;
            } else if !attachment.mime.trim().to_lowercase().starts_with("text/") {
                return Err(ChatError::from(ProviderError::unsupported_capability(
                    format!("unsupported attachment type '{}'", attachment.mime),
                )));
            }
        }

        if has_image && !self.catalog.supports_vision(&model.qualified()) {
            return Err(ChatError::from(ProviderError::unsupported_capability(
                format!("model '{}' does not accept image attachments", request.model),
            )));
        }

        Ok(())
    }
}

struct PreparedTurn {
    model: ProviderModel,
    adapter: Arc<dyn ProviderAdapter>,
}

/// One task per session: events reach the buffer and the outbound stream in
/// strict emission order, and flushes never overlap.
struct SessionDriver {
    chat_id: ChatId,
    events: EventReceiver,
    frame_tx: Sender<String>,
    buffer: PersistenceBuffer,
    hooks: Arc<dyn StreamSessionHooks>,
}

impl SessionDriver {
    async fn run(mut self) {
        let mut outcome = SessionOutcome::Completed;

        while let Some(event) = self.events.next_event().await {
            match event {
                StreamEvent::TextDelta(text) => {
                    match self.buffer.push(&text).await {
                        Ok(Some(flushed)) => self.hooks.on_flush(&self.chat_id, flushed),
                        Ok(None) => {}
                        Err(error) => self.hooks.on_flush_error(&self.chat_id, &error, true),
                    }

                    if self.frame_tx.send(encoder::delta_frame(&text)).await.is_err() {
                        // Client disconnect, observed at this suspension
                        // point. Fall through to the forced flush.
                        outcome = SessionOutcome::Disconnected;
                        break;
                    }
                }
                StreamEvent::Error(error) => {
                    self.hooks.on_provider_error(&self.chat_id, &error);
                    let _ = self
                        .frame_tx
                        .send(encoder::error_frame(&error.to_string()))
                        .await;
                    outcome = SessionOutcome::Failed;
                    break;
                }
                StreamEvent::Done => break,
            }
        }

        // Finalize: the forced flush runs on every path. A failure here is
        // the documented eventual-consistency gap; it reaches hooks only.
        match self.buffer.finish().await {
            Ok(flushed) if flushed > 0 => self.hooks.on_flush(&self.chat_id, flushed),
            Ok(_) => {}
            Err(error) => self.hooks.on_flush_error(&self.chat_id, &error, false),
        }

        if outcome != SessionOutcome::Disconnected {
            // Synthesized even when the adapter's own stream ended without
            // a terminal event: the final frame is always Done.
            let _ = self.frame_tx.send(encoder::done_frame()).await;
        }

        self.hooks.on_session_end(&self.chat_id, outcome);
    }
}

/// Outbound SSE frame sequence for one session.
pub struct FrameStream {
    inner: FrameStreamInner,
}

enum FrameStreamInner {
    Buffered(VecDeque<String>),
    Live(Receiver<String>),
}

impl FrameStream {
    pub(crate) fn buffered(frames: Vec<String>) -> Self {
        Self {
            inner: FrameStreamInner::Buffered(frames.into()),
        }
    }

    pub(crate) fn live(receiver: Receiver<String>) -> Self {
        Self {
            inner: FrameStreamInner::Live(receiver),
        }
    }

    pub async fn next_frame(&mut self) -> Option<String> {
        match &mut self.inner {
            FrameStreamInner::Buffered(frames) => frames.pop_front(),
            FrameStreamInner::Live(receiver) => receiver.recv().await,
        }
    }
}

impl Stream for FrameStream {
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        match &mut self.get_mut().inner {
            FrameStreamInner::Buffered(frames) => Poll::Ready(frames.pop_front()),
            FrameStreamInner::Live(receiver) => receiver.poll_recv(cx),
        }
    }
}
