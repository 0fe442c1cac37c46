pub mod cohere;
pub mod openai;

use crate::error::Result;
use crate::models::ConversationMessage;
use async_trait::async_trait;
use futures::stream::{AbortRegistration, Abortable};
use futures::{Stream, StreamExt};
use std::pin::Pin;

/// Lazy, single-pass sequence of text fragments from one generation.
/// Dropping it tears down the upstream connection.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Everything one upstream call needs. Built per request from the persona
/// and the normalized conversation; never persisted.
pub struct ProviderRequest {
    pub model: String,
    pub system_prompt: String,
    pub messages: Vec<ConversationMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Cooperative cancellation, tied to the client's own disconnect. When
    /// it fires, the stream ends and no further fragments are emitted.
    pub cancel: Option<AbortRegistration>,
}

impl ProviderRequest {
    /// Split off the cancellation signal so the request itself can be
    /// serialized into an upstream body.
    pub fn take_cancel(&mut self) -> Option<AbortRegistration> {
        self.cancel.take()
    }
}

/// Uniform surface over the hosted LLM backends. Generation either streams
/// fragment by fragment or buffers into one string; a backend without a
/// native streaming API still satisfies `stream` by yielding its buffered
/// reply as a single fragment.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn stream(&self, request: ProviderRequest) -> Result<FragmentStream>;

    /// Buffered mode: the concatenation of whatever the backend produced,
    /// regardless of whether it streamed internally. Single attempt, no
    /// retries.
    async fn complete(&self, request: ProviderRequest) -> Result<String> {
        let mut stream = self.stream(request).await?;
        let mut full = String::new();
        while let Some(fragment) = stream.next().await {
            full.push_str(&fragment?);
        }
        Ok(full)
    }
}

/// Attach the request's cancellation signal to a fragment stream. An aborted
/// stream simply ends; the drop of the inner stream closes the connection.
pub fn with_cancellation(
    stream: impl Stream<Item = Result<String>> + Send + 'static,
    cancel: Option<AbortRegistration>,
) -> FragmentStream {
    match cancel {
        Some(registration) => Box::pin(Abortable::new(stream, registration)),
        None => Box::pin(stream),
    }
}
