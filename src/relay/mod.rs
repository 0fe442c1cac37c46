//! The chat-relay pipeline: normalize the client conversation, compose the
//! persona request, and hand it to a provider in streaming or buffered mode.
//!
//! Handlers own the transport (HTTP status, body framing); this module only
//! produces fragment streams and strings, which keeps it testable against
//! in-process provider stubs.

use crate::error::Result;
use crate::normalize;
use crate::persona::Persona;
use crate::provider::{ChatProvider, FragmentStream, ProviderRequest};
use futures::stream::AbortRegistration;
use serde_json::Value;

/// Attach the persona's system prompt and generation parameters to a
/// normalized conversation. Pure transform; nothing here is client-tunable.
pub fn compose(
    persona: Persona,
    model: &str,
    messages: Vec<crate::models::ConversationMessage>,
    cancel: Option<AbortRegistration>,
) -> ProviderRequest {
    ProviderRequest {
        model: model.to_string(),
        system_prompt: persona.system_prompt().to_string(),
        messages,
        temperature: persona.temperature(),
        max_tokens: persona.max_tokens(),
        cancel,
    }
}

/// Streaming variant: validation failures return before the provider is
/// ever contacted.
pub async fn stream_chat(
    provider: &dyn ChatProvider,
    persona: Persona,
    model: &str,
    body: &Value,
    cancel: Option<AbortRegistration>,
) -> Result<FragmentStream> {
    let messages = normalize::normalize(body)?;
    let request = compose(persona, model, messages, cancel);
    provider.stream(request).await
}

/// Buffered variant: one string, the concatenation of everything the
/// provider produced.
pub async fn complete_chat(
    provider: &dyn ChatProvider,
    persona: Persona,
    model: &str,
    body: &Value,
) -> Result<String> {
    let messages = normalize::normalize(body)?;
    let request = compose(persona, model, messages, None);
    provider.complete(request).await
}
