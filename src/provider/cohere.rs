//! Alternate backend: Cohere's conversational chat API.
//!
//! This deployment uses it without a streaming interface, so `complete` is
//! the native call and `stream` yields the buffered reply as one fragment.

use super::{with_cancellation, ChatProvider, FragmentStream, ProviderRequest};
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::models::Role;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error};

pub struct CohereProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct ChatReply {
    text: Option<String>,
}

impl CohereProvider {
    pub fn new(
        config: &ProviderConfig,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        })
    }

    fn history_role(role: Role) -> &'static str {
        match role {
            Role::Assistant => "CHATBOT",
            // System turns never survive normalization; map defensively to
            // the user side rather than invent a persona turn.
            Role::User | Role::System => "USER",
        }
    }
}

#[async_trait]
impl ChatProvider for CohereProvider {
    fn name(&self) -> &'static str {
        "cohere"
    }

    async fn stream(&self, mut request: ProviderRequest) -> Result<FragmentStream> {
        let cancel = request.take_cancel();
        let full = self.complete(request).await?;
        Ok(with_cancellation(futures::stream::iter([Ok(full)]), cancel))
    }

    async fn complete(&self, request: ProviderRequest) -> Result<String> {
        // Cohere separates the current turn from the history: the final
        // message travels as `message`, everything before it as
        // `chat_history`, and the persona prompt as `preamble`.
        let (current, history) = request
            .messages
            .split_last()
            .ok_or_else(|| Error::Provider("no messages to forward".to_string()))?;

        let chat_history: Vec<_> = history
            .iter()
            .map(|m| {
                json!({
                    "role": Self::history_role(m.role),
                    "message": m.content,
                })
            })
            .collect();

        let body = json!({
            "model": request.model,
            "message": current.content,
            "chat_history": chat_history,
            "preamble": request.system_prompt,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let url = format!("{}/chat", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("cohere: connection failed: {}", e);
                Error::Provider(format!("upstream call failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("cohere: upstream error (status {}): {}", status, body);
            return Err(Error::Provider(format!(
                "upstream returned status {}",
                status
            )));
        }

        debug!("cohere: reply received (status {})", status);
        let reply: ChatReply = response
            .json()
            .await
            .map_err(|_| Error::Provider("malformed upstream response".to_string()))?;

        reply
            .text
            .ok_or_else(|| Error::Provider("upstream response missing text".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConversationMessage;
    use futures::StreamExt;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> CohereProvider {
        CohereProvider::new(
            &ProviderConfig {
                api_key: "test-key".to_string(),
                base_url: server.uri(),
                model: "command-test".to_string(),
            },
            Duration::from_secs(5),
            Duration::from_secs(10),
        )
        .unwrap()
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "command-test".to_string(),
            system_prompt: "be kind".to_string(),
            messages: vec![
                ConversationMessage::user("hello"),
                ConversationMessage::assistant("hi, how are you feeling?"),
                ConversationMessage::user("I feel anxious"),
            ],
            temperature: 0.7,
            max_tokens: 500,
            cancel: None,
        }
    }

    #[tokio::test]
    async fn complete_splits_history_from_current_turn() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_partial_json(serde_json::json!({
                "message": "I feel anxious",
                "chat_history": [
                    { "role": "USER", "message": "hello" },
                    { "role": "CHATBOT", "message": "hi, how are you feeling?" },
                ],
                "preamble": "be kind",
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "text": "I hear you." })),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let full = provider.complete(request()).await.unwrap();
        assert_eq!(full, "I hear you.");
    }

    #[tokio::test]
    async fn stream_yields_the_buffered_reply_as_one_fragment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "text": "one whole reply" })),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let mut stream = provider.stream(request()).await.unwrap();

        let mut fragments = Vec::new();
        while let Some(fragment) = stream.next().await {
            fragments.push(fragment.unwrap());
        }
        assert_eq!(fragments, vec!["one whole reply"]);
    }

    #[tokio::test]
    async fn missing_text_field_is_a_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "abc" })),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }
}
