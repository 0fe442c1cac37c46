//! Streaming-capable OpenAI-compatible backend.
//!
//! Generation always goes over the SSE variant of `/chat/completions`;
//! buffered callers get the default drain in [`ChatProvider::complete`].

use super::{with_cancellation, ChatProvider, FragmentStream, ProviderRequest};
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use async_stream::try_stream;
use async_trait::async_trait;
use bytes::BytesMut;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error};

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

impl OpenAiProvider {
    /// Streaming client: connect timeout only, no total-duration timeout,
    /// so long generations are not cut off mid-stream.
    pub fn new(config: &ProviderConfig, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        })
    }

    async fn send(&self, request: &ProviderRequest) -> Result<reqwest::Response> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(json!({
            "role": "system",
            "content": request.system_prompt,
        }));
        for message in &request.messages {
            messages.push(json!({
                "role": message.role.as_str(),
                "content": message.content,
            }));
        }

        let body = json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": true,
        });

        let url = format!(
            "{}/chat/completions",
            self.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("openai: connection failed: {}", e);
                Error::Provider(format!("upstream call failed: {}", e))
            })?;

        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn stream(&self, mut request: ProviderRequest) -> Result<FragmentStream> {
        let cancel = request.take_cancel();
        let response = self.send(&request).await?;

        let status = response.status();
        if !status.is_success() {
            // Upstream bodies stay in the server log; clients only ever see
            // the status.
            let body = response.text().await.unwrap_or_default();
            error!("openai: upstream error (status {}): {}", status, body);
            return Err(Error::Provider(format!(
                "upstream returned status {}",
                status
            )));
        }

        debug!("openai: stream established (status {})", status);
        let mut upstream = response.bytes_stream();

        let stream = try_stream! {
            let mut buffer = BytesMut::new();
            'upstream: while let Some(chunk) = upstream.next().await {
                let chunk = chunk?;
                buffer.extend_from_slice(&chunk);

                // SSE events arrive split across arbitrary chunk boundaries;
                // only complete lines are parsed, the rest stays buffered.
                while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line = buffer.split_to(pos + 1);
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    let value = match line.strip_prefix("data:") {
                        Some(value) => value.trim_start(),
                        None => continue,
                    };

                    if value == "[DONE]" {
                        break 'upstream;
                    }

                    if let Ok(event) = serde_json::from_str::<StreamEvent>(value) {
                        let fragment = event
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|choice| choice.delta.content);
                        if let Some(fragment) = fragment {
                            if !fragment.is_empty() {
                                yield fragment;
                            }
                        }
                    }
                }
            }
        };

        Ok(with_cancellation(stream, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConversationMessage;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new(
            &ProviderConfig {
                api_key: "test-key".to_string(),
                base_url: server.uri(),
                model: "gpt-test".to_string(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "gpt-test".to_string(),
            system_prompt: "be kind".to_string(),
            messages: vec![ConversationMessage::user("I feel anxious")],
            temperature: 0.7,
            max_tokens: 500,
            cancel: None,
        }
    }

    fn sse_body(fragments: &[&str]) -> String {
        let mut body = String::new();
        for fragment in fragments {
            body.push_str(&format!(
                "data: {}\n\n",
                serde_json::json!({
                    "choices": [{ "delta": { "content": fragment } }]
                })
            ));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    #[tokio::test]
    async fn parses_sse_fragments_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({ "stream": true })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(sse_body(&["I ", "hear ", "you."]), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let mut stream = provider.stream(request()).await.unwrap();

        let mut fragments = Vec::new();
        while let Some(fragment) = stream.next().await {
            fragments.push(fragment.unwrap());
        }
        assert_eq!(fragments, vec!["I ", "hear ", "you."]);
    }

    #[tokio::test]
    async fn ignores_events_after_done_marker() {
        let server = MockServer::start().await;
        let body = format!(
            "{}data: {}\n\n",
            sse_body(&["hello"]),
            serde_json::json!({ "choices": [{ "delta": { "content": "late" } }] })
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let mut stream = provider.stream(request()).await.unwrap();

        let mut fragments = Vec::new();
        while let Some(fragment) = stream.next().await {
            fragments.push(fragment.unwrap());
        }
        assert_eq!(fragments, vec!["hello"]);
    }

    #[tokio::test]
    async fn upstream_error_status_becomes_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider.stream(request()).await.err().unwrap();
        assert!(matches!(err, Error::Provider(_)));
        // Upstream body must not leak into the client-facing message.
        assert!(!err.to_string().contains("bad key"));
    }

    #[tokio::test]
    async fn complete_drains_the_stream_into_one_string() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(sse_body(&["one ", "two ", "three"]), "text/event-stream"),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let full = provider.complete(request()).await.unwrap();
        assert_eq!(full, "one two three");
    }
}
