//! HTTP surface of the relay. Handlers own status codes and body framing;
//! the relay pipeline stays transport-free.
//!
//! Failure policy per endpoint:
//! - validation errors are always 400 with `{error}` and never reach a
//!   provider;
//! - provider or unexpected failures are 500 on the general endpoints, but
//!   the therapy endpoint deliberately answers 200 with a scripted fallback
//!   so a person in a sensitive moment never sees a raw error.

use crate::config::Config;
use crate::error::Error;
use crate::models::{
    BufferedChatResponse, ConnectivityResponse, ConversationMessage, TherapyResponse,
};
use crate::persona::{Persona, THERAPY_FALLBACK_MESSAGE};
use crate::provider::{ChatProvider, FragmentStream};
use crate::relay;
use crate::resources::EMERGENCY_CONTACTS;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{Request, Response, StatusCode},
    routing::{get, post},
    Router,
};
use futures::StreamExt;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Streaming-capable provider backing the general and therapy endpoints.
    pub primary: Arc<dyn ChatProvider>,
    /// Conversational provider backing the alternate and buffered endpoints.
    pub alternate: Arc<dyn ChatProvider>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_stream))
        .route("/api/chat/alternate", post(chat_stream_alternate))
        .route("/api/chat/buffered", post(chat_buffered))
        .route("/api/chat/test", get(connectivity_check).post(connectivity_check))
        .route("/api/therapy", post(therapy))
        .route("/api/resources", get(emergency_resources))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                // Keep health probes out of the request log.
                if request.uri().path() == "/health" {
                    tracing::trace_span!("health_check")
                } else {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }
            }),
        )
        .with_state(state)
}

async fn health() -> Response<Body> {
    json_response(StatusCode::OK, &serde_json::json!({ "status": "healthy" }))
}

async fn emergency_resources() -> Response<Body> {
    json_response(StatusCode::OK, &EMERGENCY_CONTACTS)
}

/// General assistant, primary provider, streaming.
async fn chat_stream(State(state): State<AppState>, body: Bytes) -> Response<Body> {
    let request_id = Uuid::new_v4();
    let body = match parse_body(&body) {
        Ok(body) => body,
        Err(e) => return validation_response(&e),
    };

    let model = &state.config.providers.openai.model;
    match relay::stream_chat(&*state.primary, Persona::CrisisCompanion, model, &body, None).await {
        Ok(fragments) => {
            info!("chat: stream opened (request {})", request_id);
            stream_response(fragments, "chat")
        }
        Err(e) if e.is_validation() => validation_response(&e),
        Err(e) => {
            error!("chat: relay failed (request {}): {}", request_id, e);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &serde_json::json!({ "error": "Failed to generate a response" }),
            )
        }
    }
}

/// General assistant over the alternate provider. Same contract, except the
/// error body also carries a diagnostic `details` string.
async fn chat_stream_alternate(State(state): State<AppState>, body: Bytes) -> Response<Body> {
    let request_id = Uuid::new_v4();
    let body = match parse_body(&body) {
        Ok(body) => body,
        Err(e) => return validation_response(&e),
    };

    let model = &state.config.providers.cohere.model;
    match relay::stream_chat(&*state.alternate, Persona::CrisisCompanion, model, &body, None).await
    {
        Ok(fragments) => {
            info!("chat-alternate: stream opened (request {})", request_id);
            stream_response(fragments, "chat-alternate")
        }
        Err(e) if e.is_validation() => validation_response(&e),
        Err(e) => {
            error!("chat-alternate: relay failed (request {}): {}", request_id, e);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &serde_json::json!({
                    "error": "Failed to generate a response",
                    "details": e.to_string(),
                }),
            )
        }
    }
}

/// General assistant, alternate provider, buffered: one JSON reply.
async fn chat_buffered(State(state): State<AppState>, body: Bytes) -> Response<Body> {
    let body = match parse_body(&body) {
        Ok(body) => body,
        Err(e) => return validation_response(&e),
    };

    let model = state.config.providers.cohere.model.clone();
    let result = with_deadline(
        &state,
        relay::complete_chat(&*state.alternate, Persona::CrisisCompanion, &model, &body),
    )
    .await;

    match result {
        Ok(content) => json_response(StatusCode::OK, &BufferedChatResponse { content }),
        Err(e) if e.is_validation() => validation_response(&e),
        Err(e) => {
            error!("chat-buffered: relay failed: {}", e);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &serde_json::json!({ "error": "Failed to generate a response" }),
            )
        }
    }
}

/// Connectivity check: sends one canned turn to the alternate provider and
/// reports reachability. Any POST body is ignored.
async fn connectivity_check(State(state): State<AppState>) -> Response<Body> {
    let model = state.config.providers.cohere.model.clone();
    let request = relay::compose(
        Persona::CrisisCompanion,
        &model,
        vec![ConversationMessage::user("ping")],
        None,
    );

    match with_deadline(&state, state.alternate.complete(request)).await {
        Ok(response) => json_response(
            StatusCode::OK,
            &ConnectivityResponse {
                success: true,
                message: format!("{} provider reachable", state.alternate.name()),
                response,
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
        ),
        Err(e) => {
            error!("chat-test: connectivity check failed: {}", e);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &serde_json::json!({
                    "success": false,
                    "error": "Provider connectivity check failed",
                }),
            )
        }
    }
}

/// Therapy-session persona, buffered. Validation still returns 400, but any
/// failure past that point answers 200 with the scripted fallback.
async fn therapy(State(state): State<AppState>, body: Bytes) -> Response<Body> {
    let body = match parse_body(&body) {
        Ok(body) => body,
        Err(e) => return validation_response(&e),
    };

    let model = state.config.providers.openai.model.clone();
    let result = with_deadline(
        &state,
        relay::complete_chat(&*state.primary, Persona::TherapySession, &model, &body),
    )
    .await;

    match result {
        Ok(response) => json_response(StatusCode::OK, &TherapyResponse { response }),
        Err(e) if e.is_validation() => validation_response(&e),
        Err(e) => {
            error!("therapy: relay failed, serving fallback: {}", e);
            json_response(
                StatusCode::OK,
                &TherapyResponse {
                    response: THERAPY_FALLBACK_MESSAGE.to_string(),
                },
            )
        }
    }
}

fn parse_body(bytes: &Bytes) -> crate::error::Result<Value> {
    serde_json::from_slice(bytes)
        .map_err(|_| Error::Validation("request body must be valid JSON".to_string()))
}

/// Bound one buffered request; streaming responses are not covered since a
/// generation may legitimately outlive the budget fragment by fragment.
async fn with_deadline<T>(
    state: &AppState,
    fut: impl std::future::Future<Output = crate::error::Result<T>>,
) -> crate::error::Result<T> {
    match tokio::time::timeout(state.config.relay.request_timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Provider(format!(
            "request exceeded {:?} deadline",
            state.config.relay.request_timeout
        ))),
    }
}

fn validation_response(error: &Error) -> Response<Body> {
    json_response(
        StatusCode::BAD_REQUEST,
        &serde_json::json!({ "error": error_detail(error) }),
    )
}

/// Strip the taxonomy prefix so clients see "missing \"messages\" field"
/// rather than "Validation error: ...".
fn error_detail(error: &Error) -> String {
    match error {
        Error::Validation(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn json_response<T: serde::Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    let body = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

/// Stream emitter: one chunk per provider fragment, provider order, no
/// coalescing. A mid-stream provider failure ends the stream after logging;
/// the status line has already been sent, so nothing is rendered client-side.
fn stream_response(mut fragments: FragmentStream, endpoint: &'static str) -> Response<Body> {
    let bytes = async_stream::stream! {
        while let Some(next) = fragments.next().await {
            match next {
                Ok(fragment) => yield Ok::<Bytes, Infallible>(Bytes::from(fragment)),
                Err(e) => {
                    error!("{}: stream ended after provider error: {}", endpoint, e);
                    break;
                }
            }
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/plain; charset=utf-8")
        .header("cache-control", "no-cache")
        .header("x-accel-buffering", "no")
        .body(Body::from_stream(bytes))
        .unwrap()
}
