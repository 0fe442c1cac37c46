use serde::{Deserialize, Serialize};

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// One turn of a client conversation. This is the only shape the relay
/// forwards upstream; any extra client-supplied fields are dropped during
/// normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Body of the buffered chat endpoint's success response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferedChatResponse {
    pub content: String,
}

/// Body of the therapy endpoint's response. Always paired with HTTP 200,
/// even when the text is the scripted fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TherapyResponse {
    pub response: String,
}

/// Body of the connectivity-check endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityResponse {
    pub success: bool,
    pub message: String,
    pub response: String,
    pub timestamp: String,
}

/// A crisis hotline or support service shown in the resources directory.
/// Static, read-only data; nothing here is ever derived from a request.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EmergencyContact {
    pub name: &'static str,
    pub phone: &'static str,
    pub description: &'static str,
}
