//! Core message types for chat completion requests
//!
//! Defines roles, message content and the incoming request body. Content
//! arrives either as plain text or as a list of parts and is flattened to a
//! single string before it reaches a provider.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Role of a message participant
///
/// Parsed case-insensitively; always serialized in lowercase.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message providing instructions or context
    System,
    /// User message from the human
    User,
    /// Assistant message from the model
    Assistant,
    /// Tool/function result message
    Tool,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "tool" => Ok(Role::Tool),
            other => Err(format!("unknown message role '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A part of structured message content
///
/// Only `text` matters for normalization; image and other part kinds are
/// carried along but contribute nothing to the flattened text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ContentPart {
    /// Part kind, e.g. "text" or "image_url"
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Text of the part, if it has any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Remaining fields of non-text parts
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentPart {
    /// Create a plain text part
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: Some("text".to_string()),
            text: Some(text.into()),
            extra: Map::new(),
        }
    }
}

/// Message content - plain text, a list of parts, or anything else a client sent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Content {
    /// Simple text content
    Text(String),
    /// Structured content parts
    Parts(Vec<ContentPart>),
    /// Any other JSON shape; coerced to a string on normalization
    Other(Value),
}

impl Default for Content {
    fn default() -> Self {
        Content::Text(String::new())
    }
}

impl Content {
    /// Flatten content into a single string.
    ///
    /// Text is returned unchanged. Parts are joined with `\n` in order,
    /// skipping parts without text. Anything else becomes its JSON
    /// representation, with `null` mapping to the empty string. Never fails.
    pub fn normalize(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
            Content::Other(Value::Null) => String::new(),
            Content::Other(Value::String(text)) => text.clone(),
            Content::Other(other) => other.to_string(),
        }
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

/// A chat message with role and content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// The role of the message author
    pub role: Role,
    /// The content of the message
    #[serde(default)]
    pub content: Content,
    /// Optional name of the author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<Content>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }

    pub fn user(content: impl Into<Content>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<Content>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<Content>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Chat completion request
///
/// Sampling parameters and other OpenAI fields are accepted and kept in
/// `extra`, but they are not forwarded to the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    /// Requested model, possibly vendor-prefixed ("openrouter/anthropic/claude-3.5-sonnet")
    pub model: String,
    /// Conversation, oldest first
    pub messages: Vec<ChatMessage>,
    /// Whether to stream the response as SSE chunks
    #[serde(default)]
    pub stream: bool,
    /// Any other fields the client sent
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
            extra: Map::new(),
        }
    }

    /// Short preview of the latest user message, for request logs
    pub fn latest_user_preview(&self, max_chars: usize) -> String {
        let Some(message) = self.messages.iter().rev().find(|m| m.role == Role::User) else {
            return String::new();
        };

        let text = message.content.normalize();
        if text.chars().count() > max_chars {
            let truncated: String = text.chars().take(max_chars).collect();
            format!("{}...", truncated)
        } else {
            text
        }
    }
}
