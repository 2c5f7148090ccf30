//! Response types for chat completions
//!
//! Defines the non-streaming response object and the streaming chunk
//! structure written as SSE frames.

use serde::{Deserialize, Serialize};

use super::types::{ChatMessage, Role};

/// Object tag of a non-streaming response
pub const COMPLETION_OBJECT: &str = "chat.completion";
/// Object tag of a streaming chunk
pub const CHUNK_OBJECT: &str = "chat.completion.chunk";
/// Finish reason reported once generation is over
pub const FINISH_STOP: &str = "stop";

/// Token usage statistics
///
/// Counts are characters of generated text, not tokenizer output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Usage for a completion of the given text
    pub fn for_completion(content: &str) -> Self {
        let chars = u32::try_from(content.chars().count()).unwrap_or(u32::MAX);
        Self {
            prompt_tokens: 0,
            completion_tokens: chars,
            total_tokens: chars,
        }
    }
}

/// A completion choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    /// Index of this choice
    pub index: u32,
    /// The generated message
    pub message: ChatMessage,
    /// Reason the generation stopped
    pub finish_reason: String,
}

/// Chat completion response (non-streaming)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionResponse {
    pub id: String,
    /// Object type (always "chat.completion")
    pub object: String,
    /// Unix timestamp of creation, in seconds
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

/// Delta content in a streaming chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Delta {
    /// Role (only present in the first chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Content fragment, empty in the terminal chunk
    #[serde(default)]
    pub content: String,
}

/// A choice in a streaming chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: Delta,
    /// Empty until the terminal chunk, which carries "stop"
    pub finish_reason: String,
}

/// Streaming chunk for chat completion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionChunk {
    pub id: String,
    /// Object type (always "chat.completion.chunk")
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

impl ChatCompletionChunk {
    /// Build a single-choice chunk
    pub fn new(
        id: impl Into<String>,
        created: i64,
        model: impl Into<String>,
        delta: Delta,
        finish_reason: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            object: CHUNK_OBJECT.to_string(),
            created,
            model: model.into(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason: finish_reason.into(),
            }],
        }
    }

    /// Whether this is the terminal chunk of a stream
    pub fn is_terminal(&self) -> bool {
        self.choices
            .first()
            .is_some_and(|choice| choice.finish_reason == FINISH_STOP)
    }

    /// Content fragment carried by this chunk
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .map(|choice| choice.delta.content.as_str())
            .unwrap_or_default()
    }
}
