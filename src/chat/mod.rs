//! Chat completion wire types
//!
//! Request, response and streaming chunk shapes of the OpenAI-compatible
//! chat completions API, plus content normalization for incoming messages.

pub mod response;
pub mod types;

pub use response::{
    ChatCompletionChunk, ChatCompletionResponse, Choice, ChunkChoice, Delta, Usage,
};
pub use types::{ChatCompletionRequest, ChatMessage, Content, ContentPart, Role};
