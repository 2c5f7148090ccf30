//! Response assembly
//!
//! Drives a provider model and turns its fragment stream into either one
//! `ChatCompletionResponse` or a [`ChunkStream`] of wire chunks.
//!
//! Every call owns a fresh cancellation token behind a drop guard: when the
//! future (non-streaming) or the chunk stream (streaming) is dropped, which
//! is what happens when the HTTP client goes away, the provider is told to
//! stop generating.

pub mod stream;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::chat::response::{COMPLETION_OBJECT, FINISH_STOP};
use crate::chat::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Choice, Usage};
use crate::error::{ProxyError, ProxyResult};
use crate::provider::{LanguageModel, ProviderMessage, RequestOptions};

pub use stream::ChunkStream;

/// Id of every non-streaming response
pub const NONSTREAM_ID: &str = "chatcmpl-nonstream";

/// Current Unix time in seconds
pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Run a completion to the end and build a single response.
///
/// Fragments are concatenated in arrival order. Usage counts characters of
/// the generated text; prompt tokens are not computed.
pub async fn complete(
    model: &dyn LanguageModel,
    messages: Vec<ProviderMessage>,
) -> ProxyResult<ChatCompletionResponse> {
    let family = model.info().family.clone();
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let mut fragments = model
        .send_request(messages, RequestOptions::default(), cancel)
        .await
        .map_err(|e| ProxyError::provider(&family, e))?;

    let mut full_content = String::new();
    while let Some(fragment) = fragments.next().await {
        let fragment = fragment.map_err(|e| ProxyError::provider(&family, e))?;
        full_content.push_str(&fragment);
    }

    let usage = Usage::for_completion(&full_content);
    Ok(ChatCompletionResponse {
        id: NONSTREAM_ID.to_string(),
        object: COMPLETION_OBJECT.to_string(),
        created: unix_now(),
        model: family,
        choices: vec![Choice {
            index: 0,
            message: ChatMessage::assistant(full_content),
            finish_reason: FINISH_STOP.to_string(),
        }],
        usage,
    })
}

/// Start a completion and return its chunk stream.
///
/// The provider is invoked before this returns, so a failure to start is
/// reported here rather than as a stream item. The request is moved into the
/// stream, which appends the generated assistant message once the provider
/// finishes.
pub async fn complete_stream(
    model: &dyn LanguageModel,
    messages: Vec<ProviderMessage>,
    request: ChatCompletionRequest,
) -> ProxyResult<ChunkStream> {
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let fragments = model
        .send_request(messages, RequestOptions::default(), cancel)
        .await
        .map_err(|e| ProxyError::provider(&request.model, e))?;

    Ok(ChunkStream::new(fragments, request, guard))
}
