//! Chunk stream state machine
//!
//! A `ChunkStream` is pulled by the transport. Each poll waits on the
//! provider's next fragment and turns it into one chunk; when the provider is
//! exhausted it records the assistant reply on the request and yields the
//! single terminal chunk. After that, or after an error, it yields nothing.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::FusedStream;
use futures::{ready, Stream};
use tokio_util::sync::DropGuard;

use super::unix_now;
use crate::chat::response::FINISH_STOP;
use crate::chat::{ChatCompletionChunk, ChatCompletionRequest, ChatMessage, Delta, Role};
use crate::error::{ProxyError, ProxyResult};
use crate::provider::TextStream;

/// Id prefix of fragment chunks; the chunk index follows it
pub const STREAM_ID_PREFIX: &str = "chatcmpl-stream-";
/// Id of the terminal chunk
pub const FINAL_CHUNK_ID: &str = "chatcmpl-stream-final";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Emitting,
    Finished,
}

/// Lazily produced, single-pass sequence of chat completion chunks
pub struct ChunkStream {
    fragments: TextStream,
    request: ChatCompletionRequest,
    buffer: String,
    next_index: u64,
    state: State,
    /// Cancels the provider call when the stream is dropped
    _cancel: DropGuard,
}

impl ChunkStream {
    pub(crate) fn new(
        fragments: TextStream,
        request: ChatCompletionRequest,
        cancel: DropGuard,
    ) -> Self {
        Self {
            fragments,
            request,
            buffer: String::new(),
            next_index: 0,
            state: State::Emitting,
            _cancel: cancel,
        }
    }

    /// The request this stream answers.
    ///
    /// Once the terminal chunk has been produced its message list ends with
    /// the generated assistant reply.
    pub fn request(&self) -> &ChatCompletionRequest {
        &self.request
    }

    pub fn into_request(self) -> ChatCompletionRequest {
        self.request
    }

    /// Text produced so far
    pub fn content(&self) -> &str {
        &self.buffer
    }

    /// Number of fragment chunks emitted so far (terminal chunk excluded)
    pub fn fragments_emitted(&self) -> u64 {
        self.next_index
    }

    fn emit(&mut self, fragment: String) -> ChatCompletionChunk {
        let role = (self.next_index == 0).then_some(Role::Assistant);
        let id = format!("{}{}", STREAM_ID_PREFIX, self.next_index);
        self.next_index += 1;
        self.buffer.push_str(&fragment);

        ChatCompletionChunk::new(
            id,
            unix_now(),
            self.request.model.clone(),
            Delta {
                role,
                content: fragment,
            },
            "",
        )
    }

    fn finalize(&mut self) -> ChatCompletionChunk {
        self.state = State::Finished;
        self.request
            .messages
            .push(ChatMessage::assistant(self.buffer.clone()));

        ChatCompletionChunk::new(
            FINAL_CHUNK_ID,
            unix_now(),
            self.request.model.clone(),
            Delta::default(),
            FINISH_STOP,
        )
    }
}

impl Stream for ChunkStream {
    type Item = ProxyResult<ChatCompletionChunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.state == State::Finished {
            return Poll::Ready(None);
        }

        match ready!(this.fragments.as_mut().poll_next(cx)) {
            Some(Ok(fragment)) => Poll::Ready(Some(Ok(this.emit(fragment)))),
            Some(Err(e)) => {
                this.state = State::Finished;
                let model = this.request.model.clone();
                Poll::Ready(Some(Err(ProxyError::provider(model, e))))
            }
            None => Poll::Ready(Some(Ok(this.finalize()))),
        }
    }
}

impl FusedStream for ChunkStream {
    fn is_terminated(&self) -> bool {
        self.state == State::Finished
    }
}
