//! Chat completions endpoint
//!
//! OpenAI-compatible `POST /v1/chat/completions`. Parses the request, strips
//! the model prefix, translates messages, resolves the model and writes the
//! assembled result either as one JSON body or as an SSE stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::{Stream, StreamExt};
use tracing::{warn, Instrument};

use crate::{
    assembler::{self, ChunkStream},
    chat::{ChatCompletionChunk, ChatCompletionRequest},
    error::{ProxyError, ProxyResult},
    logging::RequestContext,
    resolver::family_name,
    routes::metrics::{record_completion_chars, record_request},
    streaming::{format_sse_data, format_sse_done, format_sse_error},
    translate::translate_messages,
    AppState,
};

type Frame = Result<Bytes, Infallible>;

/// Handle chat completion requests
///
/// Branches on the `stream` flag of the body. Failures before any output is
/// written become JSON error responses.
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let mut request: ChatCompletionRequest = serde_json::from_slice(&body)
        .map_err(|e| ProxyError::BadRequest(format!("Invalid request body: {}", e)))?;

    request.model = family_name(&request.model).to_string();

    let ctx = RequestContext::new(request.model.clone(), request.stream);
    ctx.log_request_received(&request);
    let span = ctx.create_span();

    let result = if request.stream {
        handle_streaming(&state, request, ctx.clone())
            .instrument(span)
            .await
    } else {
        handle_non_streaming(&state, request, &ctx)
            .instrument(span)
            .await
    };

    if let Err(ref err) = result {
        ctx.log_error(err);
        record_request("error", &ctx.model, ctx.elapsed_secs());
    }

    result
}

/// Handle non-streaming chat completion
async fn handle_non_streaming(
    state: &AppState,
    request: ChatCompletionRequest,
    ctx: &RequestContext,
) -> ProxyResult<Response> {
    let messages = translate_messages(&request.messages);
    let model = state.resolver.resolve(&request.model).await?;

    let response = assembler::complete(model.as_ref(), messages).await?;

    let chars = response.usage.completion_tokens;
    record_request("success", &ctx.model, ctx.elapsed_secs());
    record_completion_chars(u64::from(chars), &ctx.model);
    ctx.log_request_complete(chars);

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handle streaming chat completion
///
/// The first chunk is pulled before any header is written, so a provider
/// that fails on its first fragment still gets a JSON error response.
async fn handle_streaming(
    state: &AppState,
    request: ChatCompletionRequest,
    ctx: RequestContext,
) -> ProxyResult<Response> {
    let messages = translate_messages(&request.messages);
    let model = state.resolver.resolve(&request.model).await?;

    let mut chunks = assembler::complete_stream(model.as_ref(), messages, request).await?;
    let first = chunks.next().await.transpose()?;
    ctx.log_stream_started();

    let body = Body::from_stream(sse_frames(first, chunks, ctx));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(body)
        .map_err(|e| ProxyError::Transport(format!("Failed to build response: {}", e)))
}

/// Encode a chunk stream as SSE frames, starting with an already pulled chunk.
///
/// A clean end is followed by `data: [DONE]`. A failure mid-stream writes one
/// error frame and closes the body without the sentinel.
fn sse_frames(
    first: Option<ChatCompletionChunk>,
    rest: ChunkStream,
    ctx: RequestContext,
) -> impl Stream<Item = Frame> + Send + 'static {
    let mut chunks = futures::stream::iter(first.map(Ok)).chain(rest);

    async_stream::stream! {
        let mut outcome = StreamOutcome::new(ctx);
        let mut failure: Option<ProxyError> = None;

        while let Some(item) = chunks.next().await {
            let encoded = item.and_then(|chunk| {
                format_sse_data(&chunk)
                    .map(|frame| (frame, chunk))
                    .map_err(|e| ProxyError::Transport(format!("Failed to encode chunk: {}", e)))
            });

            match encoded {
                Ok((frame, chunk)) => {
                    outcome.sent(&chunk);
                    yield Frame::Ok(frame);
                }
                Err(err) => {
                    yield Frame::Ok(format_sse_error(&err.to_string()));
                    failure = Some(err);
                    break;
                }
            }
        }

        match failure {
            None => {
                outcome.completed();
                yield Frame::Ok(format_sse_done());
            }
            Some(err) => outcome.failed(&err),
        }
    }
}

/// Logs and records how a stream ended.
///
/// A stream dropped before either outcome is reported, which is what happens
/// when the client disconnects, is recorded as `disconnected` on drop.
struct StreamOutcome {
    ctx: RequestContext,
    frames: usize,
    content_chars: usize,
    reported: bool,
}

impl StreamOutcome {
    fn new(ctx: RequestContext) -> Self {
        Self {
            ctx,
            frames: 0,
            content_chars: 0,
            reported: false,
        }
    }

    fn sent(&mut self, chunk: &ChatCompletionChunk) {
        self.frames += 1;
        self.content_chars += chunk.content().chars().count();
    }

    fn completed(&mut self) {
        self.reported = true;
        record_request("success", &self.ctx.model, self.ctx.elapsed_secs());
        record_completion_chars(self.content_chars as u64, &self.ctx.model);
        self.ctx
            .log_stream_ended(self.frames, self.content_chars, true);
    }

    fn failed(&mut self, err: &ProxyError) {
        self.reported = true;
        self.ctx.log_error(err);
        record_request("error", &self.ctx.model, self.ctx.elapsed_secs());
        self.ctx
            .log_stream_ended(self.frames, self.content_chars, false);
    }
}

impl Drop for StreamOutcome {
    fn drop(&mut self) {
        if self.reported {
            return;
        }
        warn!(
            trace_id = %self.ctx.trace_id,
            model = %self.ctx.model,
            "Client disconnected mid-stream"
        );
        record_request("disconnected", &self.ctx.model, self.ctx.elapsed_secs());
        self.ctx
            .log_stream_ended(self.frames, self.content_chars, false);
    }
}
