//! Request logging for chat completions
//!
//! Provides structured logging with short correlation IDs so every line
//! produced for one request can be grepped together.

use std::time::Instant;

use tracing::{debug, error, info, Span};
use uuid::Uuid;

use crate::chat::ChatCompletionRequest;
use crate::error::ProxyError;

/// Characters of the latest user message shown in request logs
const PREVIEW_CHARS: usize = 30;

/// Context for tracking a chat request through the system
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this request (for log correlation)
    pub trace_id: String,
    /// When the request started
    pub start_time: Instant,
    /// Model family after prefix stripping
    pub model: String,
    /// Whether this is a streaming request
    pub streaming: bool,
}

impl RequestContext {
    pub fn new(model: impl Into<String>, streaming: bool) -> Self {
        Self {
            trace_id: Uuid::new_v4().simple().to_string()[..8].to_string(),
            start_time: Instant::now(),
            model: model.into(),
            streaming,
        }
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }

    /// Get elapsed time in seconds, for metrics
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Log an incoming request with a short preview of the prompt
    pub fn log_request_received(&self, request: &ChatCompletionRequest) {
        info!(
            trace_id = %self.trace_id,
            model = %self.model,
            streaming = %self.streaming,
            messages = request.messages.len(),
            preview = %request.latest_user_preview(PREVIEW_CHARS),
            "Request received"
        );
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                trace_id = %self.trace_id,
                messages = %serde_json::to_string(&request.messages).unwrap_or_default(),
                "Full messages"
            );
        }
    }

    /// Log successful completion of a non-streaming request
    pub fn log_request_complete(&self, content_chars: u32) {
        info!(
            trace_id = %self.trace_id,
            model = %self.model,
            content_chars = content_chars,
            elapsed_ms = %self.elapsed_ms(),
            "Request completed"
        );
    }

    /// Log the first byte of a streaming response
    pub fn log_stream_started(&self) {
        info!(
            trace_id = %self.trace_id,
            model = %self.model,
            elapsed_ms = %self.elapsed_ms(),
            "Streaming response started"
        );
    }

    /// Log the end of a stream, successful or not
    pub fn log_stream_ended(&self, chunks: usize, content_chars: usize, completed: bool) {
        info!(
            trace_id = %self.trace_id,
            model = %self.model,
            chunks = chunks,
            content_chars = content_chars,
            completed = completed,
            elapsed_ms = %self.elapsed_ms(),
            "Streaming response ended"
        );
    }

    /// Log request failure
    pub fn log_error(&self, err: &ProxyError) {
        error!(
            trace_id = %self.trace_id,
            model = %self.model,
            streaming = %self.streaming,
            kind = err.kind(),
            elapsed_ms = %self.elapsed_ms(),
            error = %err,
            "Request failed"
        );
    }

    /// Create a tracing span for this request
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "chat_request",
            trace_id = %self.trace_id,
            model = %self.model,
            streaming = %self.streaming,
        )
    }
}
