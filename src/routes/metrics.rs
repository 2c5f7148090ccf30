//! Prometheus metrics endpoint
//!
//! Exposes request and completion metrics in Prometheus format.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::warn;

/// Prometheus handle, present once a recorder has been installed
static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize metrics (call once at startup)
///
/// Installing the recorder fails if another global recorder exists; metrics
/// are then simply not exported.
pub fn init_metrics() {
    let handle = PROMETHEUS_HANDLE.get_or_try_init(|| PrometheusBuilder::new().install_recorder());
    if let Err(e) = handle {
        warn!(error = %e, "Failed to install Prometheus recorder");
        return;
    }

    metrics::describe_counter!(
        "lmbridge_requests_total",
        "Total number of chat completion requests processed"
    );
    metrics::describe_histogram!(
        "lmbridge_request_duration_seconds",
        "Chat completion duration in seconds"
    );
    metrics::describe_counter!(
        "lmbridge_completion_chars_total",
        "Characters of generated text returned to clients"
    );
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Record a finished request
pub fn record_request(status: &str, model: &str, duration_secs: f64) {
    metrics::counter!("lmbridge_requests_total", "status" => status.to_string(), "model" => model.to_string())
        .increment(1);
    metrics::histogram!("lmbridge_request_duration_seconds", "model" => model.to_string())
        .record(duration_secs);
}

/// Record generated characters
pub fn record_completion_chars(count: u64, model: &str) {
    metrics::counter!("lmbridge_completion_chars_total", "model" => model.to_string())
        .increment(count);
}
