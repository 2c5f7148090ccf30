//! Streaming chat completion integration tests
//!
//! Verifies SSE framing, chunk lifecycle and error handling of
//! `POST /v1/chat/completions` with `"stream": true`.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{sse_payloads, test_server, FakeModel, FakeProvider};

fn streaming_request(model: &str) -> Value {
    json!({
        "model": model,
        "messages": [{"role": "user", "content": "hi"}],
        "stream": true
    })
}

#[tokio::test]
async fn test_stream_emits_chunks_then_done() {
    let model = FakeModel::fragments("gpt-4o", &["Hel", "lo"]);
    let server = test_server(FakeProvider::new(vec![model]));

    let response = server
        .post("/v1/chat/completions")
        .json(&streaming_request("gpt-4o"))
        .await;

    response.assert_status_ok();
    let body = response.text();
    assert!(body.ends_with("data: [DONE]\n\n"));

    let payloads = sse_payloads(&body);
    assert_eq!(payloads.len(), 4);
    assert_eq!(payloads[3], "[DONE]");

    let chunks: Vec<Value> = payloads[..3]
        .iter()
        .map(|p| serde_json::from_str(p).unwrap())
        .collect();

    assert_eq!(chunks[0]["id"], "chatcmpl-stream-0");
    assert_eq!(chunks[0]["object"], "chat.completion.chunk");
    assert_eq!(chunks[0]["model"], "gpt-4o");
    assert_eq!(
        chunks[0]["choices"][0]["delta"],
        json!({"role": "assistant", "content": "Hel"})
    );
    assert_eq!(chunks[0]["choices"][0]["finish_reason"], "");

    assert_eq!(chunks[1]["id"], "chatcmpl-stream-1");
    assert_eq!(chunks[1]["choices"][0]["delta"], json!({"content": "lo"}));

    assert_eq!(chunks[2]["id"], "chatcmpl-stream-final");
    assert_eq!(chunks[2]["choices"][0]["delta"], json!({"content": ""}));
    assert_eq!(chunks[2]["choices"][0]["finish_reason"], "stop");
}

#[tokio::test]
async fn test_stream_response_headers() {
    let model = FakeModel::fragments("gpt-4o", &["x"]);
    let server = test_server(FakeProvider::new(vec![model]));

    let response = server
        .post("/v1/chat/completions")
        .json(&streaming_request("gpt-4o"))
        .await;

    response.assert_status_ok();
    let content_type = response.header("content-type");
    assert!(content_type.to_str().unwrap().starts_with("text/event-stream"));
    assert_eq!(response.header("cache-control"), "no-cache");
    assert_eq!(response.header("x-accel-buffering"), "no");
}

#[tokio::test]
async fn test_stream_deltas_reproduce_text() {
    let fragments = ["The ", "quick ", "brown ", "fox"];
    let model = FakeModel::fragments("gpt-4o", &fragments);
    let server = test_server(FakeProvider::new(vec![model]));

    let response = server
        .post("/v1/chat/completions")
        .json(&streaming_request("gpt-4o"))
        .await;

    let payloads = sse_payloads(&response.text());
    let chunks: Vec<Value> = payloads
        .iter()
        .filter(|p| p.as_str() != "[DONE]")
        .map(|p| serde_json::from_str(p).unwrap())
        .collect();

    let text: String = chunks
        .iter()
        .map(|c| c["choices"][0]["delta"]["content"].as_str().unwrap())
        .collect();
    assert_eq!(text, fragments.concat());

    let with_role = chunks
        .iter()
        .filter(|c| c["choices"][0]["delta"].get("role").is_some())
        .count();
    assert_eq!(with_role, 1);

    let terminal = chunks
        .iter()
        .filter(|c| c["choices"][0]["finish_reason"] == "stop")
        .count();
    assert_eq!(terminal, 1);
}

#[tokio::test]
async fn test_empty_stream_sends_terminal_chunk_only() {
    let model = FakeModel::fragments("gpt-4o", &[]);
    let server = test_server(FakeProvider::new(vec![model]));

    let response = server
        .post("/v1/chat/completions")
        .json(&streaming_request("gpt-4o"))
        .await;

    response.assert_status_ok();
    let payloads = sse_payloads(&response.text());
    assert_eq!(payloads.len(), 2);

    let terminal: Value = serde_json::from_str(&payloads[0]).unwrap();
    assert_eq!(terminal["id"], "chatcmpl-stream-final");
    assert_eq!(payloads[1], "[DONE]");
}

#[tokio::test]
async fn test_mid_stream_failure_writes_error_frame() {
    let model = FakeModel::scripted(
        "gpt-4o",
        vec![
            Ok("Hel".to_string()),
            Err("connection reset".to_string()),
            Ok("never".to_string()),
        ],
    );
    let server = test_server(FakeProvider::new(vec![model]));

    let response = server
        .post("/v1/chat/completions")
        .json(&streaming_request("gpt-4o"))
        .await;

    // Headers were already sent when the failure happened
    response.assert_status_ok();
    let body = response.text();
    assert!(!body.contains("[DONE]"));
    assert!(!body.contains("never"));

    let payloads = sse_payloads(&body);
    assert_eq!(payloads.len(), 2);

    let first: Value = serde_json::from_str(&payloads[0]).unwrap();
    assert_eq!(first["choices"][0]["delta"]["content"], "Hel");

    let error: Value = serde_json::from_str(&payloads[1]).unwrap();
    assert!(error["error"].as_str().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn test_failure_on_first_fragment_returns_json_error() {
    let model = FakeModel::scripted("gpt-4o", vec![Err("failed before any text".to_string())]);
    let server = test_server(FakeProvider::new(vec![model.clone()]));

    let response = server
        .post("/v1/chat/completions")
        .json(&streaming_request("gpt-4o"))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let content_type = response.header("content-type");
    assert!(content_type.to_str().unwrap().starts_with("application/json"));

    let json: Value = response.json();
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("failed before any text"));
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn test_failure_after_first_fragment_keeps_stream_status() {
    let model = FakeModel::scripted(
        "gpt-4o",
        vec![Ok("H".to_string()), Err("failed after one fragment".to_string())],
    );
    let server = test_server(FakeProvider::new(vec![model]));

    let response = server
        .post("/v1/chat/completions")
        .json(&streaming_request("gpt-4o"))
        .await;

    response.assert_status_ok();
    let payloads = sse_payloads(&response.text());
    assert_eq!(payloads.len(), 2);

    let error: Value = serde_json::from_str(&payloads[1]).unwrap();
    assert!(error["error"]
        .as_str()
        .unwrap()
        .contains("failed after one fragment"));
}

#[tokio::test]
async fn test_stream_start_failure_returns_json_error() {
    let server = test_server(FakeProvider::new(vec![FakeModel::refusing("gpt-4o")]));

    let response = server
        .post("/v1/chat/completions")
        .json(&streaming_request("gpt-4o"))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("quota exhausted"));
}

#[tokio::test]
async fn test_stream_unknown_model_returns_json_error() {
    let model = FakeModel::fragments("gpt-4o", &["x"]);
    let server = test_server(FakeProvider::new(vec![model.clone()]));

    let response = server
        .post("/v1/chat/completions")
        .json(&streaming_request("vendor/unknown-x"))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = response.json();
    assert_eq!(
        json["error"],
        "No language model available for model: unknown-x"
    );
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn test_stream_model_field_uses_stripped_name() {
    let model = FakeModel::fragments("gpt-4o", &["a"]);
    let server = test_server(FakeProvider::new(vec![model]));

    let response = server
        .post("/v1/chat/completions")
        .json(&streaming_request("openai/gpt-4o"))
        .await;

    let payloads = sse_payloads(&response.text());
    for payload in payloads.iter().filter(|p| p.as_str() != "[DONE]") {
        let chunk: Value = serde_json::from_str(payload).unwrap();
        assert_eq!(chunk["model"], "gpt-4o");
    }
}
