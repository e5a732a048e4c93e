//! Client tests against a mock chat-completions server.

mod common;

use futures::StreamExt;
use pretty_assertions::assert_eq;
use rill::config::{RetryConfig, RillConfig};
use rill::error::RillError;
use rill::provider::{ChatCompletionsClient, ChatRequest};
use rill::types::{ResponsePart, ToolDefinition};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

fn client(server: &MockServer) -> ChatCompletionsClient {
    let config = RillConfig::builder()
        .base_url(format!("{}/v1", server.uri()))
        .api_key("sk-test")
        .retry(RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            multiplier: 2.0,
        })
        .build();
    ChatCompletionsClient::new(config).unwrap()
}

fn request() -> ChatRequest {
    ChatRequest::new("test-model", vec![json!({"role": "user", "content": "hi"})])
}

fn sse(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

#[tokio::test]
async fn streams_parts_after_retrying_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "test-model", "stream": true})))
        .respond_with(sse(
            [
                delta_frame(json!({"content": "Hello "})),
                delta_frame(json!({"content": "world"})),
                finish_frame("stop"),
                DONE_FRAME.to_string(),
            ]
            .concat(),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let stream = client(&server)
        .stream_chat(&request(), CancellationToken::new())
        .await
        .unwrap();
    let parts: Vec<ResponsePart> = stream.map(|p| p.unwrap()).collect().await;

    assert_eq!(parts, vec![ResponsePart::text("Hello "), ResponsePart::text("world")]);
}

#[tokio::test]
async fn authentication_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .collect_chat(&request(), CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        RillError::Authentication(message) => assert_eq!(message, "invalid api key"),
        other => panic!("expected authentication error, got {other:?}"),
    }
}

#[tokio::test]
async fn persistent_server_errors_exhaust_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server)
        .collect_chat(&request(), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RillError::Api { status: 503, .. }));
}

#[tokio::test]
async fn rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "0")
                .set_body_string("slow down"),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(sse([delta_frame(json!({"content": "ok"})), DONE_FRAME.to_string()].concat()))
        .expect(1)
        .mount(&server)
        .await;

    let parts = client(&server)
        .collect_chat(&request(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(parts, vec![ResponsePart::text("ok")]);
}

#[tokio::test]
async fn too_many_tools_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = RillConfig::builder()
        .base_url(server.uri())
        .max_tools(2)
        .build();
    let client = ChatCompletionsClient::new(config).unwrap();
    let tools = (0..3)
        .map(|i| ToolDefinition::new(format!("tool_{i}"), "test tool", json!({"type": "object"})))
        .collect();

    let err = client
        .collect_chat(&request().with_tools(tools), CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        RillError::ToolLimitExceeded { count, max } => {
            assert_eq!(count, 3);
            assert_eq!(max, 2);
        }
        other => panic!("expected tool limit error, got {other:?}"),
    }
}

#[tokio::test]
async fn collects_reconstructed_tool_call_and_sends_tools() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "tools": [{"type": "function", "function": {"name": "get_weather"}}]
        })))
        .respond_with(sse(
            [
                delta_frame(json!({"tool_calls": [
                    {"index": 0, "id": "c1", "function": {"name": "get_weather", "arguments": "{\"city\":"}}
                ]})),
                delta_frame(json!({"tool_calls": [
                    {"index": 0, "function": {"arguments": "\"nyc\"}"}}
                ]})),
                finish_frame("tool_calls"),
                DONE_FRAME.to_string(),
            ]
            .concat(),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let weather = ToolDefinition::new(
        "get_weather",
        "Current weather",
        json!({"type": "object", "properties": {"city": {"type": "string"}}}),
    );
    let parts = client(&server)
        .collect_chat(&request().with_tools(vec![weather]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(parts.len(), 1);
    let call = parts[0].as_tool_call().unwrap();
    assert_eq!(call.id, "c1");
    assert_eq!(call.arguments, json!({"city": "nyc"}));
}

#[tokio::test]
async fn incomplete_tool_call_at_finish_fails_collection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(sse(
            [
                delta_frame(json!({"tool_calls": [
                    {"index": 0, "id": "c1", "function": {"name": "f", "arguments": "{\"a\":"}}
                ]})),
                finish_frame("stop"),
                DONE_FRAME.to_string(),
            ]
            .concat(),
        ))
        .mount(&server)
        .await;

    let err = client(&server)
        .collect_chat(&request(), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RillError::IncompleteToolCall { index: 0, .. }));
}

#[tokio::test]
async fn cancelled_token_prevents_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client(&server).collect_chat(&request(), cancel).await.unwrap_err();

    assert!(matches!(err, RillError::Cancelled));
}
