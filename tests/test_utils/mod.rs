//! Test utilities for integration tests
#![allow(dead_code)]
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, body::Body};
use serde_json::json;

use quixa::api::AppState;
use quixa::api::app;
use quixa::core::AppConfig;

pub const SYSTEM_MESSAGE: &str = "You are a helpful assistant.";

/// Config pointing the relay at a fake upstream, usually a `mockito`
/// server URL.
pub fn test_config(upstream_url: &str) -> AppConfig {
    AppConfig {
        openai_api_hostname: upstream_url.to_string(),
        openai_api_key: String::from("test-api-key"),
        openai_model: String::from("test-model"),
        system_message: String::from(SYSTEM_MESSAGE),
        site_url: None,
        site_name: None,
        upstream_timeout: Some(Duration::from_secs(5)),
        web_ui_path: concat!(env!("CARGO_MANIFEST_DIR"), "/web-ui").to_string(),
    }
}

/// Creates a test application router that relays to `upstream_url`.
pub fn test_app(upstream_url: &str) -> Router {
    test_app_with_config(test_config(upstream_url))
}

pub fn test_app_with_config(config: AppConfig) -> Router {
    app(Arc::new(AppState::new(config)))
}

/// Run the app on an ephemeral port and return the relay endpoint URL.
pub async fn spawn_relay(upstream_url: &str) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    let app = test_app(upstream_url);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/chat", addr)
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A streamed completion in the upstream wire format: a role-only
/// chunk, one chunk per delta, a finish chunk and the terminator.
pub fn sse_body(deltas: &[&str]) -> String {
    let mut events = vec![json!({
        "id": "chunk0",
        "choices": [{"index": 0, "delta": {"role": "assistant"}, "finish_reason": null}]
    })];
    for (i, delta) in deltas.iter().enumerate() {
        events.push(json!({
            "id": format!("chunk{}", i + 1),
            "choices": [{"index": 0, "delta": {"content": delta}, "finish_reason": null}]
        }));
    }
    events.push(json!({
        "id": "final",
        "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]
    }));

    let mut body: String = events
        .iter()
        .map(|event| format!("data: {}\n\n", event))
        .collect();
    body.push_str("data: [DONE]\n\n");
    body
}

pub const QUOTA_ERROR_BODY: &str = r#"{"error":{"message":"You exceeded your current quota, please check your plan and billing details.","type":"insufficient_quota","param":null,"code":"insufficient_quota"}}"#;
