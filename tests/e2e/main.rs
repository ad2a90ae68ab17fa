//! Full stack: router + `OpenAIExecutor` served over TCP against a mock
//! upstream.

use arc_swap::ArcSwap;
use relay_core::config::Config;
use relay_server::{AppState, CHAT_PATH, build_router};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serve the relay on an ephemeral port and return its base URL.
async fn spawn_relay(upstream_base: &str) -> String {
    let mut config = Config::default();
    config.upstream.base_url = upstream_base.to_string();
    config.upstream.api_key = "sk-e2e".to_string();
    config.upstream.connect_timeout = 2;

    let state = AppState {
        config: Arc::new(ArcSwap::from_pointee(config)),
        executor: relay_provider::build_executor(),
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

async fn post_chat(relay: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{relay}{CHAT_PATH}"))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .expect("relay unreachable");
    let status = resp.status().as_u16();
    let body = resp.json::<Value>().await.unwrap_or(json!(null));
    (status, body)
}

#[tokio::test]
async fn test_fallback_round_trip() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-e2e"))
        .and(body_partial_json(json!({"model": "gpt-5"})))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"message": "The model `gpt-5` does not exist", "code": "model_not_found"}
        })))
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"model": "gpt-4", "max_tokens": 500})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = spawn_relay(&upstream.uri()).await;
    let (status, body) = post_chat(
        &relay,
        json!({"model": "gpt-5", "fallback_model": "gpt-4"}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({"choices": [], "_used_model": "gpt-4"}));
}

#[tokio::test]
async fn test_primary_success_round_trip() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-5",
            "messages": [{"role": "user", "content": "hi"}],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "hello"}}]
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = spawn_relay(&upstream.uri()).await;
    let (status, body) = post_chat(
        &relay,
        json!({"messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["_used_model"], "gpt-5");
    assert_eq!(body["choices"][0]["message"]["content"], "hello");
}

#[tokio::test]
async fn test_rate_limit_passes_through_without_fallback() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({"error": "slow down"})))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = spawn_relay(&upstream.uri()).await;
    let (status, body) = post_chat(&relay, json!({})).await;

    assert_eq!(status, 429);
    assert_eq!(
        body,
        json!({"error": "OpenAI API error", "detail": {"error": "slow down"}})
    );
}

#[tokio::test]
async fn test_unreachable_upstream_is_500() {
    let relay = spawn_relay("http://127.0.0.1:1").await;
    let (status, body) = post_chat(&relay, json!({})).await;

    assert_eq!(status, 500);
    assert_eq!(body, json!({"error": "Internal server error"}));
}

#[tokio::test]
async fn test_preflight_over_tcp() {
    let upstream = MockServer::start().await;
    let relay = spawn_relay(&upstream.uri()).await;

    let resp = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("{relay}{CHAT_PATH}"))
        .header("origin", "https://app.example")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert_eq!(resp.headers()["access-control-allow-methods"], "POST, OPTIONS");
    assert!(resp.bytes().await.unwrap().is_empty());
    assert!(upstream.received_requests().await.unwrap().is_empty());
}
