//! HTTP round trips of the chat-completion backed inference against a
//! local stub server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use locus::{
    InferenceConfig, InferenceError, LlmSelectorInference, LocatorResolver, LocatorStore, NullSink,
    ResolverConfig, SelectorInference, StaticPage,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug)]
struct Stub {
    status: StatusCode,
    answer: String,
    delay: Duration,
    requests: Mutex<Vec<(Option<String>, Value)>>,
}

async fn chat_completions(
    State(stub): State<Arc<Stub>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    stub.requests.lock().unwrap().push((auth, body));
    tokio::time::sleep(stub.delay).await;
    if !stub.status.is_success() {
        return (stub.status, Json(json!({"error": {"message": "overloaded"}})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "id": "chatcmpl-stub",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "stub-model",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": stub.answer},
                "finish_reason": "stop"
            }]
        })),
    )
}

async fn serve(status: StatusCode, answer: &str, delay: Duration) -> (String, Arc<Stub>) {
    let stub = Arc::new(Stub {
        status,
        answer: answer.to_string(),
        delay,
        requests: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(stub.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), stub)
}

fn config(base_url: &str) -> InferenceConfig {
    InferenceConfig::default()
        .with_api_key("sk-test")
        .with_base_url(base_url)
        .with_model("stub-model")
}

#[tokio::test]
async fn sends_prompt_with_bearer_auth_and_cleans_answer() {
    let (url, stub) = serve(StatusCode::OK, "```css\n#go\n```", Duration::ZERO).await;
    let inference = LlmSelectorInference::new(&config(&url)).unwrap();

    let answer = inference
        .find_selector(r#"<body><button id="go">Go</button></body>"#, "Go button")
        .await
        .unwrap();

    assert_eq!(answer.as_deref(), Some("#go"));
    let requests = stub.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["model"], "stub-model");
    assert_eq!(body["temperature"], 0.0);
    assert!(body["max_tokens"].as_u64().unwrap() > 0);
    assert_eq!(body["messages"][0]["role"], "user");
    let prompt = body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("Go button"));
    assert!(prompt.contains(r#"<button id="go">Go</button>"#));
}

#[tokio::test]
async fn sentinel_answer_is_no_match() {
    let (url, _stub) = serve(StatusCode::OK, "NOT_FOUND", Duration::ZERO).await;
    let inference = LlmSelectorInference::new(&config(&url)).unwrap();
    assert_eq!(inference.find_selector("<body></body>", "missing").await.unwrap(), None);
}

#[tokio::test]
async fn server_error_is_a_backend_failure() {
    let (url, _stub) = serve(StatusCode::SERVICE_UNAVAILABLE, "", Duration::ZERO).await;
    let inference = LlmSelectorInference::new(&config(&url)).unwrap();
    match inference.find_selector("<body></body>", "x").await {
        Err(InferenceError::Backend(message)) => assert!(message.contains("503"), "{message}"),
        other => panic!("expected backend error, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_backend_times_out() {
    let (url, _stub) = serve(StatusCode::OK, "#go", Duration::from_secs(5)).await;
    let inference = LlmSelectorInference::new(&config(&url).with_timeout(200)).unwrap();
    assert_eq!(
        inference.find_selector("<body></body>", "x").await,
        Err(InferenceError::Timeout { ms: 200 })
    );
}

#[tokio::test]
async fn resolver_opened_from_config_heals_through_http() {
    let (url, stub) = serve(StatusCode::OK, "`#go`", Duration::ZERO).await;
    let dir = TempDir::new().unwrap();
    let config = ResolverConfig::default()
        .with_cache_dir(dir.path())
        .with_inference(config(&url));
    let page = Arc::new(StaticPage::new(
        r#"<body><button id="go" onclick="x()">Go</button><script>1</script></body>"#,
    ));

    let mut resolver = LocatorResolver::open(page, "http-suite", config)
        .unwrap()
        .with_events(Arc::new(NullSink));
    assert_eq!(resolver.resolve("go-btn", "Go button").await.unwrap(), "#go");
    assert_eq!(resolver.resolve("go-btn", "Go button").await.unwrap(), "#go");

    assert_eq!(stub.requests.lock().unwrap().len(), 1);
    let reopened = LocatorStore::open(dir.path(), "http-suite", Arc::new(NullSink));
    assert_eq!(reopened.get("go-btn"), Some("#go"));
}
