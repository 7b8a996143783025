use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use sts_harness::gateway::usage::{CallStatus, ProviderCallRecord};
use sts_harness::gateway::{
    Attribution, ChatRequest, EmbedRequest, FinishReason, Message, ModelRef, OllamaAdapter,
    ProviderError, ProviderGateway, UsageSink,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter(server: &MockServer) -> OllamaAdapter {
    OllamaAdapter::with_config(server.uri(), Duration::from_secs(5)).unwrap()
}

fn chat_request() -> ChatRequest {
    ChatRequest::new(
        ModelRef::ollama("llama3.2"),
        vec![Message::user("rate these")],
        Attribution::new("test"),
    )
    .temperature(0.4)
}

#[derive(Default)]
struct CollectingSink {
    records: Mutex<Vec<ProviderCallRecord>>,
}

#[async_trait]
impl UsageSink for CollectingSink {
    async fn record(&self, record: ProviderCallRecord) {
        self.records.lock().unwrap().push(record);
    }
}

#[tokio::test]
async fn chat_sends_temperature_and_parses_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "llama3.2",
            "stream": false,
            "options": { "temperature": 0.4 },
            "messages": [{ "role": "user", "content": "rate these" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2",
            "message": { "role": "assistant", "content": "0.8" },
            "done": true,
            "done_reason": "stop",
            "prompt_eval_count": 42,
            "eval_count": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = adapter(&server).chat(&chat_request()).await.unwrap();
    assert_eq!(resp.content, "0.8");
    assert_eq!(resp.finish_reason, FinishReason::Stop);
    assert_eq!(resp.input_tokens, 42);
    assert_eq!(resp.output_tokens, 3);
}

#[tokio::test]
async fn missing_model_maps_to_model_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error": "model \"llama3.2\" not found" })),
        )
        .mount(&server)
        .await;

    let err = adapter(&server).chat(&chat_request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::ModelNotFound { ref model, .. } if model == "llama3.2"));
    assert!(!err.is_transient());
    assert_eq!(err.http_status(), Some(404));
}

#[tokio::test]
async fn server_errors_are_transient_and_carry_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "error": "loading model" })))
        .mount(&server)
        .await;

    let err = adapter(&server).chat(&chat_request()).await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(err.code(), "provider_error");
    assert!(err.to_string().contains("loading model"));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let adapter = OllamaAdapter::with_config(server.uri(), Duration::from_millis(200)).unwrap();
    let err = adapter.chat(&chat_request()).await.unwrap_err();
    assert_eq!(err.code(), "timeout");
}

#[tokio::test]
async fn embed_returns_one_vector_per_input() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "model": "bge-m3", "input": ["a", "b"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "bge-m3",
            "embeddings": [[0.1, 0.2], [0.3, 0.4]],
            "prompt_eval_count": 4
        })))
        .expect(1)
        .mount(&server)
        .await;

    let req = EmbedRequest::new(
        ModelRef::ollama("bge-m3"),
        vec!["a".to_string(), "b".to_string()],
        Attribution::new("test"),
    );
    let resp = adapter(&server).embed(&req).await.unwrap();
    assert_eq!(resp.embeddings, vec![vec![0.1f32, 0.2], vec![0.3, 0.4]]);
    assert_eq!(resp.input_tokens, 4);
}

#[tokio::test]
async fn embed_count_mismatch_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.1, 0.2]]
        })))
        .mount(&server)
        .await;

    let req = EmbedRequest::new(
        ModelRef::ollama("bge-m3"),
        vec!["a".to_string(), "b".to_string()],
        Attribution::new("test"),
    );
    let err = adapter(&server).embed(&req).await.unwrap_err();
    assert!(err.to_string().contains("expected 2 embeddings, got 1"));
}

#[tokio::test]
async fn provider_gateway_records_success_and_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[1.0, 0.0]],
            "prompt_eval_count": 2
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "not found" })))
        .mount(&server)
        .await;

    let sink = Arc::new(CollectingSink::default());
    let gateway = ProviderGateway::new(adapter(&server), sink.clone());

    let run_id = uuid::Uuid::new_v4();
    gateway
        .embed(EmbedRequest::new(
            ModelRef::ollama("bge-m3"),
            vec!["x".to_string()],
            Attribution::new("scorer::embedding").with_run(run_id),
        ))
        .await
        .unwrap();
    assert!(gateway.chat(chat_request()).await.is_err());

    let records = sink.records.lock().unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].endpoint, "embed");
    assert_eq!(records[0].status, CallStatus::Success);
    assert_eq!(records[0].batch_size, 1);
    assert_eq!(records[0].input_tokens, 2);
    assert_eq!(records[0].run_id, Some(run_id));
    assert_eq!(records[0].caller, "scorer::embedding");

    assert_eq!(records[1].endpoint, "chat");
    assert_eq!(records[1].status, CallStatus::Error);
    assert_eq!(records[1].error_code.as_deref(), Some("model_not_found"));
}
