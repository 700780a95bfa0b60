use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn config_for(server: &MockServer) -> OpenAiConfig {
    OpenAiConfig::new("test-key").with_base_url(server.uri())
}

#[test]
fn test_config_defaults() {
    let config = OpenAiConfig::new("key");
    assert_eq!(config.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.chat_model, DEFAULT_CHAT_MODEL);
    assert_eq!(config.embedding_model, DEFAULT_EMBEDDING_MODEL);
    assert_eq!(config.embedding_dimension, 1536);
}

#[test]
fn test_config_builders() {
    let config = OpenAiConfig::new("key")
        .with_base_url("https://compat.example/v1")
        .with_chat_model("qwen-plus")
        .with_embedding_model("text-embedding-v1");
    assert_eq!(config.base_url, "https://compat.example/v1");
    assert_eq!(config.chat_model, "qwen-plus");
    assert_eq!(config.embedding_model, "text-embedding-v1");
}

#[test]
fn test_endpoint_trims_trailing_slash() {
    let chat = OpenAiChat::new(OpenAiConfig::new("key").with_base_url("https://x/v1/")).unwrap();
    assert_eq!(chat.endpoint(), "https://x/v1/chat/completions");
}

#[test]
fn test_build_request() {
    let chat = OpenAiChat::new(OpenAiConfig::new("key")).unwrap();
    let request = chat.build_request("你好");
    assert_eq!(request.model, DEFAULT_CHAT_MODEL);
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.messages[0].role, "user");
    assert_eq!(request.temperature, Some(0.2));
}

#[tokio::test]
async fn test_generate_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "**咳嗽有痰吗？**"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 5, "completion_tokens": 8, "total_tokens": 13}
        })))
        .mount(&server)
        .await;

    let chat = OpenAiChat::new(config_for(&server)).unwrap();
    let response = chat.generate("病人主诉咳嗽").await.unwrap();
    assert_eq!(response, "**咳嗽有痰吗？**");
}

#[tokio::test]
async fn test_generate_maps_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let chat = OpenAiChat::new(config_for(&server)).unwrap();
    let err = chat.generate("prompt").await.unwrap_err();
    assert!(matches!(err, OracleError::AuthenticationFailed(_)));
}

#[tokio::test]
async fn test_generate_maps_rate_limit_with_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "17"))
        .mount(&server)
        .await;

    let chat = OpenAiChat::new(config_for(&server)).unwrap();
    let err = chat.generate("prompt").await.unwrap_err();
    match err {
        OracleError::RateLimited {
            retry_after_seconds,
        } => assert_eq!(retry_after_seconds, 17),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_generate_maps_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let chat = OpenAiChat::new(config_for(&server)).unwrap();
    let err = chat.generate("prompt").await.unwrap_err();
    match err {
        OracleError::ApiError { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "overloaded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_generate_rejects_empty_choices() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [],
            "usage": null
        })))
        .mount(&server)
        .await;

    let chat = OpenAiChat::new(config_for(&server)).unwrap();
    let err = chat.generate("prompt").await.unwrap_err();
    assert!(matches!(err, OracleError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_embed_returns_vector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"index": 0, "embedding": [0.1, 0.2, 0.3]}],
            "model": "text-embedding-ada-002",
            "usage": {"prompt_tokens": 3, "total_tokens": 3}
        })))
        .mount(&server)
        .await;

    let embedder = OpenAiEmbedder::new(config_for(&server)).unwrap();
    let embedding = embedder.embed("咳嗽三天").await.unwrap();
    assert_eq!(embedding.dimension, 3);
    assert!((embedding.vector[1] - 0.2).abs() < 1e-6);
}

#[tokio::test]
async fn test_embed_substitutes_empty_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_string_contains("\"input\":\"None\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"index": 0, "embedding": [0.0]}],
            "model": "text-embedding-ada-002",
            "usage": null
        })))
        .mount(&server)
        .await;

    let embedder = OpenAiEmbedder::new(config_for(&server)).unwrap();
    assert!(embedder.embed("   ").await.is_ok());
}
