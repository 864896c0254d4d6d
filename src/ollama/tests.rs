use super::*;
use crate::config::OllamaConfig;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    Config {
        ollama: OllamaConfig {
            host: "127.0.0.1".to_string(),
            port: server.address().port(),
            embedding_model: "test-embed".to_string(),
            generation_model: "test-gen".to_string(),
            embedding_dimension: 64,
            ..OllamaConfig::default()
        },
        ..Config::default()
    }
}

#[test]
fn client_configuration() {
    let config = Config {
        ollama: OllamaConfig {
            host: "test-host".to_string(),
            port: 1234,
            embedding_model: "embed-model".to_string(),
            generation_model: "gen-model".to_string(),
            ..OllamaConfig::default()
        },
        ..Config::default()
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.embedding_model, "embed-model");
    assert_eq!(client.generation_model, "gen-model");
    assert_eq!(client.embedding_dimension, 768);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&Config::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);

    assert_eq!(client.retry_attempts, 5);
}

#[tokio::test]
async fn embedding_request_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({
            "model": "test-embed",
            "input": "What is the punishment for theft?"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "test-embed",
            "embeddings": [[0.25, -0.5, 1.0]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client builds");
    let embedding = tokio::task::spawn_blocking(move || {
        client.encode("What is the punishment for theft?")
    })
    .await
    .expect("blocking task joins")
    .expect("embedding succeeds");

    assert_eq!(embedding, vec![0.25, -0.5, 1.0]);
}

#[tokio::test]
async fn generation_sends_fixed_decoding_options() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "test-gen",
            "stream": false,
            "options": {
                "num_predict": 96,
                "stop": ["\n\n", "Question:", "---"]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "test-gen",
            "response": "  Theft is punishable under Section 12.  ",
            "done": true,
            "eval_count": 9
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client builds");
    let output = tokio::task::spawn_blocking(move || {
        client.generate("LAW TEXT", &GenerationParams::default())
    })
    .await
    .expect("blocking task joins")
    .expect("generation succeeds");

    assert_eq!(output, "  Theft is punishable under Section 12.  ");
}

#[tokio::test]
async fn generation_failures_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("out of memory"))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client builds");
    let result = tokio::task::spawn_blocking(move || {
        client.generate("LAW TEXT", &GenerationParams::default())
    })
    .await
    .expect("blocking task joins");

    match result {
        Err(LegalRagError::Generation(message)) => assert!(message.contains("500")),
        other => panic!("expected generation error, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_embedding_response_is_an_encoding_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": []})))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client builds");
    let result = tokio::task::spawn_blocking(move || client.encode("question"))
        .await
        .expect("blocking task joins");

    assert!(matches!(result, Err(LegalRagError::Encoding(_))));
}

#[tokio::test]
async fn health_check_requires_both_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "test-embed"}]
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client builds");
    let result = tokio::task::spawn_blocking(move || client.health_check())
        .await
        .expect("blocking task joins");

    let error = result.expect_err("generation model is missing");
    assert!(error.to_string().contains("test-gen"));
}

#[tokio::test]
async fn health_check_passes_with_models_present() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "test-embed", "size": 274302450_u64},
                {"name": "test-gen", "details": {"family": "llama"}}
            ]
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client builds");
    let result = tokio::task::spawn_blocking(move || client.health_check())
        .await
        .expect("blocking task joins");

    assert!(result.is_ok(), "health check failed: {:?}", result);
}
