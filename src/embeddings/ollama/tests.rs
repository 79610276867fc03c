use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OllamaClient {
    let address = server.address();
    let config = EmbeddingConfig {
        host: address.ip().to_string(),
        port: address.port(),
        model: "test-model".to_string(),
        batch_size: 2,
        ..EmbeddingConfig::default()
    };

    OllamaClient::new(&config)
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(5))
        .with_retry_attempts(2)
        .with_backoff_unit(Duration::from_millis(10))
}

#[test]
fn client_configuration() {
    let config = EmbeddingConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        model: "test-model".to_string(),
        batch_size: 128,
        ..EmbeddingConfig::default()
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
    assert_eq!(client.model_name(), "test-model");
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&EmbeddingConfig::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);

    assert_eq!(client.retry_attempts, 5);

    let client = client.with_retry_attempts(0);
    assert_eq!(client.retry_attempts, 1);
}

#[tokio::test]
async fn encode_single_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "input": ["who is the customer"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.1, 0.2, 0.3]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let vector = client
        .encode("who is the customer")
        .await
        .expect("embedding should succeed");

    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn encode_batch_splits_by_batch_size() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "input": ["a", "b"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[1.0, 0.0], [0.0, 1.0]]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "input": ["c"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.5, 0.5]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let vectors = client
        .encode_batch(&texts)
        .await
        .expect("batch embedding should succeed");

    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]);
}

#[tokio::test]
async fn encode_batch_empty_input() {
    let client = OllamaClient::new(&EmbeddingConfig::default()).expect("Failed to create client");
    let vectors = client
        .encode_batch(&[])
        .await
        .expect("empty batch should succeed");

    assert!(vectors.is_empty());
}

#[tokio::test]
async fn mismatched_response_count_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[1.0, 0.0]]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let texts = vec!["a".to_string(), "b".to_string()];
    let result = client.encode_batch(&texts).await;

    assert!(matches!(result, Err(WingmanError::Embedding(_))));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.encode("query").await;

    assert!(matches!(result, Err(WingmanError::Embedding(_))));
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.encode("query").await;

    assert!(matches!(result, Err(WingmanError::Embedding(_))));
}

#[tokio::test]
async fn validate_model_against_tags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": "test-model" }, { "name": "other", "size": 10 }]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (models, health) = tokio::task::spawn_blocking(move || {
        let models = client.list_models();
        let health = client.health_check();
        (models, health)
    })
    .await
    .expect("blocking task should finish");

    assert_eq!(models.expect("models should list").len(), 2);
    assert!(health.is_ok());
}
