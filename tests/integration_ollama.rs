#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Integration tests that require a local Ollama instance
// Run with: cargo test --test integration_ollama -- --ignored

use paperchat::config::Config;
use paperchat::embeddings::chunking::{ContentChunk, estimate_token_count};
use paperchat::embeddings::ollama::OllamaClient;
use std::env;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info};

fn create_integration_test_client() -> (OllamaClient, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config::load(temp_dir.path()).expect("should build default config");

    if let Ok(host) = env::var("OLLAMA_HOST") {
        config.ollama.host = host;
    }
    if let Some(port) = env::var("OLLAMA_PORT").ok().and_then(|p| p.parse().ok()) {
        config.ollama.port = port;
    }
    if let Ok(model) = env::var("OLLAMA_EMBEDDING_MODEL") {
        config.ollama.embedding_model = model;
    }
    if let Ok(model) = env::var("OLLAMA_CHAT_MODEL") {
        config.ollama.chat_model = model;
    }
    config.ollama.batch_size = 5;

    let client = OllamaClient::new(&config)
        .expect("Failed to create Ollama client")
        .with_timeout(Duration::from_secs(120))
        .with_retry_attempts(3);

    (client, temp_dir)
}

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok();
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_health_check() {
    init_test_tracing();

    let (client, _temp_dir) = create_integration_test_client();

    info!("Testing health check against real Ollama instance");
    let result = client.health_check();

    assert!(
        result.is_ok(),
        "Health check should succeed with local Ollama: {:?}",
        result
    );
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_list_models() {
    init_test_tracing();

    let (client, _temp_dir) = create_integration_test_client();

    let result = client.list_models();
    assert!(result.is_ok(), "Model listing should succeed: {:?}", result);

    let models = result.expect("models exist");
    assert!(
        !models.is_empty(),
        "Should have at least one model available"
    );

    info!("Found {} models", models.len());
    for model in &models {
        debug!("Available model: {} (size: {:?})", model.name, model.size);
    }
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_single_embedding() {
    init_test_tracing();

    let (client, _temp_dir) = create_integration_test_client();

    let test_text = "This is a test document about machine learning and artificial intelligence.";

    let result = client.generate_embedding(test_text);
    assert!(
        result.is_ok(),
        "Single embedding generation should succeed: {:?}",
        result
    );

    let embedding_result = result.expect("embedding result succeeded");
    assert_eq!(embedding_result.text, test_text);
    assert!(
        !embedding_result.embedding.is_empty(),
        "Embedding should not be empty"
    );
    assert!(
        embedding_result.token_count > 0,
        "Token count should be positive"
    );
    assert!(
        embedding_result.embedding.len() >= 100,
        "Embedding should have reasonable number of dimensions"
    );
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_chunk_embeddings() {
    init_test_tracing();

    let (client, _temp_dir) = create_integration_test_client();

    let texts = [
        "The transformer architecture relies entirely on attention mechanisms.",
        "Positional encodings inject order information into the model.",
        "Multi-head attention attends to information from different subspaces.",
    ];

    let test_chunks: Vec<ContentChunk> = texts
        .iter()
        .enumerate()
        .map(|(i, text)| ContentChunk {
            content: (*text).to_string(),
            page_number: 1,
            chunk_index: i,
            token_count: estimate_token_count(text),
        })
        .collect();

    let result = client.generate_chunk_embeddings(&test_chunks);
    assert!(
        result.is_ok(),
        "Chunk embedding generation should succeed: {:?}",
        result
    );

    let embedding_results = result.expect("embedding result succeeded");
    assert_eq!(
        embedding_results.len(),
        test_chunks.len(),
        "Should have one embedding per chunk"
    );

    let first_dim = embedding_results[0].embedding.len();
    for (i, embedding_result) in embedding_results.iter().enumerate() {
        let original_chunk = &test_chunks[i];

        assert_eq!(embedding_result.text, original_chunk.content);
        assert_eq!(
            embedding_result.chunk_index,
            Some(original_chunk.chunk_index)
        );
        assert_eq!(
            embedding_result.page_number,
            Some(original_chunk.page_number)
        );
        assert_eq!(
            embedding_result.embedding.len(),
            first_dim,
            "Embedding {} should have consistent dimensions",
            i
        );
    }
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_generation() {
    init_test_tracing();

    let (client, _temp_dir) = create_integration_test_client();

    let prompt = "Answer with a single word: what is the capital of France?";
    let result = client.generate(prompt);

    assert!(result.is_ok(), "Generation should succeed: {:?}", result);

    let response = result.expect("generation succeeded");
    assert!(!response.trim().is_empty(), "Response should not be empty");
    info!("Model responded: {}", response);
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_error_recovery() {
    init_test_tracing();

    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config::load(temp_dir.path()).expect("should build default config");
    config.ollama.embedding_model = "non-existent-model-12345".to_string();

    let client = OllamaClient::new(&config)
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(10))
        .with_retry_attempts(1);

    let result = client.health_check();
    assert!(
        result.is_err(),
        "Health check should fail with invalid model"
    );

    let result = client.generate_embedding("test text");
    assert!(
        result.is_err(),
        "Embedding generation should fail with invalid model"
    );
}
