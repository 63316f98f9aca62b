//! Provider clients against a throwaway local http server.

use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use serde_json::{json, Value};

use crate::config::{EmbeddingConfig, ProviderKind};
use crate::semantic::huggingface::HuggingFaceProvider;
use crate::semantic::openai::OpenAiProvider;
use crate::semantic::{provider_from_config, EmbeddingError, EmbeddingProvider};

#[derive(Default)]
struct Script {
    /// Responses served in order; anything past the end gets a 500
    responses: Mutex<Vec<(u16, String)>>,
    requests: Mutex<Vec<(Option<String>, Value)>>,
}

struct MockServer {
    endpoint: String,
    script: Arc<Script>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockServer {
    fn start(responses: Vec<(u16, &str)>) -> Self {
        let script = Arc::new(Script {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .rev()
                    .map(|(status, body)| (status, body.to_string()))
                    .collect(),
            ),
            ..Default::default()
        });

        let (addr_tx, addr_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        std::thread::spawn({
            let script = script.clone();
            move || {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap();

                rt.block_on(async move {
                    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                    addr_tx.send(listener.local_addr().unwrap()).unwrap();

                    let router = Router::new()
                        .route("/embed", post(respond))
                        .with_state(script);

                    axum::serve(listener, router)
                        .with_graceful_shutdown(async {
                            shutdown_rx.await.ok();
                        })
                        .await
                        .unwrap();
                });
            }
        });

        let addr = addr_rx.recv().unwrap();
        Self {
            endpoint: format!("http://{addr}/embed"),
            script,
            shutdown: Some(shutdown_tx),
        }
    }

    fn hits(&self) -> usize {
        self.script.requests.lock().unwrap().len()
    }

    fn requests(&self) -> Vec<(Option<String>, Value)> {
        self.script.requests.lock().unwrap().clone()
    }

    fn config(&self, provider: ProviderKind) -> EmbeddingConfig {
        EmbeddingConfig {
            provider,
            api_key: Some("test-key".to_string()),
            endpoint: Some(self.endpoint.clone()),
            initial_backoff_ms: 50,
            ..Default::default()
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
    }
}

async fn respond(
    State(script): State<Arc<Script>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = serde_json::from_str(&body).unwrap_or(Value::Null);
    script.requests.lock().unwrap().push((auth, body));

    let (status, body) = script
        .responses
        .lock()
        .unwrap()
        .pop()
        .unwrap_or((500, "script exhausted".to_string()));
    (StatusCode::from_u16(status).unwrap(), body)
}

const LOADING: &str = r#"{"error":"Model BAAI/bge-small-en-v1.5 is currently loading","estimated_time":20.0}"#;

#[test]
fn test_retries_while_model_loads() {
    let server = MockServer::start(vec![(503, LOADING), (503, LOADING), (200, "[0.25, -0.5, 1.0]")]);
    let provider = HuggingFaceProvider::new(&server.config(ProviderKind::HuggingFace)).unwrap();

    let started = Instant::now();
    let embedding = provider.embed("Clean Code").unwrap();

    assert_eq!(embedding, vec![0.25, -0.5, 1.0]);
    assert_eq!(server.hits(), 3);
    // 50ms + 100ms of backoff
    assert!(started.elapsed() >= Duration::from_millis(150));

    let requests = server.requests();
    assert_eq!(requests[0].0.as_deref(), Some("Bearer test-key"));
    assert_eq!(requests[0].1, json!({ "inputs": "Clean Code" }));
}

#[test]
fn test_gives_up_after_max_attempts() {
    let server = MockServer::start(vec![(503, LOADING), (503, LOADING), (503, LOADING), (200, "[1.0]")]);
    let provider = HuggingFaceProvider::new(&server.config(ProviderKind::HuggingFace)).unwrap();

    let err = provider.embed("Clean Code").unwrap_err();
    match err {
        EmbeddingError::Provider {
            status,
            attempts,
            max_attempts,
            body,
            ..
        } => {
            assert_eq!(status, 503);
            assert_eq!(attempts, 3);
            assert_eq!(max_attempts, 3);
            assert!(body.contains("currently loading"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(server.hits(), 3);
}

#[test]
fn test_other_statuses_are_not_retried() {
    let server = MockServer::start(vec![(401, r#"{"error":"Invalid credentials"}"#), (200, "[1.0]")]);
    let provider = HuggingFaceProvider::new(&server.config(ProviderKind::HuggingFace)).unwrap();

    let err = provider.embed("Clean Code").unwrap_err();
    assert!(
        matches!(err, EmbeddingError::Provider { status: 401, attempts: 1, .. }),
        "{err:?}"
    );
    assert!(err.to_string().contains("attempt 1/3"), "{err}");
    assert_eq!(server.hits(), 1);
}

#[test]
fn test_missing_api_key_is_a_configuration_error() {
    let server = MockServer::start(vec![(200, "[1.0]")]);
    let mut config = server.config(ProviderKind::HuggingFace);
    config.api_key = Some("   ".to_string());

    let provider = HuggingFaceProvider::new(&config).unwrap();
    let err = provider.embed("Clean Code").unwrap_err();
    assert!(matches!(err, EmbeddingError::Configuration(_)), "{err:?}");
    assert!(err.to_string().contains("BOOKSTORE_EMBEDDING_API_KEY"));
    assert_eq!(server.hits(), 0);
}

#[test]
fn test_malformed_responses() {
    let server = MockServer::start(vec![
        (200, r#"{"error":"unexpected"}"#),
        (200, "[]"),
        (200, "[[0.1, 0.2]]"),
        (200, "not json"),
    ]);
    let provider = HuggingFaceProvider::new(&server.config(ProviderKind::HuggingFace)).unwrap();

    for _ in 0..4 {
        let err = provider.embed("Clean Code").unwrap_err();
        assert!(matches!(err, EmbeddingError::MalformedResponse(_)), "{err:?}");
    }
    assert_eq!(server.hits(), 4);
}

#[test]
fn test_openai_request_and_response_shape() {
    let server = MockServer::start(vec![
        (200, r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.5, 0.5]}],"model":"text-embedding-3-small"}"#),
        (200, r#"{"data":[]}"#),
    ]);
    let provider = OpenAiProvider::new(&server.config(ProviderKind::OpenAi)).unwrap();

    assert_eq!(provider.embed("Refactoring").unwrap(), vec![0.5, 0.5]);
    let requests = server.requests();
    assert_eq!(
        requests[0].1,
        json!({ "model": "text-embedding-3-small", "input": "Refactoring" })
    );

    let err = provider.embed("Refactoring").unwrap_err();
    assert!(matches!(err, EmbeddingError::MalformedResponse(_)), "{err:?}");
}

#[test]
fn test_provider_selected_from_config() {
    let server = MockServer::start(vec![]);

    let provider = provider_from_config(&server.config(ProviderKind::HuggingFace)).unwrap();
    assert_eq!(provider.name(), "huggingface");

    let provider = provider_from_config(&server.config(ProviderKind::OpenAi)).unwrap();
    assert_eq!(provider.name(), "openai");
}
