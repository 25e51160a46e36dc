//! Integration tests for the batch query endpoint.
//!
//! The embedding and completion collaborators are replaced with local,
//! deterministic fakes so no network access happens.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tokio::sync::RwLock;
use tower::ServiceExt;

use docuquery_index::{Embedder, EmbeddingError, VectorIndex};
use docuquery_llm::{AnswerSynthesizer, LlmError, LlmProvider, Message};
use docuquery_server::{build_router, AppState};

/// Letter-count embedding (4 dims) that records how often it was called.
struct CountingEmbedder {
    calls: AtomicUsize,
}

impl CountingEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                "abcd"
                    .chars()
                    .map(|letter| t.chars().filter(|c| *c == letter).count() as f32)
                    .collect()
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn model_id(&self) -> &str {
        "mock-counts"
    }
}

struct EchoProvider;

#[async_trait]
impl LlmProvider for EchoProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        Ok(format!(
            "answered: {}",
            messages.last().map(|m| m.content.as_str()).unwrap_or("")
        ))
    }
}

fn make_state(
    document_path: PathBuf,
    artifact_path: PathBuf,
    embedder: Arc<CountingEmbedder>,
) -> Arc<AppState> {
    Arc::new(AppState {
        index: Some(Arc::new(RwLock::new(VectorIndex::new(embedder)))),
        synthesizer: Arc::new(AnswerSynthesizer::new(Box::new(EchoProvider), 0.1, 256)),
        auth_token: Some("secret-token".to_string()),
        document_path,
        artifact_path,
        max_concurrency: 2,
    })
}

fn run_request(token: Option<&str>, questions: &[&str]) -> Request<Body> {
    let body = serde_json::json!({
        "documents": "",
        "questions": questions,
    });
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/query/run")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn write_document(dir: &Path) -> PathBuf {
    let path = dir.join("doc.txt");
    std::fs::write(&path, "Clause A about aaaa.\n\nClause B about bbbb.").unwrap();
    path
}

#[tokio::test]
async fn wrong_bearer_token_is_rejected_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_document(dir.path());
    let artifact = dir.path().join("doc.idx");
    let embedder = Arc::new(CountingEmbedder::new());
    let app = build_router(make_state(document, artifact.clone(), embedder.clone()));

    let response = app
        .oneshot(run_request(Some("wrong"), &["What is covered?"]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid authorization token");
    assert_eq!(embedder.calls(), 0, "no embedding work on rejected requests");
    assert!(!artifact.exists());
}

#[tokio::test]
async fn missing_header_is_rejected_like_a_bad_token() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_document(dir.path());
    let embedder = Arc::new(CountingEmbedder::new());
    let app = build_router(make_state(document, dir.path().join("doc.idx"), embedder));

    let response = app.oneshot(run_request(None, &["q"])).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn absent_local_document_returns_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(CountingEmbedder::new());
    let app = build_router(make_state(
        dir.path().join("nope.pdf"),
        dir.path().join("doc.idx"),
        embedder,
    ));

    let response = app
        .oneshot(run_request(Some("secret-token"), &["q"]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn batch_request_builds_persists_and_answers() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_document(dir.path());
    let artifact = dir.path().join("doc.idx");
    let embedder = Arc::new(CountingEmbedder::new());
    let state = make_state(document, artifact.clone(), embedder.clone());

    let response = build_router(state.clone())
        .oneshot(run_request(Some("secret-token"), &["aaaa?", "bbbb?"]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let answers = body["answers"].as_array().unwrap();
    assert_eq!(answers.len(), 2, "one entry per question, in order");

    for answer in answers {
        assert!(answer["answer"].as_str().unwrap().starts_with("answered:"));
        let sources = answer["sources"].as_array().unwrap();
        assert_eq!(sources.len(), 2, "both clauses retrieved, top_k clamped");
        assert_eq!(sources[0]["page"], 1);
    }

    // The first question ranks the aaaa clause first, the second the bbbb one.
    assert!(answers[0]["sources"][0]["text"]
        .as_str()
        .unwrap()
        .contains("aaaa"));
    assert!(answers[1]["sources"][0]["text"]
        .as_str()
        .unwrap()
        .contains("bbbb"));

    assert!(artifact.exists(), "index artifact persisted after first build");

    // A second request reuses the built index: only query embeddings run.
    let calls_after_first = embedder.calls();
    let response = build_router(state)
        .oneshot(run_request(Some("secret-token"), &["aaaa again?"]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(embedder.calls(), calls_after_first + 1);
}

#[tokio::test]
async fn health_reports_readiness() {
    let dir = tempfile::tempdir().unwrap();
    let document = write_document(dir.path());
    let embedder = Arc::new(CountingEmbedder::new());
    let app = build_router(make_state(document, dir.path().join("doc.idx"), embedder));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["index_ready"], false);
    assert_eq!(body["llm_available"], true);
}
