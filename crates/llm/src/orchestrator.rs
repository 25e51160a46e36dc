//! Batch question answering over a shared index and synthesizer.
//!
//! Each question runs as an independent task (search, then synthesize);
//! a counting semaphore caps how many synthesizer calls are in flight so
//! burst batches cannot overload the completion backend. Failures stay
//! local to their question — one degraded entry never aborts siblings.

use std::sync::Arc;

use docuquery_core::Source;
use docuquery_index::VectorIndex;
use serde::Serialize;
use tokio::sync::{RwLock, Semaphore};
use tracing::{info, warn};

use crate::synthesizer::{truncate, AnswerSynthesizer, ERROR_FALLBACK};

/// Context breadth for the interactive chat front end.
pub const CHAT_TOP_K: usize = 7;

/// Context breadth for the batch API — fewer sources for a cleaner output.
pub const BATCH_TOP_K: usize = 5;

/// Returned as the sole batch entry when no index has been built or loaded.
pub const NO_INDEX_ADVISORY: &str =
    "No document has been indexed yet. Index a document before asking questions.";

/// One answered question with its page-attributed source excerpts.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub answer: String,
    pub sources: Vec<Source>,
}

/// Answer a batch of questions against the currently loaded index.
///
/// Result order matches input question order regardless of completion
/// order. At most `max_concurrency` questions are in flight against the
/// synthesizer at once. An unbuilt index short-circuits with a single
/// advisory result instead of attempting any search.
pub async fn answer_batch(
    questions: Vec<String>,
    index: Arc<RwLock<VectorIndex>>,
    synthesizer: Arc<AnswerSynthesizer>,
    top_k: usize,
    max_concurrency: usize,
) -> Vec<RetrievalResult> {
    if !index.read().await.is_built() {
        return vec![RetrievalResult {
            answer: NO_INDEX_ADVISORY.to_string(),
            sources: Vec::new(),
        }];
    }

    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));

    let handles: Vec<_> = questions
        .into_iter()
        .map(|question| {
            let index = index.clone();
            let synthesizer = synthesizer.clone();
            let semaphore = semaphore.clone();
            tokio::spawn(answer_question(question, index, synthesizer, top_k, semaphore))
        })
        .collect();

    // Join in input order; a panicked task degrades to its fallback entry.
    futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| {
            joined.unwrap_or_else(|e| {
                warn!("Question task failed to join: {}", e);
                RetrievalResult {
                    answer: ERROR_FALLBACK.to_string(),
                    sources: Vec::new(),
                }
            })
        })
        .collect()
}

async fn answer_question(
    question: String,
    index: Arc<RwLock<VectorIndex>>,
    synthesizer: Arc<AnswerSynthesizer>,
    top_k: usize,
    semaphore: Arc<Semaphore>,
) -> RetrievalResult {
    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return RetrievalResult {
                answer: ERROR_FALLBACK.to_string(),
                sources: Vec::new(),
            }
        }
    };

    info!("Processing question: '{}…'", truncate(&question, 30));

    let chunks = {
        let guard = index.read().await;
        guard.search(&question, top_k).await
    };

    let chunks = match chunks {
        Ok(chunks) => chunks,
        Err(e) => {
            warn!(
                "Search failed for question '{}…': {}",
                truncate(&question, 30),
                e
            );
            return RetrievalResult {
                answer: ERROR_FALLBACK.to_string(),
                sources: Vec::new(),
            };
        }
    };

    info!(
        "Context for '{}…': pages {:?}",
        truncate(&question, 30),
        chunks.iter().map(|c| c.page).collect::<Vec<_>>()
    );

    let answer = synthesizer.generate(&question, &chunks).await;
    let sources = chunks.iter().map(Source::from).collect();

    RetrievalResult { answer, sources }
}
