use std::path::PathBuf;
use std::sync::Arc;

use docuquery_index::VectorIndex;
use docuquery_llm::AnswerSynthesizer;
use tokio::sync::RwLock;

/// The index is shared read-mostly across concurrently answered questions;
/// the write half is taken only for the ensure-built/loaded step at a
/// request boundary, never while searches are in flight.
pub type SharedIndex = Arc<RwLock<VectorIndex>>;

pub struct AppState {
    /// None when no embedding provider could be configured.
    pub index: Option<SharedIndex>,
    pub synthesizer: Arc<AnswerSynthesizer>,
    /// Expected bearer token for the batch endpoint.
    pub auth_token: Option<String>,
    /// The fixed local document the batch API answers questions about.
    pub document_path: PathBuf,
    /// Where the persisted index artifact lives.
    pub artifact_path: PathBuf,
    /// Cap on simultaneously in-flight synthesizer calls per batch.
    pub max_concurrency: usize,
}
