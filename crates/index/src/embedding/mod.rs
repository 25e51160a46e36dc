pub mod ollama;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use docuquery_core::Config;
use tracing::info;

pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;
pub use traits::{Embedder, EmbeddingError};

/// Create the embedding backend named by config.
///
/// Fails with `NotConfigured` when the named provider is unknown or its
/// credential is missing — index builds cannot proceed without one.
pub fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match config.embedding.provider.as_str() {
        "ollama" => {
            let embedder = OllamaEmbedder::new(
                config.ollama.url.clone(),
                config.ollama.embedding_model.clone(),
                config.embedding.dimensions as usize,
            );
            info!(
                "Embedding provider ready: ollama (model: {}, dims: {})",
                config.ollama.embedding_model, config.embedding.dimensions
            );
            Ok(Arc::new(embedder))
        }
        "openai" => {
            let api_key = config.llm.openai_api_key.clone().ok_or_else(|| {
                EmbeddingError::NotConfigured(
                    "EMBEDDING_PROVIDER=openai but OPENAI_API_KEY is empty".to_string(),
                )
            })?;
            let embedder = OpenAiEmbedder::new(
                api_key,
                "text-embedding-3-small".to_string(),
                config.llm.openai_base_url.clone(),
                config.embedding.dimensions as usize,
            );
            info!(
                "Embedding provider ready: openai (dims: {})",
                config.embedding.dimensions
            );
            Ok(Arc::new(embedder))
        }
        other => Err(EmbeddingError::NotConfigured(format!(
            "unknown embedding provider: '{other}'"
        ))),
    }
}
