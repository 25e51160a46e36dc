//! Embedding-backed vector index for one chunk set at a time.
//!
//! The index pairs an ordered chunk sequence with a parallel matrix of
//! embeddings and answers nearest-neighbor queries with an exact L2 scan.
//! Corpora are single-document-sized (hundreds of chunks, not millions),
//! so an exhaustive scan beats maintaining an ANN structure.

use std::path::Path;
use std::sync::Arc;

use docuquery_core::Chunk;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::embedding::{Embedder, EmbeddingError};

/// Chunks are embedded in batches to avoid API timeouts on large documents.
const DEFAULT_EMBED_BATCH_SIZE: usize = 64;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index has not been built or loaded")]
    NotBuilt,

    #[error("corrupt index artifact: {0}")]
    CorruptArtifact(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persisted artifact layout: one opaque blob per indexed document.
#[derive(Serialize, Deserialize)]
struct IndexArtifact {
    model: String,
    dimension: usize,
    /// Row-major flattened embedding matrix, `chunks.len()` rows.
    vectors: Vec<f32>,
    chunks: Vec<Chunk>,
}

/// The built state: chunks plus their embeddings, replaced wholesale on
/// every successful build/load. Invariant: `vectors.len() == dimension *
/// chunks.len()`, and row *i* is the embedding of chunk *i*.
struct BuiltIndex {
    dimension: usize,
    vectors: Vec<f32>,
    chunks: Vec<Chunk>,
}

impl BuiltIndex {
    fn row(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dimension..(i + 1) * self.dimension]
    }
}

/// Owns embedding-model access and the search structure for exactly one
/// document's chunk set.
///
/// `search` takes `&self` and is safe to invoke from concurrent tasks;
/// `build`/`load` take `&mut self` so callers serialize whole-structure
/// replacement at request boundaries.
pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    embed_batch_size: usize,
    built: Option<BuiltIndex>,
}

impl VectorIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
            built: None,
        }
    }

    /// Override how many chunks go into each embedding call.
    pub fn with_embed_batch_size(mut self, batch_size: usize) -> Self {
        self.embed_batch_size = batch_size.max(1);
        self
    }

    /// Whether a successful `build` or `load` has happened.
    pub fn is_built(&self) -> bool {
        self.built.is_some()
    }

    /// Number of indexed chunks (0 before any build).
    pub fn len(&self) -> usize {
        self.built.as_ref().map_or(0, |b| b.chunks.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embed every chunk and replace any previously held index atomically:
    /// the new state is staged locally and only swapped in once every batch
    /// embedded successfully, so a failed build leaves the old index intact.
    ///
    /// An empty chunk sequence is legal and yields a queryable index whose
    /// searches return no results.
    pub async fn build(&mut self, chunks: Vec<Chunk>) -> Result<(), IndexError> {
        let dimension = self.embedder.dimensions();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();

        let mut vectors: Vec<f32> = Vec::with_capacity(texts.len() * dimension);
        for (i, batch) in texts.chunks(self.embed_batch_size).enumerate() {
            debug!(
                "Embedding batch {}/{} ({} chunks)",
                i + 1,
                texts.len().div_ceil(self.embed_batch_size),
                batch.len()
            );
            let batch_embeddings = self.embedder.embed_batch(batch).await?;
            for embedding in &batch_embeddings {
                if embedding.len() != dimension {
                    return Err(IndexError::Embedding(EmbeddingError::DimensionMismatch {
                        expected: dimension,
                        actual: embedding.len(),
                    }));
                }
                vectors.extend_from_slice(embedding);
            }
        }

        info!("Index built: {} chunks, {} dims", chunks.len(), dimension);
        self.built = Some(BuiltIndex {
            dimension,
            vectors,
            chunks,
        });
        Ok(())
    }

    /// Exact nearest-neighbor search by L2 distance, most similar first.
    ///
    /// `top_k` values exceeding the index size are clamped. Searching an
    /// empty (but built) index returns an empty result, not an error.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Chunk>, IndexError> {
        let built = self.built.as_ref().ok_or(IndexError::NotBuilt)?;
        if built.chunks.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let embeddings = self.embedder.embed_batch(&[query]).await?;
        let query_vec = embeddings
            .first()
            .ok_or_else(|| IndexError::Embedding(EmbeddingError::Api("no embedding returned".into())))?;
        if query_vec.len() != built.dimension {
            return Err(IndexError::Embedding(EmbeddingError::DimensionMismatch {
                expected: built.dimension,
                actual: query_vec.len(),
            }));
        }

        let mut ranked: Vec<(f32, usize)> = (0..built.chunks.len())
            .map(|i| (l2_distance(query_vec, built.row(i)), i))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        ranked.truncate(top_k.min(built.chunks.len()));

        Ok(ranked
            .into_iter()
            .map(|(_, i)| built.chunks[i].clone())
            .collect())
    }

    /// Serialize the index and its chunk sequence to a single artifact.
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let built = self.built.as_ref().ok_or(IndexError::NotBuilt)?;

        let artifact = IndexArtifact {
            model: self.embedder.model_id().to_string(),
            dimension: built.dimension,
            vectors: built.vectors.clone(),
            chunks: built.chunks.clone(),
        };
        let bytes = rmp_serde::to_vec(&artifact)
            .map_err(|e| IndexError::CorruptArtifact(format!("encode failed: {e}")))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, &bytes)?;

        info!(
            "Index saved to {} ({} chunks, {} bytes)",
            path.display(),
            built.chunks.len(),
            bytes.len()
        );
        Ok(())
    }

    /// Restore chunks and vectors from a prior `save`, replacing any held
    /// index. Rejects artifacts whose internal shapes disagree.
    pub fn load(&mut self, path: &Path) -> Result<(), IndexError> {
        let bytes = std::fs::read(path)?;
        let artifact: IndexArtifact = rmp_serde::from_slice(&bytes)
            .map_err(|e| IndexError::CorruptArtifact(format!("decode failed: {e}")))?;

        if artifact.dimension == 0 && !artifact.chunks.is_empty() {
            return Err(IndexError::CorruptArtifact(
                "zero dimension with non-empty chunk set".to_string(),
            ));
        }
        let expected_len = artifact.dimension * artifact.chunks.len();
        if artifact.vectors.len() != expected_len {
            return Err(IndexError::CorruptArtifact(format!(
                "vector count disagrees with chunk count: {} floats for {} chunks of dim {}",
                artifact.vectors.len(),
                artifact.chunks.len(),
                artifact.dimension
            )));
        }
        if artifact.model != self.embedder.model_id() {
            tracing::warn!(
                "Artifact was built with model '{}' but current embedder is '{}'",
                artifact.model,
                self.embedder.model_id()
            );
        }

        info!(
            "Index loaded from {} ({} chunks)",
            path.display(),
            artifact.chunks.len()
        );
        self.built = Some(BuiltIndex {
            dimension: artifact.dimension,
            vectors: artifact.vectors,
            chunks: artifact.chunks,
        });
        Ok(())
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
