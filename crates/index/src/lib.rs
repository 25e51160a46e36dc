pub mod embedding;
mod store;

pub use embedding::{build_embedder, Embedder, EmbeddingError};
pub use store::{IndexError, VectorIndex};
