use serde::{Deserialize, Serialize};

/// A normalized unit of extracted document text tagged with its source page.
///
/// Chunks are created in bulk by the chunker and never mutated afterwards.
/// `text` holds no raw newlines and is non-empty after trimming; `page` is
/// 1-based and refers to a page that existed in the source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub page: usize,
}

impl Chunk {
    pub fn new(text: impl Into<String>, page: usize) -> Self {
        debug_assert!(page >= 1, "chunk pages are 1-based");
        Self {
            text: text.into(),
            page,
        }
    }
}

/// A page-attributed source excerpt returned alongside a synthesized answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub page: usize,
    pub text: String,
}

impl From<&Chunk> for Source {
    fn from(chunk: &Chunk) -> Self {
        Self {
            page: chunk.page,
            text: chunk.text.clone(),
        }
    }
}
