pub mod chunker;
pub mod document;
pub mod fetch;

pub use chunker::extract_chunks;
pub use document::{extract_text, ExtractedDocument, ExtractionError, PageContent};
pub use fetch::fetch_document;
