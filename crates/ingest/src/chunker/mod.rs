//! Paragraph-preserving chunker.
//!
//! Splits each page's text on blank-line boundaries and normalizes every
//! retained paragraph into a single-line chunk tagged with its page number.

#[cfg(test)]
mod tests;

use docuquery_core::Chunk;

use crate::document::ExtractedDocument;

/// Extract normalized text chunks from a document, keeping paragraphs together.
///
/// Chunks come out in document order: all chunks of page *n* precede all
/// chunks of page *n+1*, and paragraph order within a page is preserved.
/// A page with no paragraphs contributes zero chunks; a document with zero
/// extractable pages yields an empty sequence.
pub fn extract_chunks(doc: &ExtractedDocument) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for page in &doc.pages {
        for paragraph in page.text.split("\n\n") {
            // Collapse internal whitespace runs (including single newlines)
            // to single spaces and drop whitespace-only paragraphs.
            let normalized = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
            if normalized.is_empty() {
                continue;
            }
            chunks.push(Chunk::new(normalized, page.page_number));
        }
    }

    chunks
}
