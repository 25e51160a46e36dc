//! Tests for the paragraph chunker.

use super::extract_chunks;
use crate::document::{ExtractedDocument, PageContent};

fn make_doc(pages: Vec<(usize, &str)>) -> ExtractedDocument {
    ExtractedDocument {
        filename: "test.pdf".to_string(),
        file_type: "pdf".to_string(),
        pages: pages
            .into_iter()
            .map(|(num, text)| PageContent {
                page_number: num,
                text: text.to_string(),
            })
            .collect(),
    }
}

#[test]
fn splits_pages_into_paragraph_chunks() {
    let doc = make_doc(vec![(1, "Clause A.\n\nClause B."), (2, "Clause C.")]);
    let chunks = extract_chunks(&doc);

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].text, "Clause A.");
    assert_eq!(chunks[0].page, 1);
    assert_eq!(chunks[1].text, "Clause B.");
    assert_eq!(chunks[1].page, 1);
    assert_eq!(chunks[2].text, "Clause C.");
    assert_eq!(chunks[2].page, 2);
}

#[test]
fn collapses_internal_whitespace() {
    let doc = make_doc(vec![(1, "A sentence\nwrapped over   several\n lines.")]);
    let chunks = extract_chunks(&doc);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "A sentence wrapped over several lines.");
}

#[test]
fn chunks_are_nonempty_and_newline_free() {
    let doc = make_doc(vec![
        (1, "First.\n\n   \n\nSecond\nparagraph."),
        (2, "\n\nThird."),
    ]);
    for chunk in extract_chunks(&doc) {
        assert!(!chunk.text.trim().is_empty());
        assert!(!chunk.text.contains('\n'));
    }
}

#[test]
fn skips_whitespace_only_paragraphs() {
    let doc = make_doc(vec![(1, "Real content.\n\n   \t \n\nMore content.")]);
    let chunks = extract_chunks(&doc);

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].text, "Real content.");
    assert_eq!(chunks[1].text, "More content.");
}

#[test]
fn page_order_is_monotonic() {
    let doc = make_doc(vec![
        (1, "One.\n\nTwo."),
        (2, "Three."),
        (3, "Four.\n\nFive.\n\nSix."),
    ]);
    let chunks = extract_chunks(&doc);

    assert_eq!(chunks.len(), 6);
    for pair in chunks.windows(2) {
        assert!(pair[0].page <= pair[1].page);
    }
}

#[test]
fn empty_document_yields_no_chunks() {
    let doc = make_doc(vec![]);
    assert!(extract_chunks(&doc).is_empty());
}

#[test]
fn blank_page_contributes_no_chunks() {
    let doc = make_doc(vec![(1, "   \n\n \t"), (2, "Content.")]);
    let chunks = extract_chunks(&doc);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].page, 2);
}
