// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text-extraction collaborator seam and its default in-process
// implementation backed by the `pdf-extract` crate.

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::DocumentMetadata;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::model::Document;

/// Document-level extraction result: the full text plus the basic shape of
/// the document it came from.
#[derive(Debug, Clone, Serialize)]
pub struct TextSummary {
    pub text: String,
    pub page_count: usize,
    pub metadata: DocumentMetadata,
}

/// Text-extraction collaborator: raw document bytes to plain text.
///
/// A deliberately separate seam from the primary parsing library, so content
/// analyses and the diff engine can run against any extractor (including the
/// in-tree stub used by tests).
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<TextSummary>;
}

/// Default extractor using the `pdf-extract` crate in-process.
#[derive(Debug, Default)]
pub struct PdfExtractTextExtractor;

impl TextExtractor for PdfExtractTextExtractor {
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    fn extract(&self, bytes: &[u8]) -> Result<TextSummary> {
        let doc = Document::load_permissive(bytes)?;
        let text = pdf_extract::extract_text_from_mem(bytes).map_err(|err| {
            BlattwerkError::ExtractionError(format!("text extraction failed: {err}"))
        })?;
        debug!(chars = text.len(), pages = doc.page_count(), "text extracted");
        Ok(TextSummary {
            text,
            page_count: doc.page_count(),
            metadata: doc.metadata(),
        })
    }
}

/// Extract a document's plain text through the given collaborator.
pub fn extract_text(bytes: &[u8], extractor: &dyn TextExtractor) -> Result<String> {
    Ok(extractor.extract(bytes)?.text)
}

/// Per-page text, obtained by isolating each page as a single-page document
/// and extracting from those bytes.
///
/// A page whose isolation or extraction fails yields `None`; callers treat
/// that fail-open (the page is neither blank nor comparable).
pub fn page_texts(doc: &Document, extractor: &dyn TextExtractor) -> Vec<Option<String>> {
    (0..doc.page_count())
        .map(|index| {
            let isolated = match doc.isolate_page(index) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(page = index, %err, "page isolation failed, skipping extraction");
                    return None;
                }
            };
            match extractor.extract(&isolated) {
                Ok(summary) => Some(summary.text),
                Err(err) => {
                    warn!(page = index, %err, "per-page extraction failed");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{doc_with_pages, pdf_with_pages, FailingExtractor, StubExtractor};

    #[test]
    fn stub_extractor_reads_fixture_text() {
        let bytes = pdf_with_pages(&["the cat sat", "on the mat"]);
        let summary = StubExtractor.extract(&bytes).unwrap();
        assert_eq!(summary.page_count, 2);
        assert!(summary.text.contains("the cat sat"));
        assert!(summary.text.contains("on the mat"));
    }

    #[test]
    fn page_texts_are_per_page() {
        let doc = doc_with_pages(&["first page words", "second page words"]);
        let texts = page_texts(&doc, &StubExtractor);
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].as_deref(), Some("first page words"));
        assert_eq!(texts[1].as_deref(), Some("second page words"));
    }

    #[test]
    fn failing_extractor_yields_none_per_page() {
        let doc = doc_with_pages(&["a", "b"]);
        let texts = page_texts(&doc, &FailingExtractor);
        assert_eq!(texts, vec![None, None]);
    }

    #[test]
    fn extract_text_passthrough() {
        let bytes = pdf_with_pages(&["hello engine"]);
        let text = extract_text(&bytes, &StubExtractor).unwrap();
        assert_eq!(text, "hello engine");
    }
}
