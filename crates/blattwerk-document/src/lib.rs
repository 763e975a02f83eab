// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-document — Page-oriented PDF transformation and analysis engine.
//
// Provides page transforms (merge, split, extract, rotate, crop, overlays,
// password protection), content analysis (deduplication, blank-page removal,
// orientation normalization), text extraction, an OCR pipeline, document
// comparison, composition of new documents, and structural validation.

pub mod analysis;
pub mod compose;
pub mod diff;
pub mod extract;
pub mod model;
pub mod ocr;
pub mod transform;
pub mod validate;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export the primary types so callers can use `blattwerk_document::Document` etc.
pub use compose::DocumentTemplate;
pub use diff::{compare, review_merge, DiffReport};
pub use extract::{extract_text, PdfExtractTextExtractor, TextExtractor, TextSummary};
pub use model::Document;
pub use ocr::{OcrConfig, OcrOutcome, OcrPipeline};
pub use validate::{extract_form_data, validate, ValidationReport};
