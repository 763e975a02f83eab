// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Blattwerk.

use thiserror::Error;

/// Top-level error type for all Blattwerk operations.
#[derive(Debug, Error)]
pub enum BlattwerkError {
    // -- Request errors --
    #[error("required input missing or invalid: {0}")]
    InputMissing(String),

    #[error("page index {index} out of range for document with {page_count} pages")]
    PageIndexOutOfRange { index: usize, page_count: usize },

    // -- Document errors --
    #[error("document cannot be parsed: {0}")]
    UnparsableDocument(String),

    #[error("document is encrypted: {0}")]
    EncryptedDocument(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Collaborator errors --
    #[error("required collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    #[error("text extraction failed: {0}")]
    ExtractionError(String),

    // -- Ambient --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlattwerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_page_numbers() {
        let err = BlattwerkError::PageIndexOutOfRange {
            index: 9,
            page_count: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains('9'));
        assert!(msg.contains('3'));
    }
}
