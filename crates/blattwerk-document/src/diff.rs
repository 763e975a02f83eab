// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document comparison: word-set similarity between two documents, and a
// side-by-side review merge that interleaves their pages.

use std::collections::BTreeSet;

use blattwerk_core::error::{BlattwerkError, Result};
use serde::Serialize;
use tracing::{info, instrument};

use crate::extract::TextExtractor;
use crate::model::Document;

/// Maximum number of words listed per `only_in_*` set in a report.
const WORD_LIST_CAP: usize = 100;

/// Per-document statistics in a comparison.
#[derive(Debug, Clone, Serialize)]
pub struct DiffSideStats {
    pub page_count: usize,
    pub word_count: usize,
    pub char_count: usize,
}

/// Outcome of comparing two documents by their extracted text.
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub first: DiffSideStats,
    pub second: DiffSideStats,
    /// Words unique to each side, sorted, capped at 100 entries.
    pub only_in_first: Vec<String>,
    pub only_in_second: Vec<String>,
    pub common_word_count: usize,
    /// `common / max(len(a), len(b)) * 100`; two empty documents score 100.
    pub similarity_score: f64,
}

/// Tokenization is whitespace splitting only; case and punctuation are
/// significant, so reported tokens appear literally in their document.
fn word_set(text: &str) -> BTreeSet<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Compare two documents by their extracted word sets.
#[instrument(skip_all)]
pub fn compare(
    first: &[u8],
    second: &[u8],
    extractor: &dyn TextExtractor,
) -> Result<DiffReport> {
    let first_doc = Document::load_permissive(first)?;
    let second_doc = Document::load_permissive(second)?;
    let first_text = extractor.extract(first)?.text;
    let second_text = extractor.extract(second)?.text;

    let first_words = word_set(&first_text);
    let second_words = word_set(&second_text);

    let common_word_count = first_words.intersection(&second_words).count();
    let larger = first_words.len().max(second_words.len());
    let similarity_score = if larger == 0 {
        100.0
    } else {
        common_word_count as f64 / larger as f64 * 100.0
    };

    let only_in_first: Vec<String> = first_words
        .difference(&second_words)
        .take(WORD_LIST_CAP)
        .cloned()
        .collect();
    let only_in_second: Vec<String> = second_words
        .difference(&first_words)
        .take(WORD_LIST_CAP)
        .cloned()
        .collect();

    info!(similarity_score, common_word_count, "documents compared");
    Ok(DiffReport {
        first: DiffSideStats {
            page_count: first_doc.page_count(),
            word_count: first_words.len(),
            char_count: first_text.chars().count(),
        },
        second: DiffSideStats {
            page_count: second_doc.page_count(),
            word_count: second_words.len(),
            char_count: second_text.chars().count(),
        },
        only_in_first,
        only_in_second,
        common_word_count,
        similarity_score,
    })
}

/// Interleave the pages of two documents for side-by-side review.
///
/// The result alternates page `i` of the first document with page `i` of the
/// second. When one document is shorter, a blank filler page sized like the
/// opposite page keeps the pairing aligned.
#[instrument(skip_all)]
pub fn review_merge(first: &Document, second: &Document) -> Result<Document> {
    if first.page_count() == 0 && second.page_count() == 0 {
        return Err(BlattwerkError::InputMissing(
            "both documents are empty".to_string(),
        ));
    }

    let mut result = Document::new_empty();
    let pairs = first.page_count().max(second.page_count());

    for index in 0..pairs {
        match (index < first.page_count(), index < second.page_count()) {
            (true, true) => {
                first.copy_pages_into(&[index], &mut result)?;
                second.copy_pages_into(&[index], &mut result)?;
            }
            (true, false) => {
                first.copy_pages_into(&[index], &mut result)?;
                let geometry = &first.page_geometry()[index];
                result.append_blank_page(geometry.width, geometry.height)?;
            }
            (false, true) => {
                let geometry = &second.page_geometry()[index];
                result.append_blank_page(geometry.width, geometry.height)?;
                second.copy_pages_into(&[index], &mut result)?;
            }
            (false, false) => unreachable!("index bounded by the longer document"),
        }
    }

    info!(pages = result.page_count(), "review merge assembled");
    Ok(result)
}
