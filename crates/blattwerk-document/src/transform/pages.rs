// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-sequence transforms: merge, split, remove, extract, organize,
// reverse, duplicate, compress.
//
// All of these are copy-on-write: the result is assembled fully in a fresh
// document and the input is never touched, so a mid-operation failure leaves
// no partial output.

use std::collections::BTreeSet;

use blattwerk_core::error::{BlattwerkError, Result};
use tracing::{info, instrument};

use crate::model::Document;

/// Concatenate the pages of each input document in listed order.
#[instrument(skip_all, fields(documents = docs.len()))]
pub fn merge(docs: &[Document]) -> Result<Document> {
    if docs.is_empty() {
        return Err(BlattwerkError::InputMissing(
            "merge requires at least one input document".to_string(),
        ));
    }

    let mut merged = Document::new_empty();
    for doc in docs {
        let all_pages: Vec<usize> = (0..doc.page_count()).collect();
        doc.copy_pages_into(&all_pages, &mut merged)?;
    }
    info!(pages = merged.page_count(), "documents merged");
    Ok(merged)
}

/// For each index range, produce one output document containing exactly
/// those pages in listed order. Any out-of-range index anywhere fails the
/// whole call before any output is produced.
#[instrument(skip_all, fields(ranges = ranges.len()))]
pub fn split(doc: &Document, ranges: &[Vec<usize>]) -> Result<Vec<Document>> {
    if ranges.is_empty() {
        return Err(BlattwerkError::InputMissing(
            "split requires at least one page range".to_string(),
        ));
    }
    for range in ranges {
        doc.check_indices(range)?;
    }

    let mut outputs = Vec::with_capacity(ranges.len());
    for range in ranges {
        let mut part = Document::new_empty();
        doc.copy_pages_into(range, &mut part)?;
        outputs.push(part);
    }
    Ok(outputs)
}

/// Remove the listed pages; remaining pages keep their relative order.
/// Duplicate indices are deduplicated.
#[instrument(skip_all, fields(remove = indices.len()))]
pub fn remove_pages(doc: &Document, indices: &[usize]) -> Result<Document> {
    let distinct: BTreeSet<usize> = indices.iter().copied().collect();
    let as_vec: Vec<usize> = distinct.iter().copied().collect();
    doc.check_indices(&as_vec)?;

    let kept: Vec<usize> = (0..doc.page_count())
        .filter(|index| !distinct.contains(index))
        .collect();

    let mut result = Document::new_empty();
    doc.copy_pages_into(&kept, &mut result)?;
    Ok(result)
}

/// Keep only the listed pages, preserving their original relative order.
/// Duplicate indices are deduplicated.
#[instrument(skip_all, fields(extract = indices.len()))]
pub fn extract_pages(doc: &Document, indices: &[usize]) -> Result<Document> {
    if indices.is_empty() {
        return Err(BlattwerkError::InputMissing(
            "extract_pages requires at least one page index".to_string(),
        ));
    }
    let distinct: Vec<usize> = indices
        .iter()
        .copied()
        .collect::<BTreeSet<usize>>()
        .into_iter()
        .collect();
    doc.check_indices(&distinct)?;

    let mut result = Document::new_empty();
    doc.copy_pages_into(&distinct, &mut result)?;
    Ok(result)
}

/// Reorder pages: result page `i` is input page `order[i]`.
///
/// `order` must be a permutation of `0..page_count`; wrong length, a
/// duplicate, or an out-of-range entry fails before anything is built.
#[instrument(skip_all, fields(pages = order.len()))]
pub fn organize(doc: &Document, order: &[usize]) -> Result<Document> {
    let page_count = doc.page_count();
    if order.len() != page_count {
        return Err(BlattwerkError::InputMissing(format!(
            "page order has {} entries but the document has {} pages",
            order.len(),
            page_count
        )));
    }
    doc.check_indices(order)?;
    let distinct: BTreeSet<usize> = order.iter().copied().collect();
    if distinct.len() != order.len() {
        return Err(BlattwerkError::InputMissing(
            "page order contains duplicate indices".to_string(),
        ));
    }

    let mut result = Document::new_empty();
    doc.copy_pages_into(order, &mut result)?;
    Ok(result)
}

/// Reverse the page sequence. Equivalent to [`organize`] with the reversed
/// index sequence.
pub fn reverse(doc: &Document) -> Result<Document> {
    let order: Vec<usize> = (0..doc.page_count()).rev().collect();
    organize(doc, &order)
}

/// Follow each page at a listed index immediately with a copy of itself;
/// later originals shift accordingly. Duplicate indices are deduplicated.
#[instrument(skip_all, fields(duplicate = indices.len()))]
pub fn duplicate(doc: &Document, indices: &[usize]) -> Result<Document> {
    let distinct: BTreeSet<usize> = indices.iter().copied().collect();
    let as_vec: Vec<usize> = distinct.iter().copied().collect();
    doc.check_indices(&as_vec)?;

    let mut sequence = Vec::with_capacity(doc.page_count() + distinct.len());
    for index in 0..doc.page_count() {
        sequence.push(index);
        if distinct.contains(&index) {
            sequence.push(index);
        }
    }

    let mut result = Document::new_empty();
    doc.copy_pages_into(&sequence, &mut result)?;
    Ok(result)
}

/// Re-serialise with structural sharing only: renumber objects and
/// flate-compress content streams.
///
/// No lossy recompression of embedded raster content happens here; for
/// documents dominated by images the saving is modest. Quality hints from
/// callers are advisory only.
#[instrument(skip_all)]
pub fn compress(doc: &Document) -> Result<Vec<u8>> {
    let mut inner = doc.inner.clone();
    inner.renumber_objects();
    inner.compress();
    let mut compacted = Document::from_inner(inner, doc.encrypted());
    compacted.save()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::doc_with_pages;

    fn page_order(doc: &Document) -> Vec<String> {
        // Fixture pages carry their text as the only literal string; pull it
        // back out of each isolated page for order assertions.
        use crate::extract::page_texts;
        use crate::testutil::StubExtractor;
        page_texts(doc, &StubExtractor)
            .into_iter()
            .map(|t| t.unwrap_or_default())
            .collect()
    }

    #[test]
    fn merge_concatenates_in_listed_order() {
        let first = doc_with_pages(&["a1", "a2"]);
        let second = doc_with_pages(&["b1"]);
        let merged = merge(&[first, second]).unwrap();
        assert_eq!(page_order(&merged), vec!["a1", "a2", "b1"]);
    }

    #[test]
    fn merge_of_nothing_is_an_error() {
        let err = merge(&[]).unwrap_err();
        assert!(matches!(err, BlattwerkError::InputMissing(_)));
    }

    #[test]
    fn split_produces_each_range() {
        let doc = doc_with_pages(&["a", "b", "c", "d"]);
        let parts = split(&doc, &[vec![0, 1], vec![2, 3]]).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(page_order(&parts[0]), vec!["a", "b"]);
        assert_eq!(page_order(&parts[1]), vec!["c", "d"]);
    }

    #[test]
    fn split_rejects_any_bad_range_before_output() {
        let doc = doc_with_pages(&["a", "b"]);
        let err = split(&doc, &[vec![0], vec![7]]).unwrap_err();
        assert!(matches!(err, BlattwerkError::PageIndexOutOfRange { .. }));
    }

    #[test]
    fn merge_of_full_partition_reconstructs_document() {
        let doc = doc_with_pages(&["a", "b", "c", "d", "e"]);
        let parts = split(&doc, &[vec![0, 1], vec![2], vec![3, 4]]).unwrap();
        let merged = merge(&parts).unwrap();
        assert_eq!(page_order(&merged), page_order(&doc));
    }

    #[test]
    fn extract_pages_example_from_contract() {
        // 5-page [A,B,C,D,E]: extract [1,3] -> [B,D].
        let doc = doc_with_pages(&["A", "B", "C", "D", "E"]);
        let extracted = extract_pages(&doc, &[1, 3]).unwrap();
        assert_eq!(page_order(&extracted), vec!["B", "D"]);
    }

    #[test]
    fn remove_pages_example_from_contract() {
        // 5-page [A,B,C,D,E]: remove [0,4] -> [B,C,D].
        let doc = doc_with_pages(&["A", "B", "C", "D", "E"]);
        let remaining = remove_pages(&doc, &[0, 4]).unwrap();
        assert_eq!(page_order(&remaining), vec!["B", "C", "D"]);

        let mut result = remaining;
        let bytes = result.save().unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(!text.contains("(A)"), "removed content must not survive");
        assert!(!text.contains("(E)"));
    }

    #[test]
    fn remove_pages_dedups_indices() {
        let doc = doc_with_pages(&["A", "B", "C"]);
        let remaining = remove_pages(&doc, &[1, 1, 1]).unwrap();
        assert_eq!(remaining.page_count(), 2);
    }

    #[test]
    fn organize_applies_any_permutation() {
        let doc = doc_with_pages(&["A", "B", "C"]);
        let reordered = organize(&doc, &[2, 0, 1]).unwrap();
        assert_eq!(page_order(&reordered), vec!["C", "A", "B"]);
    }

    #[test]
    fn organize_rejects_non_permutations() {
        let doc = doc_with_pages(&["A", "B", "C"]);
        assert!(organize(&doc, &[0, 1]).is_err(), "wrong length");
        assert!(organize(&doc, &[0, 1, 1]).is_err(), "duplicate entry");
        assert!(organize(&doc, &[0, 1, 3]).is_err(), "out of range");
    }

    #[test]
    fn reverse_twice_restores_order() {
        let doc = doc_with_pages(&["A", "B", "C", "D"]);
        let twice = reverse(&reverse(&doc).unwrap()).unwrap();
        assert_eq!(page_order(&twice), page_order(&doc));
    }

    #[test]
    fn duplicate_inserts_copies_in_place() {
        let doc = doc_with_pages(&["A", "B", "C"]);
        let duplicated = duplicate(&doc, &[0, 2]).unwrap();
        assert_eq!(page_order(&duplicated), vec!["A", "A", "B", "C", "C"]);
    }

    #[test]
    fn compress_output_still_parses() {
        let doc = doc_with_pages(&["A", "B"]);
        let bytes = compress(&doc).unwrap();
        let reloaded = Document::load(&bytes).unwrap();
        assert_eq!(reloaded.page_count(), 2);
    }
}
