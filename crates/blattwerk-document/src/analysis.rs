// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content analysis: duplicate-page detection via content hashing, blank-page
// detection via a text-density threshold, and heuristic orientation
// normalization.

use std::collections::HashSet;

use blattwerk_core::error::Result;
use lopdf::Object;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use crate::extract::{page_texts, TextExtractor};
use crate::model::{self, Document};
use crate::transform::extract_pages;

/// Minimum trimmed-text length below which a page is classified blank.
pub const BLANK_THRESHOLD: usize = 10;

/// Outcome of a duplicate-detection pass.
#[derive(Debug, Clone, Serialize)]
pub struct DedupReport {
    pub kept_pages: usize,
    pub dropped_pages: usize,
    /// SHA-256 hex digest per input page; `None` where the page could not be
    /// isolated and was kept fail-open.
    pub page_hashes: Vec<Option<String>>,
}

/// Remove duplicate pages, keeping the first page per distinct content hash
/// and preserving original relative order.
///
/// Each page is isolated into a single-page document, serialised, and
/// SHA-256 hashed. The hash is over the exact serialised form, so pages that
/// render identically but are encoded differently count as distinct — a
/// documented limitation of this pass. A page whose isolation fails is kept
/// rather than dropped.
#[instrument(skip_all, fields(pages = doc.page_count()))]
pub fn remove_duplicate_pages(doc: &Document) -> Result<(Document, DedupReport)> {
    let mut seen: HashSet<[u8; 32]> = HashSet::new();
    let mut kept: Vec<usize> = Vec::new();
    let mut page_hashes: Vec<Option<String>> = Vec::with_capacity(doc.page_count());

    for index in 0..doc.page_count() {
        match doc.isolate_page(index) {
            Ok(bytes) => {
                let digest: [u8; 32] = Sha256::digest(&bytes).into();
                page_hashes.push(Some(hex::encode(digest)));
                if seen.insert(digest) {
                    kept.push(index);
                } else {
                    debug!(page = index, "duplicate page dropped");
                }
            }
            Err(err) => {
                warn!(page = index, %err, "page isolation failed, keeping page");
                page_hashes.push(None);
                kept.push(index);
            }
        }
    }

    let report = DedupReport {
        kept_pages: kept.len(),
        dropped_pages: doc.page_count() - kept.len(),
        page_hashes,
    };
    info!(kept = report.kept_pages, dropped = report.dropped_pages, "dedup complete");

    if kept.is_empty() {
        return Ok((Document::new_empty(), report));
    }
    let result = extract_pages(doc, &kept)?;
    Ok((result, report))
}

/// Remove pages whose extracted text is shorter than [`BLANK_THRESHOLD`]
/// characters after trimming.
///
/// A page whose extraction fails is kept (fail-open). The result always
/// retains at least one page: if every page tests blank, the first page
/// survives.
#[instrument(skip_all, fields(pages = doc.page_count()))]
pub fn remove_blank_pages(doc: &Document, extractor: &dyn TextExtractor) -> Result<Document> {
    let texts = page_texts(doc, extractor);
    let mut kept: Vec<usize> = texts
        .iter()
        .enumerate()
        .filter(|(_, text)| match text {
            Some(text) => text.trim().chars().count() >= BLANK_THRESHOLD,
            // Extraction failed; keep the page.
            None => true,
        })
        .map(|(index, _)| index)
        .collect();

    if kept.is_empty() && doc.page_count() > 0 {
        info!("every page tests blank, retaining the first page");
        kept.push(0);
    }

    info!(kept = kept.len(), removed = doc.page_count() - kept.len(), "blank pages removed");
    if kept.is_empty() {
        return Ok(Document::new_empty());
    }
    extract_pages(doc, &kept)
}

/// Normalize page rotation with a shape heuristic.
///
/// A landscape-shaped page (width > height) with rotation 90 or 270 has its
/// rotation reset to 0; any non-zero rotation on a portrait-shaped page is
/// also reset. This reasons about page geometry only — it is not
/// content-aware deskewing.
#[instrument(skip_all, fields(pages = doc.page_count()))]
pub fn normalize_orientation(doc: &Document) -> Result<Document> {
    let mut inner = doc.inner.clone();
    let page_ids: Vec<_> = inner.get_pages().values().copied().collect();

    for page_id in page_ids {
        let (width, height) = model::page_size(&inner, page_id);
        let rotation = model::rotation_of(&inner, page_id);

        let reset = if width > height {
            rotation == 90 || rotation == 270
        } else {
            rotation != 0
        };
        if reset {
            debug!(?page_id, rotation, "resetting page rotation");
            if let Ok(Object::Dictionary(dict)) = inner.get_object_mut(page_id) {
                dict.set("Rotate", Object::Integer(0));
            }
        }
    }

    Ok(Document::from_inner(inner, doc.encrypted()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{doc_with_pages, doc_with_sized_pages, FailingExtractor, StubExtractor};

    #[test]
    fn dedup_keeps_first_of_each_distinct_page() {
        let doc = doc_with_pages(&["alpha", "beta", "alpha", "gamma", "beta"]);
        let (deduped, report) = remove_duplicate_pages(&doc).unwrap();
        assert_eq!(deduped.page_count(), 3);
        assert_eq!(report.kept_pages, 3);
        assert_eq!(report.dropped_pages, 2);
        assert_eq!(report.page_hashes[0], report.page_hashes[2]);
        assert_ne!(report.page_hashes[0], report.page_hashes[1]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let doc = doc_with_pages(&["x", "x", "y"]);
        let (once, _) = remove_duplicate_pages(&doc).unwrap();
        let (twice, report) = remove_duplicate_pages(&once).unwrap();
        assert_eq!(once.page_count(), twice.page_count());
        assert_eq!(report.dropped_pages, 0);
    }

    #[test]
    fn blank_pages_are_dropped() {
        let doc = doc_with_pages(&["this page has plenty of text on it", "", "short"]);
        let cleaned = remove_blank_pages(&doc, &StubExtractor).unwrap();
        assert_eq!(cleaned.page_count(), 1);
    }

    #[test]
    fn all_blank_document_keeps_one_page() {
        let doc = doc_with_pages(&["", "", ""]);
        let cleaned = remove_blank_pages(&doc, &StubExtractor).unwrap();
        assert_eq!(cleaned.page_count(), 1, "never return a zero-page document");
    }

    #[test]
    fn extraction_failure_keeps_pages() {
        let doc = doc_with_pages(&["", ""]);
        let cleaned = remove_blank_pages(&doc, &FailingExtractor).unwrap();
        assert_eq!(cleaned.page_count(), 2, "fail-open on extraction failure");
    }

    #[test]
    fn landscape_sideways_rotation_is_reset() {
        let doc = doc_with_sized_pages(&[("wide", 792.0, 612.0, 90)]);
        let normalized = normalize_orientation(&doc).unwrap();
        assert_eq!(normalized.page_geometry()[0].rotation, 0);
    }

    #[test]
    fn landscape_half_turn_is_preserved() {
        let doc = doc_with_sized_pages(&[("wide", 792.0, 612.0, 180)]);
        let normalized = normalize_orientation(&doc).unwrap();
        assert_eq!(normalized.page_geometry()[0].rotation, 180);
    }

    #[test]
    fn portrait_rotation_is_reset() {
        let doc = doc_with_sized_pages(&[("tall", 612.0, 792.0, 270), ("tall", 612.0, 792.0, 0)]);
        let normalized = normalize_orientation(&doc).unwrap();
        let rotations: Vec<i32> = normalized.page_geometry().iter().map(|g| g.rotation).collect();
        assert_eq!(rotations, vec![0, 0]);
    }
}
