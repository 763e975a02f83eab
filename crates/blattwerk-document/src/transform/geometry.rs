// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Whole-document geometry transforms: rotate, crop, resize.

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::PageRect;
use lopdf::Object;
use tracing::{info, instrument};

use crate::model::{self, Document};

/// Rotate every page by `degrees`, applied as a delta on top of each page's
/// current rotation and normalized into [0, 360).
///
/// `degrees` must be a multiple of 90; negative values are allowed.
#[instrument(skip(doc))]
pub fn rotate(doc: &Document, degrees: i32) -> Result<Document> {
    if degrees % 90 != 0 {
        return Err(BlattwerkError::InputMissing(format!(
            "rotation must be a multiple of 90, got {degrees}"
        )));
    }

    let mut inner = doc.inner.clone();
    let page_ids: Vec<_> = inner.get_pages().values().copied().collect();
    for page_id in page_ids {
        let current = model::rotation_of(&inner, page_id);
        let rotated = (current + degrees).rem_euclid(360);
        if let Ok(Object::Dictionary(dict)) = inner.get_object_mut(page_id) {
            dict.set("Rotate", Object::Integer(i64::from(rotated)));
        }
    }

    info!(pages = doc.page_count(), degrees, "pages rotated");
    Ok(Document::from_inner(inner, doc.encrypted()))
}

/// Set every page's crop boundary to `rect` (points, bottom-left origin).
#[instrument(skip_all)]
pub fn crop(doc: &Document, rect: PageRect) -> Result<Document> {
    set_box_on_all_pages(doc, "CropBox", rect.corners())
}

/// Set every page's dimensions to `width` x `height` points.
#[instrument(skip(doc))]
pub fn resize(doc: &Document, width: f32, height: f32) -> Result<Document> {
    if width <= 0.0 || height <= 0.0 {
        return Err(BlattwerkError::InputMissing(format!(
            "page dimensions must be positive, got {width} x {height}"
        )));
    }
    set_box_on_all_pages(doc, "MediaBox", [0.0, 0.0, width, height])
}

fn set_box_on_all_pages(doc: &Document, key: &str, corners: [f32; 4]) -> Result<Document> {
    let mut inner = doc.inner.clone();
    let page_ids: Vec<_> = inner.get_pages().values().copied().collect();
    for page_id in page_ids {
        if let Ok(Object::Dictionary(dict)) = inner.get_object_mut(page_id) {
            dict.set(
                key,
                Object::Array(corners.iter().map(|&v| Object::Real(v)).collect()),
            );
        }
    }
    Ok(Document::from_inner(inner, doc.encrypted()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{doc_with_pages, doc_with_sized_pages};

    #[test]
    fn rotation_is_a_delta() {
        let doc = doc_with_sized_pages(&[("page", 612.0, 792.0, 90)]);
        let rotated = rotate(&doc, 90).unwrap();
        assert_eq!(rotated.page_geometry()[0].rotation, 180);
    }

    #[test]
    fn rotation_normalizes_negative_deltas() {
        let doc = doc_with_pages(&["page"]);
        let rotated = rotate(&doc, -90).unwrap();
        assert_eq!(rotated.page_geometry()[0].rotation, 270);
    }

    #[test]
    fn four_quarter_turns_restore_rotation() {
        let doc = doc_with_sized_pages(&[("a", 612.0, 792.0, 0), ("b", 612.0, 792.0, 180)]);
        let mut turned = doc.clone();
        for _ in 0..4 {
            turned = rotate(&turned, 90).unwrap();
        }
        let original: Vec<i32> = doc.page_geometry().iter().map(|g| g.rotation).collect();
        let restored: Vec<i32> = turned.page_geometry().iter().map(|g| g.rotation).collect();
        assert_eq!(original, restored);
    }

    #[test]
    fn rotation_rejects_non_right_angles() {
        let doc = doc_with_pages(&["page"]);
        let err = rotate(&doc, 45).unwrap_err();
        assert!(matches!(err, BlattwerkError::InputMissing(_)));
    }

    #[test]
    fn rotate_does_not_touch_the_input() {
        let doc = doc_with_pages(&["page"]);
        let _ = rotate(&doc, 90).unwrap();
        assert_eq!(doc.page_geometry()[0].rotation, 0);
    }

    #[test]
    fn resize_changes_every_page() {
        let doc = doc_with_pages(&["a", "b"]);
        let resized = resize(&doc, 400.0, 500.0).unwrap();
        for page in resized.page_geometry() {
            assert_eq!(page.width, 400.0);
            assert_eq!(page.height, 500.0);
        }
    }

    #[test]
    fn resize_rejects_non_positive_dimensions() {
        let doc = doc_with_pages(&["a"]);
        assert!(resize(&doc, 0.0, 500.0).is_err());
        assert!(resize(&doc, 400.0, -1.0).is_err());
    }

    #[test]
    fn crop_sets_crop_box_without_resizing() {
        let doc = doc_with_pages(&["a"]);
        let cropped = crop(&doc, blattwerk_core::types::PageRect::new(10.0, 10.0, 300.0, 400.0)).unwrap();
        // MediaBox untouched.
        assert_eq!(cropped.page_geometry()[0].width, 612.0);
        let page_id = cropped.inner.get_pages().values().copied().next().unwrap();
        let crop_box = crate::model::box_attribute(&cropped.inner, page_id, b"CropBox").unwrap();
        assert_eq!(crop_box, [10.0, 10.0, 310.0, 410.0]);
    }
}
