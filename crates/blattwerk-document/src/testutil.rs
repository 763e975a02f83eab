// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared test fixtures: synthetic in-memory PDFs built with lopdf, and a
// stub text extractor that reads the literal strings those fixtures contain.

use blattwerk_core::error::Result;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, Stream};

use crate::extract::{TextExtractor, TextSummary};
use crate::model::Document;

/// Build a PDF where each page draws the given text. Pages are US Letter
/// unless a size override is supplied via [`pdf_with_sized_pages`].
pub(crate) fn pdf_with_pages(texts: &[&str]) -> Vec<u8> {
    let sized: Vec<(&str, f32, f32, i32)> =
        texts.iter().map(|&t| (t, 612.0, 792.0, 0)).collect();
    pdf_with_sized_pages(&sized)
}

/// Build a PDF with per-page `(text, width, height, rotation)`.
pub(crate) fn pdf_with_sized_pages(pages: &[(&str, f32, f32, i32)]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let page_tree_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([(
            "F1",
            Object::Reference(font_id),
        )])),
    )]));

    let mut kids = Vec::new();
    for &(text, width, height, rotation) in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().unwrap_or_default(),
        ));

        let mut page_dict = Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(page_tree_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    0.into(),
                    0.into(),
                    Object::Real(width),
                    Object::Real(height),
                ]),
            ),
        ]);
        if rotation != 0 {
            page_dict.set("Rotate", Object::Integer(i64::from(rotation)));
        }
        kids.push(Object::Reference(doc.add_object(page_dict)));
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        page_tree_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(page_count)),
        ])),
    );

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(page_tree_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).expect("fixture serialisation");
    output
}

/// Load a fixture built by [`pdf_with_pages`] as a [`Document`].
pub(crate) fn doc_with_pages(texts: &[&str]) -> Document {
    Document::load(&pdf_with_pages(texts)).expect("fixture load")
}

pub(crate) fn doc_with_sized_pages(pages: &[(&str, f32, f32, i32)]) -> Document {
    Document::load(&pdf_with_sized_pages(pages)).expect("fixture load")
}

/// A text extractor for fixture documents: collects the literal `(...)`
/// strings from the raw bytes, which works because fixture content streams
/// are stored uncompressed.
pub(crate) struct StubExtractor;

impl TextExtractor for StubExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<TextSummary> {
        let doc = Document::load_permissive(bytes)?;
        let mut pieces = Vec::new();
        let mut cursor = 0;
        while let Some(open) = bytes[cursor..].iter().position(|&b| b == b'(') {
            let start = cursor + open + 1;
            let Some(close) = bytes[start..].iter().position(|&b| b == b')') else {
                break;
            };
            let piece = String::from_utf8_lossy(&bytes[start..start + close]).into_owned();
            if !piece.is_empty() {
                pieces.push(piece);
            }
            cursor = start + close + 1;
        }
        Ok(TextSummary {
            text: pieces.join(" "),
            page_count: doc.page_count(),
            metadata: doc.metadata(),
        })
    }
}

/// An extractor whose every call fails, for fail-open paths.
pub(crate) struct FailingExtractor;

impl TextExtractor for FailingExtractor {
    fn extract(&self, _bytes: &[u8]) -> Result<TextSummary> {
        Err(blattwerk_core::error::BlattwerkError::ExtractionError(
            "scripted failure".to_string(),
        ))
    }
}
