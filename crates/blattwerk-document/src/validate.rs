// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structural validation and diagnostics: strict-then-permissive load,
// encryption detection, page survey, form-field enumeration, and an issue
// list for reportable (non-fatal) findings.

use blattwerk_core::config::EngineConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{DocumentMetadata, FormField, PageGeometry};
use serde::Serialize;
use tracing::{info, instrument};

use crate::model::Document;

/// Full diagnostics for one document.
///
/// Issues are reported, not thrown: an oversized file or missing title shows
/// up in `issues` while the validation itself succeeds. Only a byte stream
/// that fails even the permissive load raises
/// [`BlattwerkError::UnparsableDocument`].
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub page_count: usize,
    pub file_size: u64,
    pub metadata: DocumentMetadata,
    pub pages: Vec<PageGeometry>,
    pub is_encrypted: bool,
    pub has_form: bool,
    pub form_field_count: usize,
    pub issues: Vec<String>,
}

/// Validate a document byte stream.
///
/// A strict load is attempted first; on an encryption-specific outcome the
/// load is retried permissively and the report carries `is_encrypted` rather
/// than an error.
#[instrument(skip_all, fields(bytes_len = bytes.len()))]
pub fn validate(bytes: &[u8], config: &EngineConfig) -> Result<ValidationReport> {
    let file_size = bytes.len() as u64;

    let (doc, is_encrypted) = match Document::load(bytes) {
        Ok(doc) => (Some(doc), false),
        Err(BlattwerkError::EncryptedDocument(_)) => match Document::load_permissive(bytes) {
            Ok(doc) => (Some(doc), true),
            // Encrypted beyond even permissive parsing: report it instead of
            // failing the whole validation.
            Err(BlattwerkError::EncryptedDocument(_)) => (None, true),
            Err(err) => return Err(err),
        },
        Err(err) => return Err(err),
    };

    let mut issues = Vec::new();
    if file_size > config.max_document_bytes {
        issues.push(format!(
            "file size {file_size} bytes exceeds the {} byte ceiling",
            config.max_document_bytes
        ));
    }

    let report = match doc {
        Some(doc) => {
            let metadata = doc.metadata();
            let pages = doc.page_geometry();
            let form_fields = doc.form_fields();

            if pages.is_empty() {
                issues.push("document has zero pages".to_string());
            }
            if metadata.title.is_none() {
                issues.push("missing title metadata".to_string());
            }

            ValidationReport {
                valid: issues.is_empty(),
                page_count: pages.len(),
                file_size,
                metadata,
                pages,
                is_encrypted,
                has_form: !form_fields.is_empty(),
                form_field_count: form_fields.len(),
                issues,
            }
        }
        None => {
            issues.push("document is encrypted; page inventory unavailable".to_string());
            ValidationReport {
                valid: false,
                page_count: 0,
                file_size,
                metadata: DocumentMetadata::default(),
                pages: Vec::new(),
                is_encrypted,
                has_form: false,
                form_field_count: 0,
                issues,
            }
        }
    };

    info!(
        valid = report.valid,
        pages = report.page_count,
        issues = report.issues.len(),
        "validation complete"
    );
    Ok(report)
}

/// Enumerate a document's form fields as a structured report.
///
/// Documents without an `AcroForm` yield an empty list.
pub fn extract_form_data(bytes: &[u8]) -> Result<Vec<FormField>> {
    let doc = Document::load_permissive(bytes)?;
    Ok(doc.form_fields())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::pdf_with_pages;
    use blattwerk_core::types::FormFieldKind;

    #[test]
    fn untitled_document_reports_issue() {
        let bytes = pdf_with_pages(&["a", "b"]);
        let report = validate(&bytes, &EngineConfig::default()).unwrap();
        assert!(!report.valid);
        assert_eq!(report.page_count, 2);
        assert!(!report.is_encrypted);
        assert!(report.issues.iter().any(|i| i.contains("title")));
    }

    #[test]
    fn titled_document_is_valid() {
        let mut doc = Document::load(&pdf_with_pages(&["a"])).unwrap();
        doc.set_metadata(&DocumentMetadata {
            title: Some("Titled".to_string()),
            ..Default::default()
        });
        let bytes = doc.save().unwrap();

        let report = validate(&bytes, &EngineConfig::default()).unwrap();
        assert!(report.valid, "unexpected issues: {:?}", report.issues);
        assert_eq!(report.metadata.title.as_deref(), Some("Titled"));
    }

    #[test]
    fn oversized_file_is_an_issue_not_an_error() {
        let bytes = pdf_with_pages(&["a"]);
        let config = EngineConfig {
            max_document_bytes: 16,
        };
        let report = validate(&bytes, &config).unwrap();
        assert!(report.issues.iter().any(|i| i.contains("ceiling")));
    }

    #[test]
    fn garbage_fails_even_permissive() {
        let err = validate(b"%%not-a-document%%", &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, BlattwerkError::UnparsableDocument(_)));
    }

    #[test]
    fn page_survey_includes_sizes() {
        let bytes = pdf_with_pages(&["a"]);
        let report = validate(&bytes, &EngineConfig::default()).unwrap();
        assert_eq!(report.pages[0].width, 612.0);
        assert_eq!(report.pages[0].height, 792.0);
    }

    #[test]
    fn formless_document_has_no_fields() {
        let bytes = pdf_with_pages(&["a"]);
        let fields = extract_form_data(&bytes).unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn form_fields_are_enumerated() {
        // Attach a minimal AcroForm with one text field and one checkbox.
        let mut doc = Document::load(&pdf_with_pages(&["a"])).unwrap();
        let inner = &mut doc.inner;

        let text_field = inner.add_object(lopdf::Dictionary::from_iter([
            ("FT", lopdf::Object::Name(b"Tx".to_vec())),
            ("T", lopdf::Object::string_literal("full_name")),
            ("V", lopdf::Object::string_literal("Ada")),
        ]));
        let checkbox = inner.add_object(lopdf::Dictionary::from_iter([
            ("FT", lopdf::Object::Name(b"Btn".to_vec())),
            ("T", lopdf::Object::string_literal("subscribed")),
            ("V", lopdf::Object::Name(b"Yes".to_vec())),
        ]));
        let acro_form = inner.add_object(lopdf::Dictionary::from_iter([(
            "Fields",
            lopdf::Object::Array(vec![
                lopdf::Object::Reference(text_field),
                lopdf::Object::Reference(checkbox),
            ]),
        )]));

        let catalog_id = match inner.trailer.get(b"Root").unwrap() {
            lopdf::Object::Reference(id) => *id,
            _ => panic!("Root is not a reference"),
        };
        if let Ok(lopdf::Object::Dictionary(catalog)) = inner.get_object_mut(catalog_id) {
            catalog.set("AcroForm", lopdf::Object::Reference(acro_form));
        }

        let bytes = doc.save().unwrap();
        let fields = extract_form_data(&bytes).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "full_name");
        assert_eq!(fields[0].kind, FormFieldKind::Text);
        assert_eq!(fields[0].value.as_deref(), Some("Ada"));
        assert_eq!(fields[1].kind, FormFieldKind::Checkbox);
        assert_eq!(fields[1].value.as_deref(), Some("Yes"));

        let report = validate(&bytes, &EngineConfig::default()).unwrap();
        assert!(report.has_form);
        assert_eq!(report.form_field_count, 2);
    }
}
