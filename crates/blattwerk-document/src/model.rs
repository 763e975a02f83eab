// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document model adapter — loads a byte stream into an in-memory ordered page
// collection with metadata and serialises it back, using the `lopdf` crate.
//
// Every engine operation constructs a fresh `Document` from input bytes and
// discards it once the output bytes (or report) are produced; nothing is
// cached across requests.

use std::collections::{HashMap, HashSet};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{DocumentMetadata, FormField, FormFieldKind, PageGeometry};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lopdf::{Dictionary, Object, ObjectId};
use tracing::{debug, instrument, warn};

/// US Letter media box, the fallback when a page carries no `MediaBox` even
/// through `/Parent` inheritance.
pub(crate) const LETTER_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Depth limit for walks up the page tree, guarding against malformed
/// `/Parent` cycles.
const PARENT_WALK_LIMIT: usize = 10;

/// An in-memory page-oriented document: an ordered page sequence, an
/// information record, and optional form fields.
///
/// Wraps `lopdf::Document`. Page indices used throughout the engine are
/// 0-based and contiguous.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) inner: lopdf::Document,
    encrypted: bool,
}

impl Document {
    // -- Construction ---------------------------------------------------------

    /// Parse a document from raw bytes, strict mode.
    ///
    /// Fails with [`BlattwerkError::UnparsableDocument`] when the bytes cannot
    /// be parsed at all, and with [`BlattwerkError::EncryptedDocument`] when
    /// the file carries an encryption dictionary.
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let doc = Self::load_permissive(bytes)?;
        if doc.encrypted {
            return Err(BlattwerkError::EncryptedDocument(
                "document carries an encryption dictionary; supply a password or use \
                 permissive load"
                    .to_string(),
            ));
        }
        Ok(doc)
    }

    /// Parse a document from raw bytes, permissive mode.
    ///
    /// An encrypted file loads with its [`encrypted`](Self::encrypted) flag
    /// set instead of failing. Only a genuinely unparsable byte stream
    /// returns [`BlattwerkError::UnparsableDocument`].
    pub fn load_permissive(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(BlattwerkError::InputMissing(
                "document byte stream is empty".to_string(),
            ));
        }

        let inner = lopdf::Document::load_mem(bytes).map_err(|err| {
            let msg = err.to_string();
            if msg.to_ascii_lowercase().contains("crypt") {
                BlattwerkError::EncryptedDocument(msg)
            } else {
                BlattwerkError::UnparsableDocument(msg)
            }
        })?;

        let encrypted = inner.is_encrypted();
        debug!(pages = inner.get_pages().len(), encrypted, "document loaded");

        Ok(Self { inner, encrypted })
    }

    /// An empty document with a catalog and a zero-page page tree, the
    /// starting point for every page-copying transform.
    pub fn new_empty() -> Self {
        let mut inner = lopdf::Document::with_version("1.5");

        let pages_id = inner.new_object_id();
        inner.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(Vec::new())),
                ("Count", Object::Integer(0)),
            ])),
        );

        let catalog_id = inner.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        inner.trailer.set("Root", Object::Reference(catalog_id));

        Self {
            inner,
            encrypted: false,
        }
    }

    pub(crate) fn from_inner(inner: lopdf::Document, encrypted: bool) -> Self {
        Self { inner, encrypted }
    }

    // -- Inspection -----------------------------------------------------------

    /// Whether the source file carried an encryption dictionary.
    pub fn encrypted(&self) -> bool {
        self.encrypted
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Page object ids in page order.
    pub(crate) fn page_ids(&self) -> Vec<ObjectId> {
        // get_pages is keyed by 1-based page number; BTreeMap iteration is
        // already in page order.
        self.inner.get_pages().values().copied().collect()
    }

    /// Object id of the page at a 0-based index.
    pub(crate) fn page_id(&self, index: usize) -> Result<ObjectId> {
        let ids = self.page_ids();
        ids.get(index)
            .copied()
            .ok_or(BlattwerkError::PageIndexOutOfRange {
                index,
                page_count: ids.len(),
            })
    }

    /// Validate a set of 0-based indices against the current page count.
    /// Rejection happens before any mutation, so a failed operation never
    /// produces partial output.
    pub fn check_indices(&self, indices: &[usize]) -> Result<()> {
        let page_count = self.page_count();
        for &index in indices {
            if index >= page_count {
                return Err(BlattwerkError::PageIndexOutOfRange { index, page_count });
            }
        }
        Ok(())
    }

    /// Per-page size and rotation, resolving `MediaBox` and `Rotate` through
    /// `/Parent` inheritance.
    pub fn page_geometry(&self) -> Vec<PageGeometry> {
        self.page_ids()
            .iter()
            .enumerate()
            .map(|(index, &page_id)| {
                let media_box = media_box_of(&self.inner, page_id);
                PageGeometry {
                    index,
                    width: media_box[2] - media_box[0],
                    height: media_box[3] - media_box[1],
                    rotation: rotation_of(&self.inner, page_id),
                }
            })
            .collect()
    }

    // -- Metadata -------------------------------------------------------------

    /// The document information record, read from the PDF Info dictionary.
    pub fn metadata(&self) -> DocumentMetadata {
        let Some(info) = self.info_dictionary() else {
            return DocumentMetadata::default();
        };

        DocumentMetadata {
            title: info_string(info, b"Title"),
            author: info_string(info, b"Author"),
            subject: info_string(info, b"Subject"),
            creator: info_string(info, b"Creator"),
            producer: info_string(info, b"Producer"),
            keywords: info_string(info, b"Keywords"),
            created: info_string(info, b"CreationDate").and_then(|s| parse_pdf_date(&s)),
            modified: info_string(info, b"ModDate").and_then(|s| parse_pdf_date(&s)),
        }
    }

    /// Replace the Info-dictionary metadata record.
    pub fn set_metadata(&mut self, metadata: &DocumentMetadata) {
        let mut info = Dictionary::new();
        let mut set = |key: &str, value: &Option<String>| {
            if let Some(value) = value {
                info.set(key, Object::string_literal(value.as_str()));
            }
        };
        set("Title", &metadata.title);
        set("Author", &metadata.author);
        set("Subject", &metadata.subject);
        set("Creator", &metadata.creator);
        set("Producer", &metadata.producer);
        set("Keywords", &metadata.keywords);
        if let Some(created) = metadata.created {
            info.set("CreationDate", Object::string_literal(format_pdf_date(created)));
        }
        if let Some(modified) = metadata.modified {
            info.set("ModDate", Object::string_literal(format_pdf_date(modified)));
        }

        // Reuse the existing Info object rather than orphaning it.
        let existing = match self.inner.trailer.get(b"Info") {
            Ok(Object::Reference(id)) if self.inner.objects.contains_key(id) => Some(*id),
            _ => None,
        };
        match existing {
            Some(info_id) => {
                self.inner.objects.insert(info_id, Object::Dictionary(info));
            }
            None => {
                let info_id = self.inner.add_object(Object::Dictionary(info));
                self.inner.trailer.set("Info", Object::Reference(info_id));
            }
        }
    }

    fn info_dictionary(&self) -> Option<&Dictionary> {
        match self.inner.trailer.get(b"Info").ok()? {
            Object::Reference(id) => match self.inner.get_object(*id).ok()? {
                Object::Dictionary(dict) => Some(dict),
                _ => None,
            },
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    // -- Form fields ----------------------------------------------------------

    /// Enumerate interactive form fields from the `AcroForm` dictionary.
    ///
    /// Returns an empty list for documents without a form.
    pub fn form_fields(&self) -> Vec<FormField> {
        let Some(fields_array) = self.acro_form_fields() else {
            return Vec::new();
        };

        let mut fields = Vec::new();
        for entry in fields_array {
            let dict = match resolve(&self.inner, &entry) {
                Some(Object::Dictionary(dict)) => dict,
                _ => continue,
            };

            let Some(name) = dict
                .get(b"T")
                .ok()
                .and_then(|obj| string_value(&self.inner, obj))
            else {
                continue;
            };

            let kind = match dict.get(b"FT").ok().and_then(|o| o.as_name().ok()) {
                Some(b"Tx") => FormFieldKind::Text,
                Some(b"Btn") => FormFieldKind::Checkbox,
                Some(other) => {
                    FormFieldKind::Other(String::from_utf8_lossy(other).into_owned())
                }
                None => FormFieldKind::Other(String::new()),
            };

            let value = dict
                .get(b"V")
                .ok()
                .and_then(|obj| string_value(&self.inner, obj));

            fields.push(FormField { name, kind, value });
        }
        fields
    }

    fn acro_form_fields(&self) -> Option<Vec<Object>> {
        let catalog = self.inner.catalog().ok()?;
        let acro_form = resolve(&self.inner, catalog.get(b"AcroForm").ok()?)?;
        let Object::Dictionary(acro_form) = acro_form else {
            return None;
        };
        match resolve(&self.inner, acro_form.get(b"Fields").ok()?)? {
            Object::Array(fields) => Some(fields.clone()),
            _ => None,
        }
    }

    // -- Serialisation --------------------------------------------------------

    /// Serialise the document to bytes. Deterministic for the same in-memory
    /// state; page content and order are preserved exactly.
    #[instrument(skip_all)]
    pub fn save(&mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.inner.save_to(&mut output).map_err(|err| {
            BlattwerkError::PdfError(format!("failed to serialise document: {err}"))
        })?;
        debug!(output_bytes = output.len(), "document serialised");
        Ok(output)
    }

    /// Serialise one page (0-based index) as a standalone single-page
    /// document. Used by duplicate detection and per-page text extraction.
    pub fn isolate_page(&self, index: usize) -> Result<Vec<u8>> {
        let mut isolated = Document::new_empty();
        self.copy_pages_into(&[index], &mut isolated)?;
        isolated.save()
    }

    // -- Page copying ---------------------------------------------------------

    /// Deep-copy the referenced pages (0-based indices, in listed order) into
    /// `target`, appending them after its existing pages.
    ///
    /// Indirect objects shared between the copied pages stay shared in the
    /// target. A repeated index yields an independent copy of that page, so
    /// duplicated pages do not alias each other. Inherited page attributes
    /// (`MediaBox`, `CropBox`, `Rotate`, `Resources`) are materialised onto
    /// each copied page dictionary, since the source parent chain is not
    /// carried over.
    pub fn copy_pages_into(&self, indices: &[usize], target: &mut Document) -> Result<()> {
        self.check_indices(indices)?;

        let mut shared_map: HashMap<ObjectId, ObjectId> = HashMap::new();
        let mut seen: HashSet<usize> = HashSet::new();

        for &index in indices {
            let page_id = self.page_id(index)?;
            if seen.insert(index) {
                self.copy_single_page(page_id, target, &mut shared_map)?;
            } else {
                // Repeat of an index: clone with a fresh map for a true copy.
                let mut fresh_map = HashMap::new();
                self.copy_single_page(page_id, target, &mut fresh_map)?;
            }
        }
        Ok(())
    }

    fn copy_single_page(
        &self,
        page_id: ObjectId,
        target: &mut Document,
        visited: &mut HashMap<ObjectId, ObjectId>,
    ) -> Result<()> {
        let page_object = self.inner.get_object(page_id).map_err(|err| {
            BlattwerkError::PdfError(format!("cannot read page object {page_id:?}: {err}"))
        })?;

        // Reserve the target id and seed the map first, so a subtree that
        // points back at the page (an annotation's /P, say) maps to this
        // clone instead of producing a second copy.
        let new_id = target.inner.new_object_id();
        visited.insert(page_id, new_id);
        let cloned = clone_object(&self.inner, &mut target.inner, &page_object.clone(), visited);
        target.inner.objects.insert(new_id, cloned);

        // Materialise inherited attributes the clone would otherwise lose.
        for key in [&b"MediaBox"[..], b"CropBox", b"Rotate", b"Resources"] {
            let already_present = matches!(
                target.inner.get_object(new_id),
                Ok(Object::Dictionary(dict)) if dict.has(key)
            );
            if already_present {
                continue;
            }
            if let Some(value) = inherited_attribute(&self.inner, page_id, key) {
                let cloned_value = clone_object(&self.inner, &mut target.inner, &value, visited);
                if let Ok(Object::Dictionary(dict)) = target.inner.get_object_mut(new_id) {
                    dict.set(key.to_vec(), cloned_value);
                }
            }
        }

        append_page_to_tree(&mut target.inner, new_id)
    }

    /// Append a blank page of the given size (points) to this document.
    pub fn append_blank_page(&mut self, width: f32, height: f32) -> Result<()> {
        let content_id = self
            .inner
            .add_object(Object::Stream(lopdf::Stream::new(Dictionary::new(), Vec::new())));
        let page_id = self.inner.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            (
                "MediaBox",
                Object::Array(vec![
                    0.into(),
                    0.into(),
                    Object::Real(width),
                    Object::Real(height),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
        ]));
        append_page_to_tree(&mut self.inner, page_id)
    }
}

// -- Page tree helpers --------------------------------------------------------

/// Object id of the root `/Pages` node.
pub(crate) fn pages_root_id(inner: &lopdf::Document) -> Result<ObjectId> {
    let catalog = inner
        .catalog()
        .map_err(|err| BlattwerkError::PdfError(format!("document has no catalog: {err}")))?;
    match catalog.get(b"Pages") {
        Ok(Object::Reference(id)) => Ok(*id),
        _ => Err(BlattwerkError::PdfError(
            "catalog /Pages is missing or not a reference".to_string(),
        )),
    }
}

/// Append an existing page object to the document's page tree, patching its
/// `/Parent` and the tree's `/Kids` and `/Count`.
fn append_page_to_tree(inner: &mut lopdf::Document, page_id: ObjectId) -> Result<()> {
    let pages_id = pages_root_id(inner)?;

    if let Ok(Object::Dictionary(pages_dict)) = inner.get_object_mut(pages_id) {
        if let Ok(Object::Array(kids)) = pages_dict.get_mut(b"Kids") {
            kids.push(Object::Reference(page_id));
        }
        let count = pages_dict
            .get(b"Count")
            .ok()
            .and_then(|c| c.as_i64().ok())
            .unwrap_or(0);
        pages_dict.set("Count", Object::Integer(count + 1));
    }

    if let Ok(Object::Dictionary(page_dict)) = inner.get_object_mut(page_id) {
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(pages_id));
    }
    Ok(())
}

/// Deep-clone an object from `source` into `target`, following references
/// through `visited` so shared objects stay shared. `/Parent` entries are
/// skipped; the caller patches them.
fn clone_object(
    source: &lopdf::Document,
    target: &mut lopdf::Document,
    object: &Object,
    visited: &mut HashMap<ObjectId, ObjectId>,
) -> Object {
    match object {
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                if key == b"Parent" {
                    continue;
                }
                let cloned = clone_object(source, target, value, visited);
                new_dict.set(key.clone(), cloned);
            }
            Object::Dictionary(new_dict)
        }
        Object::Array(array) => Object::Array(
            array
                .iter()
                .map(|item| clone_object(source, target, item, visited))
                .collect(),
        ),
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                if key == b"Parent" {
                    continue;
                }
                let cloned = clone_object(source, target, value, visited);
                new_dict.set(key.clone(), cloned);
            }
            Object::Stream(lopdf::Stream::new(new_dict, stream.content.clone()))
        }
        Object::Reference(ref_id) => {
            if let Some(&mapped) = visited.get(ref_id) {
                return Object::Reference(mapped);
            }
            match source.get_object(*ref_id) {
                Ok(referenced) => {
                    // Reserve the target id first so cyclic references map to
                    // the object being cloned rather than recursing forever.
                    let new_id = target.new_object_id();
                    visited.insert(*ref_id, new_id);
                    let cloned = clone_object(source, target, &referenced.clone(), visited);
                    target.objects.insert(new_id, cloned);
                    Object::Reference(new_id)
                }
                Err(err) => {
                    warn!(?ref_id, %err, "cannot resolve reference while copying, using Null");
                    Object::Null
                }
            }
        }
        other => other.clone(),
    }
}

// -- Inherited page attributes ------------------------------------------------

/// Resolve a page attribute through `/Parent` inheritance with a bounded
/// walk. Returns an owned copy of the value.
pub(crate) fn inherited_attribute(
    inner: &lopdf::Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<Object> {
    let mut current = inner.get_object(page_id).ok()?;
    for _ in 0..PARENT_WALK_LIMIT {
        let Object::Dictionary(dict) = current else {
            return None;
        };
        if let Ok(value) = dict.get(key) {
            return resolve(inner, value).cloned();
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => {
                current = inner.get_object(*parent_id).ok()?;
            }
            _ => return None,
        }
    }
    None
}

/// Media box of a page as `[x1, y1, x2, y2]`, falling back to US Letter.
pub(crate) fn media_box_of(inner: &lopdf::Document, page_id: ObjectId) -> [f32; 4] {
    box_attribute(inner, page_id, b"MediaBox").unwrap_or(LETTER_MEDIA_BOX)
}

/// A box-array attribute (`MediaBox`/`CropBox`) as corner coordinates.
pub(crate) fn box_attribute(
    inner: &lopdf::Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<[f32; 4]> {
    let Object::Array(array) = inherited_attribute(inner, page_id, key)? else {
        return None;
    };
    let values: Vec<f32> = array.iter().filter_map(number_value).collect();
    if values.len() == 4 {
        Some([values[0], values[1], values[2], values[3]])
    } else {
        None
    }
}

/// Effective page rotation in degrees, normalized into [0, 360).
pub(crate) fn rotation_of(inner: &lopdf::Document, page_id: ObjectId) -> i32 {
    match inherited_attribute(inner, page_id, b"Rotate") {
        Some(Object::Integer(degrees)) => (degrees as i32).rem_euclid(360),
        _ => 0,
    }
}

/// Width and height of a page in points.
pub(crate) fn page_size(inner: &lopdf::Document, page_id: ObjectId) -> (f32, f32) {
    let media_box = media_box_of(inner, page_id);
    (media_box[2] - media_box[0], media_box[3] - media_box[1])
}

fn number_value(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn resolve<'a>(inner: &'a lopdf::Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => inner.get_object(*id).ok(),
        other => Some(other),
    }
}

fn string_value(inner: &lopdf::Document, object: &Object) -> Option<String> {
    match resolve(inner, object)? {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn info_string(info: &Dictionary, key: &[u8]) -> Option<String> {
    match info.get(key).ok()? {
        Object::String(bytes, _) => {
            let value = String::from_utf8_lossy(bytes).into_owned();
            (!value.is_empty()).then_some(value)
        }
        _ => None,
    }
}

// -- PDF date strings ---------------------------------------------------------

/// Parse a PDF date string (`D:YYYYMMDDHHmmSS...`), tolerating the truncated
/// forms real files contain. Offsets are ignored; values are taken as UTC.
pub(crate) fn parse_pdf_date(raw: &str) -> Option<DateTime<Utc>> {
    let digits: String = raw
        .trim_start_matches("D:")
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    let naive = if digits.len() >= 14 {
        NaiveDateTime::parse_from_str(&digits[..14], "%Y%m%d%H%M%S").ok()?
    } else if digits.len() >= 8 {
        NaiveDate::parse_from_str(&digits[..8], "%Y%m%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?
    } else {
        return None;
    };
    Some(naive.and_utc())
}

/// Format a timestamp as a PDF date string.
pub(crate) fn format_pdf_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format("D:%Y%m%d%H%M%SZ").to_string()
}
