// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content-stream overlays: watermark, page numbers, free text, redaction
// rectangles, shapes, stamps, headers/footers, link annotations, and the
// visual signature block.
//
// Overlays are appended as an extra content stream per page, wrapped in
// q/Q so the original content's graphics state is untouched. Text uses a
// per-document Helvetica resource; opacity goes through an ExtGState.

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{
    HorizontalAlignment, PageCorner, PageRect, Rgb, SignerInfo, VerticalAnchor,
};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId};
use tracing::{info, instrument};

use crate::model::{self, Document};

/// Resource names reserved for overlay drawing.
const OVERLAY_FONT: &str = "BwF1";
const OVERLAY_GSTATE: &str = "BwGs1";

/// Rough Helvetica advance: half the font size per character. Good enough
/// for centring overlay strings without font metrics.
fn text_width_estimate(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size / 2.0
}

// -- Watermark ----------------------------------------------------------------

/// Appearance of a watermark overlay.
#[derive(Debug, Clone)]
pub struct WatermarkOptions {
    pub font_size: f32,
    /// Fill opacity in [0, 1].
    pub opacity: f32,
    pub color: Rgb,
    /// Counter-clockwise rotation in degrees.
    pub rotation: f32,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            font_size: 50.0,
            opacity: 0.3,
            color: Rgb::GRAY,
            rotation: 45.0,
        }
    }
}

/// Draw semi-transparent rotated text centred on every page.
#[instrument(skip_all, fields(text))]
pub fn add_watermark(doc: &Document, text: &str, opts: &WatermarkOptions) -> Result<Document> {
    if text.is_empty() {
        return Err(BlattwerkError::InputMissing(
            "watermark text is empty".to_string(),
        ));
    }

    let mut inner = doc.inner.clone();
    let font_id = add_helvetica(&mut inner);
    let gstate_id = add_opacity_gstate(&mut inner, opts.opacity);

    for page_id in page_ids(&inner) {
        let (width, height) = model::page_size(&inner, page_id);
        let x = width / 2.0 - text_width_estimate(text, opts.font_size) / 2.0;
        let y = height / 2.0;

        let ops = rotated_text_ops(text, x, y, opts.font_size, opts.color, opts.rotation, true);
        attach_resources(&mut inner, page_id, font_id, Some(gstate_id))?;
        append_operations(&mut inner, page_id, ops)?;
    }

    info!(pages = doc.page_count(), "watermark applied");
    Ok(Document::from_inner(inner, doc.encrypted()))
}

// -- Page numbers -------------------------------------------------------------

/// Draw a 1-based page number on every page.
#[instrument(skip_all)]
pub fn add_page_numbers(
    doc: &Document,
    anchor: VerticalAnchor,
    alignment: HorizontalAlignment,
    font_size: f32,
) -> Result<Document> {
    let mut inner = doc.inner.clone();
    let font_id = add_helvetica(&mut inner);

    for (index, page_id) in page_ids(&inner).into_iter().enumerate() {
        let (width, height) = model::page_size(&inner, page_id);
        let label = (index + 1).to_string();

        let x = match alignment {
            HorizontalAlignment::Left => 50.0,
            HorizontalAlignment::Center => width / 2.0 - text_width_estimate(&label, font_size) / 2.0,
            HorizontalAlignment::Right => width - 50.0,
        };
        let y = match anchor {
            VerticalAnchor::Top => height - 30.0,
            VerticalAnchor::Bottom => 30.0,
        };

        let ops = rotated_text_ops(&label, x, y, font_size, Rgb::BLACK, 0.0, false);
        attach_resources(&mut inner, page_id, font_id, None)?;
        append_operations(&mut inner, page_id, ops)?;
    }

    Ok(Document::from_inner(inner, doc.encrypted()))
}

// -- Free text ----------------------------------------------------------------

/// Placement of a free-text annotation drawn by [`add_text`].
#[derive(Debug, Clone)]
pub struct TextOptions {
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub color: Rgb,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            x: 50.0,
            y: 50.0,
            font_size: 12.0,
            color: Rgb::BLACK,
        }
    }
}

/// Draw text at a position on one page (0-based index).
#[instrument(skip_all, fields(page))]
pub fn add_text(doc: &Document, page: usize, text: &str, opts: &TextOptions) -> Result<Document> {
    doc.check_indices(&[page])?;
    if text.is_empty() {
        return Err(BlattwerkError::InputMissing("text is empty".to_string()));
    }

    let mut inner = doc.inner.clone();
    let font_id = add_helvetica(&mut inner);
    let page_id = page_ids(&inner)[page];

    let ops = rotated_text_ops(text, opts.x, opts.y, opts.font_size, opts.color, 0.0, false);
    attach_resources(&mut inner, page_id, font_id, None)?;
    append_operations(&mut inner, page_id, ops)?;

    Ok(Document::from_inner(inner, doc.encrypted()))
}

// -- Redaction ----------------------------------------------------------------

/// Draw an opaque rectangle over a region of one page.
///
/// Visual cover only: the underlying content stream is not removed and the
/// covered text is still present (and extractable) in the file. This is a
/// presentation feature, not a security control.
#[instrument(skip_all, fields(page))]
pub fn redact(doc: &Document, page: usize, rect: PageRect, color: Rgb) -> Result<Document> {
    doc.check_indices(&[page])?;

    let mut inner = doc.inner.clone();
    let page_id = page_ids(&inner)[page];
    append_operations(&mut inner, page_id, filled_rect_ops(rect, color))?;

    info!(page, "redaction rectangle drawn (visual cover only)");
    Ok(Document::from_inner(inner, doc.encrypted()))
}

// -- Shapes -------------------------------------------------------------------

/// A drawable vector shape.
#[derive(Debug, Clone)]
pub enum Shape {
    Rectangle {
        rect: PageRect,
        color: Rgb,
        filled: bool,
        line_width: f32,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: Rgb,
        line_width: f32,
    },
}

/// Draw a stroked or filled shape on one page.
#[instrument(skip_all, fields(page))]
pub fn draw_shape(doc: &Document, page: usize, shape: &Shape) -> Result<Document> {
    doc.check_indices(&[page])?;

    let mut inner = doc.inner.clone();
    let page_id = page_ids(&inner)[page];

    let ops = match shape {
        Shape::Rectangle {
            rect,
            color,
            filled: true,
            ..
        } => filled_rect_ops(*rect, *color),
        Shape::Rectangle {
            rect,
            color,
            filled: false,
            line_width,
        } => stroked_rect_ops(*rect, *color, *line_width),
        Shape::Line {
            from,
            to,
            color,
            line_width,
        } => {
            let (r, g, b) = color.normalized();
            vec![
                Operation::new("q", vec![]),
                Operation::new("RG", vec![r.into(), g.into(), b.into()]),
                Operation::new("w", vec![(*line_width).into()]),
                Operation::new("m", vec![from.0.into(), from.1.into()]),
                Operation::new("l", vec![to.0.into(), to.1.into()]),
                Operation::new("S", vec![]),
                Operation::new("Q", vec![]),
            ]
        }
    };
    append_operations(&mut inner, page_id, ops)?;

    Ok(Document::from_inner(inner, doc.encrypted()))
}

// -- Stamp --------------------------------------------------------------------

/// Draw a boxed opaque text stamp at a page corner or the centre, on every
/// page or a single one.
#[instrument(skip_all, fields(text, ?corner))]
pub fn stamp(
    doc: &Document,
    text: &str,
    corner: PageCorner,
    page: Option<usize>,
) -> Result<Document> {
    if text.is_empty() {
        return Err(BlattwerkError::InputMissing("stamp text is empty".to_string()));
    }
    if let Some(page) = page {
        doc.check_indices(&[page])?;
    }

    const FONT_SIZE: f32 = 12.0;
    const PADDING: f32 = 6.0;
    const MARGIN: f32 = 20.0;

    let mut inner = doc.inner.clone();
    let font_id = add_helvetica(&mut inner);

    let all_ids = page_ids(&inner);
    let targets: Vec<ObjectId> = match page {
        Some(index) => vec![all_ids[index]],
        None => all_ids,
    };

    for page_id in targets {
        let (width, height) = model::page_size(&inner, page_id);
        let box_w = text_width_estimate(text, FONT_SIZE) + 2.0 * PADDING;
        let box_h = FONT_SIZE + 2.0 * PADDING;

        let (bx, by) = match corner {
            PageCorner::TopLeft => (MARGIN, height - MARGIN - box_h),
            PageCorner::TopRight => (width - MARGIN - box_w, height - MARGIN - box_h),
            PageCorner::BottomLeft => (MARGIN, MARGIN),
            PageCorner::BottomRight => (width - MARGIN - box_w, MARGIN),
            PageCorner::Center => ((width - box_w) / 2.0, (height - box_h) / 2.0),
        };
        let box_rect = PageRect::new(bx, by, box_w, box_h);

        let mut ops = filled_rect_ops(box_rect, Rgb::WHITE);
        ops.extend(stroked_rect_ops(box_rect, Rgb::BLACK, 1.0));
        ops.extend(rotated_text_ops(
            text,
            bx + PADDING,
            by + PADDING,
            FONT_SIZE,
            Rgb::BLACK,
            0.0,
            false,
        ));

        attach_resources(&mut inner, page_id, font_id, None)?;
        append_operations(&mut inner, page_id, ops)?;
    }

    Ok(Document::from_inner(inner, doc.encrypted()))
}

// -- Header / footer ----------------------------------------------------------

/// Draw a centred header and/or footer line on every page.
#[instrument(skip_all)]
pub fn set_header_footer(
    doc: &Document,
    header: Option<&str>,
    footer: Option<&str>,
    font_size: f32,
) -> Result<Document> {
    if header.is_none() && footer.is_none() {
        return Err(BlattwerkError::InputMissing(
            "neither header nor footer text given".to_string(),
        ));
    }

    let mut inner = doc.inner.clone();
    let font_id = add_helvetica(&mut inner);

    for page_id in page_ids(&inner) {
        let (width, height) = model::page_size(&inner, page_id);
        let mut ops = Vec::new();
        if let Some(header) = header {
            let x = width / 2.0 - text_width_estimate(header, font_size) / 2.0;
            ops.extend(rotated_text_ops(header, x, height - 30.0, font_size, Rgb::BLACK, 0.0, false));
        }
        if let Some(footer) = footer {
            let x = width / 2.0 - text_width_estimate(footer, font_size) / 2.0;
            ops.extend(rotated_text_ops(footer, x, 30.0, font_size, Rgb::BLACK, 0.0, false));
        }
        attach_resources(&mut inner, page_id, font_id, None)?;
        append_operations(&mut inner, page_id, ops)?;
    }

    Ok(Document::from_inner(inner, doc.encrypted()))
}

// -- Link annotations ---------------------------------------------------------

/// Add a URI link annotation over a region of one page.
#[instrument(skip_all, fields(page, uri))]
pub fn add_link(doc: &Document, page: usize, rect: PageRect, uri: &str) -> Result<Document> {
    doc.check_indices(&[page])?;
    if uri.is_empty() {
        return Err(BlattwerkError::InputMissing("link URI is empty".to_string()));
    }

    let mut inner = doc.inner.clone();
    let page_id = page_ids(&inner)[page];

    let corners = rect.corners();
    let action = Dictionary::from_iter([
        ("Type", Object::Name(b"Action".to_vec())),
        ("S", Object::Name(b"URI".to_vec())),
        ("URI", Object::string_literal(uri)),
    ]);
    let annotation_id = inner.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Annot".to_vec())),
        ("Subtype", Object::Name(b"Link".to_vec())),
        (
            "Rect",
            Object::Array(corners.iter().map(|&v| Object::Real(v)).collect()),
        ),
        (
            "Border",
            Object::Array(vec![0.into(), 0.into(), 0.into()]),
        ),
        ("A", Object::Dictionary(action)),
    ]));

    if let Ok(Object::Dictionary(page_dict)) = inner.get_object_mut(page_id) {
        match page_dict.get(b"Annots").ok().cloned() {
            Some(Object::Array(mut annots)) => {
                annots.push(Object::Reference(annotation_id));
                page_dict.set("Annots", Object::Array(annots));
            }
            Some(Object::Reference(existing)) => {
                page_dict.set(
                    "Annots",
                    Object::Array(vec![
                        Object::Reference(existing),
                        Object::Reference(annotation_id),
                    ]),
                );
            }
            _ => {
                page_dict.set("Annots", Object::Array(vec![Object::Reference(annotation_id)]));
            }
        }
    }

    Ok(Document::from_inner(inner, doc.encrypted()))
}

// -- Signature block ----------------------------------------------------------

/// Draw a visual signature block (name, optional title, date) on the last
/// page. Non-cryptographic: this is ink on the page, not a digital
/// signature.
#[instrument(skip_all)]
pub fn sign(doc: &Document, signer: &SignerInfo) -> Result<Document> {
    let page_count = doc.page_count();
    if page_count == 0 {
        return Err(BlattwerkError::InputMissing(
            "cannot sign a document with no pages".to_string(),
        ));
    }
    if signer.name.is_empty() {
        return Err(BlattwerkError::InputMissing("signer name is empty".to_string()));
    }

    const FONT_SIZE: f32 = 10.0;
    const LINE_GAP: f32 = 14.0;
    const BLOCK_WIDTH: f32 = 200.0;

    let mut inner = doc.inner.clone();
    let font_id = add_helvetica(&mut inner);
    let page_id = page_ids(&inner)[page_count - 1];

    let (width, _) = model::page_size(&inner, page_id);
    let x = width - BLOCK_WIDTH - 40.0;
    let mut y = 60.0 + 3.0 * LINE_GAP;

    // Rule above the block, then the identity lines beneath it.
    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new("RG", vec![0.into(), 0.into(), 0.into()]),
        Operation::new("w", vec![1.into()]),
        Operation::new("m", vec![x.into(), y.into()]),
        Operation::new("l", vec![(x + BLOCK_WIDTH).into(), y.into()]),
        Operation::new("S", vec![]),
        Operation::new("Q", vec![]),
    ];

    y -= LINE_GAP;
    ops.extend(rotated_text_ops(&signer.name, x, y, FONT_SIZE, Rgb::BLACK, 0.0, false));
    if let Some(title) = &signer.title {
        y -= LINE_GAP;
        ops.extend(rotated_text_ops(title, x, y, FONT_SIZE, Rgb::BLACK, 0.0, false));
    }
    y -= LINE_GAP;
    ops.extend(rotated_text_ops(
        &signer.date_line(),
        x,
        y,
        FONT_SIZE,
        Rgb::BLACK,
        0.0,
        false,
    ));

    attach_resources(&mut inner, page_id, font_id, None)?;
    append_operations(&mut inner, page_id, ops)?;

    Ok(Document::from_inner(inner, doc.encrypted()))
}

// -- Content-stream plumbing --------------------------------------------------

fn page_ids(inner: &lopdf::Document) -> Vec<ObjectId> {
    inner.get_pages().values().copied().collect()
}

fn add_helvetica(inner: &mut lopdf::Document) -> ObjectId {
    inner.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]))
}

fn add_opacity_gstate(inner: &mut lopdf::Document, opacity: f32) -> ObjectId {
    let opacity = opacity.clamp(0.0, 1.0);
    inner.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"ExtGState".to_vec())),
        ("ca", Object::Real(opacity)),
        ("CA", Object::Real(opacity)),
    ]))
}

/// Make the overlay font (and optionally the opacity graphics state)
/// reachable from the page's `/Resources`, preserving existing entries.
/// Inherited resources are materialised onto the page first.
fn attach_resources(
    inner: &mut lopdf::Document,
    page_id: ObjectId,
    font_id: ObjectId,
    gstate_id: Option<ObjectId>,
) -> Result<()> {
    let mut resources = match model::inherited_attribute(inner, page_id, b"Resources") {
        Some(Object::Dictionary(dict)) => dict,
        _ => Dictionary::new(),
    };

    let mut fonts = resolve_subdictionary(inner, &resources, b"Font");
    fonts.set(OVERLAY_FONT, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    if let Some(gstate_id) = gstate_id {
        let mut gstates = resolve_subdictionary(inner, &resources, b"ExtGState");
        gstates.set(OVERLAY_GSTATE, Object::Reference(gstate_id));
        resources.set("ExtGState", Object::Dictionary(gstates));
    }

    match inner.get_object_mut(page_id) {
        Ok(Object::Dictionary(page_dict)) => {
            page_dict.set("Resources", Object::Dictionary(resources));
            Ok(())
        }
        _ => Err(BlattwerkError::PdfError(format!(
            "page object {page_id:?} is not a dictionary"
        ))),
    }
}

fn resolve_subdictionary(
    inner: &lopdf::Document,
    resources: &Dictionary,
    key: &[u8],
) -> Dictionary {
    match resources.get(key) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => match inner.get_object(*id) {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        },
        _ => Dictionary::new(),
    }
}

/// Encode operations as a content stream and append it to the page's
/// `/Contents`, keeping the existing stream(s) first.
fn append_operations(
    inner: &mut lopdf::Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<()> {
    let encoded = Content { operations }.encode().map_err(|err| {
        BlattwerkError::PdfError(format!("failed to encode content stream: {err}"))
    })?;
    let content_id = inner.add_object(Object::Stream(lopdf::Stream::new(
        Dictionary::new(),
        encoded,
    )));

    match inner.get_object_mut(page_id) {
        Ok(Object::Dictionary(page_dict)) => {
            match page_dict.get(b"Contents").ok().cloned() {
                Some(Object::Reference(existing)) => {
                    page_dict.set(
                        "Contents",
                        Object::Array(vec![
                            Object::Reference(existing),
                            Object::Reference(content_id),
                        ]),
                    );
                }
                Some(Object::Array(mut streams)) => {
                    streams.push(Object::Reference(content_id));
                    page_dict.set("Contents", Object::Array(streams));
                }
                _ => {
                    page_dict.set("Contents", Object::Reference(content_id));
                }
            }
            Ok(())
        }
        _ => Err(BlattwerkError::PdfError(format!(
            "page object {page_id:?} is not a dictionary"
        ))),
    }
}

/// Text drawn through a text matrix, optionally rotated and optionally
/// through the overlay ExtGState.
fn rotated_text_ops(
    text: &str,
    x: f32,
    y: f32,
    font_size: f32,
    color: Rgb,
    rotation_degrees: f32,
    with_gstate: bool,
) -> Vec<Operation> {
    let radians = rotation_degrees.to_radians();
    let (sin, cos) = radians.sin_cos();
    let (r, g, b) = color.normalized();

    let mut ops = vec![Operation::new("q", vec![])];
    if with_gstate {
        ops.push(Operation::new("gs", vec![OVERLAY_GSTATE.into()]));
    }
    ops.extend([
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![OVERLAY_FONT.into(), font_size.into()]),
        Operation::new("rg", vec![r.into(), g.into(), b.into()]),
        Operation::new(
            "Tm",
            vec![
                cos.into(),
                sin.into(),
                (-sin).into(),
                cos.into(),
                x.into(),
                y.into(),
            ],
        ),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]);
    ops
}

fn filled_rect_ops(rect: PageRect, color: Rgb) -> Vec<Operation> {
    let (r, g, b) = color.normalized();
    vec![
        Operation::new("q", vec![]),
        Operation::new("rg", vec![r.into(), g.into(), b.into()]),
        Operation::new(
            "re",
            vec![
                rect.x.into(),
                rect.y.into(),
                rect.width.into(),
                rect.height.into(),
            ],
        ),
        Operation::new("f", vec![]),
        Operation::new("Q", vec![]),
    ]
}

fn stroked_rect_ops(rect: PageRect, color: Rgb, line_width: f32) -> Vec<Operation> {
    let (r, g, b) = color.normalized();
    vec![
        Operation::new("q", vec![]),
        Operation::new("RG", vec![r.into(), g.into(), b.into()]),
        Operation::new("w", vec![line_width.into()]),
        Operation::new(
            "re",
            vec![
                rect.x.into(),
                rect.y.into(),
                rect.width.into(),
                rect.height.into(),
            ],
        ),
        Operation::new("S", vec![]),
        Operation::new("Q", vec![]),
    ]
}
