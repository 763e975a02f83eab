// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document composition — build new PDF documents from text or an image using
// `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use blattwerk_core::error::{BlattwerkError, Result};
use chrono::Utc;
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage,
    RawImageData, RawImageFormat, TextItem, XObjectTransform,
};
use tracing::{debug, info, instrument};

// US Letter.
const PAGE_WIDTH_MM: f32 = 215.9;
const PAGE_HEIGHT_MM: f32 = 279.4;
const MARGIN_MM: f32 = 20.0;

const TITLE_SIZE_PT: f32 = 24.0;
const BODY_SIZE_PT: f32 = 12.0;
const LINE_HEIGHT_PT: f32 = 16.0;

/// Maximum rendered image size in PDF points.
const IMAGE_FIT_WIDTH_PT: f32 = 500.0;
const IMAGE_FIT_HEIGHT_PT: f32 = 700.0;

/// Boilerplate scaffold wrapped around composed body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentTemplate {
    /// Title and body only.
    Blank,
    /// Dated salutation and sign-off.
    Letter,
    /// Dated report header.
    Report,
    /// Invoice and due dates plus payment terms.
    Invoice,
}

impl DocumentTemplate {
    fn preamble(&self) -> Vec<String> {
        let today = Utc::now();
        match self {
            Self::Blank => Vec::new(),
            Self::Letter => vec![
                String::new(),
                today.format("%d %B %Y").to_string(),
                String::new(),
                "Dear Sir or Madam,".to_string(),
                String::new(),
            ],
            Self::Report => vec![
                String::new(),
                format!("Report date: {}", today.format("%d %B %Y")),
                String::new(),
            ],
            Self::Invoice => vec![
                String::new(),
                format!("Invoice date: {}", today.format("%d %B %Y")),
                format!(
                    "Due date: {}",
                    (today + chrono::Duration::days(30)).format("%d %B %Y")
                ),
                String::new(),
            ],
        }
    }

    fn postlude(&self) -> Vec<String> {
        match self {
            Self::Blank | Self::Report => Vec::new(),
            Self::Letter => vec![String::new(), "Yours faithfully,".to_string()],
            Self::Invoice => vec![String::new(), "Payment terms: 30 days net.".to_string()],
        }
    }
}

/// Compose a text document with a centred title and template boilerplate.
///
/// The body is laid out top-to-bottom in Helvetica with simple word wrap and
/// automatic page breaks.
#[instrument(skip(body, template), fields(body_len = body.len(), ?template))]
pub fn compose_text(title: &str, body: &str, template: DocumentTemplate) -> Result<Vec<u8>> {
    if title.trim().is_empty() && body.trim().is_empty() {
        return Err(BlattwerkError::InputMissing(
            "both title and body are empty".to_string(),
        ));
    }

    let page_w = Mm(PAGE_WIDTH_MM);
    let page_h = Mm(PAGE_HEIGHT_MM);
    let page_w_pt = page_w.into_pt().0;
    let page_h_pt = page_h.into_pt().0;
    let margin_pt = Mm(MARGIN_MM).into_pt().0;

    // Approximate characters per line for Helvetica: average glyph width is
    // roughly 0.50 * font size.
    let usable_width_pt = page_w_pt - 2.0 * margin_pt;
    let max_chars_per_line = (usable_width_pt / (0.50 * BODY_SIZE_PT)) as usize;

    let mut lines = template.preamble();
    lines.extend(wrap_text(body, max_chars_per_line));
    lines.extend(template.postlude());

    let usable_height_pt = page_h_pt - 2.0 * margin_pt;
    // The title and its gap occupy roughly three body lines on the first page.
    let title_offset_pt = if title.trim().is_empty() {
        0.0
    } else {
        3.0 * LINE_HEIGHT_PT
    };
    let first_page_lines = ((usable_height_pt - title_offset_pt) / LINE_HEIGHT_PT) as usize;
    let lines_per_page = (usable_height_pt / LINE_HEIGHT_PT) as usize;

    let mut doc = PdfDocument::new(title);
    let mut pages: Vec<PdfPage> = Vec::new();

    let mut line_iter = lines.iter().peekable();
    loop {
        let first_page = pages.is_empty();
        let mut ops: Vec<Op> = Vec::new();
        let mut top_pt = page_h_pt - margin_pt;

        if first_page && !title.trim().is_empty() {
            let title_width_pt = title.chars().count() as f32 * 0.50 * TITLE_SIZE_PT;
            let title_x = ((page_w_pt - title_width_pt) / 2.0).max(margin_pt);
            ops.extend(text_ops(title, TITLE_SIZE_PT, title_x, top_pt - TITLE_SIZE_PT));
            top_pt -= title_offset_pt;
        }

        let budget = if first_page {
            first_page_lines
        } else {
            lines_per_page
        };
        let mut line_idx = 0usize;
        while line_idx < budget {
            let line = match line_iter.next() {
                Some(l) => l,
                None => break,
            };
            if !line.is_empty() {
                let y_pt = top_pt - BODY_SIZE_PT - line_idx as f32 * LINE_HEIGHT_PT;
                ops.extend(text_ops(line, BODY_SIZE_PT, margin_pt, y_pt));
            }
            line_idx += 1;
        }

        pages.push(PdfPage::new(page_w, page_h, ops));
        if line_iter.peek().is_none() {
            break;
        }
    }

    doc.with_pages(pages);
    debug!(total_lines = lines.len(), pages = doc.pages.len(), "text layout complete");

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
    info!(bytes = output.len(), "document composed");
    Ok(output)
}

/// Compose a single-page document containing the given image.
///
/// The image is decoded, converted to RGB, and scaled to fit within a
/// 500 x 700 point box centred on a US Letter page, preserving aspect ratio
/// and never upscaling.
#[instrument(skip(image_bytes), fields(bytes_len = image_bytes.len()))]
pub fn compose_from_image(title: &str, image_bytes: &[u8]) -> Result<Vec<u8>> {
    let page_w = Mm(PAGE_WIDTH_MM);
    let page_h = Mm(PAGE_HEIGHT_MM);

    let dynamic_image = ::image::load_from_memory(image_bytes)
        .map_err(|err| BlattwerkError::ImageError(format!("failed to decode image: {err}")))?;

    let img_width = dynamic_image.width() as usize;
    let img_height = dynamic_image.height() as usize;

    let rgb_image = dynamic_image.to_rgb8();
    let raw = RawImage {
        pixels: RawImageData::U8(rgb_image.into_raw()),
        width: img_width,
        height: img_height,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    };

    let mut doc = PdfDocument::new(title);
    let xobject_id = doc.add_image(&raw);

    // Image native size at 150 DPI, then scaled to fit the box.
    let dpi: f32 = 150.0;
    let img_w_pt = img_width as f32 / dpi * 72.0;
    let img_h_pt = img_height as f32 / dpi * 72.0;

    let scale = (IMAGE_FIT_WIDTH_PT / img_w_pt)
        .min(IMAGE_FIT_HEIGHT_PT / img_h_pt)
        .min(1.0);
    let rendered_w_pt = img_w_pt * scale;
    let rendered_h_pt = img_h_pt * scale;

    let page_w_pt = page_w.into_pt().0;
    let page_h_pt = page_h.into_pt().0;
    let x_offset = (page_w_pt - rendered_w_pt) / 2.0;
    let y_offset = (page_h_pt - rendered_h_pt) / 2.0;

    let ops = vec![Op::UseXobject {
        id: xobject_id,
        transform: XObjectTransform {
            translate_x: Some(Pt(x_offset)),
            translate_y: Some(Pt(y_offset)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(dpi),
            rotate: None,
        },
    }];

    doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);
    debug!(rendered_w_pt, rendered_h_pt, scale, "image placed on page");

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
    info!(bytes = output.len(), "image document composed");
    Ok(output)
}

fn text_ops(text: &str, size_pt: f32, x_pt: f32, y_pt: f32) -> Vec<Op> {
    vec![
        Op::StartTextSection,
        Op::SetTextCursor {
            pos: Point {
                x: Pt(x_pt),
                y: Pt(y_pt),
            },
        },
        Op::SetFontSizeBuiltinFont {
            size: Pt(size_pt),
            font: BuiltinFont::Helvetica,
        },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text.to_string())],
            font: BuiltinFont::Helvetica,
        },
        Op::EndTextSection,
    ]
}

/// Wrap a multi-line string so that no line exceeds `max_width` characters.
///
/// Splits on existing newlines first, then performs simple word-wrap within
/// each paragraph. Words longer than `max_width` are force-broken.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut result = Vec::new();

    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            result.push(String::new());
            continue;
        }

        let mut current_line = String::with_capacity(max_width);
        for word in words {
            if word.len() > max_width {
                if !current_line.is_empty() {
                    result.push(current_line.clone());
                    current_line.clear();
                }
                let mut remaining = word;
                while remaining.len() > max_width {
                    let (chunk, rest) = remaining.split_at(max_width);
                    result.push(chunk.to_string());
                    remaining = rest;
                }
                if !remaining.is_empty() {
                    current_line.push_str(remaining);
                }
            } else if current_line.is_empty() {
                current_line.push_str(word);
            } else if current_line.len() + 1 + word.len() <= max_width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                result.push(current_line.clone());
                current_line.clear();
                current_line.push_str(word);
            }
        }

        if !current_line.is_empty() {
            result.push(current_line);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Document;

    #[test]
    fn composed_text_is_a_loadable_document() {
        let bytes = compose_text("Quarterly Notes", "Hello from the composer.", DocumentTemplate::Blank)
            .unwrap();
        let doc = Document::load(&bytes).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.metadata().title.as_deref(), Some("Quarterly Notes"));
    }

    #[test]
    fn long_body_breaks_across_pages() {
        let body = "lorem ipsum dolor sit amet\n".repeat(200);
        let bytes = compose_text("Long", &body, DocumentTemplate::Blank).unwrap();
        let doc = Document::load(&bytes).unwrap();
        assert!(doc.page_count() > 1, "expected page breaks, got {}", doc.page_count());
    }

    #[test]
    fn empty_title_and_body_is_rejected() {
        let err = compose_text("", "  ", DocumentTemplate::Letter).unwrap_err();
        assert!(matches!(err, BlattwerkError::InputMissing(_)));
    }

    #[test]
    fn title_only_produces_one_page() {
        let bytes = compose_text("Cover", "", DocumentTemplate::Blank).unwrap();
        let doc = Document::load(&bytes).unwrap();
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn image_composition_yields_one_letter_page() {
        let mut png = Vec::new();
        let image = ::image::RgbImage::from_pixel(4, 4, ::image::Rgb([200, 10, 10]));
        ::image::DynamicImage::ImageRgb8(image)
            .write_to(&mut std::io::Cursor::new(&mut png), ::image::ImageFormat::Png)
            .unwrap();

        let bytes = compose_from_image("Scan", &png).unwrap();
        let doc = Document::load(&bytes).unwrap();
        assert_eq!(doc.page_count(), 1);

        let geometry = &doc.page_geometry()[0];
        assert!((geometry.width - 612.0).abs() < 1.0);
        assert!((geometry.height - 792.0).abs() < 1.0);
    }

    #[test]
    fn undecodable_image_is_an_image_error() {
        let err = compose_from_image("Bad", b"not an image").unwrap_err();
        assert!(matches!(err, BlattwerkError::ImageError(_)));
    }

    #[test]
    fn wrap_respects_width_and_breaks_long_words() {
        let wrapped = wrap_text("aa bb cc ddddddddd", 5);
        assert_eq!(wrapped, vec!["aa bb", "cc", "ddddd", "dddd"]);
    }
}
