// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Blattwerk document engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A rectangle on a page, in PDF points with a bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle as `[x1, y1, x2, y2]` corner coordinates, the form PDF
    /// box arrays use.
    pub fn corners(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }
}

/// An RGB colour with 0–255 channels at the interface.
///
/// PDF colour operators take operands in [0, 1]; use
/// [`normalized`](Self::normalized) when emitting content streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };
    pub const GRAY: Rgb = Rgb {
        r: 128,
        g: 128,
        b: 128,
    };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channel values normalized to [0, 1] for PDF `rg`/`RG` operands.
    pub fn normalized(&self) -> (f32, f32, f32) {
        (
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        )
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Horizontal placement for page numbers, headers, and similar overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlignment {
    Left,
    Center,
    Right,
}

/// Vertical placement: the top or bottom band of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAnchor {
    Top,
    Bottom,
}

/// Anchor position for a stamp overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

/// The document information record, mirroring the PDF Info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub keywords: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

/// Kind of an interactive form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFieldKind {
    Text,
    Checkbox,
    /// A field type this engine does not interpret (`/Ch`, `/Sig`, ...).
    Other(String),
}

/// One interactive form field: name, kind, and current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub kind: FormFieldKind,
    pub value: Option<String>,
}

/// Per-page size and rotation, as surveyed by validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// 0-based page index.
    pub index: usize,
    /// Width in PDF points.
    pub width: f32,
    /// Height in PDF points.
    pub height: f32,
    /// Rotation in degrees, normalized into [0, 360).
    pub rotation: i32,
}

impl PageGeometry {
    /// Whether the page is wider than it is tall.
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// Identity drawn by the visual signature block.
///
/// This is presentation only — no cryptographic signature is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignerInfo {
    pub name: String,
    pub title: Option<String>,
    /// Date line to render; defaults to today when absent.
    pub date: Option<String>,
}

impl SignerInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            date: None,
        }
    }

    /// The date string to draw, falling back to today's date.
    pub fn date_line(&self) -> String {
        self.date
            .clone()
            .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_normalizes_channels() {
        let (r, g, b) = Rgb::new(255, 0, 128).normalized();
        assert_eq!(r, 1.0);
        assert_eq!(g, 0.0);
        assert!((b - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn rect_corners() {
        let rect = PageRect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.corners(), [10.0, 20.0, 110.0, 70.0]);
    }

    #[test]
    fn landscape_detection() {
        let page = PageGeometry {
            index: 0,
            width: 792.0,
            height: 612.0,
            rotation: 0,
        };
        assert!(page.is_landscape());
    }

    #[test]
    fn signer_date_defaults_to_today() {
        let signer = SignerInfo::new("A. Reviewer");
        let line = signer.date_line();
        assert_eq!(line.len(), 10, "expected YYYY-MM-DD, got {line}");
    }
}
