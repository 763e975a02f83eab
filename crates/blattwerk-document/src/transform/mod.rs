// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page transform operations: pure functions from an input document plus
// parameters to a new document. The input is never mutated.

pub mod geometry;
pub mod overlay;
pub mod pages;
pub mod protect;

pub use geometry::{crop, resize, rotate};
pub use overlay::{
    add_link, add_page_numbers, add_text, add_watermark, draw_shape, redact, set_header_footer,
    sign, stamp, Shape, TextOptions, WatermarkOptions,
};
pub use pages::{
    compress, duplicate, extract_pages, merge, organize, remove_pages, reverse, split,
};
pub use protect::{protect, unlock, EncryptionTool, QpdfEncryptionTool};
