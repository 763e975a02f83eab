// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text recognition collaborator seam and the default `tesseract` shell-out.
// Tesseract's TSV output carries per-word confidences, which is what the
// pipeline's quality scoring and language auto-detection feed on.

use async_trait::async_trait;
use blattwerk_core::error::{BlattwerkError, Result};
use tokio::process::Command;
use tracing::{debug, instrument};

/// Text recognized from one page image, with quality signals.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    /// Mean per-word confidence, 0.0 to 100.0. Zero when no words were found.
    pub confidence: f32,
    pub word_count: usize,
    pub line_count: usize,
}

/// Recognition collaborator: PNG image bytes to text plus confidence.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Fails with [`BlattwerkError::CollaboratorUnavailable`] (with an
    /// install hint) when the backend cannot be invoked.
    async fn ensure_available(&self) -> Result<()>;

    /// Recognize text in a page image using the given tesseract language
    /// code (e.g. `eng`).
    async fn recognize(&self, image: &[u8], language: &str) -> Result<RecognizedText>;
}

/// Default recognizer shelling out to the `tesseract` CLI in TSV mode.
#[derive(Debug, Default)]
pub struct TesseractRecognizer;

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn ensure_available(&self) -> Result<()> {
        let probe = Command::new("tesseract").arg("--version").output().await;
        match probe {
            Ok(output) if output.status.success() => Ok(()),
            _ => Err(BlattwerkError::CollaboratorUnavailable(
                "tesseract not found; install it (e.g. `apt install tesseract-ocr` or \
                 `brew install tesseract`) to enable text recognition"
                    .to_string(),
            )),
        }
    }

    #[instrument(skip(self, image))]
    async fn recognize(&self, image: &[u8], language: &str) -> Result<RecognizedText> {
        let workdir = tempfile::tempdir()?;
        let image_path = workdir.path().join("page.png");
        let output_base = workdir.path().join("out");
        tokio::fs::write(&image_path, image).await?;

        let output = Command::new("tesseract")
            .arg(&image_path)
            .arg(&output_base)
            .args(["-l", language])
            .arg("tsv")
            .output()
            .await
            .map_err(|err| {
                BlattwerkError::CollaboratorUnavailable(format!("failed to run tesseract: {err}"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BlattwerkError::OcrError(format!(
                "tesseract failed: {stderr}"
            )));
        }

        let tsv = tokio::fs::read_to_string(workdir.path().join("out.tsv")).await?;
        let recognized = parse_tsv(&tsv);
        debug!(
            words = recognized.word_count,
            confidence = recognized.confidence,
            "page recognized"
        );
        Ok(recognized)
    }
}

/// Parse tesseract TSV output into recognized text with quality signals.
///
/// Level-5 rows are words; a word's confidence counts toward the mean only
/// when non-negative (tesseract marks non-text regions with -1). Words are
/// regrouped into lines by their (block, paragraph, line) coordinates.
pub fn parse_tsv(tsv: &str) -> RecognizedText {
    let mut lines: Vec<String> = Vec::new();
    let mut current_key: Option<(u32, u32, u32)> = None;
    let mut confidence_sum = 0.0f32;
    let mut scored_words = 0usize;
    let mut word_count = 0usize;

    for row in tsv.lines().skip(1) {
        let columns: Vec<&str> = row.split('\t').collect();
        if columns.len() < 12 {
            continue;
        }
        if columns[0] != "5" {
            continue;
        }
        let word = columns[11].trim();
        if word.is_empty() {
            continue;
        }

        let key = (
            columns[2].parse().unwrap_or(0),
            columns[3].parse().unwrap_or(0),
            columns[4].parse().unwrap_or(0),
        );
        if current_key != Some(key) {
            current_key = Some(key);
            lines.push(String::new());
        }
        if let Some(line) = lines.last_mut() {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        word_count += 1;

        if let Ok(confidence) = columns[10].parse::<f32>() {
            if confidence >= 0.0 {
                confidence_sum += confidence;
                scored_words += 1;
            }
        }
    }

    let confidence = if scored_words > 0 {
        confidence_sum / scored_words as f32
    } else {
        0.0
    };

    RecognizedText {
        line_count: lines.len(),
        text: lines.join("\n"),
        confidence,
        word_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        let mut out = HEADER.to_string();
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out
    }

    #[test]
    fn words_are_regrouped_into_lines() {
        let input = tsv(&[
            "5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t91.5\tHello",
            "5\t1\t1\t1\t1\t2\t12\t0\t10\t10\t88.5\tworld",
            "5\t1\t1\t1\t2\t1\t0\t14\t10\t10\t95.0\tSecond",
        ]);
        let recognized = parse_tsv(&input);
        assert_eq!(recognized.text, "Hello world\nSecond");
        assert_eq!(recognized.word_count, 3);
        assert_eq!(recognized.line_count, 2);
        assert!((recognized.confidence - 91.666_664).abs() < 0.001);
    }

    #[test]
    fn negative_confidence_rows_are_excluded_from_the_mean() {
        let input = tsv(&[
            "4\t1\t1\t1\t1\t0\t0\t0\t100\t12\t-1\t",
            "5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t80.0\tword",
            "5\t1\t1\t1\t1\t2\t12\t0\t10\t10\t-1\tsmudge",
        ]);
        let recognized = parse_tsv(&input);
        assert_eq!(recognized.word_count, 2);
        assert_eq!(recognized.confidence, 80.0);
    }

    #[test]
    fn empty_page_yields_zero_confidence() {
        let recognized = parse_tsv(HEADER);
        assert_eq!(recognized.text, "");
        assert_eq!(recognized.word_count, 0);
        assert_eq!(recognized.confidence, 0.0);
    }

    #[test]
    fn short_rows_are_ignored() {
        let input = tsv(&["5\t1\t1", "not a tsv row at all"]);
        let recognized = parse_tsv(&input);
        assert_eq!(recognized.word_count, 0);
    }
}
