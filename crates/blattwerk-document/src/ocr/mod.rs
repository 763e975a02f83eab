// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR pipeline: rasterize pages, recognize text concurrently with a bounded
// in-flight window and a per-page timeout, and assemble a document-level
// outcome. Language auto-detection runs the pipeline per candidate language
// and keeps the run with the strictly highest mean confidence.

pub mod raster;
pub mod recognize;

use std::sync::Arc;
use std::time::Duration;

use blattwerk_core::error::{BlattwerkError, Result};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use crate::model::Document;

pub use raster::{rasterize_document, PageRasterizer, PdftoppmRasterizer};
pub use recognize::{RecognizedText, TesseractRecognizer, TextRecognizer};

/// Tesseract language codes the pipeline accepts.
pub const SUPPORTED_LANGUAGES: [&str; 10] = [
    "eng", "spa", "fra", "deu", "ita", "por", "rus", "chi_sim", "jpn", "kor",
];

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Rasterization resolution.
    pub dpi: u32,
    /// Candidate languages for auto-detection, tried in order.
    pub languages: Vec<String>,
    /// Per-page budget covering rasterization plus recognition.
    pub page_timeout: Duration,
    /// Maximum pages in flight at once.
    pub page_concurrency: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            languages: vec![
                "eng".to_string(),
                "spa".to_string(),
                "fra".to_string(),
                "deu".to_string(),
            ],
            page_timeout: Duration::from_secs(30),
            page_concurrency: 4,
        }
    }
}

/// Recognized text for one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageOcr {
    /// 1-based page number.
    pub page_number: usize,
    pub text: String,
    pub confidence: f32,
    pub word_count: usize,
    pub line_count: usize,
}

/// A page the pipeline could not process.
#[derive(Debug, Clone, Serialize)]
pub struct PageOcrError {
    /// 1-based page number.
    pub page_number: usize,
    pub error: String,
}

/// Document-level OCR result.
///
/// `text` concatenates the successful pages with `--- Page N ---` separators;
/// failed pages are listed in `failed_pages` and excluded from
/// `mean_confidence`.
#[derive(Debug, Clone, Serialize)]
pub struct OcrOutcome {
    pub pages: Vec<PageOcr>,
    pub failed_pages: Vec<PageOcrError>,
    pub text: String,
    pub mean_confidence: f32,
    /// Language the run used.
    pub language: String,
    /// Set only by auto-detection.
    pub detected_language: Option<String>,
}

/// The OCR pipeline, parameterized over its two collaborators.
pub struct OcrPipeline {
    rasterizer: Arc<dyn PageRasterizer>,
    recognizer: Arc<dyn TextRecognizer>,
    config: OcrConfig,
}

impl OcrPipeline {
    pub fn new(
        rasterizer: Arc<dyn PageRasterizer>,
        recognizer: Arc<dyn TextRecognizer>,
        config: OcrConfig,
    ) -> Self {
        Self {
            rasterizer,
            recognizer,
            config,
        }
    }

    /// Pipeline with the default `pdftoppm` + `tesseract` collaborators.
    pub fn with_default_tools(config: OcrConfig) -> Self {
        Self::new(
            Arc::new(PdftoppmRasterizer),
            Arc::new(TesseractRecognizer),
            config,
        )
    }

    /// Run OCR over every page in the given language.
    ///
    /// Pages run concurrently up to `page_concurrency`, each under
    /// `page_timeout`. A failed page is recorded and skipped, never fatal
    /// for the run.
    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len()))]
    pub async fn run(&self, bytes: &[u8], language: &str) -> Result<OcrOutcome> {
        if !SUPPORTED_LANGUAGES.contains(&language) {
            return Err(BlattwerkError::InputMissing(format!(
                "unsupported OCR language {language:?}; supported: {}",
                SUPPORTED_LANGUAGES.join(", ")
            )));
        }
        self.rasterizer.ensure_available().await?;
        self.recognizer.ensure_available().await?;

        let page_count = Document::load_permissive(bytes)?.page_count();
        let bytes = Arc::new(bytes.to_vec());
        let language = language.to_string();

        let mut slots: Vec<Option<std::result::Result<RecognizedText, String>>> =
            vec![None; page_count];
        let mut join_set: JoinSet<(usize, std::result::Result<RecognizedText, String>)> =
            JoinSet::new();
        let mut next_page = 0usize;

        while next_page < page_count || !join_set.is_empty() {
            while next_page < page_count && join_set.len() < self.config.page_concurrency.max(1) {
                let rasterizer = Arc::clone(&self.rasterizer);
                let recognizer = Arc::clone(&self.recognizer);
                let bytes = Arc::clone(&bytes);
                let language = language.clone();
                let dpi = self.config.dpi;
                let timeout = self.config.page_timeout;
                let index = next_page;
                join_set.spawn(async move {
                    let work = ocr_one_page(&*rasterizer, &*recognizer, &bytes, index, dpi, &language);
                    let result = match tokio::time::timeout(timeout, work).await {
                        Ok(Ok(recognized)) => Ok(recognized),
                        Ok(Err(err)) => Err(err.to_string()),
                        Err(_) => Err(format!("page timed out after {timeout:?}")),
                    };
                    (index, result)
                });
                next_page += 1;
            }

            match join_set.join_next().await {
                Some(Ok((index, result))) => slots[index] = Some(result),
                Some(Err(err)) => warn!(%err, "ocr page task aborted"),
                None => {}
            }
        }

        let outcome = assemble_outcome(slots, &language);
        info!(
            pages = outcome.pages.len(),
            failed = outcome.failed_pages.len(),
            mean_confidence = outcome.mean_confidence,
            "ocr run complete"
        );
        Ok(outcome)
    }

    /// Run OCR once per candidate language and keep the best run.
    ///
    /// The run with the strictly highest mean confidence wins; on a tie the
    /// earlier candidate is kept.
    #[instrument(skip(self, bytes))]
    pub async fn run_auto_detect(&self, bytes: &[u8]) -> Result<OcrOutcome> {
        if self.config.languages.is_empty() {
            return Err(BlattwerkError::InputMissing(
                "no candidate languages configured for auto-detection".to_string(),
            ));
        }

        let mut best: Option<OcrOutcome> = None;
        for language in &self.config.languages {
            let outcome = self.run(bytes, language).await?;
            info!(
                language,
                mean_confidence = outcome.mean_confidence,
                "auto-detect candidate scored"
            );
            let better = match &best {
                Some(current) => outcome.mean_confidence > current.mean_confidence,
                None => true,
            };
            if better {
                best = Some(outcome);
            }
        }

        // languages is non-empty, so a best run exists.
        let mut outcome = best.ok_or_else(|| {
            BlattwerkError::OcrError("auto-detection produced no outcome".to_string())
        })?;
        outcome.detected_language = Some(outcome.language.clone());
        info!(detected = ?outcome.detected_language, "language auto-detected");
        Ok(outcome)
    }
}

async fn ocr_one_page(
    rasterizer: &dyn PageRasterizer,
    recognizer: &dyn TextRecognizer,
    bytes: &[u8],
    index: usize,
    dpi: u32,
    language: &str,
) -> Result<RecognizedText> {
    let image = rasterizer.rasterize(bytes, index, dpi).await?;
    recognizer.recognize(&image, language).await
}

fn assemble_outcome(
    slots: Vec<Option<std::result::Result<RecognizedText, String>>>,
    language: &str,
) -> OcrOutcome {
    let mut pages = Vec::new();
    let mut failed_pages = Vec::new();
    let mut text = String::new();

    for (index, slot) in slots.into_iter().enumerate() {
        let page_number = index + 1;
        match slot {
            Some(Ok(recognized)) => {
                text.push_str(&format!(
                    "\n--- Page {page_number} ---\n{}\n",
                    recognized.text
                ));
                pages.push(PageOcr {
                    page_number,
                    text: recognized.text,
                    confidence: recognized.confidence,
                    word_count: recognized.word_count,
                    line_count: recognized.line_count,
                });
            }
            Some(Err(error)) => failed_pages.push(PageOcrError { page_number, error }),
            None => failed_pages.push(PageOcrError {
                page_number,
                error: "page task aborted".to_string(),
            }),
        }
    }

    let mean_confidence = if pages.is_empty() {
        0.0
    } else {
        pages.iter().map(|p| p.confidence).sum::<f32>() / pages.len() as f32
    };

    OcrOutcome {
        pages,
        failed_pages,
        text: text.trim().to_string(),
        mean_confidence,
        language: language.to_string(),
        detected_language: None,
    }
}
