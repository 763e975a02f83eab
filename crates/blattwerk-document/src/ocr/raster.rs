// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rasterization collaborator seam and the default `pdftoppm` shell-out.

use async_trait::async_trait;
use blattwerk_core::error::{BlattwerkError, Result};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::model::Document;

/// Rasterization collaborator: one page of a document to PNG bytes.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Fails with [`BlattwerkError::CollaboratorUnavailable`] (with an
    /// install hint) when the backend cannot be invoked.
    async fn ensure_available(&self) -> Result<()>;

    /// Render the page at `page_number` (0-based) to PNG at the given DPI.
    async fn rasterize(&self, document: &[u8], page_number: usize, dpi: u32) -> Result<Vec<u8>>;
}

/// Default rasterizer shelling out to poppler's `pdftoppm`.
#[derive(Debug, Default)]
pub struct PdftoppmRasterizer;

#[async_trait]
impl PageRasterizer for PdftoppmRasterizer {
    async fn ensure_available(&self) -> Result<()> {
        let probe = Command::new("pdftoppm").arg("-v").output().await;
        match probe {
            Ok(_) => Ok(()),
            Err(_) => Err(BlattwerkError::CollaboratorUnavailable(
                "pdftoppm not found; install poppler-utils (e.g. `apt install poppler-utils` \
                 or `brew install poppler`) to enable rasterization"
                    .to_string(),
            )),
        }
    }

    #[instrument(skip(self, document))]
    async fn rasterize(&self, document: &[u8], page_number: usize, dpi: u32) -> Result<Vec<u8>> {
        let workdir = tempfile::tempdir()?;
        let input_path = workdir.path().join("input.pdf");
        tokio::fs::write(&input_path, document).await?;

        // pdftoppm numbers pages from 1.
        let page_arg = (page_number + 1).to_string();
        let prefix = workdir.path().join("page");

        let output = Command::new("pdftoppm")
            .arg("-png")
            .args(["-r", &dpi.to_string()])
            .args(["-f", &page_arg])
            .args(["-l", &page_arg])
            .arg(&input_path)
            .arg(&prefix)
            .output()
            .await
            .map_err(|err| {
                BlattwerkError::CollaboratorUnavailable(format!("failed to run pdftoppm: {err}"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BlattwerkError::OcrError(format!(
                "pdftoppm failed on page {page_number}: {stderr}"
            )));
        }

        // The output suffix is zero-padded to the document's digit count, so
        // scan the scratch directory for the single produced file.
        let mut entries = tokio::fs::read_dir(workdir.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("page") && name.ends_with(".png") {
                let image = tokio::fs::read(entry.path()).await?;
                debug!(page_number, image_bytes = image.len(), "page rasterized");
                return Ok(image);
            }
        }

        Err(BlattwerkError::OcrError(format!(
            "pdftoppm produced no image for page {page_number}"
        )))
    }
}

/// Rasterize every page of a document at the given DPI.
///
/// A page that fails yields `None` with a warning; the remaining pages are
/// still produced.
#[instrument(skip_all, fields(dpi))]
pub async fn rasterize_document(
    bytes: &[u8],
    dpi: u32,
    rasterizer: &dyn PageRasterizer,
) -> Result<Vec<Option<Vec<u8>>>> {
    rasterizer.ensure_available().await?;
    let page_count = Document::load_permissive(bytes)?.page_count();

    let mut images = Vec::with_capacity(page_count);
    for page_number in 0..page_count {
        match rasterizer.rasterize(bytes, page_number, dpi).await {
            Ok(image) => images.push(Some(image)),
            Err(err) => {
                warn!(page = page_number, %err, "page rasterization failed, skipping");
                images.push(None);
            }
        }
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::pdf_with_pages;
    use async_trait::async_trait;

    struct FlakyRasterizer;

    #[async_trait]
    impl PageRasterizer for FlakyRasterizer {
        async fn ensure_available(&self) -> Result<()> {
            Ok(())
        }

        async fn rasterize(
            &self,
            _document: &[u8],
            page_number: usize,
            _dpi: u32,
        ) -> Result<Vec<u8>> {
            if page_number == 1 {
                return Err(BlattwerkError::OcrError("scripted failure".to_string()));
            }
            Ok(vec![page_number as u8])
        }
    }

    struct MissingRasterizer;

    #[async_trait]
    impl PageRasterizer for MissingRasterizer {
        async fn ensure_available(&self) -> Result<()> {
            Err(BlattwerkError::CollaboratorUnavailable(
                "scripted: tool missing".to_string(),
            ))
        }

        async fn rasterize(
            &self,
            _document: &[u8],
            _page_number: usize,
            _dpi: u32,
        ) -> Result<Vec<u8>> {
            Err(BlattwerkError::OcrError("should not be reached".to_string()))
        }
    }

    #[tokio::test]
    async fn failed_page_rasterizes_to_none_and_the_rest_are_produced() {
        let bytes = pdf_with_pages(&["a", "b", "c"]);
        let images = rasterize_document(&bytes, 150, &FlakyRasterizer)
            .await
            .unwrap();
        assert_eq!(images.len(), 3);
        assert_eq!(images[0].as_deref(), Some(&[0u8][..]));
        assert!(images[1].is_none());
        assert_eq!(images[2].as_deref(), Some(&[2u8][..]));
    }

    #[tokio::test]
    async fn missing_tool_fails_the_whole_call() {
        let bytes = pdf_with_pages(&["a"]);
        let err = rasterize_document(&bytes, 150, &MissingRasterizer)
            .await
            .unwrap_err();
        assert!(matches!(err, BlattwerkError::CollaboratorUnavailable(_)));
    }
}
