// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Password protection and unlocking, delegated to an external encryption
// tool. No cryptography is implemented in-engine: `protect` records intent
// in the document metadata and hands the bytes to the collaborator. A
// missing collaborator is an explicit error, never a silent no-op.

use async_trait::async_trait;
use blattwerk_core::error::{BlattwerkError, Result};
use tokio::process::Command;
use tracing::{info, instrument, warn};

use crate::model::Document;

/// External encryption-tool collaborator.
#[async_trait]
pub trait EncryptionTool: Send + Sync {
    /// Fails with [`BlattwerkError::CollaboratorUnavailable`] (including an
    /// install hint) when the tool cannot be invoked.
    async fn ensure_available(&self) -> Result<()>;

    /// Password-protect a document byte stream.
    async fn encrypt(&self, document: &[u8], password: &str) -> Result<Vec<u8>>;

    /// Remove password protection from a document byte stream.
    async fn decrypt(&self, document: &[u8], password: &str) -> Result<Vec<u8>>;
}

/// Password-protect a document.
///
/// The keywords metadata records the protection intent, then the actual
/// encryption is delegated to `tool`.
#[instrument(skip_all)]
pub async fn protect(bytes: &[u8], password: &str, tool: &dyn EncryptionTool) -> Result<Vec<u8>> {
    if password.is_empty() {
        return Err(BlattwerkError::InputMissing("password is empty".to_string()));
    }
    tool.ensure_available().await?;

    let mut doc = Document::load(bytes)?;
    let mut metadata = doc.metadata();
    metadata.keywords = Some(match metadata.keywords {
        Some(existing) => format!("{existing}, password-protected"),
        None => "password-protected".to_string(),
    });
    doc.set_metadata(&metadata);
    let marked = doc.save()?;

    info!("delegating encryption to external tool");
    tool.encrypt(&marked, password).await
}

/// Remove password protection, delegated to `tool`.
#[instrument(skip_all)]
pub async fn unlock(bytes: &[u8], password: &str, tool: &dyn EncryptionTool) -> Result<Vec<u8>> {
    if password.is_empty() {
        return Err(BlattwerkError::InputMissing("password is empty".to_string()));
    }
    tool.ensure_available().await?;

    info!("delegating decryption to external tool");
    tool.decrypt(bytes, password).await
}

/// Default collaborator shelling out to the `qpdf` CLI.
#[derive(Debug, Default)]
pub struct QpdfEncryptionTool;

impl QpdfEncryptionTool {
    async fn run(&self, arguments: &[&str], input: &[u8]) -> Result<Vec<u8>> {
        let workdir = tempfile::tempdir()?;
        let input_path = workdir.path().join("input.pdf");
        let output_path = workdir.path().join("output.pdf");
        tokio::fs::write(&input_path, input).await?;

        let mut command = Command::new("qpdf");
        command.args(arguments);
        command.arg(&input_path).arg(&output_path);

        let output = command.output().await.map_err(|err| {
            BlattwerkError::CollaboratorUnavailable(format!("failed to run qpdf: {err}"))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(%stderr, "qpdf reported failure");
            return Err(BlattwerkError::PdfError(format!("qpdf failed: {stderr}")));
        }

        Ok(tokio::fs::read(&output_path).await?)
    }
}

#[async_trait]
impl EncryptionTool for QpdfEncryptionTool {
    async fn ensure_available(&self) -> Result<()> {
        let probe = Command::new("qpdf").arg("--version").output().await;
        match probe {
            Ok(output) if output.status.success() => Ok(()),
            _ => Err(BlattwerkError::CollaboratorUnavailable(
                "qpdf not found; install it (e.g. `apt install qpdf` or `brew install qpdf`) \
                 to enable password protection"
                    .to_string(),
            )),
        }
    }

    async fn encrypt(&self, document: &[u8], password: &str) -> Result<Vec<u8>> {
        self.run(&["--encrypt", password, password, "256", "--"], document)
            .await
    }

    async fn decrypt(&self, document: &[u8], password: &str) -> Result<Vec<u8>> {
        let password_flag = format!("--password={password}");
        self.run(&[password_flag.as_str(), "--decrypt"], document)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::pdf_with_pages;

    struct MockEncryptionTool {
        available: bool,
    }

    #[async_trait]
    impl EncryptionTool for MockEncryptionTool {
        async fn ensure_available(&self) -> Result<()> {
            if self.available {
                Ok(())
            } else {
                Err(BlattwerkError::CollaboratorUnavailable(
                    "scripted: tool missing".to_string(),
                ))
            }
        }

        async fn encrypt(&self, document: &[u8], _password: &str) -> Result<Vec<u8>> {
            let mut out = b"ENC:".to_vec();
            out.extend_from_slice(document);
            Ok(out)
        }

        async fn decrypt(&self, document: &[u8], _password: &str) -> Result<Vec<u8>> {
            Ok(document
                .strip_prefix(b"ENC:")
                .unwrap_or(document)
                .to_vec())
        }
    }

    #[tokio::test]
    async fn protect_marks_intent_and_delegates() {
        let bytes = pdf_with_pages(&["secret"]);
        let tool = MockEncryptionTool { available: true };
        let protected = protect(&bytes, "hunter2", &tool).await.unwrap();
        assert!(protected.starts_with(b"ENC:"));

        let inner = Document::load(&protected[4..]).unwrap();
        let keywords = inner.metadata().keywords.unwrap();
        assert!(keywords.contains("password-protected"));
    }

    #[tokio::test]
    async fn missing_tool_is_an_explicit_error() {
        let bytes = pdf_with_pages(&["secret"]);
        let tool = MockEncryptionTool { available: false };
        let err = protect(&bytes, "hunter2", &tool).await.unwrap_err();
        assert!(matches!(err, BlattwerkError::CollaboratorUnavailable(_)));
    }

    #[tokio::test]
    async fn unlock_requires_password() {
        let bytes = pdf_with_pages(&["secret"]);
        let tool = MockEncryptionTool { available: true };
        let err = unlock(&bytes, "", &tool).await.unwrap_err();
        assert!(matches!(err, BlattwerkError::InputMissing(_)));
    }
}
