// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use serde::{Deserialize, Serialize};

/// Boundary ceiling applied to input documents before any engine work begins.
pub const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 50 * 1024 * 1024;

/// Engine-level settings, passed explicitly into operations that need them.
///
/// There is deliberately no process-wide singleton; callers construct one
/// (usually `EngineConfig::default()`) and hand it to validation or to the
/// OCR pipeline builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum accepted document size in bytes. Oversized inputs are flagged
    /// as a validation issue, not rejected with an error.
    pub max_document_bytes: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ceiling_is_fifty_mebibytes() {
        let config = EngineConfig::default();
        assert_eq!(config.max_document_bytes, 52_428_800);
    }
}
