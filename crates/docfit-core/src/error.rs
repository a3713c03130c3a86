// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Docfit.

use thiserror::Error;

use crate::types::Stage;

/// Top-level error type for all Docfit operations.
#[derive(Debug, Error)]
pub enum DocfitError {
    // -- Input errors --
    #[error("invalid requirement: {0}")]
    InvalidRequirement(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    // -- Codec errors --
    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("image decode timed out after {seconds}s")]
    DecodeTimeout { seconds: u64 },

    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    // -- Pipeline errors --
    /// A single stage failed. The orchestrator decides whether to fall back
    /// to the pre-stage artifact or abort.
    #[error("{stage} stage failed: {detail}")]
    Stage { stage: Stage, detail: String },

    /// No reachable encoding fits under the ceiling.
    #[error(
        "cannot compress {original_bytes} bytes to fit {ceiling_bytes} bytes \
         (ratio {ratio:.1}x, target {target_bytes} bytes): try a smaller or simpler \
         image, crop away empty borders, or ask for a higher size limit"
    )]
    CompressionExhausted {
        original_bytes: u64,
        target_bytes: u64,
        ceiling_bytes: u64,
        ratio: f64,
    },

    /// The orchestrator's own postcondition failed after an apparently
    /// successful run. This is a pipeline defect, not a user error.
    #[error("pipeline postcondition violated: {0}")]
    ValidationFailure(String),

    #[error("background task failed: {0}")]
    Task(String),

    // -- Storage / serialization --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DocfitError {
    /// Whether this error signals a bug in the pipeline itself rather than an
    /// input the user can fix.
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::ValidationFailure(_) | Self::Task(_))
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocfitError>;
