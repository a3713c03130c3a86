// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outcome of a transformation call.
//
// Three outcomes, all carrying the transformation record: a ready artifact,
// a compliant artifact that needs operator review first, or a failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::DocfitError;
use crate::record::TransformationRecord;
use crate::types::Artifact;

/// How strongly an operator must look at a degraded result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewTier {
    /// The caller may proceed but should offer a preview.
    Advisory,
    /// The caller must show the preview and get confirmation before use.
    Mandatory,
}

/// A compliant artifact whose encode quality is low enough that a human
/// should see it before it is uploaded.
#[derive(Debug, Clone)]
pub struct QualityDisclosure {
    /// Achieved encode quality, 1–100.
    pub quality_percent: u8,
    pub achieved_size_bytes: u64,
    pub max_size_bytes: u64,
    /// The already-built, size-compliant artifact.
    pub preview: Artifact,
    pub tier: ReviewTier,
    /// Plain-language explanation for the operator.
    pub message: String,
}

impl QualityDisclosure {
    pub fn mandatory_review(&self) -> bool {
        self.tier == ReviewTier::Mandatory
    }
}

/// An error together with the record of everything that ran before it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct TransformFailure {
    #[source]
    pub error: DocfitError,
    pub record: TransformationRecord,
}

/// Result of one transformation call. Callers must handle all three.
#[derive(Debug)]
pub enum TransformOutcome {
    /// The artifact satisfies the requirement and can be used directly.
    Ready {
        artifact: Artifact,
        record: TransformationRecord,
    },
    /// A compliant artifact exists but needs operator review first.
    NeedsReview {
        disclosure: QualityDisclosure,
        record: TransformationRecord,
    },
    /// The transformation failed.
    Failed(TransformFailure),
}

impl TransformOutcome {
    pub fn record(&self) -> &TransformationRecord {
        match self {
            Self::Ready { record, .. } | Self::NeedsReview { record, .. } => record,
            Self::Failed(failure) => &failure.record,
        }
    }

    /// The artifact a caller could use: the ready artifact or the preview.
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            Self::Ready { artifact, .. } => Some(artifact),
            Self::NeedsReview { disclosure, .. } => Some(&disclosure.preview),
            Self::Failed(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaType;

    #[test]
    fn failure_displays_inner_error() {
        let failure = TransformFailure {
            error: DocfitError::Decode("truncated".into()),
            record: TransformationRecord::new(1, 1, 1),
        };
        assert_eq!(failure.to_string(), "image decode failed: truncated");
        let outcome = TransformOutcome::Failed(failure);
        assert!(outcome.artifact().is_none());
        assert_eq!(outcome.record().max_size_bytes, 1);
    }

    #[test]
    fn review_exposes_preview() {
        let preview = Artifact::new(vec![1; 8], MediaType::Pdf, "doc.pdf");
        let outcome = TransformOutcome::NeedsReview {
            disclosure: QualityDisclosure {
                quality_percent: 40,
                achieved_size_bytes: 8,
                max_size_bytes: 10,
                preview,
                tier: ReviewTier::Mandatory,
                message: "check it".into(),
            },
            record: TransformationRecord::new(20, 8, 10),
        };
        assert!(!outcome.is_ready());
        assert_eq!(outcome.artifact().map(|a| a.size_bytes()), Some(8));
    }
}
