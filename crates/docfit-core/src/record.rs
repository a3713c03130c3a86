// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transformation record — the per-call log every stage appends to.
//
// A record is created fresh for each call and threaded through the stages
// explicitly, so concurrent transformations never share a log.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::types::{MediaType, Stage};

/// Ordered log and summary statistics for one transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationRecord {
    /// Correlates log lines of one call.
    pub run_id: Uuid,
    /// Ordered step log, each entry prefixed with its stage tag.
    pub steps: Vec<String>,
    /// Non-fatal problems (fallbacks, degraded quality).
    pub warnings: Vec<String>,
    pub original_size_bytes: u64,
    pub final_size_bytes: u64,
    /// Size reduction relative to the original, in percent (negative when
    /// the artifact grew, e.g. after a format change).
    pub compression_ratio_percent: f64,
    /// "image/png -> application/pdf" when the media type changed.
    pub format_change: Option<String>,
    /// Quality was sacrificed more than necessary.
    pub is_overcompressed: bool,
    /// Preferred landing size (a fraction of the ceiling).
    pub target_size_bytes: u64,
    pub max_size_bytes: u64,
}

impl TransformationRecord {
    pub fn new(original_size_bytes: u64, target_size_bytes: u64, max_size_bytes: u64) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            steps: Vec::new(),
            warnings: Vec::new(),
            original_size_bytes,
            final_size_bytes: original_size_bytes,
            compression_ratio_percent: 0.0,
            format_change: None,
            is_overcompressed: false,
            target_size_bytes,
            max_size_bytes,
        }
    }

    /// Append a step to the log.
    pub fn step(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        info!(run_id = %self.run_id, stage = stage.as_str(), "{message}");
        self.steps.push(format!("[{stage}] {message}"));
    }

    /// Append a warning. Warnings also appear in the step log so the
    /// ordering of events is preserved.
    pub fn warn(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        warn!(run_id = %self.run_id, stage = stage.as_str(), "{message}");
        self.steps.push(format!("[{stage}] warning: {message}"));
        self.warnings.push(message);
    }

    /// Number of log entries recorded for `stage`.
    pub fn steps_for(&self, stage: Stage) -> usize {
        let prefix = format!("[{stage}]");
        self.steps.iter().filter(|s| s.starts_with(&prefix)).count()
    }

    pub fn note_format_change(&mut self, from: MediaType, to: MediaType) {
        if from != to {
            self.format_change = Some(format!("{from} -> {to}"));
        }
    }

    /// Fill in the final size and the derived reduction percentage.
    pub fn finish(&mut self, final_size_bytes: u64) {
        self.final_size_bytes = final_size_bytes;
        self.compression_ratio_percent = if self.original_size_bytes == 0 {
            0.0
        } else {
            let saved = self.original_size_bytes as f64 - final_size_bytes as f64;
            (saved / self.original_size_bytes as f64 * 1000.0).round() / 10.0
        };
    }
}
